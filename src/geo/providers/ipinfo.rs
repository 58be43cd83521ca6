//! ipinfo.io provider (single address).

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::{coordinate_from_parts, fetch_json, normalize_base};
use crate::config::IPINFO_BASE_URL;
use crate::error_handling::ProviderError;
use crate::geo::provider::{lookup_each, GeoProvider, ProviderResults};
use crate::geo::types::Coordinate;

#[derive(Debug, Deserialize)]
struct IpInfoRecord {
    #[serde(default)]
    ip: Option<String>,
    /// "lat,lon"; absent for bogon and unknown addresses
    #[serde(default)]
    loc: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    bogon: bool,
}

impl IpInfoRecord {
    fn into_coordinate(self, address: &str) -> Option<Coordinate> {
        if self.bogon {
            log::debug!("ipinfo reports {} as a bogon address", address);
            return None;
        }
        let (latitude, longitude) = match self.loc.as_deref().and_then(parse_loc) {
            Some((lat, lon)) => (Some(lat), Some(lon)),
            None => (None, None),
        };
        coordinate_from_parts("ipinfo", address, latitude, longitude, self.country, self.city)
    }
}

fn parse_loc(loc: &str) -> Option<(f64, f64)> {
    let (lat, lon) = loc.split_once(',')?;
    Some((lat.trim().parse().ok()?, lon.trim().parse().ok()?))
}

/// Client for ipinfo.io.
pub struct IpInfoProvider {
    client: Arc<reqwest::Client>,
    base_url: String,
}

impl IpInfoProvider {
    pub fn new(client: Arc<reqwest::Client>, base_url: Option<String>) -> Self {
        IpInfoProvider {
            client,
            base_url: normalize_base(base_url, IPINFO_BASE_URL),
        }
    }

    async fn lookup_one(&self, address: String) -> Result<Option<Coordinate>, ProviderError> {
        let request = self
            .client
            .get(format!("{}/{}/json", self.base_url, address));
        let record: IpInfoRecord = fetch_json(request).await?;
        Ok(record.into_coordinate(&address))
    }
}

#[async_trait]
impl GeoProvider for IpInfoProvider {
    fn name(&self) -> &str {
        "ipinfo"
    }

    async fn lookup(&self, addresses: &[String]) -> Result<ProviderResults, ProviderError> {
        lookup_each(self.name(), addresses, |address| self.lookup_one(address)).await
    }

    async fn lookup_self(&self) -> Result<Option<Coordinate>, ProviderError> {
        let request = self.client.get(format!("{}/json", self.base_url));
        let record: IpInfoRecord = fetch_json(request).await?;
        let address = record.ip.clone().unwrap_or_else(|| "self".to_string());
        Ok(record.into_coordinate(&address))
    }
}
