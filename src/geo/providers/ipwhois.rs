//! ipwho.is provider (single address).

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::{coordinate_from_parts, fetch_json, normalize_base};
use crate::config::IPWHOIS_BASE_URL;
use crate::error_handling::ProviderError;
use crate::geo::provider::{lookup_each, GeoProvider, ProviderResults};
use crate::geo::types::Coordinate;

#[derive(Debug, Deserialize)]
struct IpWhoIsRecord {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    ip: Option<String>,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    city: Option<String>,
}

impl IpWhoIsRecord {
    fn into_coordinate(self, address: &str) -> Option<Coordinate> {
        if !self.success {
            log::debug!(
                "ipwhois could not resolve {}: {}",
                address,
                self.message.as_deref().unwrap_or("no reason given")
            );
            return None;
        }
        coordinate_from_parts(
            "ipwhois",
            address,
            self.latitude,
            self.longitude,
            self.country,
            self.city,
        )
    }
}

/// Client for ipwho.is.
pub struct IpWhoIsProvider {
    client: Arc<reqwest::Client>,
    base_url: String,
}

impl IpWhoIsProvider {
    pub fn new(client: Arc<reqwest::Client>, base_url: Option<String>) -> Self {
        IpWhoIsProvider {
            client,
            base_url: normalize_base(base_url, IPWHOIS_BASE_URL),
        }
    }

    async fn lookup_one(&self, address: String) -> Result<Option<Coordinate>, ProviderError> {
        let request = self.client.get(format!("{}/{}", self.base_url, address));
        let record: IpWhoIsRecord = fetch_json(request).await?;
        Ok(record.into_coordinate(&address))
    }
}

#[async_trait]
impl GeoProvider for IpWhoIsProvider {
    fn name(&self) -> &str {
        "ipwhois"
    }

    async fn lookup(&self, addresses: &[String]) -> Result<ProviderResults, ProviderError> {
        lookup_each(self.name(), addresses, |address| self.lookup_one(address)).await
    }

    async fn lookup_self(&self) -> Result<Option<Coordinate>, ProviderError> {
        let request = self.client.get(format!("{}/", self.base_url));
        let record: IpWhoIsRecord = fetch_json(request).await?;
        let address = record.ip.clone().unwrap_or_else(|| "self".to_string());
        Ok(record.into_coordinate(&address))
    }
}
