//! ip-api.com provider (bulk-capable).

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::{coordinate_from_parts, fetch_json, normalize_base};
use crate::config::{IP_API_BASE_URL, PRIMARY_BATCH_LIMIT};
use crate::error_handling::ProviderError;
use crate::geo::provider::{GeoProvider, ProviderResults};
use crate::geo::types::Coordinate;

const FIELDS: &str = "status,message,query,country,city,lat,lon";

/// One record of an ip-api response.
#[derive(Debug, Deserialize)]
struct IpApiRecord {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    city: Option<String>,
}

impl IpApiRecord {
    fn into_coordinate(self, address: &str) -> Option<Coordinate> {
        if self.status != "success" {
            log::debug!(
                "ip-api could not resolve {}: {}",
                address,
                self.message.as_deref().unwrap_or("no reason given")
            );
            return None;
        }
        coordinate_from_parts(
            "ip-api",
            address,
            self.lat,
            self.lon,
            self.country,
            self.city,
        )
    }
}

/// Client for the ip-api.com JSON and batch endpoints.
pub struct IpApiProvider {
    client: Arc<reqwest::Client>,
    base_url: String,
}

impl IpApiProvider {
    pub fn new(client: Arc<reqwest::Client>, base_url: Option<String>) -> Self {
        IpApiProvider {
            client,
            base_url: normalize_base(base_url, IP_API_BASE_URL),
        }
    }
}

#[async_trait]
impl GeoProvider for IpApiProvider {
    fn name(&self) -> &str {
        "ip-api"
    }

    fn batch_limit(&self) -> usize {
        PRIMARY_BATCH_LIMIT
    }

    async fn lookup(&self, addresses: &[String]) -> Result<ProviderResults, ProviderError> {
        if addresses.is_empty() {
            return Ok(ProviderResults::new());
        }

        let request = self
            .client
            .post(format!("{}/batch", self.base_url))
            .query(&[("fields", FIELDS)])
            .json(addresses);
        let records: Vec<IpApiRecord> = fetch_json(request).await?;

        if records.len() != addresses.len() {
            log::debug!(
                "ip-api returned {} records for {} addresses",
                records.len(),
                addresses.len()
            );
        }

        let mut results = ProviderResults::new();
        for (index, record) in records.into_iter().enumerate() {
            // Records echo the address in `query`; fall back to request order
            let address = match record.query.clone() {
                Some(query) if addresses.contains(&query) => query,
                _ => match addresses.get(index) {
                    Some(address) => address.clone(),
                    None => continue,
                },
            };
            if let Some(coordinate) = record.into_coordinate(&address) {
                results.insert(address, coordinate);
            }
        }
        Ok(results)
    }

    async fn lookup_self(&self) -> Result<Option<Coordinate>, ProviderError> {
        let request = self
            .client
            .get(format!("{}/json/", self.base_url))
            .query(&[("fields", FIELDS)]);
        let record: IpApiRecord = fetch_json(request).await?;
        let address = record.query.clone().unwrap_or_else(|| "self".to_string());
        Ok(record.into_coordinate(&address))
    }
}
