//! HTTP geolocation providers.

mod ip_api;
mod ipinfo;
mod ipwhois;

pub use ip_api::IpApiProvider;
pub use ipinfo::IpInfoProvider;
pub use ipwhois::IpWhoIsProvider;

use serde::de::DeserializeOwned;

use super::types::Coordinate;
use crate::error_handling::ProviderError;

/// Sends a request and decodes a JSON body, mapping non-2xx statuses to
/// `ProviderError::Status`.
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
) -> Result<T, ProviderError> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ProviderError::Status(status.as_u16()));
    }
    Ok(response.json::<T>().await?)
}

/// Builds a coordinate from optional provider fields.
///
/// Missing or out-of-range positions yield `None`; the provider is treated as
/// having no usable data for that address.
pub(crate) fn coordinate_from_parts(
    provider: &str,
    address: &str,
    latitude: Option<f64>,
    longitude: Option<f64>,
    country: Option<String>,
    city: Option<String>,
) -> Option<Coordinate> {
    let (latitude, longitude) = match (latitude, longitude) {
        (Some(lat), Some(lon)) => (lat, lon),
        _ => {
            log::debug!("{} returned no position for {}", provider, address);
            return None;
        }
    };
    match Coordinate::new(latitude, longitude) {
        Ok(coordinate) => Some(coordinate.with_place(country, city)),
        Err(e) => {
            log::debug!("{} returned malformed data for {}: {}", provider, address, e);
            None
        }
    }
}

/// Trims a trailing slash so paths can be appended with `format!`.
pub(crate) fn normalize_base(base_url: Option<String>, default: &str) -> String {
    base_url
        .unwrap_or_else(|| default.to_string())
        .trim_end_matches('/')
        .to_string()
}
