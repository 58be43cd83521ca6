//! Geolocation provider capability.
//!
//! Every provider, bulk or single-address, exposes the same capability:
//! resolve a set of addresses and report which ones it could place. Which
//! providers are used, and in what order, is configuration (`ProviderKind`),
//! not structure.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use clap::ValueEnum;
use strum_macros::{Display, EnumIter};

use super::providers::{IpApiProvider, IpInfoProvider, IpWhoIsProvider};
use super::types::Coordinate;
use crate::error_handling::ProviderError;

/// Addresses a provider resolved. Addresses absent from the map were not
/// resolved by this provider (per-address failure or no data).
pub type ProviderResults = HashMap<String, Coordinate>;

/// A geolocation data source.
#[async_trait]
pub trait GeoProvider: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Maximum addresses accepted per `lookup` call.
    fn batch_limit(&self) -> usize {
        1
    }

    /// Resolves `addresses`.
    ///
    /// `Err` means the whole call failed; a partial answer is `Ok` with the
    /// unresolved addresses missing from the map.
    async fn lookup(&self, addresses: &[String]) -> Result<ProviderResults, ProviderError>;

    /// Resolves the caller's own public address.
    async fn lookup_self(&self) -> Result<Option<Coordinate>, ProviderError>;
}

/// Built-in providers, selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Display, EnumIter)]
pub enum ProviderKind {
    /// ip-api.com, bulk endpoint (100 addresses per call)
    #[value(name = "ip-api")]
    #[strum(serialize = "ip-api")]
    IpApi,
    /// ipwho.is, single address
    #[value(name = "ipwhois")]
    #[strum(serialize = "ipwhois")]
    IpWhoIs,
    /// ipinfo.io, single address
    #[value(name = "ipinfo")]
    #[strum(serialize = "ipinfo")]
    IpInfo,
}

impl ProviderKind {
    /// Builds the provider against its public endpoint or `base_url`.
    pub fn build(
        self,
        client: Arc<reqwest::Client>,
        base_url: Option<String>,
    ) -> Arc<dyn GeoProvider> {
        match self {
            ProviderKind::IpApi => Arc::new(IpApiProvider::new(client, base_url)),
            ProviderKind::IpWhoIs => Arc::new(IpWhoIsProvider::new(client, base_url)),
            ProviderKind::IpInfo => Arc::new(IpInfoProvider::new(client, base_url)),
        }
    }
}

/// Looks up each address with a single-address provider, one call at a time.
///
/// A per-address error is logged and leaves that address unresolved, unless
/// there was only one address, in which case the error is the call's error.
pub(crate) async fn lookup_each<F, Fut>(
    provider: &str,
    addresses: &[String],
    lookup_one: F,
) -> Result<ProviderResults, ProviderError>
where
    F: Fn(String) -> Fut,
    Fut: std::future::Future<Output = Result<Option<Coordinate>, ProviderError>>,
{
    let mut results = ProviderResults::new();
    for address in addresses {
        match lookup_one(address.clone()).await {
            Ok(Some(coordinate)) => {
                results.insert(address.clone(), coordinate);
            }
            Ok(None) => {}
            Err(e) if addresses.len() == 1 => return Err(e),
            Err(e) => log::debug!("{} failed for {}: {}", provider, address, e),
        }
    }
    Ok(results)
}
