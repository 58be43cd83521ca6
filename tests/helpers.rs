// Shared test doubles and fixtures.
//
// In-memory geolocation providers that count calls, plus a few well-known
// coordinates. Included by other test files with `mod helpers;`.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use peer_cluster::geo::ProviderResults;
use peer_cluster::{Coordinate, GeoProvider, ProviderError, ResolverConfig};

pub fn paris() -> Coordinate {
    Coordinate::new(48.8566, 2.3522)
        .unwrap()
        .with_place(Some("France".into()), Some("Paris".into()))
}

pub fn berlin() -> Coordinate {
    Coordinate::new(52.52, 13.405)
        .unwrap()
        .with_place(Some("Germany".into()), Some("Berlin".into()))
}

pub fn new_york() -> Coordinate {
    Coordinate::new(40.7128, -74.006)
        .unwrap()
        .with_place(Some("United States".into()), Some("New York".into()))
}

/// Resolver settings with a negligible retry delay.
pub fn fast_config() -> ResolverConfig {
    ResolverConfig {
        retry_delay: Duration::from_millis(1),
        ..ResolverConfig::default()
    }
}

/// Provider answering from a fixed table.
pub struct StaticProvider {
    name: &'static str,
    batch_limit: usize,
    known: HashMap<String, Coordinate>,
    own: Option<Coordinate>,
    delay: Duration,
    calls: AtomicUsize,
}

impl StaticProvider {
    pub fn new(name: &'static str, batch_limit: usize) -> Self {
        StaticProvider {
            name,
            batch_limit,
            known: HashMap::new(),
            own: None,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with(mut self, address: &str, coordinate: Coordinate) -> Self {
        self.known.insert(address.to_string(), coordinate);
        self
    }

    pub fn with_own(mut self, coordinate: Coordinate) -> Self {
        self.own = Some(coordinate);
        self
    }

    /// Every call sleeps this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl GeoProvider for StaticProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn batch_limit(&self) -> usize {
        self.batch_limit
    }

    async fn lookup(&self, addresses: &[String]) -> Result<ProviderResults, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(addresses
            .iter()
            .filter_map(|a| self.known.get(a).map(|c| (a.clone(), c.clone())))
            .collect())
    }

    async fn lookup_self(&self) -> Result<Option<Coordinate>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.own.clone())
    }
}

/// Provider whose every call fails with a transport-like error.
pub struct DownProvider {
    calls: AtomicUsize,
}

impl DownProvider {
    pub fn shared() -> Arc<Self> {
        Arc::new(DownProvider {
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GeoProvider for DownProvider {
    fn name(&self) -> &str {
        "down"
    }

    async fn lookup(&self, _addresses: &[String]) -> Result<ProviderResults, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ProviderError::Timeout)
    }

    async fn lookup_self(&self) -> Result<Option<Coordinate>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ProviderError::Timeout)
    }
}
