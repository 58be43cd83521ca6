//! Address resolver.
//!
//! Resolves addresses to coordinates through the resolution cache, one
//! bulk-capable primary provider behind a rate gate, and an ordered chain of
//! single-address fallback providers worked by a bounded pool of tasks.
//!
//! Provider failures never escape: an address every provider failed on maps
//! to `None`, and that negative outcome is cached like any other.

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::net::IpAddr;
use std::num::NonZeroUsize;
use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tokio_retry::RetryIf;
use tokio_util::sync::CancellationToken;

use super::cache::{CacheLookup, CacheSnapshotEntry, ResolutionCache};
use super::provider::GeoProvider;
use super::rate_gate::RateGate;
use super::types::Coordinate;
use crate::config::{Config, ResolverConfig, SELF_CACHE_KEY};
use crate::error_handling::{retry_once, InputError, ProviderError};

/// Resolution outcome per input address; `None` when unresolvable.
pub type Resolutions = HashMap<String, Option<Coordinate>>;

/// Progress callback receiving `(done, total)`.
///
/// Always invoked from the task driving `resolve_many`, never concurrently.
pub type ProgressSink<'a> = &'a mut (dyn FnMut(usize, usize) + Send);

/// Counts completions and forwards them to the optional sink.
struct ProgressTracker<'a> {
    done: usize,
    total: usize,
    sink: Option<ProgressSink<'a>>,
}

impl<'a> ProgressTracker<'a> {
    fn new(total: usize, sink: Option<ProgressSink<'a>>) -> Self {
        ProgressTracker {
            done: 0,
            total,
            sink,
        }
    }

    fn advance(&mut self, completed: usize) {
        if completed == 0 {
            return;
        }
        self.done += completed;
        if let Some(sink) = self.sink.as_mut() {
            sink(self.done, self.total);
        }
    }
}

struct ResolverInner {
    primary: Arc<dyn GeoProvider>,
    fallbacks: Vec<Arc<dyn GeoProvider>>,
    cache: ResolutionCache,
    gate: RateGate,
    config: ResolverConfig,
    cancel: CancellationToken,
}

/// Caching, rate-limited, multi-provider address resolver.
///
/// Cheap to clone; clones share the cache, rate gate and cancellation token.
#[derive(Clone)]
pub struct AddressResolver {
    inner: Arc<ResolverInner>,
}

impl AddressResolver {
    /// Creates a resolver with its own cancellation token.
    pub fn new(
        primary: Arc<dyn GeoProvider>,
        fallbacks: Vec<Arc<dyn GeoProvider>>,
        config: ResolverConfig,
    ) -> Result<Self, InputError> {
        Self::with_cancellation(primary, fallbacks, config, CancellationToken::new())
    }

    /// Creates a resolver that stops starting new work once `cancel` fires.
    pub fn with_cancellation(
        primary: Arc<dyn GeoProvider>,
        fallbacks: Vec<Arc<dyn GeoProvider>>,
        config: ResolverConfig,
        cancel: CancellationToken,
    ) -> Result<Self, InputError> {
        config.validate()?;
        let capacity = NonZeroUsize::new(config.cache_capacity).ok_or(
            InputError::InvalidParameter {
                name: "cache_capacity",
                reason: "must be greater than zero".to_string(),
            },
        )?;

        Ok(AddressResolver {
            inner: Arc::new(ResolverInner {
                primary,
                fallbacks,
                cache: ResolutionCache::new(capacity),
                gate: RateGate::new(config.rate_limit_calls, config.rate_limit_window),
                config,
                cancel,
            }),
        })
    }

    /// Builds the configured providers on `client`.
    ///
    /// The primary provider is skipped if it also appears among the fallbacks.
    pub fn from_config(
        config: &Config,
        client: Arc<reqwest::Client>,
        cancel: CancellationToken,
    ) -> Result<Self, InputError> {
        let primary = config.primary_provider.build(Arc::clone(&client), None);
        let fallbacks = config
            .fallback_providers
            .iter()
            .filter(|kind| **kind != config.primary_provider)
            .map(|kind| kind.build(Arc::clone(&client), None))
            .collect();
        Self::with_cancellation(primary, fallbacks, config.resolver_config(), cancel)
    }

    /// Token that cancels this resolver's in-progress and future runs.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.inner.cancel.clone()
    }

    /// Resolves a single address. Convenience over `resolve_many`.
    pub async fn resolve_one(&self, address: &str) -> Result<Option<Coordinate>, InputError> {
        let mut resolved = self.resolve_many([address], None).await?;
        Ok(resolved.remove(address).flatten())
    }

    /// Resolves a set of addresses.
    ///
    /// Every input address appears exactly once in the output. Malformed
    /// addresses reject the whole call before any lookup starts. On
    /// cancellation the call returns promptly; addresses that had not
    /// completed map to `None` and are not cached.
    pub async fn resolve_many<I, S>(
        &self,
        addresses: I,
        progress: Option<ProgressSink<'_>>,
    ) -> Result<Resolutions, InputError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut pending = BTreeSet::new();
        for address in addresses {
            let address = address.as_ref();
            if address.parse::<IpAddr>().is_err() {
                return Err(InputError::InvalidAddress(address.to_string()));
            }
            pending.insert(address.to_string());
        }

        let total = pending.len();
        let mut results: Resolutions = pending.iter().map(|a| (a.clone(), None)).collect();
        let mut tracker = ProgressTracker::new(total, progress);

        let inner = &self.inner;
        let mut misses = Vec::new();
        let mut cached = 0;
        for address in &pending {
            match inner.cache.get(address) {
                CacheLookup::Hit(coordinate) => {
                    results.insert(address.clone(), Some(coordinate));
                    cached += 1;
                }
                CacheLookup::Negative => cached += 1,
                CacheLookup::Miss => misses.push(address.clone()),
            }
        }
        if cached > 0 {
            log::debug!("{} of {} addresses served from cache", cached, total);
        }
        tracker.advance(cached);

        if misses.is_empty() {
            return Ok(results);
        }

        let retry = self
            .resolve_with_primary(&misses, &mut results, &mut tracker)
            .await;
        if !retry.is_empty() && !inner.cancel.is_cancelled() {
            self.resolve_with_fallbacks(retry, &mut results, &mut tracker)
                .await;
        }

        if inner.cancel.is_cancelled() {
            log::warn!(
                "Resolution cancelled after {} of {} addresses",
                tracker.done,
                total
            );
        }
        Ok(results)
    }

    /// Resolves this machine's own public address.
    ///
    /// Cached like any address, under a reserved key.
    pub async fn resolve_self(&self) -> Option<Coordinate> {
        let inner = &self.inner;
        match inner.cache.get(SELF_CACHE_KEY) {
            CacheLookup::Hit(coordinate) => return Some(coordinate),
            CacheLookup::Negative => return None,
            CacheLookup::Miss => {}
        }

        let chain = std::iter::once((&inner.primary, true))
            .chain(inner.fallbacks.iter().map(|provider| (provider, false)));
        for (provider, gated) in chain {
            if inner.cancel.is_cancelled() {
                return None;
            }
            let name = provider.name();
            match inner
                .attempt(name, gated, || provider.lookup_self())
                .await
            {
                Ok(Some(coordinate)) => {
                    log::info!("Own location resolved by {}", name);
                    inner
                        .cache
                        .put(SELF_CACHE_KEY, Some(coordinate.clone()), inner.config.cache_ttl);
                    return Some(coordinate);
                }
                Ok(None) => log::debug!("{} returned no data for own location", name),
                Err(ProviderError::Cancelled) => return None,
                Err(e) => log::warn!("{} failed to resolve own location: {}", name, e),
            }
        }

        inner
            .cache
            .put(SELF_CACHE_KEY, None, inner.config.cache_ttl);
        None
    }

    /// Live cache entries, for persistence across runs.
    pub fn export_cache(&self) -> Vec<CacheSnapshotEntry> {
        self.inner.cache.snapshot()
    }

    /// Seeds the cache from a previous run. Returns the entries restored.
    pub fn import_cache(&self, entries: Vec<CacheSnapshotEntry>) -> usize {
        self.inner.cache.restore(entries)
    }

    /// Number of cached outcomes.
    pub fn cached_entries(&self) -> usize {
        self.inner.cache.len()
    }

    /// Submits cache misses to the primary provider in rate-gated batches.
    ///
    /// Returns the addresses the primary could not resolve.
    async fn resolve_with_primary(
        &self,
        misses: &[String],
        results: &mut Resolutions,
        tracker: &mut ProgressTracker<'_>,
    ) -> Vec<String> {
        let inner = &self.inner;
        let provider = &inner.primary;
        let name = provider.name();
        let batch_size = inner
            .config
            .batch_size
            .min(provider.batch_limit())
            .max(1);

        let mut retry = Vec::new();
        for batch in misses.chunks(batch_size) {
            if inner.cancel.is_cancelled() {
                break;
            }
            match inner.attempt(name, true, || provider.lookup(batch)).await {
                Ok(mut found) => {
                    let mut resolved = 0;
                    for address in batch {
                        match found.remove(address) {
                            Some(coordinate) => {
                                inner.cache.put(
                                    address,
                                    Some(coordinate.clone()),
                                    inner.config.cache_ttl,
                                );
                                results.insert(address.clone(), Some(coordinate));
                                resolved += 1;
                            }
                            None => {
                                log::debug!("{} returned no data for {}", name, address);
                                retry.push(address.clone());
                            }
                        }
                    }
                    log::info!(
                        "{} resolved {} of {} addresses in batch",
                        name,
                        resolved,
                        batch.len()
                    );
                    tracker.advance(resolved);
                }
                Err(ProviderError::Cancelled) => break,
                Err(e) => {
                    log::warn!("{} batch of {} addresses failed: {}", name, batch.len(), e);
                    retry.extend(batch.iter().cloned());
                }
            }
        }
        retry
    }

    /// Works the fallback chain for `retry` on a bounded pool of tasks.
    ///
    /// Workers report through a channel drained here, so results and progress
    /// are applied by a single consumer.
    async fn resolve_with_fallbacks(
        &self,
        retry: Vec<String>,
        results: &mut Resolutions,
        tracker: &mut ProgressTracker<'_>,
    ) {
        let inner = &self.inner;
        if inner.fallbacks.is_empty() {
            for address in &retry {
                inner.cache.put(address, None, inner.config.cache_ttl);
            }
            tracker.advance(retry.len());
            return;
        }

        log::info!(
            "Trying {} fallback provider(s) for {} unresolved addresses",
            inner.fallbacks.len(),
            retry.len()
        );

        let (tx, mut rx) = mpsc::unbounded_channel::<(String, Option<Coordinate>)>();
        let workers = Arc::new(Semaphore::new(inner.config.fallback_concurrency));

        for address in retry {
            let inner = Arc::clone(&self.inner);
            let workers = Arc::clone(&workers);
            let tx = tx.clone();
            // Detached: a cancelled run returns without aborting in-flight calls
            tokio::spawn(async move {
                let Ok(_permit) = workers.acquire_owned().await else {
                    return;
                };
                if inner.cancel.is_cancelled() {
                    return;
                }
                if let Some(outcome) = inner.fallback_chain(&address).await {
                    inner
                        .cache
                        .put(&address, outcome.clone(), inner.config.cache_ttl);
                    let _ = tx.send((address, outcome));
                }
            });
        }
        drop(tx);

        let mut resolved = 0;
        let mut exhausted = 0;
        let mut record = |address: String, outcome: Option<Coordinate>| {
            if outcome.is_some() {
                resolved += 1;
            } else {
                exhausted += 1;
            }
            results.insert(address, outcome);
            tracker.advance(1);
        };

        loop {
            tokio::select! {
                biased;
                _ = inner.cancel.cancelled() => {
                    // Keep whatever already finished
                    while let Ok((address, outcome)) = rx.try_recv() {
                        record(address, outcome);
                    }
                    break;
                }
                message = rx.recv() => match message {
                    Some((address, outcome)) => record(address, outcome),
                    None => break,
                },
            }
        }

        log::info!(
            "Fallback providers resolved {} addresses, {} unresolvable",
            resolved,
            exhausted
        );
    }
}

impl ResolverInner {
    /// Tries each fallback provider in order until one places `address`.
    ///
    /// `Some(None)` means every provider failed; `None` means cancellation
    /// interrupted the chain and the outcome is not terminal.
    async fn fallback_chain(&self, address: &str) -> Option<Option<Coordinate>> {
        let batch = [address.to_string()];
        for provider in &self.fallbacks {
            if self.cancel.is_cancelled() {
                return None;
            }
            let name = provider.name();
            match self.attempt(name, false, || provider.lookup(&batch)).await {
                Ok(mut found) => match found.remove(address) {
                    Some(coordinate) => {
                        log::debug!("{} resolved {}", name, address);
                        return Some(Some(coordinate));
                    }
                    None => log::debug!("{} returned no data for {}", name, address),
                },
                Err(ProviderError::Cancelled) => return None,
                Err(e) => log::debug!("{} failed for {}: {}", name, address, e),
            }
        }
        log::debug!("Every provider failed for {}", address);
        Some(None)
    }

    /// Runs one provider call with the time bound, the rate gate when
    /// `gated`, and a single retry for transient failures.
    async fn attempt<T, F, Fut>(&self, provider: &str, gated: bool, call: F) -> Result<T, ProviderError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let action = || {
            let request = call();
            async move {
                // Also stops the retry of a call that failed while a cancel was pending
                if self.cancel.is_cancelled() {
                    return Err(ProviderError::Cancelled);
                }
                if gated && !self.gate.acquire(&self.cancel).await {
                    return Err(ProviderError::Cancelled);
                }
                match tokio::time::timeout(self.config.request_timeout, request).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(ProviderError::Timeout),
                }
            }
        };

        RetryIf::spawn(
            retry_once(self.config.retry_delay),
            action,
            |e: &ProviderError| {
                let transient = e.is_transient();
                if transient {
                    log::debug!("{} call failed ({}), retrying once", provider, e);
                }
                transient
            },
        )
        .await
    }
}
