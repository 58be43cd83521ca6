//! Address geolocation.
//!
//! Coordinates and great-circle distance, the resolution cache and its
//! on-disk form, the primary-call rate gate, the provider capability with its
//! HTTP implementations, and the resolver that ties them together.

mod cache;
mod distance;
mod persist;
mod provider;
mod providers;
mod rate_gate;
mod resolver;
mod types;

pub use cache::{CacheLookup, CacheSnapshotEntry, ResolutionCache};
pub use distance::great_circle_km;
pub use persist::{load_cache_file, save_cache_file};
pub use provider::{GeoProvider, ProviderKind, ProviderResults};
pub use providers::{IpApiProvider, IpInfoProvider, IpWhoIsProvider};
pub use rate_gate::RateGate;
pub use resolver::{AddressResolver, ProgressSink, Resolutions};
pub use types::Coordinate;
