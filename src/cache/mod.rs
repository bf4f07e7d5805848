//! Cache Module
//!
//! Offline asset cache: named, versioned response caches and the service
//! worker that fills them on install, prunes them on activation and answers
//! intercepted requests cache-first or stale-while-revalidate.

mod entry;
mod stats;
mod store;
mod strategy;
mod worker;


// Re-export public types
pub use entry::CachedResponse;
pub use stats::CacheStats;
pub use store::{CacheStorage, NamedCache};
pub use strategy::FetchStrategy;
pub use worker::{ServiceWorker, WorkerState, ASSET_MANIFEST, OFFLINE_FALLBACK, WEATHER_API_HOST};
