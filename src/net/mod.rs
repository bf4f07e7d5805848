//! Network Module
//!
//! Request/response types and the fetch capability every component uses.
//! Implementations: a `reqwest` HTTP client, a static directory reader, and
//! the cache manager itself (see `cache::ServiceWorker`).

mod fetcher;
mod request;

#[cfg(test)]
pub(crate) mod testing;

pub use fetcher::{Fetcher, HttpFetcher, StaticDirFetcher};
pub use request::{Request, RequestMode, Response};
