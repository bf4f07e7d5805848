//! Cache Entry Module
//!
//! A stored response together with the time it was written.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::net::Response;

// == Cached Response ==
/// A response stored under a request key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    /// The stored response, body included
    pub response: Response,
    /// Write timestamp (Unix milliseconds)
    pub cached_at: u64,
}

impl CachedResponse {
    // == Constructor ==
    /// Wraps a response, stamping it with the current time.
    pub fn new(response: Response) -> Self {
        Self {
            response,
            cached_at: current_timestamp_ms(),
        }
    }

    // == Age ==
    /// Milliseconds since the entry was written.
    pub fn age_ms(&self) -> u64 {
        current_timestamp_ms().saturating_sub(self.cached_at)
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
