//! Fetch policies for intercepted requests.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// How the worker answers a request it intercepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchStrategy {
    /// Serve the cached copy; go to the network only on a miss.
    CacheFirst,
    /// Always refresh from the network, serving the cached copy meanwhile.
    StaleWhileRevalidate,
}

impl FromStr for FetchStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cache-first" | "cache_first" => Ok(FetchStrategy::CacheFirst),
            "stale-while-revalidate" | "stale_while_revalidate" | "swr" => {
                Ok(FetchStrategy::StaleWhileRevalidate)
            }
            other => Err(format!("unknown fetch strategy: {}", other)),
        }
    }
}

impl fmt::Display for FetchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchStrategy::CacheFirst => write!(f, "cache-first"),
            FetchStrategy::StaleWhileRevalidate => write!(f, "stale-while-revalidate"),
        }
    }
}
