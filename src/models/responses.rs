//! Response DTOs for the dashboard API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::{CacheStats, WorkerState};
use crate::login::{AuthUser, LockoutStatus};
use crate::update::{UpdateModal, UpdateState};

/// Response body for GET /api/login/status
#[derive(Debug, Clone, Serialize)]
pub struct LoginStatusResponse {
    pub blocked: bool,
    pub remaining_secs: u64,
    pub failures: u32,
    /// Signed-in user, if any
    pub user: Option<AuthUser>,
}

impl LoginStatusResponse {
    pub fn new(status: LockoutStatus, user: Option<AuthUser>) -> Self {
        Self {
            blocked: status.blocked,
            remaining_secs: status.remaining_secs,
            failures: status.failures,
            user,
        }
    }
}

/// Response body for GET /api/update
#[derive(Debug, Clone, Serialize)]
pub struct UpdateResponse {
    #[serde(flatten)]
    pub state: UpdateState,
    /// Modal on screen after the check
    pub modal: Option<UpdateModal>,
}

/// Response body for POST /api/update/ack
#[derive(Debug, Clone, Serialize)]
pub struct AckResponse {
    /// Version recorded as seen, None when no modal was open
    pub acknowledged: Option<String>,
}

/// Response body for GET /api/colors/:hex
#[derive(Debug, Clone, Serialize)]
pub struct ColorResponse {
    pub hex: String,
    pub rgb: String,
}

/// Response body for GET /api/cache/stats
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Active cache name
    pub cache_name: String,
    pub worker_state: WorkerState,
    pub hits: u64,
    pub misses: u64,
    pub stored: u64,
    pub fallbacks: u64,
    pub bypassed: u64,
    /// Entries across all caches
    pub total_entries: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl StatsResponse {
    /// Creates a new StatsResponse from worker statistics
    pub fn new(cache_name: impl Into<String>, worker_state: WorkerState, stats: &CacheStats) -> Self {
        Self {
            cache_name: cache_name.into(),
            worker_state,
            hits: stats.hits,
            misses: stats.misses,
            stored: stats.stored,
            fallbacks: stats.fallbacks,
            bypassed: stats.bypassed,
            total_entries: stats.total_entries,
            hit_rate: stats.hit_rate(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Running build version
    pub version: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(version: impl Into<String>) -> Self {
        Self {
            status: "healthy".to_string(),
            version: version.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
