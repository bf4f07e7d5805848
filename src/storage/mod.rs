//! Storage Module
//!
//! Small persistent key-value state shared by the dashboard components.
//! Values are plain strings (numbers and JSON documents are serialized by
//! the caller), mirroring browser local/session storage.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::Result;

// == Storage Keys ==
/// Consecutive failed login attempts.
pub const LOGIN_ERROR_COUNT: &str = "login_error_count";
/// Epoch-millis timestamp before which login is rejected.
pub const LOGIN_BLOCK_UNTIL: &str = "login_block_until";
/// Minimal record of the authenticated user.
pub const AUTH_USER: &str = "auth_user";
/// Last release acknowledged in the update modal.
pub const LAST_SEEN_VERSION: &str = "suite_last_seen_version";
/// Last successful weather payload.
pub const WEATHER_CACHE: &str = "suite_weather_cache";
/// Theme toggle state.
pub const SESSION_STATE: &str = "suite_session_state";

// == Key-Value Store ==
/// Capability for persistent small state.
pub trait KeyValueStore: Send + Sync {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// Reads an integer value, treating missing or malformed values as 0.
    fn get_i64(&self, key: &str) -> i64 {
        self.get(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0)
    }
}
