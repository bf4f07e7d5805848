//! Request DTOs for the dashboard API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::Deserialize;

use crate::update::LaunchContext;

/// Longest username or email accepted by the login form.
const MAX_LOGIN_INPUT: usize = 256;

/// Request body for POST /api/login
///
/// # Fields
/// - `username`: Username or email, case-insensitive
/// - `password`: Compared exactly
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(default, alias = "email")]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl LoginRequest {
    /// Validates the request data
    ///
    /// Empty fields are not rejected here; the gate answers them with its
    /// own message. Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.username.len() > MAX_LOGIN_INPUT {
            return Some(format!(
                "Username exceeds maximum length of {} characters",
                MAX_LOGIN_INPUT
            ));
        }
        None
    }
}

/// Request body for POST /api/weather/online
#[derive(Debug, Clone, Deserialize)]
pub struct OnlineRequest {
    pub online: bool,
}

/// Request body for POST /api/weather/position
#[derive(Debug, Clone, Deserialize)]
pub struct PositionRequest {
    pub latitude: f64,
    pub longitude: f64,
    /// Radius of the fix in meters
    pub accuracy: f64,
}

impl PositionRequest {
    pub fn validate(&self) -> Option<String> {
        if !self.latitude.is_finite() || !self.longitude.is_finite() {
            return Some("Coordinates must be finite numbers".to_string());
        }
        if self.accuracy < 0.0 {
            return Some("Accuracy cannot be negative".to_string());
        }
        None
    }
}

/// Query string of GET /api/update
///
/// Carries what the page knows about how it was launched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateQuery {
    #[serde(default)]
    pub standalone: bool,
    #[serde(default)]
    pub referrer: Option<String>,
}

impl From<UpdateQuery> for LaunchContext {
    fn from(query: UpdateQuery) -> Self {
        LaunchContext {
            display_mode_standalone: query.standalone,
            navigator_standalone: false,
            referrer: query.referrer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_request_accepts_email_alias() {
        let json = r#"{"email": "ana@suite.dev", "password": "pw"}"#;
        let req: LoginRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.username, "ana@suite.dev");
        assert!(req.validate().is_none());
    }

    #[test]
    fn test_login_request_too_long() {
        let req = LoginRequest {
            username: "a".repeat(300),
            password: "pw".to_string(),
        };
        assert!(req.validate().is_some());
    }

    #[test]
    fn test_position_request_validate() {
        let json = r#"{"latitude": -29.0, "longitude": -49.7, "accuracy": 12.5}"#;
        let req: PositionRequest = serde_json::from_str(json).unwrap();
        assert!(req.validate().is_none());

        let bad = PositionRequest {
            accuracy: -1.0,
            ..req
        };
        assert!(bad.validate().is_some());
    }

    #[test]
    fn test_update_query_to_launch_context() {
        let ctx: LaunchContext = UpdateQuery {
            standalone: false,
            referrer: Some("android-app://com.suite".to_string()),
        }
        .into();
        assert!(ctx.is_standalone());
        assert!(!LaunchContext::from(UpdateQuery::default()).is_standalone());
    }
}
