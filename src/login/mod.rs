//! Login Module
//!
//! Credential check against the site's static user list, with a persisted
//! failure counter and a timed lockout.

mod gate;
mod users;

pub use gate::{LockoutPolicy, LockoutStatus, LoginGate, LoginOutcome, SUCCESS_REDIRECT, USERS_URL};
pub use users::{AuthUser, User, UserDirectory};
