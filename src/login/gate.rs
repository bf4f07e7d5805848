//! Login gate with a persisted failure counter.
//!
//! The counter and the lockout deadline live in the key-value store so that
//! reloading the page does not reset them.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use super::users::{AuthUser, UserDirectory};
use crate::clock::Clock;
use crate::error::Result;
use crate::net::{Fetcher, Request};
use crate::storage::{KeyValueStore, AUTH_USER, LOGIN_BLOCK_UNTIL, LOGIN_ERROR_COUNT};
use crate::view::LoginView;

/// User list published with the site.
pub const USERS_URL: &str = "login/users.json";

/// Where a successful login sends the browser.
pub const SUCCESS_REDIRECT: &str = "../index.html";

const FILL_IN_MESSAGE: &str = "Fill in username and password.";
const UNAVAILABLE_MESSAGE: &str = "Could not process login. Try again.";
const UNLOCKED_MESSAGE: &str = "Try again with the correct password";

/// Failures allowed before the form locks, and for how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    pub max_failures: u32,
    pub lockout: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_failures: 3,
            lockout: Duration::from_secs(10),
        }
    }
}

/// Current lockout as seen by the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LockoutStatus {
    pub blocked: bool,
    pub remaining_secs: u64,
    pub failures: u32,
}

/// Result of one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LoginOutcome {
    Success { user: AuthUser, redirect: String },
    Rejected { failures: u32, message: String },
    LockedOut { failures: u32, lockout_secs: u64, message: String },
    Blocked { remaining_secs: u64, message: String },
    MissingFields { message: String },
    Unavailable { message: String },
}

impl LoginOutcome {
    /// Text shown under the form.
    pub fn message(&self) -> &str {
        match self {
            LoginOutcome::Success { .. } => "",
            LoginOutcome::Rejected { message, .. }
            | LoginOutcome::LockedOut { message, .. }
            | LoginOutcome::Blocked { message, .. }
            | LoginOutcome::MissingFields { message }
            | LoginOutcome::Unavailable { message } => message,
        }
    }
}

fn blocked_message(remaining_secs: u64) -> String {
    format!("You are blocked for {} seconds!", remaining_secs)
}

pub struct LoginGate {
    fetcher: Arc<dyn Fetcher>,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    view: Arc<dyn LoginView>,
    policy: LockoutPolicy,
    users_url: String,
    /// Held for a whole submission so the lockout check and the recorded
    /// failure are never interleaved with another request.
    submissions: Mutex<()>,
}

impl LoginGate {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        view: Arc<dyn LoginView>,
        policy: LockoutPolicy,
    ) -> Self {
        Self {
            fetcher,
            store,
            clock,
            view,
            policy,
            users_url: USERS_URL.to_string(),
            submissions: Mutex::new(()),
        }
    }

    pub fn policy(&self) -> LockoutPolicy {
        self.policy
    }

    // == Lockout ==
    /// Reads the persisted counter and deadline.
    ///
    /// A deadline that has already passed clears both keys, so the next
    /// failure starts counting from one again.
    pub fn status(&self) -> LockoutStatus {
        let block_until = self.store.get_i64(LOGIN_BLOCK_UNTIL);
        let now = self.clock.now_ms();

        if block_until > now {
            let remaining_ms = (block_until - now) as u64;
            return LockoutStatus {
                blocked: true,
                remaining_secs: remaining_ms.div_ceil(1000),
                failures: self.failures(),
            };
        }

        if block_until != 0 {
            if let Err(err) = self.clear_lockout() {
                warn!("Failed to clear expired lockout: {}", err);
            }
        }

        LockoutStatus {
            blocked: false,
            remaining_secs: 0,
            failures: self.failures(),
        }
    }

    fn failures(&self) -> u32 {
        u32::try_from(self.store.get_i64(LOGIN_ERROR_COUNT)).unwrap_or(0)
    }

    fn clear_lockout(&self) -> Result<()> {
        self.store.remove(LOGIN_ERROR_COUNT)?;
        self.store.remove(LOGIN_BLOCK_UNTIL)
    }

    // == Submit ==
    /// Checks the credentials against the published user list.
    ///
    /// # Arguments
    /// * `input` - Username or email, compared without case
    /// * `password` - Compared exactly
    ///
    /// # Returns
    /// The outcome shown to the user; `Err` only when the store cannot be written
    pub async fn submit(&self, input: &str, password: &str) -> Result<LoginOutcome> {
        let _submission = self.submissions.lock().await;
        let status = self.status();
        if status.blocked {
            let message = blocked_message(status.remaining_secs);
            self.view.show_message(&message);
            return Ok(LoginOutcome::Blocked {
                remaining_secs: status.remaining_secs,
                message,
            });
        }

        let input = input.trim();
        if input.is_empty() || password.is_empty() {
            self.view.show_message(FILL_IN_MESSAGE);
            return Ok(LoginOutcome::MissingFields {
                message: FILL_IN_MESSAGE.to_string(),
            });
        }

        let directory = match self.load_users().await {
            Ok(directory) => directory,
            Err(err) => {
                error!("Failed to load user list: {}", err);
                self.view.show_message(UNAVAILABLE_MESSAGE);
                return Ok(LoginOutcome::Unavailable {
                    message: UNAVAILABLE_MESSAGE.to_string(),
                });
            }
        };

        match directory.authenticate(input, password) {
            Some(user) => {
                let user = AuthUser::from(user);
                self.clear_lockout()?;
                self.store.set(AUTH_USER, &serde_json::to_string(&user)?)?;
                info!("User {} signed in", user.id);
                self.view.show_message("");
                self.view.redirect(SUCCESS_REDIRECT);
                Ok(LoginOutcome::Success {
                    user,
                    redirect: SUCCESS_REDIRECT.to_string(),
                })
            }
            None => self.record_failure(),
        }
    }

    async fn load_users(&self) -> Result<UserDirectory> {
        let resp = self
            .fetcher
            .fetch(&Request::get(self.users_url.as_str()))
            .await?
            .error_for_status(&self.users_url)?;
        resp.json()
    }

    fn record_failure(&self) -> Result<LoginOutcome> {
        let failures = self.failures() + 1;
        self.store.set(LOGIN_ERROR_COUNT, &failures.to_string())?;

        if failures >= self.policy.max_failures {
            let lockout_ms = self.policy.lockout.as_millis() as i64;
            let until = self.clock.now_ms() + lockout_ms;
            self.store.set(LOGIN_BLOCK_UNTIL, &until.to_string())?;
            let lockout_secs = self.policy.lockout.as_secs();
            let message = format!("You will be blocked for {} seconds!", lockout_secs);
            warn!("Login locked for {}s after {} failures", lockout_secs, failures);
            self.view.set_locked(true);
            self.view.show_message(&message);
            return Ok(LoginOutcome::LockedOut {
                failures,
                lockout_secs,
                message,
            });
        }

        let left = self.policy.max_failures - failures;
        let message = if left == 1 {
            "Invalid username or password! 1 attempt left.".to_string()
        } else {
            format!("Invalid username or password! {} attempts left.", left)
        };
        self.view.show_message(&message);
        Ok(LoginOutcome::Rejected { failures, message })
    }

    // == Countdown ==
    /// Rewrites the blocked message every second until the lockout ends,
    /// then re-enables the form. Returns `None` when nothing is locked.
    pub fn spawn_countdown(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if !self.status().blocked {
            return None;
        }
        self.view.set_locked(true);

        let gate = Arc::clone(self);
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(1));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let status = gate.status();
                if !status.blocked {
                    gate.view.set_locked(false);
                    gate.view.show_message(UNLOCKED_MESSAGE);
                    info!("Login lockout ended");
                    break;
                }
                gate.view.show_message(&blocked_message(status.remaining_secs));
            }
        }))
    }

    // == Session ==
    /// The signed-in user, if any.
    pub fn current_user(&self) -> Option<AuthUser> {
        let raw = self.store.get(AUTH_USER)?;
        serde_json::from_str(&raw).ok()
    }

    pub fn logout(&self) -> Result<()> {
        self.store.remove(AUTH_USER)
    }
}
