//! Theme toggle with the hidden login link.
//!
//! Dark mode is the default. Every switch back to dark mode is counted, and
//! the second one reveals a login link that is otherwise not shown.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;
use crate::storage::{KeyValueStore, SESSION_STATE};
use crate::view::ThemeView;

/// Where the revealed link points.
pub const LOGIN_LINK_TARGET: &str = "pages/login";

/// Dark-mode activations needed to reveal the link.
pub const REVEAL_AFTER: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeState {
    pub dark_mode: bool,
    /// Times dark mode was switched on by the toggle
    pub dark_toggle_count: u32,
    pub login_revealed: bool,
}

impl Default for ThemeState {
    fn default() -> Self {
        Self {
            dark_mode: true,
            dark_toggle_count: 0,
            login_revealed: false,
        }
    }
}

pub struct ThemeToggle {
    store: Arc<dyn KeyValueStore>,
    view: Arc<dyn ThemeView>,
    state: Mutex<ThemeState>,
}

impl ThemeToggle {
    /// Restores the persisted session state and applies it to the view.
    pub fn new(store: Arc<dyn KeyValueStore>, view: Arc<dyn ThemeView>) -> Self {
        let state = store
            .get(SESSION_STATE)
            .and_then(|raw| match serde_json::from_str(&raw) {
                Ok(state) => Some(state),
                Err(err) => {
                    warn!("Ignoring unreadable theme state: {}", err);
                    None
                }
            })
            .unwrap_or_default();

        view.apply(&state);
        if state.login_revealed && !view.has_login_link() {
            view.reveal_login_link(LOGIN_LINK_TARGET);
        }

        Self {
            store,
            view,
            state: Mutex::new(state),
        }
    }

    pub fn state(&self) -> ThemeState {
        self.state.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Flips the theme and reveals the login link on the second switch to dark.
    pub fn toggle(&self) -> Result<ThemeState> {
        let mut state = self.state();
        state.dark_mode = !state.dark_mode;
        if state.dark_mode {
            state.dark_toggle_count += 1;
        }
        self.view.apply(&state);

        if state.dark_toggle_count == REVEAL_AFTER && !self.view.has_login_link() {
            self.view.reveal_login_link(LOGIN_LINK_TARGET);
            state.login_revealed = true;
            info!("Login link revealed");
        }

        self.store.set(SESSION_STATE, &serde_json::to_string(&state)?)?;
        if let Ok(mut current) = self.state.lock() {
            *current = state.clone();
        }
        Ok(state)
    }
}
