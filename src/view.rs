//! View Module
//!
//! Rendering seams for the dashboard components. Components never format
//! pages themselves; they hand display values to these traits.
//! `DashboardSnapshot` implements all of them in memory and is what the HTTP
//! API serves and the tests inspect.

use std::sync::Mutex;

use serde::Serialize;

use crate::theme::ThemeState;
use crate::update::UpdateModal;
use crate::widgets::{SaintDisplay, WeatherDisplay};

/// Saint-of-the-day slots.
pub trait SaintView: Send + Sync {
    fn render_saint(&self, saint: &SaintDisplay);
    fn render_not_found(&self);
}

/// Weather footer.
pub trait WeatherView: Send + Sync {
    fn render_weather(&self, weather: &WeatherDisplay);
    fn render_error(&self, message: &str);
    fn set_offline(&self, offline: bool);
}

/// Login form feedback.
pub trait LoginView: Send + Sync {
    fn show_message(&self, message: &str);
    /// Disables or re-enables the submit button.
    fn set_locked(&self, locked: bool);
    fn redirect(&self, target: &str);
}

/// Release-notes modal.
pub trait ModalView: Send + Sync {
    fn is_open(&self) -> bool;
    fn open(&self, modal: &UpdateModal);
    fn close(&self);
}

/// Theme classes and the hidden login link.
pub trait ThemeView: Send + Sync {
    fn apply(&self, state: &ThemeState);
    fn has_login_link(&self) -> bool;
    fn reveal_login_link(&self, target: &str);
}

// == Snapshot ==
#[derive(Debug, Clone, Default, Serialize)]
pub struct SaintPanel {
    pub found: bool,
    pub display: Option<SaintDisplay>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct WeatherPanel {
    pub display: Option<WeatherDisplay>,
    pub error: Option<String>,
    pub offline: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LoginPanel {
    pub message: String,
    pub locked: bool,
    pub redirect: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThemePanel {
    pub body_classes: Vec<String>,
    pub toggle_classes: Vec<String>,
    pub login_link: Option<String>,
}

impl Default for ThemePanel {
    fn default() -> Self {
        Self {
            body_classes: vec!["dark-mode".to_string()],
            toggle_classes: vec!["switch-toggle".to_string(), "switch-toggle-right".to_string()],
            login_link: None,
        }
    }
}

/// Everything currently rendered.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Snapshot {
    pub saint: SaintPanel,
    pub weather: WeatherPanel,
    pub login: LoginPanel,
    pub modal: Option<UpdateModal>,
    pub theme: ThemePanel,
}

/// In-memory implementation of every view.
#[derive(Debug, Default)]
pub struct DashboardSnapshot {
    inner: Mutex<Snapshot>,
}

impl DashboardSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> Snapshot {
        self.inner.lock().map(|s| s.clone()).unwrap_or_default()
    }

    fn update(&self, f: impl FnOnce(&mut Snapshot)) {
        if let Ok(mut snapshot) = self.inner.lock() {
            f(&mut snapshot);
        }
    }
}

impl SaintView for DashboardSnapshot {
    fn render_saint(&self, saint: &SaintDisplay) {
        self.update(|s| {
            s.saint = SaintPanel {
                found: true,
                display: Some(saint.clone()),
            }
        });
    }

    fn render_not_found(&self) {
        self.update(|s| {
            s.saint = SaintPanel {
                found: false,
                display: Some(SaintDisplay::not_found()),
            }
        });
    }
}

impl WeatherView for DashboardSnapshot {
    fn render_weather(&self, weather: &WeatherDisplay) {
        self.update(|s| {
            s.weather.display = Some(weather.clone());
            s.weather.error = None;
        });
    }

    fn render_error(&self, message: &str) {
        self.update(|s| {
            s.weather.display = None;
            s.weather.error = Some(message.to_string());
        });
    }

    fn set_offline(&self, offline: bool) {
        self.update(|s| s.weather.offline = offline);
    }
}

impl LoginView for DashboardSnapshot {
    fn show_message(&self, message: &str) {
        self.update(|s| s.login.message = message.to_string());
    }

    fn set_locked(&self, locked: bool) {
        self.update(|s| s.login.locked = locked);
    }

    fn redirect(&self, target: &str) {
        self.update(|s| s.login.redirect = Some(target.to_string()));
    }
}

impl ModalView for DashboardSnapshot {
    fn is_open(&self) -> bool {
        self.inner
            .lock()
            .map(|s| s.modal.is_some())
            .unwrap_or(false)
    }

    fn open(&self, modal: &UpdateModal) {
        self.update(|s| s.modal = Some(modal.clone()));
    }

    fn close(&self) {
        self.update(|s| s.modal = None);
    }
}

impl ThemeView for DashboardSnapshot {
    fn apply(&self, state: &ThemeState) {
        self.update(|s| {
            s.theme.body_classes = if state.dark_mode {
                vec!["dark-mode".to_string()]
            } else {
                Vec::new()
            };
            s.theme.toggle_classes = vec!["switch-toggle".to_string()];
            if state.dark_mode {
                s.theme.toggle_classes.push("switch-toggle-right".to_string());
            }
        });
    }

    fn has_login_link(&self) -> bool {
        self.inner
            .lock()
            .map(|s| s.theme.login_link.is_some())
            .unwrap_or(false)
    }

    fn reveal_login_link(&self, target: &str) {
        self.update(|s| s.theme.login_link = Some(target.to_string()));
    }
}
