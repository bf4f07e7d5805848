//! Suite - A personal dashboard with an offline asset cache
//!
//! Serves a static dashboard site through an emulated service worker and
//! exposes the dashboard's widgets (login gate, theme toggle, saint of the
//! day, weather, release notes) over a JSON API.

pub mod api;
pub mod cache;
pub mod clock;
pub mod colors;
pub mod config;
pub mod error;
pub mod login;
pub mod models;
pub mod net;
pub mod storage;
pub mod tasks;
pub mod theme;
pub mod update;
pub mod view;
pub mod widgets;

pub use api::{create_router, AppState};
pub use config::Config;
pub use error::{Result, SuiteError};
pub use tasks::spawn_poller;
