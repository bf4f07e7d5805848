//! API Module
//!
//! HTTP handlers and routing for the dashboard.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint
//! - `/api/*` - Login, theme, widgets, release notes, colours and cache stats
//! - Any other `GET` - Site assets served through the service worker

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
