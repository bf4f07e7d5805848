//! Background Tasks Module
//!
//! Periodic refresh loops that run for the lifetime of the server.
//!
//! # Tasks
//! - Saint: re-renders when the liturgical day changes
//! - Weather: refreshes current conditions

mod poller;

pub use poller::spawn_poller;
