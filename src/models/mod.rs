//! Request and Response models for the dashboard API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{LoginRequest, OnlineRequest, PositionRequest, UpdateQuery};
pub use responses::{
    AckResponse, ColorResponse, ErrorResponse, HealthResponse, LoginStatusResponse,
    StatsResponse, UpdateResponse,
};
