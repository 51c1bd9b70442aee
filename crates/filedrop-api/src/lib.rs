//! Filedrop API Library
//!
//! This crate provides the HTTP API handlers, middleware, and application setup.

// Module declarations
mod api_doc;
mod handlers;
mod middleware;
pub mod services;
pub mod setup;
mod telemetry;

// Public modules
pub mod error;
pub mod state;

// Re-exports
pub use error::ErrorResponse;
