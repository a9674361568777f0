//! # Middleware
//!
//! Request-level concerns layered around the route handlers.

pub mod metrics;
