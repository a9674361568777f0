//! # Route Modules
//!
//! One module per operation group. Each exposes a `router()` returning
//! `Router<AppState>`, merged in [`crate::app`].

pub mod admin;
pub mod consent;
pub mod credentials;
pub mod events;
pub mod origin;
pub mod participants;
