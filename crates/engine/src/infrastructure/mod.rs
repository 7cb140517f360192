//! Infrastructure implementations.
//!
//! Contains port trait implementations for external dependencies.

pub mod clock;
pub mod config;
pub mod ports;
pub mod profile_store;
pub mod stable_diffusion;
pub mod webhook_poster;
