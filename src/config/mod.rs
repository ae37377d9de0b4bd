//! # Configuration
//!
//! - [`BackendConfig`]: the per-instance backend envelope.
//! - [`ControllerConfig`]: operator-wide settings from the environment.

mod backend;
mod controller;

pub use backend::BackendConfig;
pub use controller::ControllerConfig;
