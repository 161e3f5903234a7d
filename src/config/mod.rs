//! # Configuration
//!
//! Runtime settings for the controller, read from the environment at startup.

pub mod controller;

pub use controller::ControllerConfig;
