//! # Navi Common
//!
//! Shared utilities for the Navi offline router crates.
//!
//! ## Features
//!
//! - Logging configuration and setup
//! - Wall-clock helpers producing the timestamp formats stored in cache headers

pub mod clock;
pub mod logging;

pub use clock::{iso_timestamp, unix_millis};
pub use logging::{init_logging, LogConfig, LogFormat};
