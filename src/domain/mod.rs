//! Core domain types
//!
//! Pure types with no I/O dependencies: samples, estimates, configuration and
//! the error type shared by every stage.

pub mod config;
pub mod error;
pub mod types;

pub use config::*;
pub use error::*;
pub use types::*;
