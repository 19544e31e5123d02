//! Shared types for civicconnect

pub mod error;

pub use error::{CivicError, Result};
