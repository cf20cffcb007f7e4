//! Gauge Core - Fundamental types
//!
//! This crate provides the core types used throughout Gauge:
//! - `Value`: Runtime values (numbers, text, objects, null, errors)
//! - `GaugeError`: Structured errors that travel as values

mod value;
mod error;

pub use value::{Value, format_number};
pub use error::{GaugeError, ErrorContext, Severity, codes};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{Value, GaugeError, Severity};
    pub use crate::error::codes;
}
