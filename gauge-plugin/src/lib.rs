//! Gauge Plugin System
//!
//! Provides the seams the template environment is built from:
//! - Functions (pure computations exposed as filters and globals)
//! - A registry with aliases, help and "did you mean" suggestions
//! - The state provider boundary for entity lookups

mod traits;
mod registry;
mod context;
mod state;

pub use traits::{FunctionPlugin, FunctionMeta, ArgMeta};
pub use registry::PluginRegistry;
pub use context::EvalContext;
pub use state::{EntityState, StateProvider, StateSnapshot, StateError};

/// Re-export core types for plugin authors
pub mod prelude {
    pub use crate::{
        FunctionPlugin, FunctionMeta, ArgMeta,
        PluginRegistry, EvalContext,
        EntityState, StateProvider, StateSnapshot,
    };
    pub use gauge_core::prelude::*;
}
