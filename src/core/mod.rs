//! Profiling state engine.

pub mod global;
pub mod registry;
pub mod scope_stack;
pub mod state;
pub mod tls;
