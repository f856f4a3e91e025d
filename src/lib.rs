//! # erata
//!
//! Allocation profiling through a substitutable allocator.
//!
//! ## Features
//!
//! - [`ProfileAllocator`] records every allocation and deallocation it forwards
//! - Nested, per-thread scopes label what the program is doing while it allocates
//! - Type identity and byte size on every event
//! - Pluggable sinks through the [`Writer`] trait, with a JSON file sink built in
//! - Bookkeeping that never allocates through the profiled path
//! - Offline reading of persisted runs in [`analysis`]
//! - std::alloc::Allocator implementation (`nightly` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use erata::{pop_scope, push_scope, ProfileAllocator, ProfilerConfig};
//!
//! erata::configure(ProfilerConfig::default().with_output_dir("trace")).unwrap();
//!
//! let alloc = ProfileAllocator::<u32>::new();
//!
//! push_scope("decode");
//! let block = alloc.allocate(64).unwrap();
//! unsafe { alloc.deallocate(block, 64) };
//! assert_eq!(pop_scope(), "decode");
//!
//! // Writes trace/alloc/<thread>.json and trace/dealloc/<thread>.json
//! let report = erata::finish_thread().unwrap();
//! println!("{}", report);
//! ```
//!
//! ## Threads
//!
//! Every thread has its own profiling state: scope stack, registries and writers.
//! Nothing is shared on the allocation path. The state is created on first use and
//! finished by [`finish_thread`] or at thread exit, after which its [`ThreadReport`]
//! can be collected with [`drain_thread_reports`].

#![cfg_attr(feature = "nightly", feature(allocator_api))]

pub mod analysis;
pub mod api;
pub mod collections;
pub mod diagnostics;
pub mod error;
pub mod writer;

mod core;
mod util;

// Re-export public API at crate root for convenience
pub use api::allocator::{BaseAllocator, ProfileAllocator};
pub use api::config::{ProfilerConfig, SinkKind, WriterFactory};
pub use api::record::{Record, TypeInfo};
pub use api::scope::{
    current_scope, pop_scope, push_scope, try_pop_scope, try_push_scope, with_scope, ScopeGuard,
};
pub use api::stats::{ThreadReport, ThreadStats};

// Profiling state
pub use crate::core::global::{configure, drain_thread_reports};
pub use crate::core::registry::{
    hash_name, Registry, ScopeRegistry, TypeRegistry, GLOBAL_SCOPE_HASH, GLOBAL_SCOPE_NAME,
};
pub use crate::core::scope_stack::ScopeStack;
pub use crate::core::state::ProfileState;
pub use crate::core::tls::{
    finish_thread, init_thread, is_initialized, skipped_events, try_init_thread, with_state,
};

// Sinks
pub use writer::{
    Direction, JsonFileWriter, MemoryView, MemoryWriter, NullWriter, Writer, WriterContext,
};

// Errors
pub use error::{AllocError, AnalysisError, ConfigError, ProfileError, ScopeError, SinkError};

// Diagnostics
pub use diagnostics::{suppress_diagnostics, Diagnostic, DiagnosticKind};

pub use util::size::format_bytes;
pub use util::time::Timestamp;
