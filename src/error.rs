//! Error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::diagnostics::{self, Diagnostic};

pub use crate::collections::EmptyStack;

/// Failure of an underlying allocator, returned unchanged by `ProfileAllocator::allocate`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocError {
    /// `count` elements of the type do not fit in `isize::MAX` bytes.
    #[error("cannot allocate {count} elements of {type_name}: size overflows isize::MAX")]
    CapacityOverflow {
        type_name: &'static str,
        count: usize,
    },

    /// The underlying allocator returned no memory.
    #[error("underlying allocator failed to provide {size} bytes aligned to {align}")]
    Exhausted { size: usize, align: usize },
}

/// Usage errors of the scope stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScopeError {
    /// Only the global scope is on the stack.
    #[error("cannot pop the global scope")]
    PopGlobal,

    /// The scope on top of the stack has no registry entry.
    #[error("scope {0:#018x} is on the stack but has no registered name")]
    Unregistered(u64),

    /// A guard found another scope on top of the stack than the one it entered.
    #[error("expected scope {expected:#018x} on top of the stack, found {found:#018x}")]
    NotOnTop { expected: u64, found: u64 },
}

/// Failures reported by a [`Writer`](crate::Writer).
#[derive(Debug, Error)]
pub enum SinkError {
    /// Backing storage of a previous run is in the way.
    #[error("sink output path {} already exists", .0.display())]
    AlreadyExists(PathBuf),

    /// `write` or `end` before `setup`.
    #[error("sink used before setup")]
    NotSetUp,

    /// `setup` called a second time.
    #[error("sink already set up")]
    AlreadySetUp,

    /// The sink refused the operation.
    #[error("sink rejected the operation: {0}")]
    Rejected(String),

    #[error("sink I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("sink serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors while installing the process-wide configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// `configure` was already called, or a thread already read the configuration.
    #[error("profiler is already configured")]
    AlreadyConfigured,

    /// A setting could not be parsed.
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },
}

/// Errors of the per-thread profiling state.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error(transparent)]
    Scope(#[from] ScopeError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// `init_thread` after the state of this thread was already created.
    #[error("profiling state of this thread is already initialized")]
    AlreadyInitialized,

    /// `finish_thread` already ran on this thread.
    #[error("profiling state of this thread is finished")]
    Finished,

    /// The state is borrowed further up the call stack.
    #[error("profiling state of this thread is in use by an enclosing call")]
    Busy,

    /// The thread-local storage holding the state was already torn down.
    #[error("profiling state of this thread was destroyed")]
    Destroyed,
}

impl ProfileError {
    /// The coded diagnostic describing this error, if there is one.
    pub fn diagnostic(&self) -> Option<&'static Diagnostic> {
        match self {
            ProfileError::Scope(ScopeError::PopGlobal) => Some(&diagnostics::ER001),
            ProfileError::Scope(ScopeError::Unregistered(_)) => Some(&diagnostics::ER002),
            ProfileError::Scope(ScopeError::NotOnTop { .. }) => Some(&diagnostics::ER004),
            ProfileError::Finished => Some(&diagnostics::ER003),
            ProfileError::Sink(SinkError::AlreadyExists(_)) => Some(&diagnostics::ER101),
            ProfileError::Sink(_) => Some(&diagnostics::ER102),
            ProfileError::Busy => Some(&diagnostics::ER301),
            ProfileError::Destroyed => Some(&diagnostics::ER901),
            ProfileError::Config(_) | ProfileError::AlreadyInitialized => None,
        }
    }
}

/// Errors while reading a persisted run.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A thread has an allocation log but no deallocation log, or the other way round.
    #[error("thread {thread} has no matching {missing} log")]
    MissingPair {
        thread: String,
        missing: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_errors_map_to_diagnostics() {
        let pop = ProfileError::from(ScopeError::PopGlobal);
        assert_eq!(pop.diagnostic().map(|d| d.code), Some("ER001"));

        let unregistered = ProfileError::from(ScopeError::Unregistered(42));
        assert_eq!(unregistered.diagnostic().map(|d| d.code), Some("ER002"));

        let misplaced = ProfileError::from(ScopeError::NotOnTop {
            expected: 1,
            found: 0,
        });
        assert_eq!(misplaced.diagnostic().map(|d| d.code), Some("ER004"));
    }

    #[test]
    fn test_sink_conflict_maps_to_er101() {
        let err = ProfileError::from(SinkError::AlreadyExists(PathBuf::from("erata")));
        assert_eq!(err.diagnostic().map(|d| d.code), Some("ER101"));
        assert!(err.to_string().contains("already exists"));

        let other = ProfileError::from(SinkError::NotSetUp);
        assert_eq!(other.diagnostic().map(|d| d.code), Some("ER102"));
    }

    #[test]
    fn test_display_messages() {
        let err = AllocError::Exhausted { size: 64, align: 8 };
        assert_eq!(
            err.to_string(),
            "underlying allocator failed to provide 64 bytes aligned to 8"
        );
        assert_eq!(ScopeError::PopGlobal.to_string(), "cannot pop the global scope");
    }
}
