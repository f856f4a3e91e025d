//! Diagnostic kinds and predefined diagnostics.
//!
//! Mirrors rustc's diagnostic levels for familiar UX.

/// The severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A hard error - something is definitely wrong.
    Error,
    /// A warning - something is probably wrong or was lost.
    Warning,
    /// Additional context about another diagnostic.
    Note,
}

impl DiagnosticKind {
    /// Get the display prefix for this kind.
    pub fn prefix(&self) -> &'static str {
        match self {
            DiagnosticKind::Error => "error",
            DiagnosticKind::Warning => "warning",
            DiagnosticKind::Note => "note",
        }
    }

    /// Log level used when this kind is routed through the `log` facade.
    pub fn level(&self) -> log::Level {
        match self {
            DiagnosticKind::Error => log::Level::Error,
            DiagnosticKind::Warning => log::Level::Warn,
            DiagnosticKind::Note => log::Level::Info,
        }
    }
}

/// A diagnostic message with code, message, and optional context.
///
/// Diagnostic codes follow the pattern:
/// - `ER0xx` - Scope usage
/// - `ER1xx` - Sink setup
/// - `ER2xx` - Sink I/O
/// - `ER3xx` - Re-entrant recording
/// - `ER9xx` - Internal errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity level.
    pub kind: DiagnosticKind,
    /// Diagnostic code (e.g., "ER001").
    pub code: &'static str,
    /// Primary message.
    pub message: &'static str,
    /// Optional additional context.
    pub note: Option<&'static str>,
    /// Optional fix suggestion.
    pub help: Option<&'static str>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub const fn error(code: &'static str, message: &'static str) -> Self {
        Self {
            kind: DiagnosticKind::Error,
            code,
            message,
            note: None,
            help: None,
        }
    }

    /// Create a new warning diagnostic.
    pub const fn warning(code: &'static str, message: &'static str) -> Self {
        Self {
            kind: DiagnosticKind::Warning,
            code,
            message,
            note: None,
            help: None,
        }
    }

    /// Add a note to this diagnostic.
    pub const fn with_note(mut self, note: &'static str) -> Self {
        self.note = Some(note);
        self
    }

    /// Add a help message to this diagnostic.
    pub const fn with_help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }
}

// =============================================================================
// Predefined diagnostics (ER0xx - Scope usage)
// =============================================================================

/// ER001: Pop with only the global scope on the stack.
pub const ER001: Diagnostic = Diagnostic::error(
    "ER001",
    "pop_scope called with only the global scope on the stack"
).with_note("the global scope is pushed when the thread state is created and is never popped")
 .with_help("balance every push_scope() with exactly one pop_scope(), or use ScopeGuard");

/// ER002: Top of the scope stack has no registered name.
pub const ER002: Diagnostic = Diagnostic::error(
    "ER002",
    "scope on top of the stack has no registered name"
).with_note("every pushed scope is registered before it is pushed")
 .with_help("this indicates a bug in erata, please report it");

/// ER003: Profiler used after finish_thread().
pub const ER003: Diagnostic = Diagnostic::warning(
    "ER003",
    "profiler used on a thread after finish_thread()"
).with_note("the thread state was finished and its writers are closed")
 .with_help("call finish_thread() only once the thread stops allocating through ProfileAllocator");

/// ER004: Scope guard dropped while another scope is innermost.
pub const ER004: Diagnostic = Diagnostic::error(
    "ER004",
    "ScopeGuard dropped while a different scope is on top of the stack"
).with_note("the guarded scope was already popped, so the guard leaves the stack as it is")
 .with_help("do not call pop_scope() for a scope entered through ScopeGuard or with_scope()");

// =============================================================================
// Predefined diagnostics (ER1xx - Sink setup)
// =============================================================================

/// ER101: Output path already exists.
pub const ER101: Diagnostic = Diagnostic::error(
    "ER101",
    "sink output path already exists"
).with_note("erata refuses to overwrite or merge into the data of a previous run")
 .with_help("remove the previous run directory or set a different output_dir in ProfilerConfig");

/// ER102: Sink setup failed.
pub const ER102: Diagnostic = Diagnostic::error(
    "ER102",
    "failed to set up a sink for this thread"
).with_note("the allocation path cannot report this error to its caller")
 .with_help("call try_init_thread() to handle sink setup errors explicitly");

// =============================================================================
// Predefined diagnostics (ER2xx - Sink I/O)
// =============================================================================

/// ER201: Sink rejected an event.
pub const ER201: Diagnostic = Diagnostic::warning(
    "ER201",
    "sink failed to write an event, event dropped"
).with_note("further dropped events on this thread are counted but not reported")
 .with_help("check ThreadStats::dropped_events after finish_thread()");

/// ER202: Sink teardown failed.
pub const ER202: Diagnostic = Diagnostic::error(
    "ER202",
    "sink failed to finish during teardown"
).with_note("registries and trailer of this thread's log may be missing")
 .with_help("check free disk space and permissions of the output directory");

// =============================================================================
// Predefined diagnostics (ER3xx - Re-entrancy)
// =============================================================================

/// ER301: Event skipped because the state was already borrowed.
pub const ER301: Diagnostic = Diagnostic::warning(
    "ER301",
    "re-entrant allocation while recording, event skipped"
).with_note("a writer allocated through a ProfileAllocator while the thread state was in use")
 .with_help("writers must allocate through the system allocator only");

// =============================================================================
// Predefined diagnostics (ER9xx - Internal)
// =============================================================================

/// ER901: Thread state already destroyed.
pub const ER901: Diagnostic = Diagnostic::warning(
    "ER901",
    "thread profiling state accessed after it was destroyed"
).with_note("this happens when allocations run in other thread-local destructors")
 .with_help("events recorded during thread teardown are skipped");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predefined_codes_match_names() {
        let all = [ER001, ER002, ER003, ER004, ER101, ER102, ER201, ER202, ER301, ER901];
        for diag in &all {
            assert!(diag.code.starts_with("ER"));
            assert!(diag.note.is_some());
            assert!(diag.help.is_some());
        }
        assert_eq!(ER001.code, "ER001");
        assert_eq!(ER901.code, "ER901");
    }

    #[test]
    fn test_kind_levels() {
        assert_eq!(ER001.kind.level(), log::Level::Error);
        assert_eq!(ER201.kind.level(), log::Level::Warn);
        assert_eq!(DiagnosticKind::Note.prefix(), "note");
    }
}
