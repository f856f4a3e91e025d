//! Coded diagnostics for profiler misuse and sink failures.
//!
//! ## Diagnostic Codes
//!
//! | Code  | Meaning                        |
//! |-------|--------------------------------|
//! | ER0xx | Scope usage                    |
//! | ER1xx | Sink setup                     |
//! | ER2xx | Sink I/O                       |
//! | ER3xx | Re-entrant recording           |
//! | ER9xx | Internal errors                |

pub mod emit;
pub mod kind;

pub use emit::{emit, emit_with_context, is_suppressed, suppress_diagnostics};
pub use kind::{Diagnostic, DiagnosticKind};

pub use kind::{ER001, ER002, ER003, ER004, ER101, ER102, ER201, ER202, ER301, ER901};
