//! Diagnostic emission backend.
//!
//! Every diagnostic goes to the `log` facade. With the `diagnostics` feature it is
//! also written to stderr.

use std::sync::atomic::{AtomicBool, Ordering};

use super::kind::Diagnostic;

/// Global flag to suppress diagnostic output (for testing).
static DIAGNOSTICS_SUPPRESSED: AtomicBool = AtomicBool::new(false);

/// Suppress all diagnostic output.
pub fn suppress_diagnostics(suppress: bool) {
    DIAGNOSTICS_SUPPRESSED.store(suppress, Ordering::Relaxed);
}

/// Check if diagnostics are suppressed.
pub fn is_suppressed() -> bool {
    DIAGNOSTICS_SUPPRESSED.load(Ordering::Relaxed)
}

/// Emit a diagnostic.
pub fn emit(diag: &Diagnostic) {
    if is_suppressed() {
        return;
    }

    emit_to_log(diag, None);

    #[cfg(feature = "diagnostics")]
    emit_to_stderr(diag, None);
}

/// Emit a diagnostic with additional runtime context.
pub fn emit_with_context(diag: &Diagnostic, context: &str) {
    if is_suppressed() {
        return;
    }

    emit_to_log(diag, Some(context));

    #[cfg(feature = "diagnostics")]
    emit_to_stderr(diag, Some(context));
}

fn emit_to_log(diag: &Diagnostic, context: Option<&str>) {
    let level = diag.kind.level();
    match context {
        Some(context) => log::log!(level, "[{}] {}: {}", diag.code, diag.message, context),
        None => log::log!(level, "[{}] {}", diag.code, diag.message),
    }

    if let Some(note) = diag.note {
        log::debug!("  note: {}", note);
    }
    if let Some(help) = diag.help {
        log::debug!("  help: {}", help);
    }
}

#[cfg(feature = "diagnostics")]
fn emit_to_stderr(diag: &Diagnostic, context: Option<&str>) {
    use std::io::Write;

    let mut stderr = std::io::stderr().lock();

    let _ = writeln!(
        stderr,
        "[erata][{}] {}: {}",
        diag.code,
        diag.kind.prefix(),
        diag.message
    );

    if let Some(context) = context {
        let _ = writeln!(stderr, "  context: {}", context);
    }
    if let Some(note) = diag.note {
        let _ = writeln!(stderr, "  note: {}", note);
    }
    if let Some(help) = diag.help {
        let _ = writeln!(stderr, "  help: {}", help);
    }

    let _ = writeln!(stderr);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::kind::ER001;

    #[test]
    fn test_suppression() {
        suppress_diagnostics(true);
        assert!(is_suppressed());
        emit(&ER001);
        suppress_diagnostics(false);
        assert!(!is_suppressed());
    }
}
