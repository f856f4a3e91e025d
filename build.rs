//! Build script for erata.
//!
//! Emits build-time notes for enabled features and checks the toolchain
//! when the `nightly` feature is requested.

use std::env;

fn main() {
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_NIGHTLY");
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_DIAGNOSTICS");

    let nightly_enabled = env::var("CARGO_FEATURE_NIGHTLY").is_ok();
    let diagnostics_enabled = env::var("CARGO_FEATURE_DIAGNOSTICS").is_ok();

    // --- Nightly Features ---
    if nightly_enabled {
        emit_info("Nightly features enabled (std::alloc::Allocator trait)");
        emit_note("ProfileAllocator can now back standard collections:");
        emit_note("  let vec: Vec<u32, _> = Vec::new_in(erata::ProfileAllocator::<u32>::new());");

        check_nightly_compiler();
    }

    // --- Diagnostics ---
    if diagnostics_enabled {
        emit_info("Diagnostics are mirrored to stderr");
        emit_note("Silence them in tests with erata::suppress_diagnostics(true)");
    }

    check_target_features();
}

// =============================================================================
// Diagnostic emission helpers
// =============================================================================

fn emit_info(msg: &str) {
    println!("cargo:warning=[erata] {}", msg);
}

fn emit_note(msg: &str) {
    println!("cargo:warning=[erata]    {}", msg);
}

fn emit_warning(msg: &str) {
    println!("cargo:warning=[erata] warning: {}", msg);
}

// =============================================================================
// Environment and toolchain checks
// =============================================================================

fn check_nightly_compiler() {
    // Try to detect if we're on nightly by checking rustc version
    if let Ok(rustc) = env::var("RUSTC") {
        if let Ok(output) = std::process::Command::new(&rustc)
            .arg("--version")
            .output()
        {
            let version = String::from_utf8_lossy(&output.stdout);
            if !version.contains("nightly") {
                emit_warning("'nightly' feature enabled but compiler doesn't appear to be nightly!");
                emit_note("The std::alloc::Allocator trait requires nightly Rust.");
                emit_note("Install nightly: rustup install nightly");
                emit_note("Use nightly: rustup override set nightly");
            }
        }
    }
}

fn check_target_features() {
    let target = env::var("TARGET").unwrap_or_default();

    if target.contains("wasm") {
        emit_warning("WebAssembly target detected");
        emit_note("Thread states are only finished by finish_thread(); thread exit may not run them.");
        emit_note("The JSON sink needs a file system (use SinkKind::Custom otherwise).");
    }
}
