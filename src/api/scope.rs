//! Scope API for application code.
//!
//! Scopes label the allocations made while they are active. They nest per thread:
//!
//! ```rust,ignore
//! use erata::{pop_scope, push_scope, ScopeGuard};
//!
//! push_scope("level-load");
//! {
//!     let _textures = ScopeGuard::new("textures");
//!     // allocations here are attributed to "textures"
//! }
//! assert_eq!(pop_scope(), "level-load");
//! ```

use std::marker::PhantomData;

use crate::core::registry::GLOBAL_SCOPE_HASH;
use crate::core::tls;
use crate::diagnostics;
use crate::error::ProfileError;

/// Enter the scope `name` on the calling thread and return its hash.
pub fn try_push_scope(name: &str) -> Result<u64, ProfileError> {
    tls::with_state_mut(|state| state.push_scope(name))
}

/// Enter the scope `name` on the calling thread.
///
/// # Panics
///
/// Panics if the thread state cannot be used (for example after `finish_thread`).
pub fn push_scope(name: &str) {
    if let Err(err) = try_push_scope(name) {
        tls::fatal(&err);
    }
}

/// Leave the innermost scope of the calling thread and return its name.
pub fn try_pop_scope() -> Result<String, ProfileError> {
    let name = tls::with_state_mut(|state| state.pop_scope().map(str::to_string))??;
    Ok(name)
}

/// Leave the innermost scope of the calling thread and return its name.
///
/// # Panics
///
/// Panics when only the global scope is active: every pop must match an earlier push.
pub fn pop_scope() -> String {
    match try_pop_scope() {
        Ok(name) => name,
        Err(err) => tls::fatal(&err),
    }
}

/// Hash of the innermost scope of the calling thread.
///
/// The global scope hash is returned if the thread state cannot be reached.
pub fn current_scope() -> u64 {
    tls::with_state(|state| state.current_scope()).unwrap_or(GLOBAL_SCOPE_HASH)
}

/// RAII guard for a scope.
///
/// Pushes the scope on creation and pops it when dropped. Bound to the thread
/// that created it.
pub struct ScopeGuard {
    hash: u64,
    _not_send: PhantomData<*const ()>,
}

impl ScopeGuard {
    /// Enter the scope `name` until the guard is dropped.
    pub fn new(name: &str) -> Self {
        let hash = match try_push_scope(name) {
            Ok(hash) => hash,
            Err(err) => tls::fatal(&err),
        };
        Self {
            hash,
            _not_send: PhantomData,
        }
    }

    /// Hash of the guarded scope.
    pub fn hash(&self) -> u64 {
        self.hash
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        let hash = self.hash;
        let popped = tls::with_state_mut(|state| state.pop_scope_if(hash).map(|_| ()))
            .and_then(|result| result.map_err(ProfileError::from));
        if let Err(err) = popped {
            if let Some(diag) = err.diagnostic() {
                diagnostics::emit_with_context(diag, &err.to_string());
            }
        }
    }
}

/// Execute a closure with a scope active.
pub fn with_scope<F, R>(name: &str, f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = ScopeGuard::new(name);
    f()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::hash_name;
    use crate::core::tls::init_thread;
    use crate::error::ScopeError;
    use crate::writer::NullWriter;

    fn on_profiled_thread<F: FnOnce() + Send + 'static>(f: F) {
        std::thread::spawn(move || {
            init_thread(NullWriter::new(), NullWriter::new()).unwrap();
            f();
        })
        .join()
        .unwrap();
    }

    #[test]
    fn test_push_pop() {
        on_profiled_thread(|| {
            push_scope("rendering");
            assert_eq!(current_scope(), hash_name("rendering"));

            push_scope("shadows");
            assert_eq!(current_scope(), hash_name("shadows"));

            assert_eq!(pop_scope(), "shadows");
            assert_eq!(pop_scope(), "rendering");
            assert_eq!(current_scope(), GLOBAL_SCOPE_HASH);
        });
    }

    #[test]
    fn test_pop_global_fails() {
        on_profiled_thread(|| {
            assert!(matches!(
                try_pop_scope(),
                Err(ProfileError::Scope(ScopeError::PopGlobal))
            ));
        });
    }

    #[test]
    fn test_scope_guard() {
        on_profiled_thread(|| {
            {
                let outer = ScopeGuard::new("physics");
                assert_eq!(current_scope(), outer.hash());
                {
                    let _inner = ScopeGuard::new("collision");
                    assert_eq!(current_scope(), hash_name("collision"));
                }
                assert_eq!(current_scope(), hash_name("physics"));
            }
            assert_eq!(current_scope(), GLOBAL_SCOPE_HASH);
        });
    }

    #[test]
    fn test_guard_leaves_enclosing_scope_after_manual_pop() {
        on_profiled_thread(|| {
            push_scope("outer");
            {
                let _inner = ScopeGuard::new("inner");
                assert_eq!(pop_scope(), "inner");
                assert_eq!(current_scope(), hash_name("outer"));
            }
            assert_eq!(current_scope(), hash_name("outer"));
            assert_eq!(crate::core::tls::with_state(|state| state.scope_depth()).unwrap(), 1);
            assert_eq!(pop_scope(), "outer");
        });
    }

    #[test]
    fn test_with_scope() {
        on_profiled_thread(|| {
            let inside = with_scope("audio", current_scope);
            assert_eq!(inside, hash_name("audio"));
            assert_eq!(current_scope(), GLOBAL_SCOPE_HASH);
        });
    }
}
