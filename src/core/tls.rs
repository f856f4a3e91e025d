//! Thread-local profiling state management.
//!
//! Each thread owns one [`ProfileState`], created lazily on first use and finished
//! either by [`finish_thread`] or when the thread exits.

use std::cell::{Cell, RefCell};

use crate::api::record::TypeInfo;
use crate::api::stats::ThreadReport;
use crate::core::global;
use crate::core::state::ProfileState;
use crate::diagnostics::{self, ER003, ER301};
use crate::error::ProfileError;
use crate::writer::{Direction, Writer};

enum Slot {
    Vacant,
    Active(ProfileState),
    Finished,
}

impl Slot {
    fn activate(&mut self) -> Result<&mut ProfileState, ProfileError> {
        if let Slot::Vacant = self {
            *self = Slot::Active(create_state()?);
        }
        match self {
            Slot::Active(state) => Ok(state),
            Slot::Finished => Err(ProfileError::Finished),
            // Replaced above.
            Slot::Vacant => Err(ProfileError::Destroyed),
        }
    }
}

const REPORTED_BUSY: u8 = 1;
const REPORTED_FINISHED: u8 = 2;

thread_local! {
    static STATE: RefCell<Slot> = const { RefCell::new(Slot::Vacant) };
    static SKIPPED: Cell<u64> = const { Cell::new(0) };
    static REPORTED: Cell<u8> = const { Cell::new(0) };
}

fn create_state() -> Result<ProfileState, ProfileError> {
    let config = global::config();
    let label = global::next_thread_label();
    Ok(ProfileState::from_config(config, &label)?)
}

/// Execute a closure with mutable access to the state of the calling thread.
///
/// Creates the state on first access.
pub(crate) fn with_state_mut<F, R>(f: F) -> Result<R, ProfileError>
where
    F: FnOnce(&mut ProfileState) -> R,
{
    STATE
        .try_with(|cell| {
            let mut slot = cell.try_borrow_mut().map_err(|_| ProfileError::Busy)?;
            let state = slot.activate()?;
            Ok(f(state))
        })
        .unwrap_or(Err(ProfileError::Destroyed))
}

/// Execute a closure with access to the state of the calling thread.
///
/// Creates the state on first access.
pub fn with_state<F, R>(f: F) -> Result<R, ProfileError>
where
    F: FnOnce(&ProfileState) -> R,
{
    with_state_mut(|state| f(state))
}

/// Record an event of `count` values of `T` on the calling thread.
pub(crate) fn record<T>(direction: Direction, location: usize, count: usize) {
    let info = TypeInfo::of::<T>();
    record_with(|state| state.record(direction, info, location, count));
}

/// Record an event of `size` bytes attributed to `T` on the calling thread.
#[cfg_attr(not(feature = "nightly"), allow(dead_code))]
pub(crate) fn record_sized<T>(direction: Direction, location: usize, size: usize) {
    let info = TypeInfo::of::<T>();
    record_with(|state| state.record_sized(direction, info, location, size));
}

/// Busy, finished and destroyed states skip the event; any other failure is fatal.
fn record_with<F>(f: F)
where
    F: FnOnce(&mut ProfileState) -> bool,
{
    match with_state_mut(f) {
        Ok(_) => {}
        Err(err @ (ProfileError::Busy | ProfileError::Finished | ProfileError::Destroyed)) => {
            skip(&err)
        }
        Err(err) => fatal(&err),
    }
}

fn skip(err: &ProfileError) {
    let _ = SKIPPED.try_with(|skipped| skipped.set(skipped.get() + 1));

    let (flag, diag) = match err {
        ProfileError::Busy => (REPORTED_BUSY, &ER301),
        ProfileError::Finished => (REPORTED_FINISHED, &ER003),
        // Thread teardown: stay silent.
        _ => return,
    };
    let first = REPORTED
        .try_with(|reported| {
            let previous = reported.get();
            reported.set(previous | flag);
            previous & flag == 0
        })
        .unwrap_or(false);
    if first {
        diagnostics::emit(diag);
    }
}

/// Report a usage or setup error and abort the calling thread.
#[cold]
pub(crate) fn fatal(err: &ProfileError) -> ! {
    if let Some(diag) = err.diagnostic() {
        diagnostics::emit_with_context(diag, &err.to_string());
    }
    panic!("erata: {}", err)
}

/// Install explicit writers for the calling thread.
///
/// Fails with [`ProfileError::AlreadyInitialized`] if the thread state already exists.
pub fn init_thread<A, D>(alloc_writer: A, dealloc_writer: D) -> Result<(), ProfileError>
where
    A: Writer + 'static,
    D: Writer + 'static,
{
    STATE
        .try_with(|cell| {
            let mut slot = cell.try_borrow_mut().map_err(|_| ProfileError::Busy)?;
            match &*slot {
                Slot::Vacant => {}
                Slot::Active(_) => return Err(ProfileError::AlreadyInitialized),
                Slot::Finished => return Err(ProfileError::Finished),
            }
            let label = global::next_thread_label();
            let buckets = global::config().registry_buckets;
            *slot = Slot::Active(ProfileState::new(
                &label,
                alloc_writer,
                dealloc_writer,
                buckets,
            )?);
            Ok(())
        })
        .unwrap_or(Err(ProfileError::Destroyed))
}

/// Create the state of the calling thread now, from the process configuration.
///
/// Surfaces sink setup errors that the allocation path would treat as fatal.
pub fn try_init_thread() -> Result<(), ProfileError> {
    STATE
        .try_with(|cell| {
            let mut slot = cell.try_borrow_mut().map_err(|_| ProfileError::Busy)?;
            if let Slot::Active(_) = *slot {
                return Err(ProfileError::AlreadyInitialized);
            }
            slot.activate().map(|_| ())
        })
        .unwrap_or(Err(ProfileError::Destroyed))
}

/// Flush and close the writers of the calling thread.
///
/// Recording on this thread is skipped afterwards. A thread that never recorded
/// gets its state created and finished, so every finished thread has a report.
pub fn finish_thread() -> Result<ThreadReport, ProfileError> {
    STATE
        .try_with(|cell| {
            let mut slot = cell.try_borrow_mut().map_err(|_| ProfileError::Busy)?;
            match std::mem::replace(&mut *slot, Slot::Finished) {
                Slot::Active(mut state) => state.finish().ok_or(ProfileError::Finished),
                Slot::Vacant => create_state()?.finish().ok_or(ProfileError::Finished),
                Slot::Finished => Err(ProfileError::Finished),
            }
        })
        .unwrap_or(Err(ProfileError::Destroyed))
}

/// Returns true if the calling thread has a live profiling state.
pub fn is_initialized() -> bool {
    STATE
        .try_with(|cell| match cell.try_borrow() {
            Ok(slot) => matches!(*slot, Slot::Active(_)),
            Err(_) => true,
        })
        .unwrap_or(false)
}

/// Events of the calling thread that were skipped instead of recorded.
pub fn skipped_events() -> u64 {
    SKIPPED.try_with(Cell::get).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::{MemoryWriter, NullWriter};

    #[test]
    fn test_init_thread_installs_writers() {
        std::thread::spawn(|| {
            let alloc = MemoryWriter::new();
            let view = alloc.view();
            init_thread(alloc, NullWriter::new()).unwrap();
            assert!(is_initialized());
            assert!(view.is_set_up());

            assert!(matches!(
                init_thread(NullWriter::new(), NullWriter::new()),
                Err(ProfileError::AlreadyInitialized)
            ));

            record::<u32>(Direction::Alloc, 0x40, 2);
            assert_eq!(view.write_count(), 1);

            let report = finish_thread().unwrap();
            assert_eq!(report.stats.allocations, 1);
            assert!(!is_initialized());
            assert!(view.is_ended());

            record::<u32>(Direction::Alloc, 0x40, 2);
            assert_eq!(view.write_count(), 1);
            assert_eq!(skipped_events(), 1);
            assert!(matches!(finish_thread(), Err(ProfileError::Finished)));
        })
        .join()
        .unwrap();
    }

    #[test]
    fn test_busy_state_skips() {
        std::thread::spawn(|| {
            init_thread(NullWriter::new(), NullWriter::new()).unwrap();
            let nested = with_state(|_| with_state(|_| ()));
            assert!(matches!(nested, Ok(Err(ProfileError::Busy))));

            with_state(|_| record::<u8>(Direction::Alloc, 0, 1)).unwrap();
            assert_eq!(skipped_events(), 1);
            assert_eq!(with_state(|state| state.stats().allocations).unwrap(), 0);
        })
        .join()
        .unwrap();
    }
}
