//! In-memory writer for checking the profiler's call discipline.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::api::record::Record;
use crate::core::registry::{ScopeRegistry, TypeRegistry};
use crate::error::SinkError;
use crate::util::time::Timestamp;

use super::Writer;

#[derive(Debug, Default)]
struct MemoryLog {
    set_up: Cell<bool>,
    ended: Cell<bool>,
    writes: Cell<u64>,
    latest: Cell<Option<Record>>,
    tag: RefCell<Option<String>>,
    start_ts: Cell<Option<Timestamp>>,
    scopes_at_end: Cell<usize>,
    types_at_end: Cell<usize>,
    reject_writes: Cell<bool>,
    reject_end: Cell<bool>,
}

/// Writer that counts writes and keeps only the most recent record.
///
/// Hand a [`MemoryView`] to the test before moving the writer into the profiler.
#[derive(Debug, Default)]
pub struct MemoryWriter {
    log: Rc<MemoryLog>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle observing this writer.
    pub fn view(&self) -> MemoryView {
        MemoryView {
            log: Rc::clone(&self.log),
        }
    }
}

impl Writer for MemoryWriter {
    fn setup(&mut self, tag: &str) -> Result<(), SinkError> {
        if self.log.set_up.replace(true) {
            return Err(SinkError::AlreadySetUp);
        }
        *self.log.tag.borrow_mut() = Some(tag.to_string());
        Ok(())
    }

    fn write(&mut self, record: &Record) -> Result<(), SinkError> {
        if !self.log.set_up.get() || self.log.ended.get() {
            return Err(SinkError::NotSetUp);
        }
        if self.log.reject_writes.get() {
            return Err(SinkError::Rejected("writes disabled".to_string()));
        }
        self.log.writes.set(self.log.writes.get() + 1);
        self.log.latest.set(Some(*record));
        Ok(())
    }

    fn end(
        &mut self,
        start_ts: Timestamp,
        scopes: &ScopeRegistry,
        types: &TypeRegistry,
    ) -> Result<(), SinkError> {
        if !self.log.set_up.get() {
            return Err(SinkError::NotSetUp);
        }
        if self.log.ended.replace(true) {
            return Err(SinkError::Rejected("already ended".to_string()));
        }
        if self.log.reject_end.get() {
            return Err(SinkError::Rejected("end disabled".to_string()));
        }
        self.log.start_ts.set(Some(start_ts));
        self.log.scopes_at_end.set(scopes.len());
        self.log.types_at_end.set(types.len());
        Ok(())
    }
}

/// Read side of a [`MemoryWriter`].
#[derive(Debug, Clone)]
pub struct MemoryView {
    log: Rc<MemoryLog>,
}

impl MemoryView {
    /// Returns true once `setup` ran.
    pub fn is_set_up(&self) -> bool {
        self.log.set_up.get()
    }

    /// Returns true once `end` ran.
    pub fn is_ended(&self) -> bool {
        self.log.ended.get()
    }

    /// Number of accepted writes.
    pub fn write_count(&self) -> u64 {
        self.log.writes.get()
    }

    /// Most recent accepted record.
    pub fn latest(&self) -> Option<Record> {
        self.log.latest.get()
    }

    /// Tag passed to `setup`.
    pub fn tag(&self) -> Option<String> {
        self.log.tag.borrow().clone()
    }

    /// Start timestamp passed to `end`.
    pub fn start_ts(&self) -> Option<Timestamp> {
        self.log.start_ts.get()
    }

    /// Scope registry size seen by `end`.
    pub fn scopes_at_end(&self) -> usize {
        self.log.scopes_at_end.get()
    }

    /// Type registry size seen by `end`.
    pub fn types_at_end(&self) -> usize {
        self.log.types_at_end.get()
    }

    /// Make every following `write` fail.
    pub fn reject_writes(&self, reject: bool) {
        self.log.reject_writes.set(reject);
    }

    /// Make `end` fail. The writer still counts as ended.
    pub fn reject_end(&self, reject: bool) {
        self.log.reject_end.set(reject);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracks_lifecycle() {
        let mut writer = MemoryWriter::new();
        let view = writer.view();
        assert!(!view.is_set_up());

        writer.setup("alloc").unwrap();
        assert!(view.is_set_up());
        assert_eq!(view.tag().as_deref(), Some("alloc"));

        for i in 1..=3 {
            writer.write(&Record::new(0, 1, i, 0, 0)).unwrap();
            assert_eq!(view.write_count(), i as u64);
        }
        assert_eq!(view.latest().map(|r| r.size()), Some(3));

        let mut types = TypeRegistry::new();
        types.register(1, "u8");
        writer.end(42, &ScopeRegistry::new(), &types).unwrap();
        assert!(view.is_ended());
        assert_eq!(view.start_ts(), Some(42));
        assert_eq!(view.types_at_end(), 1);
        assert_eq!(view.scopes_at_end(), 0);
    }

    #[test]
    fn test_rejects_out_of_order_calls() {
        let mut writer = MemoryWriter::new();
        let view = writer.view();
        assert!(writer.write(&Record::new(0, 0, 0, 0, 0)).is_err());

        writer.setup("dealloc").unwrap();
        assert!(matches!(writer.setup("dealloc"), Err(SinkError::AlreadySetUp)));

        view.reject_writes(true);
        assert!(matches!(
            writer.write(&Record::new(0, 0, 0, 0, 0)),
            Err(SinkError::Rejected(_))
        ));
        assert_eq!(view.write_count(), 0);

        view.reject_end(true);
        assert!(matches!(
            writer.end(0, &ScopeRegistry::new(), &TypeRegistry::new()),
            Err(SinkError::Rejected(_))
        ));
        assert!(view.is_ended());
    }
}
