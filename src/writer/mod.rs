//! Sinks for profiling events.
//!
//! A [`Writer`] goes through `setup`, any number of `write` calls, then one `end`.
//! Each thread owns two writers, one per [`Direction`].

mod json;
mod memory;

pub use json::JsonFileWriter;
pub use memory::{MemoryView, MemoryWriter};

pub(crate) use json::claim_run_dir;

use std::path::Path;

use crate::api::config::{ProfilerConfig, SinkKind};
use crate::api::record::Record;
use crate::core::registry::{ScopeRegistry, TypeRegistry};
use crate::error::SinkError;
use crate::util::time::Timestamp;

/// Destination of the events of one thread and direction.
///
/// Writers run inside the profiler's bookkeeping. They must not allocate through a
/// [`ProfileAllocator`](crate::ProfileAllocator); such allocations are skipped.
pub trait Writer {
    /// Prepare backing storage. `tag` names the direction (`"alloc"` or `"dealloc"`).
    fn setup(&mut self, tag: &str) -> Result<(), SinkError>;

    /// Append one event. Called once per instrumented allocation or deallocation.
    fn write(&mut self, record: &Record) -> Result<(), SinkError>;

    /// Persist the registries and start time, then flush and close.
    fn end(
        &mut self,
        start_ts: Timestamp,
        scopes: &ScopeRegistry,
        types: &TypeRegistry,
    ) -> Result<(), SinkError>;
}

impl<W: Writer + ?Sized> Writer for Box<W> {
    fn setup(&mut self, tag: &str) -> Result<(), SinkError> {
        (**self).setup(tag)
    }

    fn write(&mut self, record: &Record) -> Result<(), SinkError> {
        (**self).write(record)
    }

    fn end(
        &mut self,
        start_ts: Timestamp,
        scopes: &ScopeRegistry,
        types: &TypeRegistry,
    ) -> Result<(), SinkError> {
        (**self).end(start_ts, scopes, types)
    }
}

/// Which side of the allocator a writer receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Alloc,
    Dealloc,
}

impl Direction {
    /// Tag passed to [`Writer::setup`], also the subdirectory of the JSON sink.
    pub const fn tag(self) -> &'static str {
        match self {
            Direction::Alloc => "alloc",
            Direction::Dealloc => "dealloc",
        }
    }
}

/// What a [`WriterFactory`](crate::WriterFactory) knows about the writer it builds.
#[derive(Debug, Clone, Copy)]
pub struct WriterContext<'a> {
    /// Label of the owning thread.
    pub thread: &'a str,
    /// Direction the writer will receive.
    pub direction: Direction,
    /// Configured run directory.
    pub output_dir: &'a Path,
    /// Configured buffer size.
    pub buffer_capacity: usize,
}

/// Writer that accepts everything and keeps nothing.
#[derive(Debug, Default)]
pub struct NullWriter {
    _private: (),
}

impl NullWriter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Writer for NullWriter {
    fn setup(&mut self, _tag: &str) -> Result<(), SinkError> {
        Ok(())
    }

    #[inline]
    fn write(&mut self, _record: &Record) -> Result<(), SinkError> {
        Ok(())
    }

    fn end(
        &mut self,
        _start_ts: Timestamp,
        _scopes: &ScopeRegistry,
        _types: &TypeRegistry,
    ) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Build the configured writer for `context`. The writer is not set up yet.
pub(crate) fn create_writer(
    config: &ProfilerConfig,
    context: &WriterContext<'_>,
) -> Result<Box<dyn Writer>, SinkError> {
    match &config.sink {
        SinkKind::Json => {
            let run_dir = claim_run_dir(context.output_dir)?;
            let writer = JsonFileWriter::new(run_dir, context.thread)
                .with_buffer_capacity(context.buffer_capacity);
            Ok(Box::new(writer))
        }
        SinkKind::Discard => Ok(Box::new(NullWriter::new())),
        SinkKind::Custom(factory) => factory(context),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_tags() {
        assert_eq!(Direction::Alloc.tag(), "alloc");
        assert_eq!(Direction::Dealloc.tag(), "dealloc");
    }

    #[test]
    fn test_custom_factory_sees_context() {
        let config = ProfilerConfig::default().with_writer_factory(|context| {
            if context.direction == Direction::Dealloc {
                return Err(SinkError::Rejected(context.thread.to_string()));
            }
            Ok(Box::new(NullWriter::new()))
        });

        let mut context = WriterContext {
            thread: "3-worker",
            direction: Direction::Alloc,
            output_dir: Path::new("unused"),
            buffer_capacity: 0,
        };
        assert!(create_writer(&config, &context).is_ok());

        context.direction = Direction::Dealloc;
        match create_writer(&config, &context) {
            Err(SinkError::Rejected(thread)) => assert_eq!(thread, "3-worker"),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_null_writer_accepts_everything() {
        let mut writer: Box<dyn Writer> = Box::new(NullWriter::new());
        writer.setup("alloc").unwrap();
        writer.write(&Record::new(0, 1, 2, 3, 4)).unwrap();
        writer
            .end(0, &ScopeRegistry::new(), &TypeRegistry::new())
            .unwrap();
    }
}
