//! Per-thread profiling state.

use crate::api::config::ProfilerConfig;
use crate::api::record::{Record, TypeInfo};
use crate::api::stats::{ThreadReport, ThreadStats};
use crate::collections::{RawMap, RawString};
use crate::core::registry::{
    hash_name, ScopeRegistry, TypeRegistry, GLOBAL_SCOPE_HASH, GLOBAL_SCOPE_NAME,
};
use crate::core::scope_stack::ScopeStack;
use crate::core::{global, tls};
use crate::diagnostics::{self, ER201, ER202};
use crate::error::{ScopeError, SinkError};
use crate::util::time::{self, Timestamp};
use crate::writer::{create_writer, Direction, Writer, WriterContext};

/// Scope stack, registries and writers of one thread.
///
/// The singleton of the calling thread is reached through [`with_state`](crate::with_state).
/// A `ProfileState` can also be driven directly, which is what the allocator path does
/// for the thread it runs on.
pub struct ProfileState {
    thread: RawString,
    scopes: ScopeStack,
    scope_names: ScopeRegistry,
    type_names: TypeRegistry,
    /// Name hashes keyed by the address of the `type_name` string, with its length.
    type_hashes: RawMap<(usize, u64)>,
    alloc_writer: Box<dyn Writer>,
    dealloc_writer: Box<dyn Writer>,
    start_ts: Timestamp,
    stats: ThreadStats,
    drop_reported: bool,
    finished: bool,
}

impl ProfileState {
    /// Create a state that sends events to the given writers.
    ///
    /// Both writers are set up here, with the tags `"alloc"` and `"dealloc"`.
    pub fn new<A, D>(
        thread: &str,
        alloc_writer: A,
        dealloc_writer: D,
        registry_buckets: usize,
    ) -> Result<Self, SinkError>
    where
        A: Writer + 'static,
        D: Writer + 'static,
    {
        Self::from_boxed(
            thread,
            Box::new(alloc_writer),
            Box::new(dealloc_writer),
            registry_buckets,
        )
    }

    /// Create a state with writers built from `config`.
    pub(crate) fn from_config(config: &ProfilerConfig, thread: &str) -> Result<Self, SinkError> {
        let context = |direction| WriterContext {
            thread,
            direction,
            output_dir: &config.output_dir,
            buffer_capacity: config.buffer_capacity,
        };
        let alloc_writer = create_writer(config, &context(Direction::Alloc))?;
        let dealloc_writer = create_writer(config, &context(Direction::Dealloc))?;
        Self::from_boxed(thread, alloc_writer, dealloc_writer, config.registry_buckets)
    }

    fn from_boxed(
        thread: &str,
        mut alloc_writer: Box<dyn Writer>,
        mut dealloc_writer: Box<dyn Writer>,
        registry_buckets: usize,
    ) -> Result<Self, SinkError> {
        alloc_writer.setup(Direction::Alloc.tag())?;
        dealloc_writer.setup(Direction::Dealloc.tag())?;

        let mut scope_names = ScopeRegistry::with_buckets(registry_buckets);
        scope_names.register(GLOBAL_SCOPE_HASH, GLOBAL_SCOPE_NAME);

        log::debug!("profiling state created for thread {}", thread);

        Ok(Self {
            thread: RawString::from(thread),
            scopes: ScopeStack::new(),
            scope_names,
            type_names: TypeRegistry::with_buckets(registry_buckets),
            type_hashes: RawMap::with_buckets(registry_buckets),
            alloc_writer,
            dealloc_writer,
            start_ts: time::now(),
            stats: ThreadStats::new(),
            drop_reported: false,
            finished: false,
        })
    }

    /// Enter the scope `name` and return its hash.
    pub fn push_scope(&mut self, name: &str) -> u64 {
        let hash = hash_name(name);
        self.scope_names.register(hash, name);
        self.scopes.push(hash);
        hash
    }

    /// Leave the innermost scope and return its name.
    pub fn pop_scope(&mut self) -> Result<&str, ScopeError> {
        if self.scopes.is_global() {
            return Err(ScopeError::PopGlobal);
        }
        let hash = self.scopes.current();
        if !self.scope_names.contains(hash) {
            return Err(ScopeError::Unregistered(hash));
        }
        self.scopes.pop()?;
        self.scope_names
            .get(hash)
            .ok_or(ScopeError::Unregistered(hash))
    }

    /// Leave the innermost scope only if it is `expected`.
    ///
    /// Fails with [`ScopeError::NotOnTop`] and leaves the stack untouched otherwise.
    pub fn pop_scope_if(&mut self, expected: u64) -> Result<&str, ScopeError> {
        let found = self.scopes.current();
        if found != expected {
            return Err(ScopeError::NotOnTop { expected, found });
        }
        self.pop_scope()
    }

    /// Hash of the innermost scope.
    pub fn current_scope(&self) -> u64 {
        self.scopes.current()
    }

    /// Number of scopes entered and not yet left.
    pub fn scope_depth(&self) -> usize {
        self.scopes.depth()
    }

    /// Record an allocation of `count` values of `T` at `ptr`.
    pub fn record_allocation<T>(&mut self, ptr: *const T, count: usize) -> bool {
        self.record(Direction::Alloc, TypeInfo::of::<T>(), ptr as usize, count)
    }

    /// Record a deallocation of `count` values of `T` at `ptr`.
    pub fn record_deallocation<T>(&mut self, ptr: *const T, count: usize) -> bool {
        self.record(Direction::Dealloc, TypeInfo::of::<T>(), ptr as usize, count)
    }

    /// Record an event covering `count` elements. Returns false if the event was not written.
    pub fn record(
        &mut self,
        direction: Direction,
        info: TypeInfo,
        location: usize,
        count: usize,
    ) -> bool {
        self.record_sized(direction, info, location, info.size_of_array(count))
    }

    /// Record an event covering `size` bytes.
    pub fn record_sized(
        &mut self,
        direction: Direction,
        info: TypeInfo,
        location: usize,
        size: usize,
    ) -> bool {
        if self.finished {
            return false;
        }

        let type_hash = self.resolve_type(info);

        let record = Record::new(
            self.scopes.current(),
            type_hash,
            size,
            location,
            time::now(),
        );

        let written = match direction {
            Direction::Alloc => self.alloc_writer.write(&record),
            Direction::Dealloc => self.dealloc_writer.write(&record),
        };

        match written {
            Ok(()) => {
                match direction {
                    Direction::Alloc => self.stats.record_alloc(size),
                    Direction::Dealloc => self.stats.record_dealloc(size),
                }
                true
            }
            Err(err) => {
                self.stats.record_drop();
                if !self.drop_reported {
                    self.drop_reported = true;
                    diagnostics::emit_with_context(&ER201, &err.to_string());
                }
                false
            }
        }
    }

    /// Hash of `info`, registering its name on first sight.
    fn resolve_type(&mut self, info: TypeInfo) -> u64 {
        let name = info.name();
        let key = name.as_ptr() as u64;
        if let Some(&(len, hash)) = self.type_hashes.find(key) {
            if len == name.len() {
                return hash;
            }
        }

        let hash = info.hash();
        self.type_names.register(hash, name);
        self.type_hashes.emplace(key, (name.len(), hash));
        hash
    }

    /// Scope names seen so far, including the global scope.
    pub fn scope_names(&self) -> &ScopeRegistry {
        &self.scope_names
    }

    /// Type names seen so far.
    pub fn type_names(&self) -> &TypeRegistry {
        &self.type_names
    }

    /// Event counters.
    pub fn stats(&self) -> &ThreadStats {
        &self.stats
    }

    /// Creation time of this state.
    pub fn start_ts(&self) -> Timestamp {
        self.start_ts
    }

    /// Label of the owning thread.
    pub fn thread(&self) -> &str {
        self.thread.as_str()
    }

    /// Returns true once [`finish`](Self::finish) ran.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Flush both writers with the accumulated registries.
    ///
    /// Runs once; later calls return `None`. Writer failures are reported as
    /// diagnostics and reflected in [`ThreadReport::flushed`].
    pub fn finish(&mut self) -> Option<ThreadReport> {
        if self.finished {
            return None;
        }
        self.finished = true;

        let mut flushed = true;
        let writers = [
            (Direction::Alloc, &mut self.alloc_writer),
            (Direction::Dealloc, &mut self.dealloc_writer),
        ];
        for (direction, writer) in writers {
            if let Err(err) = writer.end(self.start_ts, &self.scope_names, &self.type_names) {
                flushed = false;
                diagnostics::emit_with_context(
                    &ER202,
                    &format!("{} log of thread {}: {}", direction.tag(), self.thread, err),
                );
            }
        }

        let report = ThreadReport {
            thread: self.thread.as_str().to_string(),
            start_ts: self.start_ts,
            end_ts: time::now(),
            stats: self.stats,
            skipped_events: tls::skipped_events(),
            scope_count: self.scope_names.len(),
            type_count: self.type_names.len(),
            flushed,
        };

        log::debug!(
            "profiling state finished for thread {}: {} allocations, {} deallocations",
            report.thread,
            report.stats.allocations,
            report.stats.deallocations
        );

        global::publish_report(report.clone());
        Some(report)
    }
}

impl Drop for ProfileState {
    fn drop(&mut self) {
        self.finish();
    }
}

impl std::fmt::Debug for ProfileState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileState")
            .field("thread", &self.thread)
            .field("scope_depth", &self.scopes.depth())
            .field("scopes", &self.scope_names.len())
            .field("types", &self.type_names.len())
            .field("stats", &self.stats)
            .field("finished", &self.finished)
            .finish()
    }
}
