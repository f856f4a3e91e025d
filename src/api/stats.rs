//! Per-thread profiling statistics.

use std::fmt;

use crate::util::size::format_bytes;
use crate::util::time::Timestamp;

/// Counters kept by the state of one thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThreadStats {
    /// Allocation events accepted by the sink.
    pub allocations: u64,

    /// Deallocation events accepted by the sink.
    pub deallocations: u64,

    /// Bytes covered by recorded allocations.
    pub bytes_allocated: u64,

    /// Bytes covered by recorded deallocations.
    pub bytes_deallocated: u64,

    /// Events the sink failed to write.
    pub dropped_events: u64,
}

impl ThreadStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_alloc(&mut self, size: usize) {
        self.allocations += 1;
        self.bytes_allocated = self.bytes_allocated.saturating_add(size as u64);
    }

    pub(crate) fn record_dealloc(&mut self, size: usize) {
        self.deallocations += 1;
        self.bytes_deallocated = self.bytes_deallocated.saturating_add(size as u64);
    }

    pub(crate) fn record_drop(&mut self) {
        self.dropped_events += 1;
    }

    /// Recorded bytes not yet recorded as freed.
    pub fn outstanding_bytes(&self) -> u64 {
        self.bytes_allocated.saturating_sub(self.bytes_deallocated)
    }

    /// Recorded allocations not yet matched by a deallocation.
    pub fn outstanding_allocations(&self) -> u64 {
        self.allocations.saturating_sub(self.deallocations)
    }
}

/// Summary published when the state of a thread is finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadReport {
    /// Label of the thread, also the file stem of its JSON logs.
    pub thread: String,

    /// Creation time of the thread state.
    pub start_ts: Timestamp,

    /// Time of the final flush.
    pub end_ts: Timestamp,

    /// Event counters.
    pub stats: ThreadStats,

    /// Events skipped because the state was busy, finished or destroyed.
    pub skipped_events: u64,

    /// Distinct scope names, including the global scope.
    pub scope_count: usize,

    /// Distinct type names.
    pub type_count: usize,

    /// False if a writer failed during the final flush.
    pub flushed: bool,
}

impl fmt::Display for ThreadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Thread {}:", self.thread)?;
        writeln!(
            f,
            "  Duration:      {} ms",
            self.end_ts.saturating_sub(self.start_ts) / 1_000_000
        )?;
        writeln!(
            f,
            "  Allocations:   {} ({})",
            self.stats.allocations,
            format_bytes(self.stats.bytes_allocated)
        )?;
        writeln!(
            f,
            "  Deallocations: {} ({})",
            self.stats.deallocations,
            format_bytes(self.stats.bytes_deallocated)
        )?;
        writeln!(f, "  Outstanding:   {}", format_bytes(self.stats.outstanding_bytes()))?;
        writeln!(f, "  Dropped:       {}", self.stats.dropped_events)?;
        writeln!(f, "  Skipped:       {}", self.skipped_events)?;
        writeln!(f, "  Scopes:        {}", self.scope_count)?;
        writeln!(f, "  Types:         {}", self.type_count)?;
        if !self.flushed {
            writeln!(f, "  Final flush failed")?;
        }
        Ok(())
    }
}
