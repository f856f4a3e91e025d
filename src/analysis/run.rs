//! All threads of one run.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use crate::api::record::Record;
use crate::error::AnalysisError;
use crate::writer::Direction;

use super::trace::TraceLog;

/// Both logs of one thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadTrace {
    /// Thread label, the file stem of both logs.
    pub thread: String,
    pub alloc: TraceLog,
    pub dealloc: TraceLog,
}

impl ThreadTrace {
    /// Log of one direction.
    pub fn log(&self, direction: Direction) -> &TraceLog {
        match direction {
            Direction::Alloc => &self.alloc,
            Direction::Dealloc => &self.dealloc,
        }
    }
}

/// One event of a run, with the thread that produced it.
#[derive(Debug, Clone, Copy)]
pub struct Event<'a> {
    pub trace: &'a ThreadTrace,
    pub direction: Direction,
    pub record: Record,
}

impl<'a> Event<'a> {
    /// Name of the scope the event happened in.
    pub fn scope_name(&self) -> Option<&'a str> {
        self.trace
            .log(self.direction)
            .scope_name(self.record.scope_hash())
    }

    /// Name of the element type.
    pub fn type_name(&self) -> Option<&'a str> {
        self.trace
            .log(self.direction)
            .type_name(self.record.type_hash())
    }
}

/// Totals of one `(scope, type)` pair across a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub scope: String,
    pub type_name: String,
    pub allocations: u64,
    pub deallocations: u64,
    pub bytes_allocated: u64,
    pub bytes_deallocated: u64,
}

/// A run directory loaded into memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunLog {
    threads: Vec<ThreadTrace>,
}

const UNKNOWN: &str = "<unknown>";

impl RunLog {
    /// Load every thread of the run at `dir`.
    ///
    /// Each `alloc/<thread>.json` must have a matching `dealloc/<thread>.json`.
    pub fn load(dir: &Path) -> Result<Self, AnalysisError> {
        let allocs = list_logs(&dir.join(Direction::Alloc.tag()))?;
        let mut deallocs = list_logs(&dir.join(Direction::Dealloc.tag()))?;

        let mut threads = Vec::with_capacity(allocs.len());
        for (thread, alloc_path) in allocs {
            let dealloc_path = deallocs.remove(&thread).ok_or_else(|| AnalysisError::MissingPair {
                thread: thread.clone(),
                missing: Direction::Dealloc.tag(),
            })?;
            threads.push(ThreadTrace {
                alloc: TraceLog::load(&alloc_path)?,
                dealloc: TraceLog::load(&dealloc_path)?,
                thread,
            });
        }

        if let Some(thread) = deallocs.into_keys().next() {
            return Err(AnalysisError::MissingPair {
                thread,
                missing: Direction::Alloc.tag(),
            });
        }

        Ok(Self { threads })
    }

    /// Build from already parsed threads.
    pub fn from_threads(mut threads: Vec<ThreadTrace>) -> Self {
        threads.sort_by(|a, b| a.thread.cmp(&b.thread));
        Self { threads }
    }

    /// Threads ordered by label.
    pub fn threads(&self) -> &[ThreadTrace] {
        &self.threads
    }

    /// Every event of every thread, ordered by timestamp.
    ///
    /// Ties keep thread order, then allocation before deallocation, then file order.
    pub fn timeline(&self) -> Vec<Event<'_>> {
        let mut events: Vec<Event<'_>> = self
            .threads
            .iter()
            .flat_map(|trace| {
                let allocs = trace.alloc.records.iter().map(move |record| Event {
                    trace,
                    direction: Direction::Alloc,
                    record: *record,
                });
                let deallocs = trace.dealloc.records.iter().map(move |record| Event {
                    trace,
                    direction: Direction::Dealloc,
                    record: *record,
                });
                allocs.chain(deallocs)
            })
            .collect();
        events.sort_by_key(|event| event.record.timestamp());
        events
    }

    /// Totals per `(scope, type)`, largest allocated byte count first.
    pub fn summarize(&self) -> Vec<Summary> {
        let mut totals: BTreeMap<(String, String), Summary> = BTreeMap::new();
        for event in self.timeline() {
            let scope = event.scope_name().unwrap_or(UNKNOWN);
            let type_name = event.type_name().unwrap_or(UNKNOWN);
            let entry = totals
                .entry((scope.to_string(), type_name.to_string()))
                .or_insert_with(|| Summary {
                    scope: scope.to_string(),
                    type_name: type_name.to_string(),
                    ..Summary::default()
                });
            let size = event.record.size() as u64;
            match event.direction {
                Direction::Alloc => {
                    entry.allocations += 1;
                    entry.bytes_allocated += size;
                }
                Direction::Dealloc => {
                    entry.deallocations += 1;
                    entry.bytes_deallocated += size;
                }
            }
        }

        let mut summaries: Vec<Summary> = totals.into_values().collect();
        summaries.sort_by(|a, b| b.bytes_allocated.cmp(&a.bytes_allocated));
        summaries
    }

    /// Allocations with no later deallocation at the same address.
    ///
    /// Deallocations may come from other threads than the allocation.
    pub fn outstanding(&self) -> Vec<Event<'_>> {
        let mut live: HashMap<usize, Vec<Event<'_>>> = HashMap::new();
        for event in self.timeline() {
            let location = event.record.location();
            match event.direction {
                Direction::Alloc => live.entry(location).or_default().push(event),
                Direction::Dealloc => {
                    if let Some(blocks) = live.get_mut(&location) {
                        blocks.pop();
                    }
                }
            }
        }

        let mut outstanding: Vec<Event<'_>> = live.into_values().flatten().collect();
        outstanding.sort_by_key(|event| event.record.timestamp());
        outstanding
    }
}

/// Map of file stem to path for the `.json` files in `dir`.
fn list_logs(dir: &Path) -> Result<BTreeMap<String, PathBuf>, AnalysisError> {
    let io_err = |source| AnalysisError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut logs = BTreeMap::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
            logs.insert(stem.to_string(), path.clone());
        }
    }
    Ok(logs)
}
