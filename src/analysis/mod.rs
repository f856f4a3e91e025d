//! Offline reading of persisted runs.
//!
//! ```rust,ignore
//! use erata::analysis::RunLog;
//!
//! let run = RunLog::load("erata".as_ref())?;
//! for summary in run.summarize() {
//!     println!("{} / {}: {} bytes", summary.scope, summary.type_name, summary.bytes_allocated);
//! }
//! ```

mod run;
mod trace;

pub use run::{Event, RunLog, Summary, ThreadTrace};
pub use trace::TraceLog;
