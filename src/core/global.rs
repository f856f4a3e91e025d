//! Process-wide state: configuration, thread labels and finished-thread reports.
//!
//! Nothing here is touched on the allocation path once a thread's state exists.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use crossbeam_queue::SegQueue;

use crate::api::config::ProfilerConfig;
use crate::api::stats::ThreadReport;
use crate::error::ConfigError;

static CONFIG: OnceLock<ProfilerConfig> = OnceLock::new();

static NEXT_THREAD: AtomicU64 = AtomicU64::new(0);

static REPORTS: OnceLock<SegQueue<ThreadReport>> = OnceLock::new();

/// Install the process-wide configuration.
///
/// Must run before any thread creates its profiling state; afterwards the
/// configuration is fixed and this returns [`ConfigError::AlreadyConfigured`].
pub fn configure(config: ProfilerConfig) -> Result<(), ConfigError> {
    CONFIG
        .set(config)
        .map_err(|_| ConfigError::AlreadyConfigured)
}

/// The active configuration, read from the environment if [`configure`] never ran.
pub(crate) fn config() -> &'static ProfilerConfig {
    CONFIG.get_or_init(ProfilerConfig::from_env)
}

/// Label for a new thread state: `<index>` or `<index>-<thread name>`.
pub(crate) fn next_thread_label() -> String {
    let index = NEXT_THREAD.fetch_add(1, Ordering::Relaxed);
    match std::thread::current().name() {
        Some(name) => format!("{}-{}", index, sanitize(name)),
        None => index.to_string(),
    }
}

/// Keep thread names usable as file stems.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn reports() -> &'static SegQueue<ThreadReport> {
    REPORTS.get_or_init(SegQueue::new)
}

pub(crate) fn publish_report(report: ThreadReport) {
    reports().push(report);
}

/// Take the reports of every thread finished since the last call.
pub fn drain_thread_reports() -> Vec<ThreadReport> {
    let queue = reports();
    let mut drained = Vec::with_capacity(queue.len());
    while let Some(report) = queue.pop() {
        drained.push(report);
    }
    drained
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("core::state::tests"), "core__state__tests");
        assert_eq!(sanitize("worker-1.io"), "worker-1.io");
    }

    #[test]
    fn test_labels_are_unique() {
        let first = next_thread_label();
        let second = next_thread_label();
        assert_ne!(first, second);
        assert!(first.split('-').next().unwrap().parse::<u64>().is_ok());
    }
}
