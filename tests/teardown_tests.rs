//! Sink failures during recording and teardown are reported, never propagated.

use std::sync::Mutex;
use std::thread;

use log::{Level, LevelFilter, Log, Metadata};

use erata::{
    drain_thread_reports, finish_thread, init_thread, with_state, MemoryWriter, NullWriter,
    ProfileAllocator, ProfilerConfig, SinkKind,
};

static LINES: Mutex<Vec<String>> = Mutex::new(Vec::new());

struct CaptureLog;

impl Log for CaptureLog {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= Level::Warn
    }

    fn log(&self, record: &log::Record<'_>) {
        if self.enabled(record.metadata()) {
            if let Ok(mut lines) = LINES.lock() {
                lines.push(record.args().to_string());
            }
        }
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLog = CaptureLog;

fn setup() {
    let _ = erata::configure(ProfilerConfig::default().with_sink(SinkKind::Discard));
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(LevelFilter::Warn);
}

fn logged(code: &str, containing: &str) -> usize {
    let tag = format!("[{}]", code);
    LINES
        .lock()
        .unwrap()
        .iter()
        .filter(|line| line.starts_with(&tag) && line.contains(containing))
        .count()
}

#[test]
fn test_failed_end_on_finish_thread() {
    setup();
    let label = thread::Builder::new()
        .name("end-fails".to_string())
        .spawn(|| {
            let writer = MemoryWriter::new();
            let view = writer.view();
            view.reject_end(true);
            init_thread(writer, NullWriter::new()).unwrap();

            let alloc = ProfileAllocator::<u32>::new();
            let ptr = alloc.allocate(2).unwrap();
            unsafe { alloc.deallocate(ptr, 2) };

            let report = finish_thread().unwrap();
            assert!(!report.flushed);
            assert_eq!(report.stats.allocations, 1);
            assert_eq!(report.stats.deallocations, 1);
            assert!(view.is_ended());
            report.thread
        })
        .unwrap()
        .join()
        .unwrap();

    assert_eq!(logged("ER202", &format!("alloc log of thread {}: ", label)), 1);
    assert_eq!(logged("ER202", &format!("dealloc log of thread {}: ", label)), 0);
}

#[test]
fn test_failed_end_at_thread_exit() {
    setup();
    thread::Builder::new()
        .name("end-fails-on-exit".to_string())
        .spawn(|| {
            let writer = MemoryWriter::new();
            writer.view().reject_end(true);
            init_thread(NullWriter::new(), writer).unwrap();

            let alloc = ProfileAllocator::<u8>::new();
            let ptr = alloc.allocate(8).unwrap();
            unsafe { alloc.deallocate(ptr, 8) };
        })
        .unwrap()
        .join()
        .unwrap();

    let reports = drain_thread_reports();
    let report = reports
        .iter()
        .find(|report| report.thread.ends_with("-end-fails-on-exit"))
        .expect("exited thread must publish its report");
    assert!(!report.flushed);
    assert_eq!(report.stats.bytes_deallocated, 8);
    assert_eq!(
        logged("ER202", &format!("dealloc log of thread {}: ", report.thread)),
        1
    );
}

#[test]
fn test_dropped_events_warn_once_per_thread() {
    setup();
    let rejecting = || {
        let writer = MemoryWriter::new();
        writer.view().reject_writes(true);
        init_thread(writer, NullWriter::new()).unwrap();

        let alloc = ProfileAllocator::<u64>::new();
        for _ in 0..5 {
            let ptr = alloc.allocate(1).unwrap();
            unsafe { alloc.deallocate(ptr, 1) };
        }
        assert_eq!(with_state(|state| state.stats().dropped_events).unwrap(), 5);
        assert_eq!(with_state(|state| state.stats().deallocations).unwrap(), 5);
    };

    thread::spawn(rejecting).join().unwrap();
    assert_eq!(logged("ER201", "writes disabled"), 1);

    thread::spawn(rejecting).join().unwrap();
    assert_eq!(logged("ER201", "writes disabled"), 2);
}
