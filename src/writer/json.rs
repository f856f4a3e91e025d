//! File-backed JSON sink.
//!
//! Layout of a run:
//!
//! ```text
//! <output_dir>/alloc/<thread>.json
//! <output_dir>/dealloc/<thread>.json
//! ```
//!
//! Each file is one JSON object: the `values` array of records, then the
//! `scopes` and `types` registries and `start_ts`.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::api::record::Record;
use crate::core::registry::{ScopeRegistry, TypeRegistry};
use crate::error::SinkError;
use crate::util::size::kb;
use crate::util::time::Timestamp;

use super::Writer;

/// Outcome of claiming the run directory, shared by all threads.
static RUN_DIR: OnceLock<Result<PathBuf, io::ErrorKind>> = OnceLock::new();

/// Create the run directory once per process.
///
/// Fails with [`SinkError::AlreadyExists`] if the directory was there before the
/// first claim. Every later call returns the outcome of the first one.
pub(crate) fn claim_run_dir(dir: &Path) -> Result<PathBuf, SinkError> {
    let claimed = RUN_DIR.get_or_init(|| {
        if let Some(parent) = dir.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| err.kind())?;
        }
        fs::create_dir(dir).map_err(|err| err.kind())?;
        log::debug!("claimed run directory {}", dir.display());
        Ok(dir.to_path_buf())
    });

    match claimed {
        Ok(path) => Ok(path.clone()),
        Err(io::ErrorKind::AlreadyExists) => Err(SinkError::AlreadyExists(dir.to_path_buf())),
        Err(kind) => Err(SinkError::Io(io::Error::from(*kind))),
    }
}

/// Framing of one log over any output.
///
/// Every frame is built in `frame` and handed to the output in a single `write_all`.
/// After the first failed write the stream is broken and never touches the output again.
#[derive(Debug)]
struct JsonStream<W: Write> {
    out: W,
    frame: Vec<u8>,
    written: u64,
    broken: bool,
}

impl<W: Write> JsonStream<W> {
    fn begin(out: W) -> Result<Self, SinkError> {
        let mut stream = Self {
            out,
            frame: Vec::with_capacity(128),
            written: 0,
            broken: false,
        };
        stream.frame.extend_from_slice(b"{\"values\":[");
        stream.commit()?;
        Ok(stream)
    }

    fn append(&mut self, record: &Record) -> Result<(), SinkError> {
        self.ensure_intact()?;
        self.frame.clear();
        if self.written > 0 {
            self.frame.push(b',');
        }
        self.frame.push(b'\n');
        serde_json::to_writer(&mut self.frame, record)?;
        self.commit()?;
        self.written += 1;
        Ok(())
    }

    fn finish(
        &mut self,
        start_ts: Timestamp,
        scopes: &ScopeRegistry,
        types: &TypeRegistry,
    ) -> Result<(), SinkError> {
        self.ensure_intact()?;
        self.frame.clear();
        self.frame.extend_from_slice(b"\n],\"scopes\":");
        serde_json::to_writer(&mut self.frame, scopes)?;
        self.frame.extend_from_slice(b",\"types\":");
        serde_json::to_writer(&mut self.frame, types)?;
        write!(self.frame, ",\"start_ts\":{}}}\n", start_ts)?;
        self.commit()?;
        let flushed = self.out.flush();
        flushed.map_err(|err| self.break_on(err))
    }

    fn ensure_intact(&self) -> Result<(), SinkError> {
        if self.broken {
            return Err(SinkError::Rejected(
                "log is incomplete after an earlier write failure".to_string(),
            ));
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<(), SinkError> {
        let written = self.out.write_all(&self.frame);
        written.map_err(|err| self.break_on(err))
    }

    fn break_on(&mut self, err: io::Error) -> SinkError {
        self.broken = true;
        SinkError::Io(err)
    }
}

/// Writes one thread and direction of a run as a JSON file.
#[derive(Debug)]
pub struct JsonFileWriter {
    run_dir: PathBuf,
    file_stem: String,
    buffer_capacity: usize,
    path: Option<PathBuf>,
    out: Option<JsonStream<BufWriter<File>>>,
    written: u64,
    ended: bool,
}

impl JsonFileWriter {
    /// Writer for `<run_dir>/<tag>/<file_stem>.json`; the tag comes from `setup`.
    pub fn new(run_dir: impl Into<PathBuf>, file_stem: impl Into<String>) -> Self {
        Self {
            run_dir: run_dir.into(),
            file_stem: file_stem.into(),
            buffer_capacity: kb(64),
            path: None,
            out: None,
            written: 0,
            ended: false,
        }
    }

    /// Set the write buffer size.
    pub fn with_buffer_capacity(mut self, bytes: usize) -> Self {
        self.buffer_capacity = bytes;
        self
    }

    /// Path of the file, once set up.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of records written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    fn open(&self, path: &Path) -> Result<File, SinkError> {
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|err| match err.kind() {
                io::ErrorKind::AlreadyExists => SinkError::AlreadyExists(path.to_path_buf()),
                _ => SinkError::Io(err),
            })
    }
}

impl Writer for JsonFileWriter {
    fn setup(&mut self, tag: &str) -> Result<(), SinkError> {
        if self.out.is_some() || self.ended {
            return Err(SinkError::AlreadySetUp);
        }

        let dir = self.run_dir.join(tag);
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{}.json", self.file_stem));

        let file = self.open(&path)?;
        let stream = JsonStream::begin(BufWriter::with_capacity(self.buffer_capacity, file))?;

        log::debug!("opened {}", path.display());
        self.path = Some(path);
        self.out = Some(stream);
        Ok(())
    }

    fn write(&mut self, record: &Record) -> Result<(), SinkError> {
        let stream = self.out.as_mut().ok_or(SinkError::NotSetUp)?;
        stream.append(record)?;
        self.written += 1;
        Ok(())
    }

    fn end(
        &mut self,
        start_ts: Timestamp,
        scopes: &ScopeRegistry,
        types: &TypeRegistry,
    ) -> Result<(), SinkError> {
        let mut stream = self.out.take().ok_or(SinkError::NotSetUp)?;
        self.ended = true;

        let finished = stream.finish(start_ts, scopes, types);
        if stream.broken {
            // Unflushed bytes of a broken log are discarded, not flushed on drop.
            let _ = stream.out.into_parts();
        }
        finished
    }
}
