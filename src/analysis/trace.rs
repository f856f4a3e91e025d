//! One persisted log file.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::api::record::Record;
use crate::error::AnalysisError;
use crate::util::time::Timestamp;

/// Parsed contents of one `<direction>/<thread>.json` file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TraceLog {
    /// Records in the order they were written.
    #[serde(rename = "values")]
    pub records: Vec<Record>,

    /// Scope names by hash.
    pub scopes: BTreeMap<u64, String>,

    /// Type names by hash.
    pub types: BTreeMap<u64, String>,

    /// Creation time of the thread state.
    pub start_ts: Timestamp,
}

impl TraceLog {
    /// Read and parse a log file.
    pub fn load(path: &Path) -> Result<Self, AnalysisError> {
        let text = fs::read_to_string(path).map_err(|source| AnalysisError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| AnalysisError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Name of a scope hash.
    pub fn scope_name(&self, hash: u64) -> Option<&str> {
        self.scopes.get(&hash).map(String::as_str)
    }

    /// Name of a type hash.
    pub fn type_name(&self, hash: u64) -> Option<&str> {
        self.types.get(&hash).map(String::as_str)
    }

    /// `(start_ts, last event timestamp)`, if there are events.
    pub fn time_span(&self) -> Option<(Timestamp, Timestamp)> {
        let last = self.records.iter().map(Record::timestamp).max()?;
        Some((self.start_ts, last))
    }

    /// Lowest block address and the end of the highest block, if there are events.
    pub fn address_span(&self) -> Option<(usize, usize)> {
        let low = self.records.iter().map(Record::location).min()?;
        let high = self
            .records
            .iter()
            .map(|r| r.location().saturating_add(r.size()))
            .max()?;
        Some((low, high))
    }

    /// Sum of the sizes of all records.
    pub fn total_bytes(&self) -> u64 {
        self.records.iter().map(|r| r.size() as u64).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{"values":[
{"ts":10,"sh":0,"th":7,"s":8,"l":4096},
{"ts":12,"sh":5,"th":7,"s":16,"l":8192}
],"scopes":{"0":"global","5":"io"},"types":{"7":"u64"},"start_ts":3}"#;

    #[test]
    fn test_parses_trace_format() {
        let trace: TraceLog = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(trace.records.len(), 2);
        assert_eq!(trace.records[1].scope_hash(), 5);
        assert_eq!(trace.scope_name(5), Some("io"));
        assert_eq!(trace.type_name(7), Some("u64"));
        assert_eq!(trace.start_ts, 3);
    }

    #[test]
    fn test_spans() {
        let trace: TraceLog = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(trace.time_span(), Some((3, 12)));
        assert_eq!(trace.address_span(), Some((4096, 8208)));
        assert_eq!(trace.total_bytes(), 24);
    }

    #[test]
    fn test_load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{").unwrap();

        match TraceLog::load(&path) {
            Err(AnalysisError::Json { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(matches!(
            TraceLog::load(&dir.path().join("missing.json")),
            Err(AnalysisError::Io { .. })
        ));
    }
}
