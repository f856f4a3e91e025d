//! Profiler configuration.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use crate::collections::DEFAULT_BUCKETS;
use crate::error::{ConfigError, SinkError};
use crate::util::size::kb;
use crate::writer::{Writer, WriterContext};

/// Builds the writer for one direction of one thread.
pub type WriterFactory =
    Arc<dyn Fn(&WriterContext<'_>) -> Result<Box<dyn Writer>, SinkError> + Send + Sync>;

/// Where events go.
#[derive(Clone, Default)]
pub enum SinkKind {
    /// One JSON file per thread and direction under the run directory.
    #[default]
    Json,
    /// Events are accepted and thrown away.
    Discard,
    /// Writers built by a user-supplied factory.
    Custom(WriterFactory),
}

impl fmt::Debug for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkKind::Json => f.write_str("Json"),
            SinkKind::Discard => f.write_str("Discard"),
            SinkKind::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl FromStr for SinkKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(SinkKind::Json),
            "discard" | "none" => Ok(SinkKind::Discard),
            _ => Err(ConfigError::InvalidValue {
                key: ENV_SINK,
                value: s.to_string(),
            }),
        }
    }
}

/// Environment variable overriding [`ProfilerConfig::output_dir`].
pub const ENV_OUTPUT_DIR: &str = "ERATA_OUTPUT_DIR";
/// Environment variable overriding [`ProfilerConfig::sink`] (`json` or `discard`).
pub const ENV_SINK: &str = "ERATA_SINK";
/// Environment variable overriding [`ProfilerConfig::registry_buckets`].
pub const ENV_REGISTRY_BUCKETS: &str = "ERATA_REGISTRY_BUCKETS";
/// Environment variable overriding [`ProfilerConfig::buffer_capacity`].
pub const ENV_BUFFER_BYTES: &str = "ERATA_BUFFER_BYTES";

/// Process-wide configuration, installed with [`configure`](crate::configure).
#[derive(Debug, Clone)]
pub struct ProfilerConfig {
    /// Run directory of the JSON sink (default: `erata`)
    pub output_dir: PathBuf,

    /// Sink used for every thread (default: JSON files)
    pub sink: SinkKind,

    /// Fixed bucket count of the scope and type registries (default: 128)
    pub registry_buckets: usize,

    /// Write buffer of each JSON file (default: 64 KB)
    pub buffer_capacity: usize,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("erata"),
            sink: SinkKind::Json,
            registry_buckets: DEFAULT_BUCKETS,
            buffer_capacity: kb(64),
        }
    }
}

impl ProfilerConfig {
    /// Defaults overridden by `ERATA_*` environment variables.
    ///
    /// Invalid values are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok(), false).unwrap_or_default()
    }

    /// Like [`from_env`](Self::from_env), but fails on the first invalid value.
    pub fn try_from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok(), true)
    }

    fn from_lookup<F>(lookup: F, strict: bool) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup(ENV_OUTPUT_DIR) {
            config.output_dir = PathBuf::from(dir);
        }
        if let Some(sink) = lookup(ENV_SINK) {
            match sink.parse() {
                Ok(sink) => config.sink = sink,
                Err(err) => reject(err, strict)?,
            }
        }
        if let Some(buckets) = lookup(ENV_REGISTRY_BUCKETS) {
            match parse_positive(ENV_REGISTRY_BUCKETS, &buckets) {
                Ok(buckets) => config.registry_buckets = buckets,
                Err(err) => reject(err, strict)?,
            }
        }
        if let Some(bytes) = lookup(ENV_BUFFER_BYTES) {
            match parse_positive(ENV_BUFFER_BYTES, &bytes) {
                Ok(bytes) => config.buffer_capacity = bytes,
                Err(err) => reject(err, strict)?,
            }
        }

        Ok(config)
    }

    /// Set the run directory of the JSON sink.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Set the sink.
    pub fn with_sink(mut self, sink: SinkKind) -> Self {
        self.sink = sink;
        self
    }

    /// Use writers built by `factory`.
    pub fn with_writer_factory<F>(self, factory: F) -> Self
    where
        F: Fn(&WriterContext<'_>) -> Result<Box<dyn Writer>, SinkError> + Send + Sync + 'static,
    {
        self.with_sink(SinkKind::Custom(Arc::new(factory)))
    }

    /// Set the bucket count of both registries.
    pub fn with_registry_buckets(mut self, buckets: usize) -> Self {
        self.registry_buckets = buckets.max(1);
        self
    }

    /// Set the write buffer size of JSON files.
    pub fn with_buffer_capacity(mut self, bytes: usize) -> Self {
        self.buffer_capacity = bytes;
        self
    }
}

fn parse_positive(key: &'static str, value: &str) -> Result<usize, ConfigError> {
    match value.trim().parse::<usize>() {
        Ok(parsed) if parsed > 0 => Ok(parsed),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}

fn reject(err: ConfigError, strict: bool) -> Result<(), ConfigError> {
    if strict {
        return Err(err);
    }
    log::warn!("{}, keeping the default", err);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&'static str, &str)]) -> impl Fn(&'static str) -> Option<String> {
        let vars: HashMap<&'static str, String> =
            vars.iter().map(|(k, v)| (*k, v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ProfilerConfig::default();
        assert_eq!(config.output_dir, PathBuf::from("erata"));
        assert!(matches!(config.sink, SinkKind::Json));
        assert_eq!(config.registry_buckets, 128);
        assert_eq!(config.buffer_capacity, 64 * 1024);
    }

    #[test]
    fn test_reads_overrides() {
        let config = ProfilerConfig::from_lookup(
            lookup(&[
                (ENV_OUTPUT_DIR, "/tmp/trace"),
                (ENV_SINK, "Discard"),
                (ENV_REGISTRY_BUCKETS, "16"),
                (ENV_BUFFER_BYTES, "4096"),
            ]),
            true,
        )
        .unwrap();

        assert_eq!(config.output_dir, PathBuf::from("/tmp/trace"));
        assert!(matches!(config.sink, SinkKind::Discard));
        assert_eq!(config.registry_buckets, 16);
        assert_eq!(config.buffer_capacity, 4096);
    }

    #[test]
    fn test_invalid_values() {
        let vars = [(ENV_REGISTRY_BUCKETS, "zero"), (ENV_SINK, "json")];

        let lenient = ProfilerConfig::from_lookup(lookup(&vars), false).unwrap();
        assert_eq!(lenient.registry_buckets, DEFAULT_BUCKETS);

        let strict = ProfilerConfig::from_lookup(lookup(&vars), true);
        assert_eq!(
            strict.unwrap_err(),
            ConfigError::InvalidValue {
                key: ENV_REGISTRY_BUCKETS,
                value: "zero".to_string(),
            }
        );
    }

    #[test]
    fn test_sink_kind_parsing() {
        assert!(matches!("json".parse::<SinkKind>(), Ok(SinkKind::Json)));
        assert!(matches!(" NONE ".parse::<SinkKind>(), Ok(SinkKind::Discard)));
        assert!("socket".parse::<SinkKind>().is_err());
    }

    #[test]
    fn test_builder() {
        let config = ProfilerConfig::default()
            .with_output_dir("runs/1")
            .with_registry_buckets(0)
            .with_buffer_capacity(512)
            .with_writer_factory(|_| Ok(Box::new(crate::writer::NullWriter::new())));

        assert_eq!(config.output_dir, PathBuf::from("runs/1"));
        assert_eq!(config.registry_buckets, 1);
        assert_eq!(config.buffer_capacity, 512);
        assert_eq!(format!("{:?}", config.sink), "Custom(..)");
    }
}
