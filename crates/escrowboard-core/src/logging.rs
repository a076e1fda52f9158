//! Structured logging for escrowboard
//!
//! Events go to stderr, so stdout carries only command output. The stderr
//! layer is pretty (ANSI) or JSON lines; an optional log file gets the same
//! events in the same format without colors.
//!
//! ```ignore
//! use escrowboard_core::logging::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::default())?;
//! ```
//!
//! # Correlation Fields
//!
//! Spans and events use these names:
//! - `granularity`: chart granularity wire name
//! - `generation`: funds feed request generation
//! - `source`: series source (live, synthetic, snapshot)
//! - `url`, `status`: remote API request context

use std::fs::{File, OpenOptions};
use std::io;
#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use serde::{Deserialize, Serialize};
use tracing::{Level, Subscriber};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::time::SystemTime;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

pub use crate::config::LogFormat;

static INSTALLED: OnceLock<()> = OnceLock::new();

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

/// What `init_logging` installs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// trace, debug, info, warn or error. `RUST_LOG` wins when set.
    pub level: String,
    pub format: LogFormat,
    /// Extra destination, created 0600 (dir 0700) on unix.
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            file: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("logging already initialized")]
    AlreadyInitialized,

    #[error("unknown log level: {0}. Expected one of: trace, debug, info, warn, error")]
    InvalidLevel(String),

    #[error("failed to open log file {}: {source}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to install subscriber: {0}")]
    SetSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Parse a level name; `warning` is accepted for `warn`.
pub fn parse_level(raw: &str) -> Result<Level, LogError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" | "warning" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(LogError::InvalidLevel(raw.to_string())),
    }
}

/// Install the global subscriber. Only the first successful call per
/// process installs anything; later calls get `AlreadyInitialized`.
pub fn init_logging(config: &LogConfig) -> Result<(), LogError> {
    if INSTALLED.get().is_some() {
        return Err(LogError::AlreadyInitialized);
    }
    parse_level(&config.level)?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let mut layers = vec![stderr_layer(config.format)];
    if let Some(path) = &config.file {
        let file = open_log_file(path).map_err(|source| LogError::File {
            path: path.clone(),
            source,
        })?;
        layers.push(file_layer(file, config.format));
    }

    tracing::subscriber::set_global_default(
        tracing_subscriber::registry().with(filter).with(layers),
    )?;
    let _ = INSTALLED.set(());

    tracing::debug!(
        log_level = %config.level,
        log_format = %config.format,
        log_file = ?config.file,
        "Logging initialized"
    );
    Ok(())
}

fn stderr_layer<S>(format: LogFormat) -> BoxedLayer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    match format {
        LogFormat::Pretty => fmt::layer()
            .with_writer(io::stderr)
            .with_target(true)
            .boxed(),
        LogFormat::Json => json_layer(io::stderr),
    }
}

fn file_layer<S>(file: File, format: LogFormat) -> BoxedLayer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let writer = Mutex::new(file);
    match format {
        LogFormat::Pretty => fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_ansi(false)
            .boxed(),
        LogFormat::Json => json_layer(writer),
    }
}

/// One flat JSON object per event, with the current span's fields under
/// `span`.
fn json_layer<S, W>(writer: W) -> BoxedLayer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    fmt::layer()
        .json()
        .with_timer(SystemTime)
        .with_writer(writer)
        .with_target(true)
        .with_current_span(true)
        .with_span_list(false)
        .flatten_event(true)
        .boxed()
}

fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        if !dir.exists() {
            std::fs::create_dir_all(dir)?;
            #[cfg(unix)]
            std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700))?;
        }
    }

    let mut options = OpenOptions::new();
    options.create(true).append(true);
    #[cfg(unix)]
    options.mode(0o600);
    options.open(path)
}

/// Create a span carrying the feed correlation fields.
///
/// ```ignore
/// let span = escrowboard_core::feed_span!("load_funds", granularity = "month", generation = 3u64);
/// ```
#[macro_export]
macro_rules! feed_span {
    ($name:expr $(, $field:ident = $value:expr)* $(,)?) => {
        ::tracing::info_span!($name $(, $field = $value)*)
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// Shared in-memory sink for subscriber output.
    #[derive(Clone, Default)]
    struct MockLogWriter {
        buffer: Arc<Mutex<Vec<u8>>>,
    }

    impl MockLogWriter {
        fn contents(&self) -> String {
            String::from_utf8(self.buffer.lock().unwrap().clone()).unwrap()
        }

        fn first_json(&self) -> serde_json::Value {
            let output = self.contents();
            let line = output.lines().find(|l| !l.trim().is_empty()).unwrap();
            serde_json::from_str(line).unwrap()
        }
    }

    impl io::Write for MockLogWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.buffer.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for MockLogWriter {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn capture_json(writer: &MockLogWriter, body: impl FnOnce()) {
        let subscriber = tracing_subscriber::registry()
            .with(EnvFilter::new("debug"))
            .with(vec![json_layer(writer.clone())]);
        tracing::subscriber::with_default(subscriber, body);
    }

    #[test]
    fn level_names_parse() {
        assert_eq!(parse_level("trace").unwrap(), Level::TRACE);
        assert_eq!(parse_level(" Debug ").unwrap(), Level::DEBUG);
        assert_eq!(parse_level("INFO").unwrap(), Level::INFO);
        assert_eq!(parse_level("warning").unwrap(), Level::WARN);
        assert_eq!(parse_level("error").unwrap(), Level::ERROR);
    }

    #[test]
    fn unknown_level_lists_choices() {
        let err = parse_level("verbose").unwrap_err();
        assert!(matches!(err, LogError::InvalidLevel(ref raw) if raw == "verbose"));
        assert!(err.to_string().contains("trace, debug, info, warn, error"));
        assert!(parse_level("").is_err());
        assert!(parse_level("3").is_err());
    }

    #[test]
    fn init_rejects_bad_level_without_installing() {
        let config = LogConfig {
            level: "loud".to_string(),
            ..LogConfig::default()
        };
        assert!(matches!(
            init_logging(&config),
            Err(LogError::InvalidLevel(_))
        ));
        assert!(INSTALLED.get().is_none());
    }

    #[test]
    fn log_config_defaults_fill_missing_fields() {
        let config: LogConfig = serde_json::from_str(r#"{"format":"json"}"#).unwrap();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Json);
        assert!(config.file.is_none());
    }

    #[test]
    fn log_file_is_created_with_parents_and_appends() {
        use io::Write;

        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("logs").join("nested").join("eb.log");

        writeln!(open_log_file(&path).unwrap(), "first").unwrap();
        writeln!(open_log_file(&path).unwrap(), "second").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[cfg(unix)]
    #[test]
    fn log_file_and_new_dirs_are_private() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = tmp.path().join("logs");
        let path = dir.join("eb.log");
        open_log_file(&path).unwrap();

        let mode = |p: &Path| std::fs::metadata(p).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode(&dir), 0o700);
        assert_eq!(mode(&path), 0o600);
    }

    #[test]
    fn open_error_names_the_path() {
        let err = LogError::File {
            path: PathBuf::from("/var/log/eb.log"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(
            err.to_string(),
            "failed to open log file /var/log/eb.log: denied"
        );
    }

    #[test]
    fn json_events_carry_correlation_fields() {
        let writer = MockLogWriter::default();
        capture_json(&writer, || {
            tracing::info!(granularity = "month", generation = 3u64, "feed resolved");
        });

        let event = writer.first_json();
        assert!(event.get("timestamp").is_some());
        assert_eq!(event["granularity"], "month");
        assert_eq!(event["generation"], 3);
        assert_eq!(event["message"], "feed resolved");
    }

    #[test]
    fn feed_span_fields_reach_json_output() {
        let writer = MockLogWriter::default();
        capture_json(&writer, || {
            let span =
                crate::feed_span!("load_funds", granularity = "quarter", generation = 7u64);
            let _guard = span.enter();
            tracing::info!("inside span");
        });

        let event = writer.first_json();
        let span_field = |name: &str| event.pointer(&format!("/span/{name}")).cloned();
        assert_eq!(span_field("granularity"), Some("quarter".into()));
        assert_eq!(span_field("generation"), Some(7.into()));
        assert_eq!(span_field("name"), Some("load_funds".into()));
    }

    #[test]
    fn allocator_debug_event_is_structured() {
        let writer = MockLogWriter::default();
        capture_json(&writer, || {
            crate::PeriodAllocator::with_anchor_year(2025)
                .allocate(1_200_000.0, 900_000.0, crate::Granularity::Year)
                .unwrap();
        });

        let event = writer.first_json();
        assert_eq!(event["message"], "Synthesized period series");
        assert_eq!(event["granularity"], "year");
        assert_eq!(event["secured_total"], 1_200_000);
    }

    #[test]
    fn pretty_file_layer_writes_plain_text() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("eb.log");
        let file = open_log_file(&path).unwrap();

        let subscriber = tracing_subscriber::registry()
            .with(EnvFilter::new("info"))
            .with(vec![file_layer(file, LogFormat::Pretty)]);
        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(granularity = "year", "Funds fetch timed out; synthesizing");
        });

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("Funds fetch timed out; synthesizing"));
        assert!(text.contains("granularity=\"year\""));
        assert!(!text.contains("\x1b["));
    }

    #[test]
    fn debug_events_filtered_at_info() {
        let writer = MockLogWriter::default();
        let subscriber = tracing_subscriber::registry()
            .with(EnvFilter::new("info"))
            .with(vec![json_layer(writer.clone())]);
        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!("hidden");
            tracing::info!("shown");
        });

        let output = writer.contents();
        assert!(!output.contains("hidden"));
        assert!(output.contains("shown"));
    }
}
