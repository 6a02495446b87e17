//! Logging setup over `tracing-subscriber`.
//!
//! # Configuration-Based Initialization
//!
//! ```rust,ignore
//! use bronze_runtime::{config::load_config, logging};
//!
//! let config = load_config()?;
//! let _guard = logging::init_from_config(&config.logging);
//! ```
//!
//! # Manual Initialization
//!
//! ```rust,ignore
//! use bronze_runtime::logging::{LoggingBuilder, SpanEvents};
//!
//! let _guard = LoggingBuilder::new()
//!     .directive("bronze_framework=debug")
//!     .span_events(SpanEvents::LIFECYCLE)
//!     .init();
//! ```
//!
//! File output is written on a background thread; keep the returned
//! [`LoggingGuard`] alive until shutdown so buffered lines are flushed.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::config::{LogFormat, LogOutput, LogRotation, LoggingConfig, SpanEventConfig};

const DEFAULT_LOG_FILE: &str = "bronze.log";

/// Span lifecycle events to log.
///
/// Dispatch opens a `dispatch` span per message; [`SpanEvents::LIFECYCLE`]
/// shows when each one starts and how long it took.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpanEvents {
    pub new: bool,
    pub enter: bool,
    pub exit: bool,
    pub close: bool,
}

impl SpanEvents {
    pub const NONE: Self = Self {
        new: false,
        enter: false,
        exit: false,
        close: false,
    };

    /// Creation and close.
    pub const LIFECYCLE: Self = Self {
        new: true,
        enter: false,
        exit: false,
        close: true,
    };

    pub const FULL: Self = Self {
        new: true,
        enter: true,
        exit: true,
        close: true,
    };

    fn to_fmt_span(self) -> FmtSpan {
        let mut span = FmtSpan::NONE;
        if self.new {
            span |= FmtSpan::NEW;
        }
        if self.enter {
            span |= FmtSpan::ENTER;
        }
        if self.exit {
            span |= FmtSpan::EXIT;
        }
        if self.close {
            span |= FmtSpan::CLOSE;
        }
        span
    }
}

impl From<&SpanEventConfig> for SpanEvents {
    fn from(config: &SpanEventConfig) -> Self {
        Self {
            new: config.new,
            enter: config.enter,
            exit: config.exit,
            close: config.close,
        }
    }
}

/// Keeps the background log writer alive. Dropping it flushes pending
/// lines.
#[must_use = "dropping the guard stops file logging"]
#[derive(Debug, Default)]
pub struct LoggingGuard {
    _worker: Option<WorkerGuard>,
}

/// Initializes logging from configuration, ignoring an already installed
/// subscriber.
pub fn init_from_config(config: &LoggingConfig) -> LoggingGuard {
    LoggingBuilder::from_config(config).init()
}

/// A builder for the global subscriber.
#[derive(Debug, Clone)]
pub struct LoggingBuilder {
    level: tracing::Level,
    directives: Vec<String>,
    span_events: SpanEvents,
    format: LogFormat,
    output: LogOutput,
    with_target: bool,
    with_thread_ids: bool,
    with_location: bool,
    file_path: Option<PathBuf>,
    rotation: LogRotation,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggingBuilder {
    pub fn new() -> Self {
        Self {
            level: tracing::Level::INFO,
            directives: Vec::new(),
            span_events: SpanEvents::NONE,
            format: LogFormat::Compact,
            output: LogOutput::Stdout,
            with_target: true,
            with_thread_ids: false,
            with_location: false,
            file_path: None,
            rotation: LogRotation::Never,
        }
    }

    pub fn from_config(config: &LoggingConfig) -> Self {
        let mut builder = Self::new()
            .with_level(config.level.to_tracing_level())
            .span_events(SpanEvents::from(&config.span_events))
            .format(config.format)
            .output(config.output)
            .with_thread_ids(config.thread_ids)
            .with_location(config.file_location)
            .rotation(config.rotation);
        builder.file_path.clone_from(&config.file_path);

        // Sorted so the filter is the same on every start.
        let mut filters: Vec<_> = config.filters.iter().collect();
        filters.sort_by(|a, b| a.0.cmp(b.0));
        for (module, level) in filters {
            builder = builder.directive(format!("{module}={level}"));
        }
        builder
    }

    pub fn with_level(mut self, level: tracing::Level) -> Self {
        self.level = level;
        self
    }

    /// Adds an `EnvFilter` directive such as `bronze_core=trace`.
    pub fn directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    pub fn span_events(mut self, events: SpanEvents) -> Self {
        self.span_events = events;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    pub fn with_target(mut self, enabled: bool) -> Self {
        self.with_target = enabled;
        self
    }

    pub fn with_thread_ids(mut self, enabled: bool) -> Self {
        self.with_thread_ids = enabled;
        self
    }

    /// Include source file and line number.
    pub fn with_location(mut self, enabled: bool) -> Self {
        self.with_location = enabled;
        self
    }

    /// Writes to this file; implies [`LogOutput::File`].
    pub fn file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self.output = LogOutput::File;
        self
    }

    pub fn rotation(mut self, rotation: LogRotation) -> Self {
        self.rotation = rotation;
        self
    }

    /// The filter: `RUST_LOG` when set, otherwise the base level, plus every
    /// directive that parses.
    pub fn build_filter(&self) -> EnvFilter {
        let base = self.level.to_string().to_lowercase();
        let mut filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&base));

        for directive in &self.directives {
            match directive.parse::<Directive>() {
                Ok(d) => filter = filter.add_directive(d),
                Err(e) => eprintln!("Ignoring invalid log directive {directive:?}: {e}"),
            }
        }
        filter
    }

    /// Installs the subscriber; an existing global subscriber wins.
    pub fn init(self) -> LoggingGuard {
        self.try_init().unwrap_or_default()
    }

    /// Installs the subscriber, failing if one is already set.
    pub fn try_init(self) -> Result<LoggingGuard, TryInitError> {
        let filter = self.build_filter();
        let (writer, worker, fallback) = self.make_writer();
        let layer = self.layer(writer);

        tracing_subscriber::registry()
            .with(layer)
            .with(filter)
            .try_init()?;

        if let Some(reason) = fallback {
            warn!(reason = %reason, "File output unavailable, falling back to stdout");
        }
        #[cfg(not(feature = "json-log"))]
        if self.format == LogFormat::Json {
            warn!("JSON logging needs the `json-log` feature, using the full format");
        }

        Ok(LoggingGuard { _worker: worker })
    }

    /// The writer, its background guard, and why file output fell back to
    /// stdout if it did.
    fn make_writer(&self) -> (BoxMakeWriter, Option<WorkerGuard>, Option<String>) {
        let path = match (self.output, &self.file_path) {
            (LogOutput::Stdout, _) => return (BoxMakeWriter::new(std::io::stdout), None, None),
            (LogOutput::Stderr, _) => return (BoxMakeWriter::new(std::io::stderr), None, None),
            (LogOutput::File, Some(path)) => path,
            (LogOutput::File, None) => {
                let reason = "no file path configured".to_string();
                return (BoxMakeWriter::new(std::io::stdout), None, Some(reason));
            }
        };

        let (directory, file_name) = split_log_path(path);
        let appender = RollingFileAppender::builder()
            .rotation(rotation(self.rotation))
            .filename_prefix(file_name.to_string_lossy())
            .build(directory);
        match appender {
            Ok(appender) => {
                let (writer, guard) = tracing_appender::non_blocking(appender);
                (BoxMakeWriter::new(writer), Some(guard), None)
            }
            Err(e) => (BoxMakeWriter::new(std::io::stdout), None, Some(e.to_string())),
        }
    }

    fn layer(&self, writer: BoxMakeWriter) -> Box<dyn Layer<Registry> + Send + Sync> {
        let span_events = self.span_events.to_fmt_span();

        #[cfg(feature = "json-log")]
        if self.format == LogFormat::Json {
            return fmt::layer()
                .json()
                .with_span_events(span_events)
                .with_writer(writer)
                .boxed();
        }

        let layer = fmt::layer()
            .with_writer(writer)
            .with_span_events(span_events)
            .with_target(self.with_target)
            .with_thread_ids(self.with_thread_ids)
            .with_file(self.with_location)
            .with_line_number(self.with_location);
        match self.format {
            LogFormat::Compact => layer.compact().boxed(),
            LogFormat::Pretty => layer.pretty().boxed(),
            LogFormat::Full | LogFormat::Json => layer.boxed(),
        }
    }
}

fn rotation(rotation: LogRotation) -> Rotation {
    match rotation {
        LogRotation::Never => Rotation::NEVER,
        LogRotation::Hourly => Rotation::HOURLY,
        LogRotation::Daily => Rotation::DAILY,
    }
}

fn split_log_path(path: &Path) -> (&Path, &OsStr) {
    let directory = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .unwrap_or_else(|| OsStr::new(DEFAULT_LOG_FILE));
    (directory, file_name)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn test_span_events_flags() {
        assert_eq!(SpanEvents::NONE.to_fmt_span(), FmtSpan::NONE);
        assert_eq!(
            SpanEvents::LIFECYCLE.to_fmt_span(),
            FmtSpan::NEW | FmtSpan::CLOSE
        );
        let config = SpanEventConfig {
            enter: true,
            exit: true,
            ..Default::default()
        };
        assert_eq!(SpanEvents::from(&config).to_fmt_span(), FmtSpan::ACTIVE);
    }

    #[test]
    fn test_builder_from_config() {
        let config = LoggingConfig {
            level: LogLevel::Warn,
            format: LogFormat::Pretty,
            file_location: true,
            filters: HashMap::from([
                ("bronze_framework".to_string(), LogLevel::Trace),
                ("bronze_core".to_string(), LogLevel::Debug),
            ]),
            ..Default::default()
        };
        let builder = LoggingBuilder::from_config(&config);
        assert_eq!(builder.level, tracing::Level::WARN);
        assert_eq!(builder.format, LogFormat::Pretty);
        assert!(builder.with_location);
        assert_eq!(
            builder.directives,
            vec!["bronze_core=debug", "bronze_framework=trace"]
        );
    }

    #[test]
    fn test_file_path_switches_output() {
        let builder = LoggingBuilder::new().file_path("logs/bot.log");
        assert_eq!(builder.output, LogOutput::File);
        assert_eq!(
            split_log_path(builder.file_path.as_deref().unwrap()),
            (Path::new("logs"), OsStr::new("bot.log"))
        );
        assert_eq!(
            split_log_path(Path::new("bot.log")),
            (Path::new("."), OsStr::new("bot.log"))
        );
    }
}
