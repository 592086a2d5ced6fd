//! # Logger
//!
//! Installs the global `tracing` subscriber for arbor binaries. Library crates only
//! emit events; the binary calls [`LoggerBuilder::init`] once at startup and keeps the
//! returned [`Logger`] until it exits.
//!
//! Console output goes to **stderr**, leaving stdout to the tool's JSON. A log file,
//! when configured, receives the same events as JSON lines through a non-blocking
//! writer that is flushed when the [`Logger`] is dropped.
//!
//! ```rust
//! use arbor_logger::{ConsoleFormat, LevelFilter, Logger};
//!
//! let _logger = Logger::builder()
//!     .console(ConsoleFormat::Compact)
//!     .level(LevelFilter::DEBUG)
//!     .env_filter("arbor=trace,arbor_events=debug")
//!     .init()
//!     .unwrap();
//! ```

mod error;

pub use crate::error::{LoggerError, LoggerErrorExt};
pub use tracing::level_filters::LevelFilter;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// Line format of the console output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsoleFormat {
    /// Single-line, coloured.
    #[default]
    Compact,
    /// One JSON object per event.
    Json,
}

/// Configures the subscriber. Obtained from [`Logger::builder`].
#[derive(Debug)]
pub struct LoggerBuilder {
    level: LevelFilter,
    directives: Option<String>,
    console: Option<ConsoleFormat>,
    file: Option<PathBuf>,
}

impl LoggerBuilder {
    /// Default level for targets without a directive.
    #[must_use]
    pub const fn level(mut self, level: LevelFilter) -> Self {
        self.level = level;
        self
    }

    /// Filter directives such as `arbor=trace`. Without them `RUST_LOG` is read.
    #[must_use]
    pub fn env_filter(mut self, directives: impl Into<String>) -> Self {
        self.directives = Some(directives.into());
        self
    }

    /// Writes to stderr in `format`. Console output is on by default.
    #[must_use]
    pub const fn console(mut self, format: ConsoleFormat) -> Self {
        self.console = Some(format);
        self
    }

    #[must_use]
    pub const fn without_console(mut self) -> Self {
        self.console = None;
        self
    }

    /// Also appends JSON lines to the file at `path`, creating its directory.
    #[must_use]
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Installs the subscriber.
    ///
    /// # Errors
    /// * [`LoggerError::InvalidConfiguration`] for malformed directives, a file path
    ///   without a file name, or when neither console nor file output is enabled;
    /// * [`LoggerError::Io`] or [`LoggerError::Appender`] when the log file cannot be
    ///   opened;
    /// * [`LoggerError::Subscriber`] when a global subscriber is already installed.
    pub fn init(self) -> Result<Logger, LoggerError> {
        if self.console.is_none() && self.file.is_none() {
            return Err(LoggerError::InvalidConfiguration {
                message: "Neither console nor file output is enabled".into(),
                context: None,
            });
        }
        let filter = self.filter()?;

        let console = self.console.map(|format| {
            let layer = fmt::layer().with_writer(io::stderr);
            match format {
                ConsoleFormat::Compact => layer.compact().with_ansi(true).boxed(),
                ConsoleFormat::Json => layer.json().with_ansi(false).boxed(),
            }
        });

        let (file, guard) = match &self.file {
            Some(path) => {
                let (writer, guard) = open_file(path)?;
                (Some(fmt::layer().json().with_ansi(false).with_writer(writer)), Some(guard))
            },
            None => (None, None),
        };

        tracing_subscriber::registry().with(filter).with(console).with(file).try_init()?;

        Ok(Logger { guard })
    }

    fn filter(&self) -> Result<EnvFilter, LoggerError> {
        let builder = EnvFilter::builder().with_default_directive(self.level.into());
        let Some(directives) = &self.directives else {
            return Ok(builder.from_env_lossy());
        };
        builder.parse(directives).map_err(|err| LoggerError::InvalidConfiguration {
            message: format!("Invalid filter '{directives}': {err}").into(),
            context: None,
        })
    }
}

fn open_file(path: &Path) -> Result<(NonBlocking, WorkerGuard), LoggerError> {
    let name = path.file_name().ok_or_else(|| LoggerError::InvalidConfiguration {
        message: format!("'{}' does not name a file", path.display()).into(),
        context: None,
    })?;
    let dir = path.parent().filter(|dir| !dir.as_os_str().is_empty()).unwrap_or(Path::new("."));
    fs::create_dir_all(dir).context(dir.display().to_string())?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(name.to_string_lossy())
        .build(dir)
        .context(path.display().to_string())?;
    Ok(tracing_appender::non_blocking(appender))
}

/// The installed subscriber. Dropping it flushes the log file.
#[must_use = "dropping the logger stops file output"]
#[derive(Debug)]
pub struct Logger {
    guard: Option<WorkerGuard>,
}

impl Logger {
    /// Console output at `INFO`, no file.
    #[must_use]
    pub const fn builder() -> LoggerBuilder {
        LoggerBuilder {
            level: LevelFilter::INFO,
            directives: None,
            console: Some(ConsoleFormat::Compact),
            file: None,
        }
    }

    /// Whether events are also written to a file.
    #[must_use]
    pub const fn writes_file(&self) -> bool {
        self.guard.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_to_compact_console() {
        let builder = Logger::builder();
        assert_eq!(builder.console, Some(ConsoleFormat::Compact));
        assert_eq!(builder.level, LevelFilter::INFO);
        assert!(builder.file.is_none());

        let builder = builder.without_console().file("logs/arbor.log").env_filter("arbor=debug");
        assert!(builder.console.is_none());
        assert_eq!(builder.file.as_deref(), Some(Path::new("logs/arbor.log")));
        assert_eq!(builder.directives.as_deref(), Some("arbor=debug"));
    }

    #[test]
    fn invalid_settings_fail_before_install() {
        let err = Logger::builder().without_console().init().unwrap_err();
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));

        let err = Logger::builder().env_filter("arbor=verbose").init().unwrap_err();
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));

        let err = Logger::builder().file("/").init().unwrap_err();
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }), "{err}");
    }
}
