//! Logging setup for the binaries.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Which binary is logging; selects the log file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    AlertAction,
    RestHandler,
}

impl LogTarget {
    #[must_use]
    pub const fn file_name(&self) -> &'static str {
        match self {
            Self::AlertAction => "puppetenterprise_itsi.log",
            Self::RestHandler => "puppetenterprise_itsi_rest.log",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    /// `json` (any case) selects JSON; anything else is text.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Text
        }
    }
}

/// Install the global subscriber.
///
/// Logs go to `<log_dir>/<target file>` when `log_dir` is set, otherwise to
/// stderr. The returned guard must be held until exit so buffered file output
/// is flushed.
pub fn init(
    target: LogTarget,
    verbose: bool,
    log_dir: Option<&Path>,
    format: LogFormat,
) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    let (writer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::never(dir, target.file_name());
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(writer), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stderr), None),
    };

    let layer = match format {
        LogFormat::Json => fmt::layer().json().with_writer(writer).boxed(),
        LogFormat::Text => fmt::layer()
            .with_target(false)
            .with_ansi(log_dir.is_none())
            .with_writer(writer)
            .boxed(),
    };

    tracing_subscriber::registry().with(layer).with(filter).init();

    guard
}
