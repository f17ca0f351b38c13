use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};

/// Filter directives: `RUST_LOG` when set, else the configured level
fn filter_directives(config: &LoggingConfig, rust_log: Option<String>) -> String {
    rust_log
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| config.level.clone())
}

/// Install the global subscriber: stdout plus a daily file under
/// `config.dir`. Keep the returned guard alive so buffered file lines are
/// flushed on shutdown.
pub fn init_logger(config: &LoggingConfig) -> Result<WorkerGuard> {
    let filter = EnvFilter::try_new(filter_directives(
        config,
        std::env::var("RUST_LOG").ok(),
    ))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(&config.file_prefix)
        .filename_suffix("log")
        .build(&config.dir)?;
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let json = config.format == LogFormat::Json;

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json().with_target(true)))
        .with((!json).then(|| fmt::layer().pretty().with_target(true)))
        .with(json.then(|| fmt::layer().json().with_writer(file_writer.clone())))
        .with((!json).then(|| fmt::layer().with_writer(file_writer).with_ansi(false)))
        .try_init()?;

    Ok(guard)
}
