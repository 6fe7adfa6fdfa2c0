use std::path::Path;
use std::sync::OnceLock;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Options for [`setup_logging`].
#[derive(Debug, Clone)]
pub struct LogOptions<'a> {
    /// Filter used when `RUST_LOG` is not set, e.g. `"info,volseg=debug"`.
    pub base_level: &'a str,
    /// Directory for rolling log files. `None` disables the file layer.
    pub log_dir: Option<&'a Path>,
    pub file_prefix: &'a str,
    pub max_log_files: usize,
}

impl Default for LogOptions<'_> {
    fn default() -> Self {
        Self {
            base_level: "info",
            log_dir: None,
            file_prefix: "volseg",
            max_log_files: 5,
        }
    }
}

/// Install the global tracing subscriber: console output (warnings and errors to
/// stderr) plus an optional daily-rolling file.
///
/// Panics if called twice or if the filter/log directory is invalid.
pub fn setup_logging(options: &LogOptions<'_>) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(options.base_level))
        .unwrap_or_else(|e| panic!("Invalid log filter: {}", e));

    let console_writer = std::io::stdout.and(std::io::stderr.with_min_level(Level::WARN));
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(true)
        .with_writer(console_writer);

    let file_layer = options.log_dir.map(|dir| {
        std::fs::create_dir_all(dir)
            .unwrap_or_else(|e| panic!("Failed to create log directory {:?}: {}", dir, e));

        let file_appender = tracing_appender::rolling::Builder::new()
            .rotation(tracing_appender::rolling::Rotation::DAILY)
            .filename_prefix(options.file_prefix)
            .filename_suffix("log")
            .max_log_files(options.max_log_files)
            .build(dir)
            .unwrap_or_else(|e| panic!("Failed to create log file appender: {}", e));

        let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
        LOG_GUARD.set(guard).expect("Logging already initialized");

        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(false)
            .with_writer(file_writer)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .unwrap_or_else(|e| panic!("Logger initialization failed: {}", e));
}
