use std::path::PathBuf;
use std::sync::OnceLock;

use tracing::Level;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use crate::config::{runtime_dir, LogLevel};

pub const LOG_PREFIX: &str = "battery-bridge";

static INIT: OnceLock<()> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    /// Rolling files in the runtime dir; used by the backgrounded monitor.
    File,
    Stderr,
    /// A foreground monitor logs to both.
    Both,
}

pub struct LogGuard {
    _guard: Option<WorkerGuard>,
}

impl LogMode {
    fn writes_file(self) -> bool {
        matches!(self, LogMode::File | LogMode::Both)
    }

    fn writes_stderr(self) -> bool {
        matches!(self, LogMode::Stderr | LogMode::Both)
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

pub fn init(level: LogLevel, mode: LogMode, cli_override: Option<LogLevel>) -> LogGuard {
    let mut guard = None;

    INIT.get_or_init(|| {
        let Some(tracing_level) = cli_override.unwrap_or(level).as_tracing_level() else {
            return;
        };

        let mut layers: Vec<BoxedLayer> = Vec::new();
        if mode.writes_file() {
            if let Some((layer, file_guard)) = file_layer(tracing_level) {
                layers.push(layer);
                guard = Some(file_guard);
            }
        }
        if mode.writes_stderr() {
            layers.push(stderr_layer(tracing_level));
        }

        tracing_subscriber::registry().with(layers).init();
    });

    LogGuard { _guard: guard }
}

fn build_env_filter(level: Level) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
}

fn file_writer() -> Option<(NonBlocking, WorkerGuard)> {
    let log_dir = runtime_dir();

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!(
            "Warning: Failed to create log directory {:?}: {}",
            log_dir, e
        );
        return None;
    }

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_PREFIX)
        .filename_suffix("log")
        .max_log_files(7)
        .build(&log_dir)
        .ok()?;

    Some(tracing_appender::non_blocking(file_appender))
}

/// Plain-text file output with source locations, for the monitor.
fn file_layer(level: Level) -> Option<(BoxedLayer, WorkerGuard)> {
    let (writer, guard) = file_writer()?;
    let layer = fmt::layer()
        .with_writer(writer)
        .with_timer(UtcTime::rfc_3339())
        .with_ansi(false)
        .with_file(true)
        .with_line_number(true)
        .with_filter(build_env_filter(level))
        .boxed();
    Some((layer, guard))
}

fn stderr_layer(level: Level) -> BoxedLayer {
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_timer(UtcTime::rfc_3339())
        .with_filter(build_env_filter(level))
        .boxed()
}

/// Log files written by [`LogMode::File`], oldest first.
pub fn log_files() -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(runtime_dir())
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| {
                    let name = e.file_name();
                    let name = name.to_string_lossy();
                    name.starts_with(LOG_PREFIX) && name.ends_with(".log")
                })
                .map(|e| e.path())
                .collect()
        })
        .unwrap_or_default();

    files.sort();
    files
}
