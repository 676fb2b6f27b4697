//! File logging with a level that the `debugMode` setting can flip at
//! runtime.

use std::path::Path;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, Registry};

const LOG_FILE: &str = "ampdeck.log";

/// Keeps the writer thread alive and the level switch reachable.
pub struct LogHandle {
    level: reload::Handle<LevelFilter, Registry>,
    _guard: WorkerGuard,
}

impl LogHandle {
    pub fn set_debug(&self, debug: bool) {
        let level = if debug {
            LevelFilter::DEBUG
        } else {
            LevelFilter::INFO
        };
        let current = self.level.clone_current();
        if current == Some(level) {
            return;
        }
        match self.level.reload(level) {
            Ok(()) => info!("Log level set to {}", level),
            Err(e) => eprintln!("Failed to change log level: {}", e),
        }
    }
}

/// Installs the global subscriber writing to a daily file under `dir`.
pub fn init(dir: &Path) -> anyhow::Result<LogHandle> {
    std::fs::create_dir_all(dir)?;
    let appender = tracing_appender::rolling::daily(dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let (filter, level) = reload::Layer::new(LevelFilter::INFO);
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false),
        )
        .try_init()?;

    Ok(LogHandle {
        level,
        _guard: guard,
    })
}
