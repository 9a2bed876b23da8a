//! Console and file logging set up once per process.
//!
//! `RUST_LOG` overrides the console level. Dropping the returned [`LogGuard`]
//! flushes the log file.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt::{self, format::FmtSpan}};

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Filter directive for the console, e.g. `warn` or `bump_capture=debug`
    pub console_level: String,
    /// Optional log file receiving everything at `file_level`
    pub file: Option<PathBuf>,
    pub file_level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            console_level: "info".to_string(),
            file: None,
            file_level: "debug".to_string(),
        }
    }
}

/// Keeps the log file open; flushes it on drop.
pub struct LogGuard {
    file: Option<Arc<File>>,
}

impl Drop for LogGuard {
    fn drop(&mut self) {
        if let Some(file) = &self.file {
            if let Err(e) = file.sync_all() {
                eprintln!("Failed to flush log file: {}", e);
            }
        }
    }
}

pub fn init(config: &LogConfig) -> anyhow::Result<LogGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.console_level));

    let is_debug = env_filter.to_string().contains("debug")
        || std::env::var("RUST_LOG").unwrap_or_default().contains("debug");

    let console_layer = fmt::layer()
        .with_target(false)
        .with_timer(fmt::time::uptime())
        .with_span_events(if is_debug {
            FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        })
        .with_filter(env_filter);

    let (file_layer, file) = match &config.file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating log directory {}", parent.display()))?;
            }
            let file = Arc::new(
                File::create(path)
                    .with_context(|| format!("creating log file {}", path.display()))?,
            );
            let layer = fmt::layer()
                .with_ansi(false)
                .with_writer(Arc::clone(&file))
                .with_filter(EnvFilter::new(&config.file_level));
            (Some(layer), Some(file))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("installing the global tracing subscriber")?;

    Ok(LogGuard { file })
}
