//! File-based logging using simplelog
//!
//! The terminal belongs to the TUI, so log output goes to
//! `<cache dir>/stagediff/stagediff.log` instead of stderr.

use anyhow::{Context, Result};
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};
use std::fs::File;
use std::path::PathBuf;

/// Get the log file path, falling back to the current directory
fn log_file_path() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("stagediff"))
        .and_then(|dir| std::fs::create_dir_all(&dir).ok().map(|_| dir))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stagediff.log")
}

fn parse_level(value: &str) -> Option<LevelFilter> {
    match value.to_lowercase().as_str() {
        "off" => Some(LevelFilter::Off),
        "error" => Some(LevelFilter::Error),
        "warn" => Some(LevelFilter::Warn),
        "info" => Some(LevelFilter::Info),
        "debug" => Some(LevelFilter::Debug),
        "trace" => Some(LevelFilter::Trace),
        _ => None,
    }
}

/// Resolve the log level: `RUST_LOG` first, then the configured level, then info
fn resolve_level(env: Option<&str>, configured: Option<&str>) -> LevelFilter {
    env.and_then(parse_level)
        .or_else(|| configured.and_then(parse_level))
        .unwrap_or(LevelFilter::Info)
}

/// Initialize file-based logging.
///
/// Returns the path to the log file.
pub fn init(configured_level: Option<&str>) -> Result<PathBuf> {
    let log_file = log_file_path();
    let env_level = std::env::var("RUST_LOG").ok();
    let level = resolve_level(env_level.as_deref(), configured_level);

    let config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_time_offset_to_local()
        .unwrap_or_else(|c| c) // Fallback if local time offset fails
        .build();

    let file = File::create(&log_file)
        .with_context(|| format!("Failed to create log file: {}", log_file.display()))?;

    WriteLogger::init(level, config, file).context("Failed to initialize logger")?;

    Ok(log_file)
}
