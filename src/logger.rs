//! Structured console logging with per-tag prefixes
//!
//! Provides a small tag+level logging API used across the crate:
//!
//! ```rust
//! use pricebridge::logger::{self, LogTag};
//!
//! logger::info(LogTag::Price, "Resolved 4 prices from on-chain tier");
//! logger::debug(LogTag::Cache, "Cache hit for key solana:..."); // only when debug enabled
//! ```
//!
//! Debug output is off by default and toggled via [`set_debug`], which the
//! service constructors wire to `Config::general.debug_logging`.

use chrono::Local;
use colored::*;
use std::sync::atomic::{AtomicBool, Ordering};

/// Fixed width for the tag column so messages align
const TAG_WIDTH: usize = 9;

static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

/// Enable or disable DEBUG level output globally
pub fn set_debug(enabled: bool) {
    DEBUG_ENABLED.store(enabled, Ordering::Relaxed);
}

pub fn is_debug_enabled() -> bool {
    DEBUG_ENABLED.load(Ordering::Relaxed)
}

/// Log source tags, one per subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTag {
    Api,
    Cache,
    Price,
    Registry,
    Token,
}

impl LogTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogTag::Api => "API",
            LogTag::Cache => "CACHE",
            LogTag::Price => "PRICE",
            LogTag::Registry => "REGISTRY",
            LogTag::Token => "TOKEN",
        }
    }
}

/// Log level ordering (Error < Warning < Info < Debug)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error = 0,
    Warning = 1,
    Info = 2,
    Debug = 3,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warning => "WARNING",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }
}

/// Log at ERROR level (always shown)
pub fn error(tag: LogTag, message: &str) {
    log_internal(tag, LogLevel::Error, message);
}

/// Log at WARNING level
pub fn warning(tag: LogTag, message: &str) {
    log_internal(tag, LogLevel::Warning, message);
}

/// Log at INFO level
pub fn info(tag: LogTag, message: &str) {
    log_internal(tag, LogLevel::Info, message);
}

/// Log at DEBUG level (only when debug output is enabled)
pub fn debug(tag: LogTag, message: &str) {
    log_internal(tag, LogLevel::Debug, message);
}

fn log_internal(tag: LogTag, level: LogLevel, message: &str) {
    if level == LogLevel::Debug && !is_debug_enabled() {
        return;
    }

    let time = Local::now().format("%H:%M:%S").to_string();
    let tag_str = format_tag(tag);
    let level_str = format_level(level);
    let body = match level {
        LogLevel::Error => message.red().to_string(),
        LogLevel::Warning => message.yellow().to_string(),
        LogLevel::Debug => message.dimmed().to_string(),
        LogLevel::Info => message.to_string(),
    };

    println!("{} [{}] [{}] {}", time.dimmed(), tag_str, level_str, body);
}

fn format_tag(tag: LogTag) -> ColoredString {
    let padded = format!("{:<width$}", tag.as_str(), width = TAG_WIDTH);
    match tag {
        LogTag::Api => padded.bright_green().bold(),
        LogTag::Cache => padded.bright_blue().bold(),
        LogTag::Price => padded.bright_cyan().bold(),
        LogTag::Registry => padded.bright_magenta().bold(),
        LogTag::Token => padded.bright_yellow().bold(),
    }
}

fn format_level(level: LogLevel) -> ColoredString {
    match level {
        LogLevel::Error => level.as_str().red().bold(),
        LogLevel::Warning => level.as_str().yellow().bold(),
        LogLevel::Info => level.as_str().normal(),
        LogLevel::Debug => level.as_str().dimmed(),
    }
}
