//! Tenantry Logging
//!
//! Structured logging for the tenantry crates, controlled by the
//! `TENANTRY_DEBUG` / `TENANTRY_LOG_*` environment variables.
//!
//! # Usage
//!
//! ```rust
//! use tenantry_log::{debug, info, warn, error, trace};
//!
//! debug!("Resolving connection");
//! info!("Registered {} connections", 3);
//! warn!("end() called with an empty stack");
//! error!("Transaction failed");
//!
//! let name = "tenant_db";
//! debug!(target: "tenantry::context", "Entering tenant {}", name);
//! ```
//!
//! # Context fields
//!
//! Higher layers can install a [`FieldProvider`] that attaches key/value
//! pairs to every record. `tenantry-core` uses it to stamp each line with the
//! connection of the active tenant scope.
//!
//! # Environment Variables
//!
//! - `TENANTRY_DEBUG=1` - Enable debug logging
//! - `TENANTRY_LOG_LEVEL=trace|debug|info|warn|error|off` - Set log level
//! - `TENANTRY_LOG_FORMAT=pretty|json|compact` - Set output format
//! - `TENANTRY_LOG_COLOR=1|0` - Enable/disable colors
//! - `TENANTRY_LOG_TIMESTAMPS=1|0` - Include timestamps
//! - `TENANTRY_LOG_MODULE=1|0` - Include the log target

use once_cell::sync::{Lazy, OnceCell};
use std::env;
use std::fmt::Write as _;
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

// ============================================================================
// Log Levels
// ============================================================================

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    /// Trace level (most verbose)
    Trace = 0,
    /// Debug level
    Debug = 1,
    /// Info level
    Info = 2,
    /// Warning level
    Warn = 3,
    /// Error level (least verbose)
    Error = 4,
    /// Off (no logging)
    Off = 5,
}

impl Level {
    /// Parse a level name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(Level::Trace),
            "debug" => Some(Level::Debug),
            "info" => Some(Level::Info),
            "warn" | "warning" => Some(Level::Warn),
            "error" => Some(Level::Error),
            "off" | "none" => Some(Level::Off),
            _ => None,
        }
    }

    /// Get level name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Off => "OFF",
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Level::Trace,
            1 => Level::Debug,
            2 => Level::Info,
            3 => Level::Warn,
            4 => Level::Error,
            _ => Level::Off,
        }
    }

    /// Get colored level name (if color feature enabled).
    #[cfg(feature = "color")]
    pub fn colored(&self) -> colored::ColoredString {
        use colored::Colorize;
        match self {
            Level::Trace => "TRACE".magenta(),
            Level::Debug => "DEBUG".blue(),
            Level::Info => "INFO".green(),
            Level::Warn => "WARN".yellow(),
            Level::Error => "ERROR".red().bold(),
            Level::Off => "OFF".white(),
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Log Format
// ============================================================================

/// Output format for log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Human readable, one record per line
    Pretty,
    /// Compact single-line format
    Compact,
    /// JSON format for structured logging
    Json,
}

impl Format {
    /// Parse a format name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pretty" => Some(Format::Pretty),
            "compact" => Some(Format::Compact),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

// ============================================================================
// Global Configuration
// ============================================================================

static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

static LOG_LEVEL: AtomicU8 = AtomicU8::new(Level::Info as u8);

static CONFIG: Lazy<LogConfig> = Lazy::new(LogConfig::from_env);

/// Supplies extra key/value pairs appended to every record.
pub type FieldProvider = fn() -> Vec<(&'static str, String)>;

static FIELD_PROVIDER: OnceCell<FieldProvider> = OnceCell::new();

/// Logging configuration.
#[derive(Debug)]
pub struct LogConfig {
    /// Whether debug mode is enabled
    pub debug: bool,
    /// Minimum log level
    pub level: Level,
    /// Output format
    pub format: Format,
    /// Whether colors are enabled
    pub color: bool,
    /// Whether to include timestamps
    pub timestamps: bool,
    /// Whether to include the log target
    pub module_path: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            debug: false,
            level: Level::Info,
            format: Format::Json,
            color: false,
            timestamps: true,
            module_path: true,
        }
    }
}

fn env_flag(key: &str) -> Option<bool> {
    env::var(key)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

impl LogConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let debug = env_flag("TENANTRY_DEBUG").unwrap_or(false);

        let level = env::var("TENANTRY_LOG_LEVEL")
            .ok()
            .and_then(|s| Level::parse(&s))
            .unwrap_or(if debug { Level::Debug } else { Level::Info });

        let format = env::var("TENANTRY_LOG_FORMAT")
            .ok()
            .and_then(|s| Format::parse(&s))
            .unwrap_or(Format::Json);

        let color = env_flag("TENANTRY_LOG_COLOR")
            .unwrap_or_else(|| env::var("NO_COLOR").is_err() && env::var("TERM").is_ok());

        let config = Self {
            debug,
            level,
            format,
            color,
            timestamps: env_flag("TENANTRY_LOG_TIMESTAMPS").unwrap_or(true),
            module_path: env_flag("TENANTRY_LOG_MODULE").unwrap_or(true),
        };

        DEBUG_ENABLED.store(config.debug, Ordering::SeqCst);
        LOG_LEVEL.store(config.level as u8, Ordering::SeqCst);

        config
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Initialize the logging system eagerly.
pub fn init() {
    Lazy::force(&CONFIG);
}

/// Install the process-wide field provider.
///
/// Returns `false` if a provider was already installed; the first one wins.
pub fn set_field_provider(provider: FieldProvider) -> bool {
    FIELD_PROVIDER.set(provider).is_ok()
}

/// Check if debug logging is enabled.
#[inline]
pub fn is_debug_enabled() -> bool {
    DEBUG_ENABLED.load(Ordering::Relaxed)
}

/// Check if a log level is enabled.
#[inline]
pub fn is_level_enabled(level: Level) -> bool {
    level as u8 >= LOG_LEVEL.load(Ordering::Relaxed)
}

/// Get current log level.
pub fn current_level() -> Level {
    Level::from_u8(LOG_LEVEL.load(Ordering::Relaxed))
}

/// Set log level at runtime.
pub fn set_level(level: Level) {
    LOG_LEVEL.store(level as u8, Ordering::SeqCst);
}

/// Enable or disable debug mode at runtime.
pub fn set_debug(enabled: bool) {
    DEBUG_ENABLED.store(enabled, Ordering::SeqCst);
    if enabled && current_level() > Level::Debug {
        set_level(Level::Debug);
    }
}

/// Get the global configuration.
pub fn config() -> &'static LogConfig {
    &CONFIG
}

// ============================================================================
// Log Output
// ============================================================================

/// A single log record, ready to be rendered.
#[derive(Debug)]
pub struct Record<'a> {
    /// Severity
    pub level: Level,
    /// Module path or explicit target
    pub target: &'a str,
    /// Formatted message
    pub message: &'a str,
    /// Context fields from the installed provider
    pub fields: Vec<(&'static str, String)>,
}

#[doc(hidden)]
pub fn log(level: Level, target: &str, message: &str) {
    if !is_level_enabled(level) {
        return;
    }

    let config = config();
    let record = Record {
        level,
        target,
        message,
        fields: FIELD_PROVIDER.get().map(|p| p()).unwrap_or_default(),
    };

    let line = match config.format {
        Format::Pretty => render_pretty(&record, config),
        Format::Compact => render_compact(&record, config),
        Format::Json => render_json(&record),
    };

    let _ = writeln!(std::io::stderr().lock(), "{}", line);
}

/// Render a record in the pretty format.
pub fn render_pretty(record: &Record<'_>, config: &LogConfig) -> String {
    let mut out = String::new();

    if config.timestamps {
        let now = chrono::Local::now();
        let _ = write!(out, "{} ", now.format("%Y-%m-%d %H:%M:%S%.3f"));
    }

    #[cfg(feature = "color")]
    if config.color {
        let _ = write!(out, "{:5} ", record.level.colored());
    } else {
        let _ = write!(out, "{:5} ", record.level.as_str());
    }

    #[cfg(not(feature = "color"))]
    let _ = write!(out, "{:5} ", record.level.as_str());

    if config.module_path && !record.target.is_empty() {
        let _ = write!(out, "[{}] ", record.target);
    }

    out.push_str(record.message);

    for (key, value) in &record.fields {
        let _ = write!(out, " {}={}", key, value);
    }

    out
}

/// Render a record in the compact format.
pub fn render_compact(record: &Record<'_>, config: &LogConfig) -> String {
    let mut out = String::new();

    if config.timestamps {
        let now = chrono::Local::now();
        let _ = write!(out, "{} ", now.format("%H:%M:%S"));
    }

    let _ = write!(out, "{} ", record.level.as_str().chars().next().unwrap_or('?'));

    if config.module_path && !record.target.is_empty() {
        let _ = write!(out, "{}: ", record.target);
    }

    out.push_str(record.message);

    for (key, value) in &record.fields {
        let _ = write!(out, " {}={}", key, value);
    }

    out
}

/// Render a record as a single JSON object.
#[cfg(feature = "json")]
pub fn render_json(record: &Record<'_>) -> String {
    let mut entry = serde_json::Map::new();
    entry.insert(
        "timestamp".into(),
        chrono::Utc::now().to_rfc3339().into(),
    );
    entry.insert("level".into(), record.level.as_str().into());
    entry.insert("target".into(), record.target.into());
    entry.insert("message".into(), record.message.into());
    for (key, value) in &record.fields {
        entry.insert((*key).to_string(), value.clone().into());
    }

    serde_json::Value::Object(entry).to_string()
}

/// Render a record as a single JSON object.
#[cfg(not(feature = "json"))]
pub fn render_json(record: &Record<'_>) -> String {
    let mut out = format!(
        r#"{{"timestamp":"{}","level":"{}","target":"{}","message":"{}""#,
        chrono::Utc::now().to_rfc3339(),
        record.level.as_str(),
        escape_json(record.target),
        escape_json(record.message)
    );
    for (key, value) in &record.fields {
        let _ = write!(out, r#","{}":"{}""#, escape_json(key), escape_json(value));
    }
    out.push('}');
    out
}

#[cfg(not(feature = "json"))]
fn escape_json(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => result.push_str("\\\""),
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(result, "\\u{:04x}", c as u32);
            }
            c => result.push(c),
        }
    }
    result
}

// ============================================================================
// Macros
// ============================================================================

/// Log a trace message.
#[macro_export]
macro_rules! trace {
    (target: $target:expr, $($arg:tt)+) => {
        if $crate::is_level_enabled($crate::Level::Trace) {
            $crate::log($crate::Level::Trace, $target, &format!($($arg)+));
        }
    };
    ($($arg:tt)+) => {
        if $crate::is_level_enabled($crate::Level::Trace) {
            $crate::log($crate::Level::Trace, module_path!(), &format!($($arg)+));
        }
    };
}

/// Log a debug message.
///
/// Enabled by `TENANTRY_DEBUG=1` or `TENANTRY_LOG_LEVEL=debug`.
///
/// # Example
///
/// ```rust
/// use tenantry_log::debug;
///
/// let connection = "tenant_db";
/// debug!("Binding entity to {}", connection);
/// debug!(target: "tenantry::resolver", "Binding entity to {}", connection);
/// ```
#[macro_export]
macro_rules! debug {
    (target: $target:expr, $($arg:tt)+) => {
        if $crate::is_debug_enabled() || $crate::is_level_enabled($crate::Level::Debug) {
            $crate::log($crate::Level::Debug, $target, &format!($($arg)+));
        }
    };
    ($($arg:tt)+) => {
        if $crate::is_debug_enabled() || $crate::is_level_enabled($crate::Level::Debug) {
            $crate::log($crate::Level::Debug, module_path!(), &format!($($arg)+));
        }
    };
}

/// Log an info message.
#[macro_export]
macro_rules! info {
    (target: $target:expr, $($arg:tt)+) => {
        if $crate::is_level_enabled($crate::Level::Info) {
            $crate::log($crate::Level::Info, $target, &format!($($arg)+));
        }
    };
    ($($arg:tt)+) => {
        if $crate::is_level_enabled($crate::Level::Info) {
            $crate::log($crate::Level::Info, module_path!(), &format!($($arg)+));
        }
    };
}

/// Log a warning message.
#[macro_export]
macro_rules! warn {
    (target: $target:expr, $($arg:tt)+) => {
        if $crate::is_level_enabled($crate::Level::Warn) {
            $crate::log($crate::Level::Warn, $target, &format!($($arg)+));
        }
    };
    ($($arg:tt)+) => {
        if $crate::is_level_enabled($crate::Level::Warn) {
            $crate::log($crate::Level::Warn, module_path!(), &format!($($arg)+));
        }
    };
}

/// Log an error message.
#[macro_export]
macro_rules! error {
    (target: $target:expr, $($arg:tt)+) => {
        if $crate::is_level_enabled($crate::Level::Error) {
            $crate::log($crate::Level::Error, $target, &format!($($arg)+));
        }
    };
    ($($arg:tt)+) => {
        if $crate::is_level_enabled($crate::Level::Error) {
            $crate::log($crate::Level::Error, module_path!(), &format!($($arg)+));
        }
    };
}

// ============================================================================
// Tracing Integration
// ============================================================================

#[cfg(feature = "tracing")]
pub mod tracing_compat {
    //! Tracing compatibility layer.
    //!
    //! Builds a subscriber whose filter follows `TENANTRY_LOG_LEVEL` unless
    //! `RUST_LOG` overrides it.

    use super::*;

    /// Create a tracing subscriber that respects the tenantry log config.
    pub fn subscriber() -> impl tracing::Subscriber {
        use tracing_subscriber::prelude::*;
        use tracing_subscriber::{EnvFilter, fmt};

        let config = config();
        let level = match config.level {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Off => "off",
        };

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_ansi(config.color))
    }
}

// ============================================================================
// Tests
// ============================================================================
