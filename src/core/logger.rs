// Launcher Plugin Host - Systemd-Style Logger
// Copyright (C) 2025 Akaere Networks
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Systemd-style logging compatible with journald
//!
//! Plugin loading is noisy and mostly happens on worker threads, so every
//! message goes through one global sink guarded by a mutex:
//! - Log levels follow syslog priorities (err, warning, notice, info, debug)
//! - `[   OK   ]` / `[  FAILED ]` status lines for load passes
//! - Journald key/value output when running under systemd

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Identifier written as `SYSLOG_IDENTIFIER` in journald mode
const SYSLOG_IDENTIFIER: &str = "launcher-plugin-host";

/// Log levels following syslog priority numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    /// Error conditions (3)
    Error = 3,
    /// Warning conditions (4)
    Warning = 4,
    /// Normal but significant condition (5)
    Notice = 5,
    /// Informational message (6)
    Info = 6,
    /// Debug-level message (7)
    Debug = 7,
}

impl LogLevel {
    pub fn from_priority(priority: u8) -> Self {
        match priority {
            0..=3 => LogLevel::Error,
            4 => LogLevel::Warning,
            5 => LogLevel::Notice,
            6 => LogLevel::Info,
            _ => LogLevel::Debug,
        }
    }

    pub fn priority(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "ERR",
            LogLevel::Warning => "WARNING",
            LogLevel::Notice => "NOTICE",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }

    pub fn color_code(self) -> &'static str {
        match self {
            LogLevel::Error => "\x1b[31m",   // Red
            LogLevel::Warning => "\x1b[33m", // Yellow
            LogLevel::Notice => "\x1b[36m",  // Cyan
            LogLevel::Info => "\x1b[32m",    // Green
            LogLevel::Debug => "\x1b[37m",   // Gray
        }
    }
}

/// Logger configuration
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Minimum log level to output
    pub min_level: LogLevel,
    /// Whether to use colors in output
    pub use_colors: bool,
    /// Whether to include timestamps
    pub include_timestamp: bool,
    /// Whether to append the emitting module path
    pub include_target: bool,
    /// Whether to format for journald (structured format)
    pub journald_format: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            use_colors: atty::is(atty::Stream::Stderr),
            include_timestamp: true,
            include_target: false,
            journald_format: false,
        }
    }
}

static LOGGER: Mutex<Option<Logger>> = Mutex::new(None);

#[derive(Debug)]
pub struct Logger {
    config: LoggerConfig,
    min_level: AtomicU8,
}

impl Logger {
    pub fn new(config: LoggerConfig) -> Self {
        Self {
            min_level: AtomicU8::new(config.min_level.priority()),
            config,
        }
    }

    /// Install the global logger. Fails if one is already installed.
    pub fn init(config: LoggerConfig) -> Result<(), LoggerError> {
        let mut global_logger = LOGGER.lock().map_err(|_| LoggerError::InitError)?;
        if global_logger.is_some() {
            return Err(LoggerError::AlreadyInitialized);
        }
        *global_logger = Some(Self::new(config));
        Ok(())
    }

    pub fn set_min_level(&self, level: LogLevel) {
        self.min_level.store(level.priority(), Ordering::Relaxed);
    }

    pub fn should_log(&self, level: LogLevel) -> bool {
        level.priority() <= self.min_level.load(Ordering::Relaxed)
    }

    pub fn log(&self, level: LogLevel, target: &str, message: &str) {
        if !self.should_log(level) {
            return;
        }

        let timestamp = self.config.include_timestamp.then(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs()
        });

        let formatted = if self.config.journald_format {
            self.format_journald(level, target, message, timestamp)
        } else {
            self.format_terminal(level, target, message, timestamp)
        };

        eprintln!("{}", formatted);
    }

    fn format_journald(
        &self,
        level: LogLevel,
        target: &str,
        message: &str,
        timestamp: Option<u64>,
    ) -> String {
        let mut output = format!("PRIORITY={}\nMESSAGE={}\n", level.priority(), message);

        if self.config.include_target && !target.is_empty() {
            output.push_str(&format!("CODE_FILE={}\n", target));
        }

        if let Some(ts) = timestamp {
            // journald wants microseconds
            output.push_str(&format!("_SOURCE_REALTIME_TIMESTAMP={}\n", ts * 1_000_000));
        }

        output.push_str(&format!("SYSLOG_IDENTIFIER={}\n", SYSLOG_IDENTIFIER));
        output
    }

    fn format_terminal(
        &self,
        level: LogLevel,
        target: &str,
        message: &str,
        timestamp: Option<u64>,
    ) -> String {
        let mut output = String::new();

        if let Some(ts) = timestamp {
            let datetime = chrono::DateTime::from_timestamp(ts as i64, 0)
                .unwrap_or_default()
                .format("%Y-%m-%d %H:%M:%S");
            output.push_str(&format!("{} ", datetime));
        }

        // Status lines carry their own marker, so only the color is applied
        match status_level(message) {
            Some(status) if self.config.use_colors => {
                output.push_str(&format!("{}{}\x1b[0m", status.color_code(), message));
            }
            Some(_) => output.push_str(message),
            None if self.config.use_colors => {
                output.push_str(&format!(
                    "{}[{}]\x1b[0m {}",
                    level.color_code(),
                    level.as_str(),
                    message
                ));
            }
            None => output.push_str(&format!("[{}] {}", level.as_str(), message)),
        }

        if self.config.include_target && !target.is_empty() {
            output.push_str(&format!(" ({})", target));
        }

        output
    }
}

/// Level implied by a systemd-style status marker at the start of a message
fn status_level(message: &str) -> Option<LogLevel> {
    if message.starts_with("[  FAILED ]") {
        Some(LogLevel::Error)
    } else if message.starts_with("[   WARN ]") {
        Some(LogLevel::Warning)
    } else if message.starts_with("[   OK   ]") {
        Some(LogLevel::Info)
    } else if message.starts_with("[*]") {
        Some(LogLevel::Notice)
    } else {
        None
    }
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::core::logger::log_with_level($crate::core::logger::LogLevel::Error, module_path!(), &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::core::logger::log_with_level($crate::core::logger::LogLevel::Warning, module_path!(), &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_notice {
    ($($arg:tt)*) => {
        $crate::core::logger::log_with_level($crate::core::logger::LogLevel::Notice, module_path!(), &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::core::logger::log_with_level($crate::core::logger::LogLevel::Info, module_path!(), &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::core::logger::log_with_level($crate::core::logger::LogLevel::Debug, module_path!(), &format!($($arg)*))
    };
}

/// Route a message to the global logger, dropping it if none is installed
pub fn log_with_level(level: LogLevel, target: &str, message: &str) {
    if let Ok(logger_guard) = LOGGER.lock() {
        if let Some(logger) = logger_guard.as_ref() {
            logger.log(level, target, message);
        }
    }
}

pub fn log_init_start(service_name: &str) {
    let message = format!("[*] Starting {}...", service_name);
    log_with_level(LogLevel::Notice, module_path!(), &message);
}

pub fn log_init_ok_with_details(service_name: &str, details: &str) {
    let message = format!("[   OK   ] Started {} ({})", service_name, details);
    log_with_level(LogLevel::Info, module_path!(), &message);
}

pub fn log_init_failed(service_name: &str, error: &str) {
    let message = format!("[  FAILED ] Starting {} - {}", service_name, error);
    log_with_level(LogLevel::Error, module_path!(), &message);
}

pub fn log_init_warn(service_name: &str, warning: &str) {
    let message = format!("[   WARN ] Starting {} - {}", service_name, warning);
    log_with_level(LogLevel::Warning, module_path!(), &message);
}

#[macro_export]
macro_rules! log_init_start {
    ($service:expr) => {
        $crate::core::logger::log_init_start($service);
    };
}

#[macro_export]
macro_rules! log_init_ok_with_details {
    ($service:expr, $details:expr) => {
        $crate::core::logger::log_init_ok_with_details($service, $details);
    };
}

#[macro_export]
macro_rules! log_init_failed {
    ($service:expr, $error:expr) => {
        $crate::core::logger::log_init_failed($service, $error);
    };
}

#[macro_export]
macro_rules! log_init_warn {
    ($service:expr, $warning:expr) => {
        $crate::core::logger::log_init_warn($service, $warning);
    };
}

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    #[error("Logger already initialized")]
    AlreadyInitialized,
    #[error("Failed to initialize logger")]
    InitError,
}

/// Initialize logger from CLI arguments
pub fn init_from_args(debug: bool, journald: bool) -> Result<(), LoggerError> {
    let config = LoggerConfig {
        min_level: if debug { LogLevel::Debug } else { LogLevel::Info },
        use_colors: atty::is(atty::Stream::Stderr) && !journald,
        include_timestamp: !journald,
        include_target: debug,
        journald_format: journald,
    };

    Logger::init(config)
}
