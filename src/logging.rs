use chrono::Local;
use log::{LevelFilter, Metadata, Record, SetLoggerError};
use std::collections::HashSet;
use std::io::{self, Write};
use std::sync::OnceLock;

// Custom logger structure
#[derive(Debug)]
struct ShellfireLogger {
    level: LevelFilter,
    debug_filters: Option<HashSet<String>>,
}

/// Pulls the number following `label` out of a log message, e.g. "Tank 3".
fn extract_number(message: &str, label: &str) -> Option<u32> {
    let start = message.find(label)? + label.len();
    let rest = &message[start..];
    let end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    rest[..end].parse::<u32>().ok()
}

impl log::Log for ShellfireLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        if metadata.level() <= self.level {
            // Debug and trace output is limited to the selected topics
            if let Some(filters) = &self.debug_filters {
                if metadata.level() == log::Level::Debug || metadata.level() == log::Level::Trace {
                    return filters.contains(metadata.target())
                        || filters.iter().any(|f| metadata.target().starts_with(f));
                }
            }
            return true;
        }
        false
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let level_color = match record.level() {
            log::Level::Error => "\x1B[31m", // Red
            log::Level::Warn => "\x1B[33m",  // Yellow
            log::Level::Info => "\x1B[32m",  // Green
            log::Level::Debug => "\x1B[36m", // Cyan
            log::Level::Trace => "\x1B[35m", // Magenta
        };
        let reset = "\x1B[0m";
        let timestamp = Local::now().format("%H:%M:%S%.3f");

        let message = record.args().to_string();

        // Topic macros already prefix their own context
        let mut context = String::new();
        if !message.starts_with('[') {
            if let Some(round) = extract_number(&message, "Round ") {
                context.push_str(&format!("[R{:02}]", round));
            }
            if let Some(tank) = extract_number(&message, "Tank ") {
                context.push_str(&format!("[T{:02}]", tank));
            }
            if !context.is_empty() {
                context.push(' ');
            }
        }

        let mut output = format!(
            "{timestamp} {level_color}{level:5}{reset} {context}{target}: {message}",
            level = record.level(),
            target = record.target(),
        );

        if let Some(module_path) = record.module_path() {
            if module_path != record.target() {
                output.push_str(&format!(" [{}]", module_path));
            }
        }

        let mut stdout = io::stdout();
        let _ = writeln!(stdout, "{}", output);
        let _ = stdout.flush();
    }

    fn flush(&self) {
        let _ = io::stdout().flush();
    }
}

static LOGGER: OnceLock<ShellfireLogger> = OnceLock::new();

/// Parses a level name, falling back to info.
pub fn parse_level(name: &str) -> LevelFilter {
    match name.to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

fn parse_filters(filter_str: &str) -> HashSet<String> {
    filter_str
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// Initialize the logger with optional debug topic filters
pub fn init_logger(level: LevelFilter, debug_filter: Option<String>) -> Result<(), SetLoggerError> {
    let logger = LOGGER.get_or_init(|| ShellfireLogger {
        level,
        debug_filters: debug_filter.as_deref().map(parse_filters),
    });
    log::set_logger(logger).map(|()| log::set_max_level(level))
}

// Topic macros. Available topics: terrain, ballistics, round, bot, env

#[macro_export]
macro_rules! debug_terrain {
    ($($arg:tt)*) => {
        log::debug!(target: "terrain", "{}", format_args!($($arg)*))
    }
}

#[macro_export]
macro_rules! debug_ballistics {
    ($($arg:tt)*) => {
        log::debug!(target: "ballistics", "{}", format_args!($($arg)*))
    }
}

#[macro_export]
macro_rules! debug_env {
    ($($arg:tt)*) => {
        log::debug!(target: "env", "{}", format_args!($($arg)*))
    }
}

#[macro_export]
macro_rules! debug_round {
    (tank: $tank:expr, round: $round:expr, $($arg:tt)*) => {
        log::debug!(target: "round", "[R{:02}][T{:02}] {}", $round, $tank, format_args!($($arg)*))
    };
    ($($arg:tt)*) => {
        log::debug!(target: "round", "{}", format_args!($($arg)*))
    }
}

#[macro_export]
macro_rules! debug_bot {
    (tank: $tank:expr, $($arg:tt)*) => {
        log::debug!(target: "bot", "[T{:02}] {}", $tank, format_args!($($arg)*))
    };
    ($($arg:tt)*) => {
        log::debug!(target: "bot", "{}", format_args!($($arg)*))
    }
}
