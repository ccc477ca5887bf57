//! Logging

use std::sync::OnceLock;
use std::time::Instant;

use ::log::{Level, LevelFilter, Log, Metadata, Record};

static START: OnceLock<Instant> = OnceLock::new();

static LOGGER: ConsoleLogger = ConsoleLogger;

/// Sinks the `log` facade into line-oriented console output in the shape of
/// an RTOS console: `I (1042) wifi_scan: Scan started`.
pub struct ConsoleLogger;

impl ConsoleLogger {
    /// Registers the logger with the default `Info` level.
    ///
    /// Calling it again is a no-op; the first registration stays in place for
    /// the lifetime of the process.
    pub fn initialize_default() {
        Self::initialize_with_level(LevelFilter::Info);
    }

    pub fn initialize_with_level(level: LevelFilter) {
        START.get_or_init(Instant::now);

        if ::log::set_logger(&LOGGER).is_ok() {
            ::log::set_max_level(level);
        }
    }

    fn marker(level: Level) -> char {
        match level {
            Level::Error => 'E',
            Level::Warn => 'W',
            Level::Info => 'I',
            Level::Debug => 'D',
            Level::Trace => 'V',
        }
    }

    fn uptime_ms() -> u128 {
        START
            .get()
            .map(|start| start.elapsed().as_millis())
            .unwrap_or_default()
    }
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= ::log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            println!(
                "{} ({}) {}: {}",
                Self::marker(record.level()),
                Self::uptime_ms(),
                record.target(),
                record.args()
            );
        }
    }

    fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers_follow_the_console_convention() {
        assert_eq!(ConsoleLogger::marker(Level::Error), 'E');
        assert_eq!(ConsoleLogger::marker(Level::Warn), 'W');
        assert_eq!(ConsoleLogger::marker(Level::Info), 'I');
        assert_eq!(ConsoleLogger::marker(Level::Debug), 'D');
        assert_eq!(ConsoleLogger::marker(Level::Trace), 'V');
    }

    #[test]
    fn repeated_initialization_is_a_no_op() {
        ConsoleLogger::initialize_default();
        ConsoleLogger::initialize_default();
    }
}
