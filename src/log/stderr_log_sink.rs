use crate::log::{log_level::LogLevel, log_sink::LogSink};

/// Writes every line straight to stderr, filtered by a minimum level.
///
/// Handy for the relay binary when it runs in a terminal.
#[derive(Debug, Clone)]
pub struct StderrLogSink {
    min_level: LogLevel,
}

impl StderrLogSink {
    #[must_use]
    pub const fn new(min_level: LogLevel) -> Self {
        Self { min_level }
    }
}

impl Default for StderrLogSink {
    fn default() -> Self {
        Self::new(LogLevel::Info)
    }
}

impl LogSink for StderrLogSink {
    fn log(&self, level: LogLevel, msg: &str, target: &'static str) {
        if level >= self.min_level {
            eprintln!("[{level}] {target}: {msg}");
        }
    }
}
