use crate::log::log_level::LogLevel;

/// Anything that can swallow a formatted log line.
///
/// Components take an `Arc<dyn LogSink>` so the binaries decide where lines go
/// (file logger, stderr) and tests can pass a [`NoopLogSink`](super::NoopLogSink).
pub trait LogSink: Send + Sync {
    fn log(&self, level: LogLevel, msg: &str, target: &'static str);
}
