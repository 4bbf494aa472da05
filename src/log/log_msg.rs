use crate::log::log_level::LogLevel;

/// One queued log line.
#[derive(Debug, Clone)]
pub struct LogMsg {
    pub level: LogLevel,
    /// Milliseconds since the UNIX epoch.
    pub ts_ms: u128,
    pub text: String,
    /// Module path of the call site.
    pub target: &'static str,
}

impl LogMsg {
    pub fn new(level: LogLevel, text: impl Into<String>, target: &'static str, ts_ms: u128) -> Self {
        Self {
            level,
            ts_ms,
            text: text.into(),
            target,
        }
    }

    /// Single-line rendering used by the file writer.
    #[must_use]
    pub fn render(&self) -> String {
        format!("[{}] {} {} | {}", self.level, self.ts_ms, self.target, self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_contains_level_target_and_text() {
        let m = LogMsg::new(LogLevel::Warn, "relay dropped invite", "peercall::signaling", 42);
        assert_eq!(m.render(), "[WARN] 42 peercall::signaling | relay dropped invite");
    }
}
