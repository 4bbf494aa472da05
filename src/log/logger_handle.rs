use std::sync::mpsc;

use crate::{
    clock::now_millis,
    log::{log_level::LogLevel, log_msg::LogMsg, log_sink::LogSink},
};

/// Cloneable, non-blocking handle onto a running [`Logger`](super::Logger).
///
/// Lines go into a bounded queue. When the queue is full the line is dropped
/// instead of stalling the caller, which matters for the GUI thread.
#[derive(Clone)]
pub struct LoggerHandle {
    pub(super) tx: mpsc::SyncSender<LogMsg>,
}

impl LogSink for LoggerHandle {
    #[inline]
    fn log(&self, level: LogLevel, msg: &str, target: &'static str) {
        let _ = self.try_log(level, msg, target);
    }
}

impl LoggerHandle {
    /// Queues one line stamped with the current time.
    ///
    /// # Errors
    ///
    /// `TrySendError::Full` when the queue is at capacity and
    /// `TrySendError::Disconnected` when the writer thread is gone.
    pub fn try_log<S: Into<String>>(
        &self,
        level: LogLevel,
        text: S,
        target: &'static str,
    ) -> Result<(), mpsc::TrySendError<LogMsg>> {
        self.tx
            .try_send(LogMsg::new(level, text, target, now_millis()))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use std::sync::mpsc::{TrySendError, sync_channel};

    #[test]
    fn queued_line_keeps_level_text_and_target() {
        let (tx, rx) = sync_channel::<LogMsg>(2);
        let h = LoggerHandle { tx };

        h.try_log(LogLevel::Info, "identity assigned", "peercall::call")
            .expect("queue has room");

        let msg = rx.recv().expect("a message should arrive");
        assert_eq!(msg.level, LogLevel::Info);
        assert_eq!(msg.text, "identity assigned");
        assert_eq!(msg.target, "peercall::call");
        assert!(msg.ts_ms > 0);
    }

    #[test]
    fn full_queue_drops_the_line() {
        let (tx, _rx) = sync_channel::<LogMsg>(1);
        let h = LoggerHandle { tx };

        h.try_log(LogLevel::Info, "first", "t").unwrap();
        assert!(matches!(
            h.try_log(LogLevel::Info, "second", "t"),
            Err(TrySendError::Full(_))
        ));
    }

    #[test]
    fn log_sink_impl_never_panics_without_writer() {
        let (tx, rx) = sync_channel::<LogMsg>(1);
        drop(rx);
        let h = LoggerHandle { tx };

        assert!(matches!(
            h.try_log(LogLevel::Error, "lost", "t"),
            Err(TrySendError::Disconnected(_))
        ));
        h.log(LogLevel::Error, "also lost", "t");
    }
}
