//! Leveled logging macros for any [`LogSink`](crate::log::LogSink) or [`Logger`](crate::log::Logger).
//!
//! Levels are switched on at compile time through the cargo features
//! `log-trace`, `log-debug`, `log-info`, `log-warn` and `log-error`. A disabled
//! level still type-checks its sink and arguments but sits behind `if false`,
//! so nothing is formatted at runtime.

#[macro_export]
macro_rules! sink_log {
    ($sink:expr, $lvl:expr, $($arg:tt)*) => {{
        let __msg = format!($($arg)*);
        $sink.log($lvl, &__msg, module_path!());
    }};
}

#[macro_export]
macro_rules! logger_log {
    ($logger:expr, $lvl:expr, $($arg:tt)*) => {{
        let __msg = format!($($arg)*);
        let _ = $logger.try_log($lvl, __msg, module_path!());
    }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! sink_off {
    ($sink:expr, $($arg:tt)*) => {{
        if false {
            $crate::sink_log!($sink, $crate::log::log_level::LogLevel::Trace, $($arg)*);
        }
    }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! logger_off {
    ($logger:expr, $($arg:tt)*) => {{
        if false {
            $crate::logger_log!($logger, $crate::log::log_level::LogLevel::Trace, $($arg)*);
        }
    }};
}

// ---------------------- TRACE ----------------------
#[cfg(feature = "log-trace")]
#[macro_export]
macro_rules! sink_trace   { ($sink:expr, $($arg:tt)*)   => { $crate::sink_log!($sink, $crate::log::log_level::LogLevel::Trace, $($arg)*) } }
#[cfg(feature = "log-trace")]
#[macro_export]
macro_rules! logger_trace { ($logger:expr, $($arg:tt)*) => { $crate::logger_log!($logger, $crate::log::log_level::LogLevel::Trace, $($arg)*) } }

#[cfg(not(feature = "log-trace"))]
#[macro_export]
macro_rules! sink_trace {
    ($sink:expr, $($arg:tt)*) => {
        $crate::sink_off!($sink, $($arg)*)
    };
}
#[cfg(not(feature = "log-trace"))]
#[macro_export]
macro_rules! logger_trace {
    ($logger:expr, $($arg:tt)*) => {
        $crate::logger_off!($logger, $($arg)*)
    };
}

// ---------------------- DEBUG ----------------------
#[cfg(feature = "log-debug")]
#[macro_export]
macro_rules! sink_debug   { ($sink:expr, $($arg:tt)*)   => { $crate::sink_log!($sink, $crate::log::log_level::LogLevel::Debug, $($arg)*) } }
#[cfg(feature = "log-debug")]
#[macro_export]
macro_rules! logger_debug { ($logger:expr, $($arg:tt)*) => { $crate::logger_log!($logger, $crate::log::log_level::LogLevel::Debug, $($arg)*) } }

#[cfg(not(feature = "log-debug"))]
#[macro_export]
macro_rules! sink_debug {
    ($sink:expr, $($arg:tt)*) => {
        $crate::sink_off!($sink, $($arg)*)
    };
}
#[cfg(not(feature = "log-debug"))]
#[macro_export]
macro_rules! logger_debug {
    ($logger:expr, $($arg:tt)*) => {
        $crate::logger_off!($logger, $($arg)*)
    };
}

// ---------------------- INFO ----------------------
#[cfg(feature = "log-info")]
#[macro_export]
macro_rules! sink_info   { ($sink:expr, $($arg:tt)*)   => { $crate::sink_log!($sink, $crate::log::log_level::LogLevel::Info, $($arg)*) } }
#[cfg(feature = "log-info")]
#[macro_export]
macro_rules! logger_info { ($logger:expr, $($arg:tt)*) => { $crate::logger_log!($logger, $crate::log::log_level::LogLevel::Info, $($arg)*) } }

#[cfg(not(feature = "log-info"))]
#[macro_export]
macro_rules! sink_info {
    ($sink:expr, $($arg:tt)*) => {
        $crate::sink_off!($sink, $($arg)*)
    };
}
#[cfg(not(feature = "log-info"))]
#[macro_export]
macro_rules! logger_info {
    ($logger:expr, $($arg:tt)*) => {
        $crate::logger_off!($logger, $($arg)*)
    };
}

// ---------------------- WARN ----------------------
#[cfg(feature = "log-warn")]
#[macro_export]
macro_rules! sink_warn   { ($sink:expr, $($arg:tt)*)   => { $crate::sink_log!($sink, $crate::log::log_level::LogLevel::Warn, $($arg)*) } }
#[cfg(feature = "log-warn")]
#[macro_export]
macro_rules! logger_warn { ($logger:expr, $($arg:tt)*) => { $crate::logger_log!($logger, $crate::log::log_level::LogLevel::Warn, $($arg)*) } }

#[cfg(not(feature = "log-warn"))]
#[macro_export]
macro_rules! sink_warn {
    ($sink:expr, $($arg:tt)*) => {
        $crate::sink_off!($sink, $($arg)*)
    };
}
#[cfg(not(feature = "log-warn"))]
#[macro_export]
macro_rules! logger_warn {
    ($logger:expr, $($arg:tt)*) => {
        $crate::logger_off!($logger, $($arg)*)
    };
}

// ---------------------- ERROR ----------------------
#[cfg(feature = "log-error")]
#[macro_export]
macro_rules! sink_error   { ($sink:expr, $($arg:tt)*)   => { $crate::sink_log!($sink, $crate::log::log_level::LogLevel::Error, $($arg)*) } }
#[cfg(feature = "log-error")]
#[macro_export]
macro_rules! logger_error { ($logger:expr, $($arg:tt)*) => { $crate::logger_log!($logger, $crate::log::log_level::LogLevel::Error, $($arg)*) } }

#[cfg(not(feature = "log-error"))]
#[macro_export]
macro_rules! sink_error {
    ($sink:expr, $($arg:tt)*) => {
        $crate::sink_off!($sink, $($arg)*)
    };
}
#[cfg(not(feature = "log-error"))]
#[macro_export]
macro_rules! logger_error {
    ($logger:expr, $($arg:tt)*) => {
        $crate::logger_off!($logger, $($arg)*)
    };
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use crate::log::log_level::LogLevel;
    use crate::log::LogSink;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(LogLevel, String)>>);

    impl LogSink for Recorder {
        fn log(&self, level: LogLevel, msg: &str, _target: &'static str) {
            self.0.lock().unwrap().push((level, msg.to_string()));
        }
    }

    #[test]
    fn enabled_level_formats_and_forwards() {
        let sink = Recorder::default();
        let peer = "abc123";
        crate::sink_error!(sink, "lost {}", peer);
        assert_eq!(
            sink.0.lock().unwrap().as_slice(),
            &[(LogLevel::Error, "lost abc123".to_string())]
        );
    }

    #[cfg(not(feature = "log-trace"))]
    #[test]
    fn disabled_level_uses_its_arguments_without_logging() {
        let sink = Recorder::default();
        // only referenced by the disabled call; must not warn as unused
        let detail = String::from("datagram from 10.0.0.2");
        crate::sink_trace!(sink, "dropping {}", detail);
        crate::sink_off!(&sink, "{}", detail.len());
        assert!(sink.0.lock().unwrap().is_empty());
    }
}
