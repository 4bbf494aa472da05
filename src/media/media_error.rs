use std::fmt;

/// Why local capture could not start (or stopped producing frames).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    PermissionDenied,
    NoDevice,
    Initialization(String),
    Capture(String),
}

impl fmt::Display for MediaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use MediaError::{Capture, Initialization, NoDevice, PermissionDenied};
        match self {
            PermissionDenied => write!(f, "access to capture devices was denied"),
            NoDevice => write!(f, "no capture device available"),
            Initialization(msg) => write!(f, "capture initialization failed: {msg}"),
            Capture(msg) => write!(f, "failed to capture frame: {msg}"),
        }
    }
}

impl std::error::Error for MediaError {}
