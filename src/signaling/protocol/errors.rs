use std::{fmt, io};

/// Body parsing and format errors.
#[derive(Debug)]
pub enum ProtoError {
    UnknownType(u8),
    Truncated,
    InvalidUtf8,
    TooLarge,
    InvalidFormat(&'static str),
    StringTooLong { max: usize, actual: usize },
}

impl fmt::Display for ProtoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownType(t) => write!(f, "unknown message type 0x{t:02x}"),
            Self::Truncated => write!(f, "truncated message body"),
            Self::InvalidUtf8 => write!(f, "string is not valid UTF-8"),
            Self::TooLarge => write!(f, "frame body exceeds limit"),
            Self::InvalidFormat(why) => write!(f, "invalid format: {why}"),
            Self::StringTooLong { max, actual } => {
                write!(f, "string of {actual} bytes exceeds {max}")
            }
        }
    }
}

impl std::error::Error for ProtoError {}

/// Frame-level error wrapper: IO vs protocol.
#[derive(Debug)]
pub enum FrameError {
    Io(io::Error),
    Proto(ProtoError),
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Proto(e) => write!(f, "protocol: {e}"),
        }
    }
}

impl std::error::Error for FrameError {}

impl From<io::Error> for FrameError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<ProtoError> for FrameError {
    fn from(e: ProtoError) -> Self {
        Self::Proto(e)
    }
}
