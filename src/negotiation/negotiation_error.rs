use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NegotiationError {
    /// The remote payload could not be understood.
    InvalidSignal(String),
    /// A remote payload arrived when none (or no more) was expected.
    UnexpectedSignal,
    /// The negotiator was already torn down.
    Destroyed,
    Io(String),
}

impl fmt::Display for NegotiationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSignal(why) => write!(f, "invalid signal payload: {why}"),
            Self::UnexpectedSignal => write!(f, "remote signal already applied"),
            Self::Destroyed => write!(f, "negotiator destroyed"),
            Self::Io(e) => write!(f, "link io error: {e}"),
        }
    }
}

impl std::error::Error for NegotiationError {}

impl From<std::io::Error> for NegotiationError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
