use std::{fmt, io};

use crate::signaling::protocol::FrameError;

/// Errors surfaced by the signaling client.
///
/// Sends are fire-and-forget: the only thing a send can report is that the
/// writer thread has already exited.
#[derive(Debug)]
pub enum SignalingClientError {
    Io(io::Error),
    Frame(FrameError),
    Disconnected,
}

impl fmt::Display for SignalingClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {e}"),
            Self::Frame(e) => write!(f, "protocol error: {e}"),
            Self::Disconnected => write!(f, "signaling client disconnected"),
        }
    }
}

impl std::error::Error for SignalingClientError {}

impl From<io::Error> for SignalingClientError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<FrameError> for SignalingClientError {
    fn from(e: FrameError) -> Self {
        Self::Frame(e)
    }
}
