use crate::negotiation::remote_stream::RemoteStream;
use crate::signaling::protocol::SignalPayload;

/// What a negotiator reports back to its owner.
#[derive(Debug, Clone)]
pub enum NegotiationEvent {
    /// A payload that must reach the peer through signaling.
    LocalSignal(SignalPayload),
    /// Media from the peer is flowing.
    RemoteStream(RemoteStream),
    /// The transport went away.
    Close,
    Error(String),
}

impl NegotiationEvent {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::LocalSignal(_) => "LocalSignal",
            Self::RemoteStream(_) => "RemoteStream",
            Self::Close => "Close",
            Self::Error(_) => "Error",
        }
    }
}
