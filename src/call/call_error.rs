use std::fmt;

use crate::call::call_state::CallState;
use crate::negotiation::NegotiationError;
use crate::signaling_client::SignalingClientError;

#[derive(Debug)]
pub enum CallError {
    /// A live session already exists; only one call at a time.
    CallInProgress,
    NoPendingInvite,
    /// An event that the current state does not allow.
    InvalidTransition { state: CallState, event: &'static str },
    Signaling(SignalingClientError),
    Negotiation(NegotiationError),
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CallInProgress => write!(f, "a call is already in progress"),
            Self::NoPendingInvite => write!(f, "there is no incoming call to answer"),
            Self::InvalidTransition { state, event } => {
                write!(f, "{event} is not valid while {state}")
            }
            Self::Signaling(e) => write!(f, "signaling: {e}"),
            Self::Negotiation(e) => write!(f, "negotiation: {e}"),
        }
    }
}

impl std::error::Error for CallError {}

impl From<SignalingClientError> for CallError {
    fn from(e: SignalingClientError) -> Self {
        Self::Signaling(e)
    }
}

impl From<NegotiationError> for CallError {
    fn from(e: NegotiationError) -> Self {
        Self::Negotiation(e)
    }
}
