use crate::signaling::protocol::{ClientIdentity, Msg, SignalPayload};

/// Caller's request to be connected to `target_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallInvite {
    pub target_id: ClientIdentity,
    pub signal_payload: SignalPayload,
    pub from_id: ClientIdentity,
    pub display_name: String,
}

/// Callee's reply, routed back to the original caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallAcceptance {
    pub signal_payload: SignalPayload,
    pub to_id: ClientIdentity,
}

/// What the callee sees of someone else's [`CallInvite`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingInvite {
    pub from_id: ClientIdentity,
    pub display_name: String,
    pub signal_payload: SignalPayload,
}

impl From<CallInvite> for Msg {
    fn from(i: CallInvite) -> Self {
        Self::Invite {
            user_to_call: i.target_id,
            signal_data: i.signal_payload,
            from: i.from_id,
            name: i.display_name,
        }
    }
}

impl From<CallAcceptance> for Msg {
    fn from(a: CallAcceptance) -> Self {
        Self::Accept {
            signal: a.signal_payload,
            to: a.to_id,
        }
    }
}
