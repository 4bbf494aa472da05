use crate::signaling::protocol::{ClientIdentity, Msg, SignalPayload};
use crate::signaling_client::call_messages::IncomingInvite;

/// Everything the relay can tell a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalingEvent {
    IdentityAssigned(ClientIdentity),
    /// This client is the target of someone's invite.
    Invite(IncomingInvite),
    /// The party this client invited answered.
    Accepted(SignalPayload),
    /// The relay connection is gone.
    Disconnected,
}

impl SignalingEvent {
    /// Maps a server→client message to an event. Keepalives and client-only
    /// messages map to `None`.
    #[must_use]
    pub fn from_server_msg(msg: Msg) -> Option<Self> {
        match msg {
            Msg::IdentityAssigned { client_id } => Some(Self::IdentityAssigned(client_id)),
            Msg::IncomingInvite { signal, from, name } => Some(Self::Invite(IncomingInvite {
                from_id: from,
                display_name: name,
                signal_payload: signal,
            })),
            Msg::Accepted { signal } => Some(Self::Accepted(signal)),
            Msg::Hello { .. }
            | Msg::Invite { .. }
            | Msg::Accept { .. }
            | Msg::Ping { .. }
            | Msg::Pong { .. } => None,
        }
    }

    /// Short name for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::IdentityAssigned(_) => "IdentityAssigned",
            Self::Invite(_) => "Invite",
            Self::Accepted(_) => "Accepted",
            Self::Disconnected => "Disconnected",
        }
    }
}
