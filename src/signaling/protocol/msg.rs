use super::{ClientIdentity, SignalPayload};

/// Every message that crosses the relay connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    Hello {
        client_version: String,
    },
    /// Sent once, right after connect.
    IdentityAssigned {
        client_id: ClientIdentity,
    },

    /// Caller → relay.
    Invite {
        user_to_call: ClientIdentity,
        signal_data: SignalPayload,
        from: ClientIdentity,
        name: String,
    },
    /// Relay → callee.
    IncomingInvite {
        signal: SignalPayload,
        from: ClientIdentity,
        name: String,
    },
    /// Callee → relay.
    Accept {
        signal: SignalPayload,
        to: ClientIdentity,
    },
    /// Relay → caller.
    Accepted {
        signal: SignalPayload,
    },

    Ping {
        nonce: u64,
    },
    Pong {
        nonce: u64,
    },
}

impl Msg {
    /// Short variant name for logging; payloads are never logged.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Hello { .. } => "Hello",
            Self::IdentityAssigned { .. } => "IdentityAssigned",
            Self::Invite { .. } => "Invite",
            Self::IncomingInvite { .. } => "IncomingInvite",
            Self::Accept { .. } => "Accept",
            Self::Accepted { .. } => "Accepted",
            Self::Ping { .. } => "Ping",
            Self::Pong { .. } => "Pong",
        }
    }
}
