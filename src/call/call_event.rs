use crate::signaling::protocol::ClientIdentity;

/// Notable things that happened during [`CallClient::poll`](crate::call::CallClient::poll).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallEvent {
    IdentityAssigned(ClientIdentity),
    IncomingCall { from: ClientIdentity, name: String },
    /// An invite arrived while a call was live and was discarded.
    InviteDropped { from: ClientIdentity },
    InviteSent { target: ClientIdentity },
    AcceptanceSent { to: ClientIdentity },
    /// The callee accepted our invite.
    Accepted,
    RemoteStreamStarted,
    /// The media link to the peer closed.
    Ended,
    SignalingLost,
    Error(String),
}
