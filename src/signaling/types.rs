use crate::signaling::protocol::Msg;

/// Relay-internal handle for one TCP connection. Never leaves the server.
pub type ConnId = u64;

/// A message the server wants to send to a connection.
#[derive(Debug)]
pub struct OutgoingMsg {
    pub conn_target: ConnId,
    pub msg: Msg,
}

impl OutgoingMsg {
    #[must_use]
    pub const fn new(conn_target: ConnId, msg: Msg) -> Self {
        Self { conn_target, msg }
    }
}
