use std::sync::mpsc::Sender;

use crate::signaling::{protocol::Msg, types::ConnId};

/// Events sent *to* the central server thread.
pub enum ServerEvent {
    /// A new connection is up; `to_client` feeds its writer thread.
    RegisterClient {
        conn: ConnId,
        to_client: Sender<Msg>,
    },

    /// A connection sent a message.
    MsgFromClient { conn: ConnId, msg: Msg },

    /// The connection closed or errored.
    Disconnected { conn: ConnId },
}
