use crate::signaling::protocol::Msg;

/// Commands from the application into the client's writer thread.
#[derive(Debug)]
pub enum SignalingCommand {
    Send(Msg),
    Disconnect,
}
