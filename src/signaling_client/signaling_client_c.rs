use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use crate::log::LogSink;
use crate::signaling::protocol::{FrameError, Msg, read_msg, write_msg};
use crate::signaling_client::{
    call_messages::{CallAcceptance, CallInvite},
    signaling_channel::SignalingChannel,
    signaling_client_error::SignalingClientError,
    signaling_command::SignalingCommand,
    signaling_event::SignalingEvent,
};
use crate::{sink_debug, sink_info, sink_warn};

const CLIENT_VERSION: &str = concat!("peercall/", env!("CARGO_PKG_VERSION"));

/// One persistent connection to the relay.
///
/// Owns a reader thread (socket → events) and a writer thread (commands →
/// socket). Constructed explicitly and handed to the call layer; there is no
/// process-wide connection.
pub struct SignalingClient {
    cmd_tx: Sender<SignalingCommand>,
    events_rx: Receiver<SignalingEvent>,
    server_addr: SocketAddr,
    log: Arc<dyn LogSink>,
}

impl SignalingClient {
    /// Connects, spawns the I/O threads and sends `Hello`.
    ///
    /// The relay answers with `IdentityAssigned`, delivered through
    /// [`try_recv`](SignalingChannel::try_recv) like every other event.
    ///
    /// # Errors
    ///
    /// [`SignalingClientError::Io`] if the connection or the threads cannot be set up.
    pub fn connect<A: ToSocketAddrs>(
        addr: A,
        log: Arc<dyn LogSink>,
    ) -> Result<Self, SignalingClientError> {
        let stream = TcpStream::connect(addr)?;
        let _ = stream.set_nodelay(true);
        let server_addr = stream.peer_addr()?;
        let read_stream = stream.try_clone()?;

        let (cmd_tx, cmd_rx) = mpsc::channel::<SignalingCommand>();
        let (ev_tx, events_rx) = mpsc::channel::<SignalingEvent>();

        {
            let log = log.clone();
            thread::Builder::new()
                .name("signaling-writer".into())
                .spawn(move || writer_loop(stream, &cmd_rx, &log))?;
        }
        {
            let log = log.clone();
            let pong_tx = cmd_tx.clone();
            thread::Builder::new()
                .name("signaling-reader".into())
                .spawn(move || reader_loop(read_stream, &ev_tx, &pong_tx, &log))?;
        }

        sink_info!(log, "connected to relay at {}", server_addr);

        let client = Self {
            cmd_tx,
            events_rx,
            server_addr,
            log,
        };
        client.send(Msg::Hello {
            client_version: CLIENT_VERSION.to_string(),
        })?;
        Ok(client)
    }

    #[must_use]
    pub const fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    /// Queues any message for the writer thread.
    ///
    /// # Errors
    ///
    /// [`SignalingClientError::Disconnected`] once the writer has exited.
    pub fn send(&self, msg: Msg) -> Result<(), SignalingClientError> {
        self.cmd_tx
            .send(SignalingCommand::Send(msg))
            .map_err(|_| SignalingClientError::Disconnected)
    }

    /// Blocks up to `timeout` for the next event.
    #[must_use]
    pub fn recv_timeout(&self, timeout: Duration) -> Option<SignalingEvent> {
        self.events_rx.recv_timeout(timeout).ok()
    }

    /// Closes the connection; a `Disconnected` event follows.
    pub fn disconnect(&self) {
        let _ = self.cmd_tx.send(SignalingCommand::Disconnect);
    }
}

impl SignalingChannel for SignalingClient {
    fn send_invite(&self, invite: CallInvite) -> Result<(), SignalingClientError> {
        sink_debug!(
            self.log,
            "sending invite to {:?} ({} byte signal)",
            invite.target_id.as_str(),
            invite.signal_payload.len()
        );
        self.send(invite.into())
    }

    fn send_acceptance(&self, acceptance: CallAcceptance) -> Result<(), SignalingClientError> {
        sink_debug!(
            self.log,
            "sending acceptance to {} ({} byte signal)",
            acceptance.to_id,
            acceptance.signal_payload.len()
        );
        self.send(acceptance.into())
    }

    fn try_recv(&self) -> Option<SignalingEvent> {
        self.events_rx.try_recv().ok()
    }
}

impl Drop for SignalingClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn writer_loop(mut stream: TcpStream, cmd_rx: &Receiver<SignalingCommand>, log: &Arc<dyn LogSink>) {
    while let Ok(cmd) = cmd_rx.recv() {
        match cmd {
            SignalingCommand::Send(msg) => {
                if let Err(e) = write_msg(&mut stream, &msg) {
                    sink_warn!(log, "relay write of {} failed: {}", msg.name(), e);
                    break;
                }
            }
            SignalingCommand::Disconnect => break,
        }
    }
    // Wakes the reader so it reports Disconnected.
    let _ = stream.shutdown(Shutdown::Both);
}

fn reader_loop(
    mut stream: TcpStream,
    ev_tx: &Sender<SignalingEvent>,
    pong_tx: &Sender<SignalingCommand>,
    log: &Arc<dyn LogSink>,
) {
    loop {
        match read_msg(&mut stream) {
            Ok(Msg::Ping { nonce }) => {
                let _ = pong_tx.send(SignalingCommand::Send(Msg::Pong { nonce }));
            }
            Ok(msg) => {
                let name = msg.name();
                match SignalingEvent::from_server_msg(msg) {
                    Some(ev) => {
                        if ev_tx.send(ev).is_err() {
                            break;
                        }
                    }
                    None => sink_debug!(log, "ignoring {} from relay", name),
                }
            }
            Err(FrameError::Io(e)) => {
                sink_info!(log, "relay connection closed: {}", e);
                break;
            }
            Err(FrameError::Proto(e)) => {
                sink_warn!(log, "bad frame from relay: {}; closing", e);
                break;
            }
        }
    }
    let _ = ev_tx.send(SignalingEvent::Disconnected);
    let _ = pong_tx.send(SignalingCommand::Disconnect);
}
