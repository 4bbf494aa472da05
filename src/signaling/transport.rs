use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;
use std::sync::mpsc::{self, Sender};
use std::thread;

use crate::log::LogSink;
use crate::signaling::protocol::{FrameError, Msg, read_msg, write_msg};
use crate::signaling::server_event::ServerEvent;
use crate::signaling::types::ConnId;
use crate::{sink_debug, sink_warn};

/// Thin wrapper over a blocking stream that speaks in [`Msg`].
pub struct Connection<S> {
    pub conn: ConnId,
    stream: S,
}

impl<S> Connection<S>
where
    S: Read + Write,
{
    pub const fn new(conn: ConnId, stream: S) -> Self {
        Self { conn, stream }
    }

    /// # Errors
    ///
    /// See [`read_msg`].
    pub fn recv(&mut self) -> Result<Msg, FrameError> {
        read_msg(&mut self.stream)
    }

    /// # Errors
    ///
    /// See [`write_msg`].
    pub fn send(&mut self, msg: &Msg) -> Result<(), FrameError> {
        write_msg(&mut self.stream, msg)
    }
}

/// Registers `stream` with the server loop and spawns its reader and writer threads.
///
/// # Errors
///
/// Fails if the socket cannot be cloned or the server loop is gone.
pub fn spawn_connection_threads(
    conn: ConnId,
    stream: TcpStream,
    server_tx: Sender<ServerEvent>,
    log: Arc<dyn LogSink>,
) -> io::Result<()> {
    let (to_client_tx, to_client_rx) = mpsc::channel::<Msg>();

    let read_stream = stream.try_clone()?;
    let write_stream = stream;

    server_tx
        .send(ServerEvent::RegisterClient {
            conn,
            to_client: to_client_tx,
        })
        .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "server loop is not running"))?;

    // READER THREAD: socket -> ServerEvent::MsgFromClient
    {
        let server_tx = server_tx.clone();
        let log = log.clone();
        thread::Builder::new()
            .name(format!("relay-reader-{conn}"))
            .spawn(move || {
                let mut c = Connection::new(conn, read_stream);
                loop {
                    match c.recv() {
                        Ok(msg) => {
                            if server_tx.send(ServerEvent::MsgFromClient { conn, msg }).is_err() {
                                break;
                            }
                        }
                        Err(FrameError::Io(e)) => {
                            sink_debug!(log, "conn {} reader closed: {} (kind={:?})", conn, e, e.kind());
                            break;
                        }
                        Err(FrameError::Proto(e)) => {
                            sink_warn!(log, "conn {} sent a bad frame: {}; dropping connection", conn, e);
                            break;
                        }
                    }
                }
                let _ = server_tx.send(ServerEvent::Disconnected { conn });
            })?;
    }

    // WRITER THREAD: to_client_rx -> socket
    thread::Builder::new()
        .name(format!("relay-writer-{conn}"))
        .spawn(move || {
            let mut c = Connection::new(conn, write_stream);
            while let Ok(msg) = to_client_rx.recv() {
                if let Err(e) = c.send(&msg) {
                    sink_warn!(log, "conn {} write failed: {}", conn, e);
                    break;
                }
            }
            // Unblocks the reader if the server side gave up first.
            let _ = c.stream.shutdown(Shutdown::Both);
            let _ = server_tx.send(ServerEvent::Disconnected { conn });
        })?;

    Ok(())
}
