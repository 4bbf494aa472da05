use std::io;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::sync::{Arc, mpsc};
use std::thread;

use crate::log::{LogSink, NoopLogSink};
use crate::signaling::identity::IdentityGenerator;
use crate::signaling::router::Router;
use crate::signaling::runtime::run_server_loop;
use crate::signaling::server::Server;
use crate::signaling::server_event::ServerEvent;
use crate::signaling::transport::spawn_connection_threads;
use crate::signaling::types::ConnId;
use crate::{sink_info, sink_warn};

/// Top-level runtime object for the relay.
///
/// Owns the bound listener, the log sink and the identity source, and knows how
/// to spin up the central Router+Server loop plus per-connection threads.
pub struct SignalingServer {
    listener: TcpListener,
    log: Arc<dyn LogSink>,
    ids: IdentityGenerator,
}

impl SignalingServer {
    /// Binds the listener now so callers can learn the port before `run`.
    ///
    /// # Errors
    ///
    /// Any bind error.
    pub fn bind<A: ToSocketAddrs>(addr: A, log: Arc<dyn LogSink>) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        Ok(Self {
            listener,
            log,
            ids: IdentityGenerator::random(),
        })
    }

    /// # Errors
    ///
    /// Any bind error.
    pub fn bind_no_log<A: ToSocketAddrs>(addr: A) -> io::Result<Self> {
        Self::bind(addr, Arc::new(NoopLogSink))
    }

    /// Replaces the random identity source (tests use scripted ids).
    #[must_use]
    pub fn with_identities(mut self, ids: IdentityGenerator) -> Self {
        self.ids = ids;
        self
    }

    /// # Errors
    ///
    /// If the OS cannot report the bound address.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Blocking main loop: spawn the central server loop, then accept forever.
    ///
    /// # Errors
    ///
    /// If the server loop thread cannot be spawned.
    pub fn run(self) -> io::Result<()> {
        let Self { listener, log, ids } = self;

        let (server_tx, server_rx) = mpsc::channel::<ServerEvent>();

        {
            let log_for_loop = log.clone();
            let router = Router::with_server(Server::with_generator(log.clone(), ids));
            thread::Builder::new()
                .name("relay-server-loop".into())
                .spawn(move || run_server_loop(router, log_for_loop, server_rx))?;
        }

        if let Ok(addr) = listener.local_addr() {
            sink_info!(log, "relay listening on {}", addr);
        }

        let mut next_conn: ConnId = 1;
        for stream in listener.incoming() {
            let stream = match stream {
                Ok(s) => s,
                Err(e) => {
                    sink_warn!(log, "accept failed: {} (continuing)", e);
                    continue;
                }
            };
            let _ = stream.set_nodelay(true);

            let conn = next_conn;
            next_conn += 1;

            if let Ok(peer) = stream.peer_addr() {
                sink_info!(log, "accepted {} as conn {}", peer, conn);
            }

            if let Err(e) = spawn_connection_threads(conn, stream, server_tx.clone(), log.clone()) {
                sink_warn!(log, "could not start conn {}: {}", conn, e);
            }
        }

        Ok(())
    }

    /// Runs the relay on a background thread.
    ///
    /// # Errors
    ///
    /// If the thread cannot be spawned.
    pub fn spawn(self) -> io::Result<thread::JoinHandle<io::Result<()>>> {
        thread::Builder::new()
            .name("relay-accept".into())
            .spawn(move || self.run())
    }
}
