use std::collections::HashMap;
use std::sync::Arc;

use crate::log::{LogSink, NoopLogSink};
use crate::signaling::protocol::Msg;
use crate::signaling::server::Server;
use crate::signaling::types::{ConnId, OutgoingMsg};

/// Router glues the [`Server`] state machine to per-connection outboxes.
pub struct Router {
    server: Server,
    outboxes: HashMap<ConnId, Vec<Msg>>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self::with_log(Arc::new(NoopLogSink))
    }

    #[must_use]
    pub fn with_log(log: Arc<dyn LogSink>) -> Self {
        Self::with_server(Server::with_log(log))
    }

    #[must_use]
    pub fn with_server(server: Server) -> Self {
        Self {
            server,
            outboxes: HashMap::new(),
        }
    }

    /// Opens an outbox for `conn` and queues its identity assignment.
    pub fn register_client(&mut self, conn: ConnId) {
        self.outboxes.entry(conn).or_default();
        let out = self.server.handle_connect(conn);
        self.enqueue_all(out);
    }

    /// Drops the outbox and lets the server forget the identity.
    pub fn unregister_client(&mut self, conn: ConnId) {
        self.outboxes.remove(&conn);
        let out = self.server.handle_disconnect(conn);
        self.enqueue_all(out);
    }

    /// Feeds one message from `conn` through the server.
    pub fn handle_from_client(&mut self, conn: ConnId, msg: Msg) {
        let out = self.server.handle(conn, msg);
        self.enqueue_all(out);
    }

    /// Drain and return all outgoing messages for a given connection.
    pub fn take_outgoing_for(&mut self, conn: ConnId) -> Vec<Msg> {
        self.outboxes
            .get_mut(&conn)
            .map(std::mem::take)
            .unwrap_or_default()
    }

    /// Drain all pending outgoing messages, as `(target, msg)` pairs.
    pub fn drain_all_outgoing(&mut self) -> Vec<(ConnId, Msg)> {
        let mut result = Vec::new();
        for (conn, msgs) in &mut self.outboxes {
            result.extend(msgs.drain(..).map(|m| (*conn, m)));
        }
        result
    }

    #[must_use]
    pub fn server(&self) -> &Server {
        &self.server
    }

    fn enqueue_all(&mut self, out: Vec<OutgoingMsg>) {
        for OutgoingMsg { conn_target, msg } in out {
            // Messages for connections that already left are dropped here.
            if let Some(queue) = self.outboxes.get_mut(&conn_target) {
                queue.push(msg);
            }
        }
    }
}
