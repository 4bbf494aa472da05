use std::sync::Arc;

use crate::log::{LogSink, NoopLogSink};
use crate::signaling::identity::IdentityGenerator;
use crate::signaling::protocol::{ClientIdentity, Msg, SignalPayload};
use crate::signaling::registry::Registry;
use crate::signaling::types::{ConnId, OutgoingMsg};
use crate::{sink_debug, sink_info, sink_warn};

/// Attempts at drawing an unused identity before suffixing the connection id.
const MAX_ID_ATTEMPTS: usize = 16;

/// Relay state machine: assigns identities and routes invites/acceptances.
///
/// Pure message-in, messages-out; it owns no sockets. Payloads are moved
/// from the incoming message into the outgoing one untouched.
pub struct Server {
    registry: Registry,
    ids: IdentityGenerator,
    log: Arc<dyn LogSink>,
}

impl Default for Server {
    fn default() -> Self {
        Self::new()
    }
}

impl Server {
    #[must_use]
    pub fn new() -> Self {
        Self::with_log(Arc::new(NoopLogSink))
    }

    #[must_use]
    pub fn with_log(log: Arc<dyn LogSink>) -> Self {
        Self::with_generator(log, IdentityGenerator::random())
    }

    #[must_use]
    pub fn with_generator(log: Arc<dyn LogSink>, ids: IdentityGenerator) -> Self {
        Self {
            registry: Registry::new(),
            ids,
            log,
        }
    }

    /// A new connection: allocate its identity and tell it.
    pub fn handle_connect(&mut self, conn: ConnId) -> Vec<OutgoingMsg> {
        let id = self.alloc_identity(conn);
        self.registry.bind(conn, id.clone());
        sink_info!(
            self.log,
            "conn {} assigned identity {} ({} connected)",
            conn,
            id,
            self.registry.len()
        );
        vec![OutgoingMsg::new(conn, Msg::IdentityAssigned { client_id: id })]
    }

    /// Connection closed: the identity dies with it. Nobody is notified.
    pub fn handle_disconnect(&mut self, conn: ConnId) -> Vec<OutgoingMsg> {
        if let Some(id) = self.registry.remove(conn) {
            sink_info!(self.log, "conn {} ({}) disconnected", conn, id);
        }
        Vec::new()
    }

    /// Main entrypoint: handle a message from a connection.
    pub fn handle(&mut self, from: ConnId, msg: Msg) -> Vec<OutgoingMsg> {
        match msg {
            Msg::Hello { client_version } => {
                sink_debug!(self.log, "conn {} HELLO (version {})", from, client_version);
                Vec::new()
            }

            Msg::Invite {
                user_to_call,
                signal_data,
                from: caller,
                name,
            } => self.relay_invite(from, &user_to_call, signal_data, caller, name),

            Msg::Accept { signal, to } => self.relay_accept(from, &to, signal),

            Msg::Ping { nonce } => vec![OutgoingMsg::new(from, Msg::Pong { nonce })],

            Msg::Pong { .. } => Vec::new(),

            Msg::IdentityAssigned { .. } | Msg::IncomingInvite { .. } | Msg::Accepted { .. } => {
                sink_warn!(
                    self.log,
                    "ignoring server-only msg {} from conn {}",
                    msg.name(),
                    from
                );
                Vec::new()
            }
        }
    }

    #[must_use]
    pub fn identity_of(&self, conn: ConnId) -> Option<&ClientIdentity> {
        self.registry.identity_for(conn)
    }

    #[must_use]
    pub fn connected(&self) -> usize {
        self.registry.len()
    }

    // ---- Individual handlers ---------------------------------------------

    fn relay_invite(
        &self,
        from_conn: ConnId,
        target: &ClientIdentity,
        signal: SignalPayload,
        caller: ClientIdentity,
        name: String,
    ) -> Vec<OutgoingMsg> {
        // Unknown target: dropped, the caller gets no error.
        let Some(target_conn) = self.registry.conn_for(target) else {
            sink_warn!(
                self.log,
                "invite from conn {} to unknown identity {:?} dropped",
                from_conn,
                target.as_str()
            );
            return Vec::new();
        };

        sink_info!(
            self.log,
            "relaying invite {} -> {} ({} byte signal)",
            caller,
            target,
            signal.len()
        );
        vec![OutgoingMsg::new(
            target_conn,
            Msg::IncomingInvite {
                signal,
                from: caller,
                name,
            },
        )]
    }

    fn relay_accept(
        &self,
        from_conn: ConnId,
        to: &ClientIdentity,
        signal: SignalPayload,
    ) -> Vec<OutgoingMsg> {
        let Some(caller_conn) = self.registry.conn_for(to) else {
            sink_warn!(
                self.log,
                "acceptance from conn {} to unknown identity {:?} dropped",
                from_conn,
                to.as_str()
            );
            return Vec::new();
        };

        sink_info!(
            self.log,
            "relaying acceptance conn {} -> {} ({} byte signal)",
            from_conn,
            to,
            signal.len()
        );
        vec![OutgoingMsg::new(caller_conn, Msg::Accepted { signal })]
    }

    fn alloc_identity(&mut self, conn: ConnId) -> ClientIdentity {
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = self.ids.next_id();
            if !id.is_empty() && !self.registry.contains(&id) {
                return id;
            }
        }
        // The generator keeps colliding; the connection id makes it unique.
        let base = self.ids.next_id();
        ClientIdentity::from(format!("{base}-{conn}"))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    fn server(ids: Vec<&str>) -> Server {
        Server::with_generator(Arc::new(NoopLogSink), IdentityGenerator::scripted(ids))
    }

    fn single(mut out: Vec<OutgoingMsg>) -> OutgoingMsg {
        assert_eq!(out.len(), 1, "expected exactly one outgoing message");
        out.remove(0)
    }

    #[test]
    fn connect_assigns_identity_to_that_connection() {
        let mut s = server(vec!["abc123"]);
        let out = single(s.handle_connect(7));
        assert_eq!(out.conn_target, 7);
        assert_eq!(
            out.msg,
            Msg::IdentityAssigned {
                client_id: "abc123".into()
            }
        );
        assert_eq!(s.identity_of(7).map(ClientIdentity::as_str), Some("abc123"));
    }

    #[test]
    fn colliding_identity_is_redrawn() {
        let mut s = server(vec!["same", "same", "other"]);
        s.handle_connect(1);
        let out = single(s.handle_connect(2));
        assert_eq!(
            out.msg,
            Msg::IdentityAssigned {
                client_id: "other".into()
            }
        );
    }

    #[test]
    fn invite_is_routed_to_target_with_payload_untouched() {
        let mut s = server(vec!["abc123", "xyz789"]);
        s.handle_connect(1);
        s.handle_connect(2);

        let payload = SignalPayload::new(vec![0, 159, 146, 150, 255]);
        let out = single(s.handle(
            1,
            Msg::Invite {
                user_to_call: "xyz789".into(),
                signal_data: payload.clone(),
                from: "abc123".into(),
                name: "Ana".into(),
            },
        ));

        assert_eq!(out.conn_target, 2);
        assert_eq!(
            out.msg,
            Msg::IncomingInvite {
                signal: payload,
                from: "abc123".into(),
                name: "Ana".into(),
            }
        );
    }

    #[test]
    fn accept_is_routed_back_to_caller() {
        let mut s = server(vec!["abc123", "xyz789"]);
        s.handle_connect(1);
        s.handle_connect(2);

        let out = single(s.handle(
            2,
            Msg::Accept {
                signal: SignalPayload::new(b"answer".to_vec()),
                to: "abc123".into(),
            },
        ));
        assert_eq!(out.conn_target, 1);
        assert_eq!(
            out.msg,
            Msg::Accepted {
                signal: SignalPayload::new(b"answer".to_vec())
            }
        );
    }

    #[test]
    fn invite_to_unknown_or_empty_identity_is_silently_dropped() {
        let mut s = server(vec!["abc123"]);
        s.handle_connect(1);

        for target in ["nobody", ""] {
            let out = s.handle(
                1,
                Msg::Invite {
                    user_to_call: target.into(),
                    signal_data: SignalPayload::new(b"offer".to_vec()),
                    from: "abc123".into(),
                    name: String::new(),
                },
            );
            assert!(out.is_empty(), "no error may be surfaced for {target:?}");
        }
    }

    #[test]
    fn identity_is_gone_after_disconnect() {
        let mut s = server(vec!["abc123", "xyz789"]);
        s.handle_connect(1);
        s.handle_connect(2);
        assert!(s.handle_disconnect(2).is_empty());

        let out = s.handle(
            1,
            Msg::Invite {
                user_to_call: "xyz789".into(),
                signal_data: SignalPayload::default(),
                from: "abc123".into(),
                name: String::new(),
            },
        );
        assert!(out.is_empty());
        assert_eq!(s.connected(), 1);
    }

    #[test]
    fn ping_gets_pong_and_server_only_msgs_are_ignored() {
        let mut s = server(vec!["abc123"]);
        s.handle_connect(1);

        let out = single(s.handle(1, Msg::Ping { nonce: 5 }));
        assert_eq!(out.msg, Msg::Pong { nonce: 5 });

        assert!(s
            .handle(
                1,
                Msg::Accepted {
                    signal: SignalPayload::default()
                }
            )
            .is_empty());
    }
}
