use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use crate::signaling::protocol::Msg;
use crate::signaling::router::Router;
use crate::signaling::server::Server;
use crate::signaling::types::ConnId;
use crate::signaling_client::{
    call_messages::{CallAcceptance, CallInvite},
    signaling_channel::SignalingChannel,
    signaling_client_error::SignalingClientError,
    signaling_event::SignalingEvent,
};

struct RelayInner {
    router: Router,
    next_conn: ConnId,
}

/// In-process relay: the real [`Router`]/[`Server`] pair without sockets.
///
/// Every [`MemoryChannel`] handed out by [`connect`](Self::connect) behaves
/// like a TCP client of the relay, so call-layer code and tests exercise the
/// same routing rules as production.
#[derive(Clone)]
pub struct MemoryRelay {
    inner: Arc<Mutex<RelayInner>>,
}

impl Default for MemoryRelay {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRelay {
    #[must_use]
    pub fn new() -> Self {
        Self::with_server(Server::new())
    }

    #[must_use]
    pub fn with_server(server: Server) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RelayInner {
                router: Router::with_server(server),
                next_conn: 1,
            })),
        }
    }

    /// Registers a new client; its identity arrives as the first event.
    #[must_use]
    pub fn connect(&self) -> MemoryChannel {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let conn = inner.next_conn;
        inner.next_conn += 1;
        inner.router.register_client(conn);
        MemoryChannel {
            relay: self.inner.clone(),
            conn,
            inbox: RefCell::new(VecDeque::new()),
            closed: Cell::new(false),
        }
    }

    /// Number of live clients.
    #[must_use]
    pub fn connected(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .router
            .server()
            .connected()
    }
}

/// One client's end of a [`MemoryRelay`].
pub struct MemoryChannel {
    relay: Arc<Mutex<RelayInner>>,
    conn: ConnId,
    inbox: RefCell<VecDeque<SignalingEvent>>,
    closed: Cell<bool>,
}

impl MemoryChannel {
    fn push(&self, msg: Msg) -> Result<(), SignalingClientError> {
        if self.closed.get() {
            return Err(SignalingClientError::Disconnected);
        }
        self.relay
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .router
            .handle_from_client(self.conn, msg);
        Ok(())
    }

    /// Leaves the relay; the identity is released and a `Disconnected` event queued.
    pub fn disconnect(&self) {
        if self.closed.replace(true) {
            return;
        }
        self.relay
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .router
            .unregister_client(self.conn);
        self.inbox.borrow_mut().push_back(SignalingEvent::Disconnected);
    }
}

impl SignalingChannel for MemoryChannel {
    fn send_invite(&self, invite: CallInvite) -> Result<(), SignalingClientError> {
        self.push(invite.into())
    }

    fn send_acceptance(&self, acceptance: CallAcceptance) -> Result<(), SignalingClientError> {
        self.push(acceptance.into())
    }

    fn try_recv(&self) -> Option<SignalingEvent> {
        if !self.closed.get() {
            let pending = self
                .relay
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .router
                .take_outgoing_for(self.conn);
            self.inbox
                .borrow_mut()
                .extend(pending.into_iter().filter_map(SignalingEvent::from_server_msg));
        }
        self.inbox.borrow_mut().pop_front()
    }
}

impl Drop for MemoryChannel {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::log::NoopLogSink;
    use crate::signaling::identity::IdentityGenerator;
    use crate::signaling::protocol::SignalPayload;

    fn relay() -> MemoryRelay {
        MemoryRelay::with_server(Server::with_generator(
            Arc::new(NoopLogSink),
            IdentityGenerator::scripted(vec!["abc123", "xyz789"]),
        ))
    }

    #[test]
    fn invite_reaches_target_and_acceptance_reaches_caller() {
        let relay = relay();
        let a = relay.connect();
        let b = relay.connect();

        assert_eq!(a.try_recv(), Some(SignalingEvent::IdentityAssigned("abc123".into())));
        assert_eq!(b.try_recv(), Some(SignalingEvent::IdentityAssigned("xyz789".into())));

        a.send_invite(CallInvite {
            target_id: "xyz789".into(),
            signal_payload: SignalPayload::new(b"offer".to_vec()),
            from_id: "abc123".into(),
            display_name: "Ana".into(),
        })
        .unwrap();

        match b.try_recv() {
            Some(SignalingEvent::Invite(inv)) => {
                assert_eq!(inv.from_id.as_str(), "abc123");
                assert_eq!(inv.signal_payload.as_bytes(), b"offer");
            }
            other => panic!("expected invite, got {other:?}"),
        }

        b.send_acceptance(CallAcceptance {
            signal_payload: SignalPayload::new(b"answer".to_vec()),
            to_id: "abc123".into(),
        })
        .unwrap();
        assert_eq!(
            a.try_recv(),
            Some(SignalingEvent::Accepted(SignalPayload::new(b"answer".to_vec())))
        );
    }

    #[test]
    fn disconnect_releases_identity_and_blocks_sends() {
        let relay = relay();
        let a = relay.connect();
        assert_eq!(relay.connected(), 1);

        a.disconnect();
        assert_eq!(relay.connected(), 0);
        assert!(matches!(
            a.send_acceptance(CallAcceptance {
                signal_payload: SignalPayload::default(),
                to_id: "x".into(),
            }),
            Err(SignalingClientError::Disconnected)
        ));

        // IdentityAssigned was never polled; it is discarded with the connection.
        assert_eq!(a.try_recv(), Some(SignalingEvent::Disconnected));
    }
}
