use std::sync::mpsc::Receiver;

use crate::call::call_state::CallState;
use crate::negotiation::{NegotiationEvent, Negotiator, RemoteStream};
use crate::signaling::protocol::ClientIdentity;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallRole {
    Caller { target: ClientIdentity },
    Callee { caller: ClientIdentity, display_name: String },
}

/// One attempt at a call, from the first negotiator to teardown.
///
/// Owns at most one negotiator and the receiving end of its event channel;
/// dropping the session discards whatever that negotiator still had queued.
pub struct CallSession {
    role: CallRole,
    state: CallState,
    negotiator: Option<Box<dyn Negotiator>>,
    events: Receiver<NegotiationEvent>,
    accepted: bool,
    ended: bool,
    signal_sent: bool,
    remote: Option<RemoteStream>,
}

impl CallSession {
    pub(crate) fn new(
        role: CallRole,
        state: CallState,
        negotiator: Box<dyn Negotiator>,
        events: Receiver<NegotiationEvent>,
    ) -> Self {
        Self {
            role,
            state,
            negotiator: Some(negotiator),
            events,
            accepted: false,
            ended: false,
            signal_sent: false,
            remote: None,
        }
    }

    #[must_use]
    pub const fn role(&self) -> &CallRole {
        &self.role
    }

    #[must_use]
    pub const fn state(&self) -> CallState {
        self.state
    }

    #[must_use]
    pub const fn accepted(&self) -> bool {
        self.accepted
    }

    #[must_use]
    pub const fn ended(&self) -> bool {
        self.ended
    }

    #[must_use]
    pub const fn is_live(&self) -> bool {
        !self.ended && self.state.is_live()
    }

    #[must_use]
    pub const fn is_caller(&self) -> bool {
        matches!(self.role, CallRole::Caller { .. })
    }

    #[must_use]
    pub const fn remote_stream(&self) -> Option<&RemoteStream> {
        self.remote.as_ref()
    }

    #[must_use]
    pub const fn has_negotiator(&self) -> bool {
        self.negotiator.is_some()
    }

    pub(crate) fn set_state(&mut self, state: CallState) {
        self.state = state;
    }

    /// Flips `accepted`; it never goes back.
    pub(crate) fn mark_accepted(&mut self) {
        self.accepted = true;
    }

    /// Returns `true` only the first time, so each side sends one payload.
    pub(crate) fn take_first_signal(&mut self) -> bool {
        !std::mem::replace(&mut self.signal_sent, true)
    }

    pub(crate) fn set_remote(&mut self, remote: RemoteStream) {
        self.remote = Some(remote);
    }

    pub(crate) fn negotiator_mut(&mut self) -> Option<&mut (dyn Negotiator + 'static)> {
        self.negotiator.as_deref_mut()
    }

    pub(crate) fn next_event(&self) -> Option<NegotiationEvent> {
        self.events.try_recv().ok()
    }

    /// Destroys and drops the negotiator and marks the session ended. Idempotent.
    pub(crate) fn end(&mut self) {
        if let Some(mut n) = self.negotiator.take() {
            n.destroy();
        }
        self.ended = true;
        self.state = CallState::Ended;
    }
}

impl Drop for CallSession {
    fn drop(&mut self) {
        self.end();
    }
}
