use std::sync::{Arc, mpsc};

use crate::call::{
    call_error::CallError,
    call_event::CallEvent,
    call_session::{CallRole, CallSession},
    call_state::CallState,
};
use crate::log::LogSink;
use crate::media::LocalStream;
use crate::negotiation::{
    NegotiationEvent, NegotiatorConfig, NegotiatorFactory, RemoteStream,
};
use crate::signaling::protocol::{ClientIdentity, SignalPayload};
use crate::signaling_client::{
    CallAcceptance, CallInvite, IncomingInvite, SignalingChannel, SignalingEvent,
};
use crate::{sink_debug, sink_error, sink_info, sink_warn};

/// Drives one user's calls: signaling in, negotiators out.
///
/// Nothing happens in the background; the owner calls [`poll`](Self::poll)
/// regularly (the GUI does it every frame) and the state machine advances
/// from the events collected since the previous poll.
pub struct CallClient<C: SignalingChannel> {
    channel: C,
    factory: Box<dyn NegotiatorFactory>,
    local_stream: Option<LocalStream>,
    display_name: String,
    own_id: Option<ClientIdentity>,
    pending_invite: Option<IncomingInvite>,
    session: Option<CallSession>,
    signaling_up: bool,
    log: Arc<dyn LogSink>,
}

impl<C: SignalingChannel> CallClient<C> {
    pub fn new(
        channel: C,
        factory: Box<dyn NegotiatorFactory>,
        local_stream: Option<LocalStream>,
        display_name: impl Into<String>,
        log: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            channel,
            factory,
            local_stream,
            display_name: display_name.into(),
            own_id: None,
            pending_invite: None,
            session: None,
            signaling_up: true,
            log,
        }
    }

    /// Merged view of client phase and session state.
    #[must_use]
    pub fn state(&self) -> CallState {
        match &self.session {
            Some(s) if s.is_live() => s.state(),
            _ if self.pending_invite.is_some() => CallState::ReceivingInvite,
            Some(_) => CallState::Ended,
            None => CallState::Idle,
        }
    }

    #[must_use]
    pub const fn own_id(&self) -> Option<&ClientIdentity> {
        self.own_id.as_ref()
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    #[must_use]
    pub const fn local_stream(&self) -> Option<&LocalStream> {
        self.local_stream.as_ref()
    }

    #[must_use]
    pub const fn pending_invite(&self) -> Option<&IncomingInvite> {
        self.pending_invite.as_ref()
    }

    #[must_use]
    pub const fn session(&self) -> Option<&CallSession> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn remote_stream(&self) -> Option<&RemoteStream> {
        self.session.as_ref().and_then(CallSession::remote_stream)
    }

    #[must_use]
    pub fn accepted(&self) -> bool {
        self.session.as_ref().is_some_and(CallSession::accepted)
    }

    #[must_use]
    pub fn ended(&self) -> bool {
        self.session.as_ref().is_some_and(CallSession::ended)
    }

    #[must_use]
    pub const fn signaling_connected(&self) -> bool {
        self.signaling_up
    }

    #[must_use]
    pub const fn channel(&self) -> &C {
        &self.channel
    }

    fn has_live_session(&self) -> bool {
        self.session.as_ref().is_some_and(CallSession::is_live)
    }

    /// Applies everything that arrived since the last poll.
    pub fn poll(&mut self) -> Vec<CallEvent> {
        let mut out = Vec::new();
        while let Some(ev) = self.channel.try_recv() {
            self.on_signaling(ev, &mut out);
        }
        while let Some(ev) = self.session.as_ref().and_then(CallSession::next_event) {
            self.on_negotiation(ev, &mut out);
        }
        out
    }

    /// Starts a call to `target`. The id is not checked; an unknown one
    /// leaves the call connecting until it is left.
    ///
    /// # Errors
    /// `CallInProgress` while another call is live; `Negotiation` if no
    /// negotiator could be created.
    pub fn call_user(&mut self, target: impl Into<ClientIdentity>) -> Result<(), CallError> {
        if self.has_live_session() {
            return Err(CallError::CallInProgress);
        }
        let target = target.into();
        let (tx, rx) = mpsc::channel();
        let negotiator = self.factory.create(
            NegotiatorConfig {
                initiator: true,
                trickle: false,
                stream: self.local_stream.clone(),
            },
            tx,
        )?;
        sink_info!(self.log, "calling {}", target);
        self.pending_invite = None;
        self.session = Some(CallSession::new(
            CallRole::Caller { target },
            CallState::Inviting,
            negotiator,
            rx,
        ));
        Ok(())
    }

    /// Answers the pending invite.
    ///
    /// # Errors
    /// `CallInProgress`, `NoPendingInvite`, or `Negotiation`. A negotiator
    /// that cannot be created leaves the invite pending so answering can be
    /// retried; a rejected caller payload consumes it.
    pub fn answer_call(&mut self) -> Result<(), CallError> {
        if self.has_live_session() {
            return Err(CallError::CallInProgress);
        }
        if self.pending_invite.is_none() {
            return Err(CallError::NoPendingInvite);
        }
        let (tx, rx) = mpsc::channel();
        let mut negotiator = self.factory.create(
            NegotiatorConfig {
                initiator: false,
                trickle: false,
                stream: self.local_stream.clone(),
            },
            tx,
        )?;
        let Some(invite) = self.pending_invite.take() else {
            negotiator.destroy();
            return Err(CallError::NoPendingInvite);
        };
        if let Err(e) = negotiator.signal(invite.signal_payload) {
            negotiator.destroy();
            sink_error!(self.log, "could not apply invite from {}: {}", invite.from_id, e);
            return Err(e.into());
        }
        sink_info!(self.log, "answering {} ({})", invite.display_name, invite.from_id);
        let mut session = CallSession::new(
            CallRole::Callee {
                caller: invite.from_id,
                display_name: invite.display_name,
            },
            CallState::Negotiating,
            negotiator,
            rx,
        );
        session.mark_accepted();
        self.session = Some(session);
        Ok(())
    }

    /// Tears the current call down locally. The peer is not told; its link
    /// times out on its own. Without a live call this does nothing.
    ///
    /// # Errors
    /// Currently infallible.
    pub fn leave_call(&mut self) -> Result<(), CallError> {
        match self.session.as_mut() {
            Some(s) if s.is_live() => {
                s.end();
                sink_info!(self.log, "left the call");
            }
            _ => sink_debug!(self.log, "leave_call with no live call"),
        }
        Ok(())
    }

    fn on_signaling(&mut self, ev: SignalingEvent, out: &mut Vec<CallEvent>) {
        sink_debug!(self.log, "signaling event {}", ev.name());
        match ev {
            SignalingEvent::IdentityAssigned(id) => {
                sink_info!(self.log, "assigned identity {}", id);
                self.own_id = Some(id.clone());
                out.push(CallEvent::IdentityAssigned(id));
            }
            SignalingEvent::Invite(invite) => {
                if self.has_live_session() {
                    sink_warn!(
                        self.log,
                        "dropping invite from {} during a live call",
                        invite.from_id
                    );
                    out.push(CallEvent::InviteDropped {
                        from: invite.from_id,
                    });
                    return;
                }
                sink_info!(
                    self.log,
                    "incoming call from {} ({})",
                    invite.display_name,
                    invite.from_id
                );
                out.push(CallEvent::IncomingCall {
                    from: invite.from_id.clone(),
                    name: invite.display_name.clone(),
                });
                self.pending_invite = Some(invite);
            }
            SignalingEvent::Accepted(payload) => match self.apply_accepted(payload) {
                Ok(()) => out.push(CallEvent::Accepted),
                Err(e @ CallError::InvalidTransition { .. }) => {
                    sink_warn!(self.log, "ignoring acceptance: {}", e);
                }
                Err(e) => {
                    sink_error!(self.log, "acceptance failed: {}", e);
                    out.push(CallEvent::Error(e.to_string()));
                }
            },
            SignalingEvent::Disconnected => {
                sink_warn!(self.log, "lost connection to the relay");
                self.signaling_up = false;
                out.push(CallEvent::SignalingLost);
            }
        }
    }

    fn apply_accepted(&mut self, payload: SignalPayload) -> Result<(), CallError> {
        let state = self.state();
        let session = match self.session.as_mut() {
            Some(s)
                if s.is_caller() && s.state() == CallState::Negotiating && !s.accepted() =>
            {
                s
            }
            _ => {
                return Err(CallError::InvalidTransition {
                    state,
                    event: "Accepted",
                });
            }
        };
        if let Some(n) = session.negotiator_mut() {
            n.signal(payload)?;
        }
        session.mark_accepted();
        session.set_state(CallState::Active);
        sink_info!(self.log, "call accepted");
        Ok(())
    }

    fn on_negotiation(&mut self, ev: NegotiationEvent, out: &mut Vec<CallEvent>) {
        sink_debug!(self.log, "negotiation event {}", ev.name());
        match ev {
            NegotiationEvent::LocalSignal(payload) => self.on_local_signal(payload, out),
            NegotiationEvent::RemoteStream(remote) => {
                let Some(s) = self.session.as_mut() else {
                    return;
                };
                if s.is_live() && matches!(s.state(), CallState::Negotiating | CallState::Active) {
                    s.set_remote(remote);
                    s.set_state(CallState::Active);
                    out.push(CallEvent::RemoteStreamStarted);
                } else {
                    sink_debug!(self.log, "remote stream outside a connecting call");
                }
            }
            NegotiationEvent::Close => {
                if let Some(s) = self.session.as_mut() {
                    if s.is_live() {
                        s.end();
                        sink_info!(self.log, "peer link closed");
                        out.push(CallEvent::Ended);
                    }
                }
            }
            NegotiationEvent::Error(msg) => {
                sink_error!(self.log, "negotiation error: {}", msg);
                out.push(CallEvent::Error(msg));
            }
        }
    }

    fn on_local_signal(&mut self, payload: SignalPayload, out: &mut Vec<CallEvent>) {
        let from_id = self.own_id.clone().unwrap_or_default();
        let Some(s) = self.session.as_mut() else {
            return;
        };
        if !s.is_live() || !s.take_first_signal() {
            sink_debug!(self.log, "extra local signal ignored ({} bytes)", payload.len());
            return;
        }
        let sent = match s.role().clone() {
            CallRole::Caller { target } => {
                s.set_state(CallState::Negotiating);
                self.channel
                    .send_invite(CallInvite {
                        target_id: target.clone(),
                        signal_payload: payload,
                        from_id,
                        display_name: self.display_name.clone(),
                    })
                    .map(|()| CallEvent::InviteSent { target })
            }
            CallRole::Callee { caller, .. } => self
                .channel
                .send_acceptance(CallAcceptance {
                    signal_payload: payload,
                    to_id: caller.clone(),
                })
                .map(|()| CallEvent::AcceptanceSent { to: caller }),
        };
        match sent {
            Ok(ev) => out.push(ev),
            Err(e) => {
                sink_error!(self.log, "could not reach the relay: {}", e);
                out.push(CallEvent::Error(e.to_string()));
            }
        }
    }
}

impl<C: SignalingChannel> Drop for CallClient<C> {
    fn drop(&mut self) {
        if let Some(s) = self.session.as_mut() {
            s.end();
        }
    }
}
