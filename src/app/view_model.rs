use crate::call::{CallClient, CallRole, CallState};
use crate::signaling_client::SignalingChannel;

/// The main button: start a call, or hang up the one in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryAction {
    Call,
    EndCall,
}

/// Everything the window shows, derived from the client and nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewModel {
    pub own_id: Option<String>,
    pub caller_name: Option<String>,
    pub caller_id: Option<String>,
    pub show_local_video: bool,
    pub show_remote_video: bool,
    pub show_answer_prompt: bool,
    pub primary_action: PrimaryAction,
    /// An outgoing call nobody has answered yet can still be abandoned.
    pub can_cancel: bool,
    pub state: CallState,
    pub state_label: &'static str,
    pub signaling_connected: bool,
}

impl ViewModel {
    #[must_use]
    pub fn from_client<C: SignalingChannel>(client: &CallClient<C>) -> Self {
        let state = client.state();
        let accepted = client.accepted();
        let ended = client.ended();

        let (caller_name, caller_id) = match (client.pending_invite(), client.session()) {
            (Some(inv), _) if state == CallState::ReceivingInvite => (
                Some(inv.display_name.clone()),
                Some(inv.from_id.to_string()),
            ),
            (_, Some(s)) => match s.role() {
                CallRole::Callee {
                    caller,
                    display_name,
                } => (Some(display_name.clone()), Some(caller.to_string())),
                CallRole::Caller { .. } => (None, None),
            },
            _ => (None, None),
        };

        Self {
            own_id: client.own_id().map(ToString::to_string),
            caller_name,
            caller_id,
            show_local_video: client.local_stream().is_some(),
            show_remote_video: accepted && !ended && client.remote_stream().is_some(),
            show_answer_prompt: state == CallState::ReceivingInvite,
            primary_action: if accepted && !ended {
                PrimaryAction::EndCall
            } else {
                PrimaryAction::Call
            },
            can_cancel: state.is_live() && !accepted,
            state,
            state_label: state.label(),
            signaling_connected: client.signaling_connected(),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::log::NoopLogSink;
    use crate::media::{LocalStream, VideoFrame};
    use crate::negotiation::{
        NegotiationError, NegotiationEvent, Negotiator, NegotiatorConfig, NegotiatorFactory,
    };
    use crate::signaling::identity::IdentityGenerator;
    use crate::signaling::protocol::SignalPayload;
    use crate::signaling::server::Server;
    use crate::signaling_client::{MemoryChannel, MemoryRelay};
    use std::sync::Arc;
    use std::sync::mpsc::Sender;

    struct Echo {
        initiator: bool,
        events: Sender<NegotiationEvent>,
    }

    impl Negotiator for Echo {
        fn signal(&mut self, _payload: SignalPayload) -> Result<(), NegotiationError> {
            if !self.initiator {
                let _ = self
                    .events
                    .send(NegotiationEvent::LocalSignal(SignalPayload::new(b"a".to_vec())));
            }
            Ok(())
        }

        fn destroy(&mut self) {}
    }

    struct EchoFactory;

    impl NegotiatorFactory for EchoFactory {
        fn create(
            &mut self,
            cfg: NegotiatorConfig,
            events: Sender<NegotiationEvent>,
        ) -> Result<Box<dyn Negotiator>, NegotiationError> {
            if cfg.initiator {
                let _ = events.send(NegotiationEvent::LocalSignal(SignalPayload::new(b"o".to_vec())));
            }
            Ok(Box::new(Echo {
                initiator: cfg.initiator,
                events,
            }))
        }
    }

    fn client(relay: &MemoryRelay, name: &str, with_stream: bool) -> CallClient<MemoryChannel> {
        let stream = with_stream.then(|| LocalStream::still("s", VideoFrame::synthetic(4, 4, 0)));
        let mut c = CallClient::new(
            relay.connect(),
            Box::new(EchoFactory),
            stream,
            name,
            Arc::new(NoopLogSink),
        );
        c.poll();
        c
    }

    fn relay() -> MemoryRelay {
        MemoryRelay::with_server(Server::with_generator(
            Arc::new(NoopLogSink),
            IdentityGenerator::scripted(vec!["abc123", "xyz789"]),
        ))
    }

    #[test]
    fn idle_view_offers_a_call() {
        let relay = relay();
        let a = client(&relay, "Ana", false);
        let vm = ViewModel::from_client(&a);
        assert_eq!(vm.own_id.as_deref(), Some("abc123"));
        assert_eq!(vm.primary_action, PrimaryAction::Call);
        assert!(!vm.show_local_video);
        assert!(!vm.show_answer_prompt);
        assert!(!vm.can_cancel);
        assert_eq!(vm.state_label, "Idle");
    }

    #[test]
    fn incoming_call_shows_prompt_with_caller_name() {
        let relay = relay();
        let mut a = client(&relay, "Ana", true);
        let mut b = client(&relay, "Bo", true);
        a.call_user("xyz789").unwrap();
        a.poll();
        b.poll();

        let vm = ViewModel::from_client(&b);
        assert!(vm.show_answer_prompt);
        assert!(vm.show_local_video);
        assert_eq!(vm.caller_name.as_deref(), Some("Ana"));
        assert_eq!(vm.caller_id.as_deref(), Some("abc123"));

        let caller = ViewModel::from_client(&a);
        assert!(caller.can_cancel);
        assert_eq!(caller.primary_action, PrimaryAction::Call);
    }

    #[test]
    fn answered_call_offers_hang_up_and_hides_prompt() {
        let relay = relay();
        let mut a = client(&relay, "Ana", false);
        let mut b = client(&relay, "Bo", false);
        a.call_user("xyz789").unwrap();
        a.poll();
        b.poll();
        b.answer_call().unwrap();
        b.poll();
        a.poll();

        for vm in [ViewModel::from_client(&a), ViewModel::from_client(&b)] {
            assert_eq!(vm.primary_action, PrimaryAction::EndCall);
            assert!(!vm.show_answer_prompt);
            // no link yet, so no remote picture
            assert!(!vm.show_remote_video);
        }

        a.leave_call().unwrap();
        let vm = ViewModel::from_client(&a);
        assert_eq!(vm.primary_action, PrimaryAction::Call);
        assert_eq!(vm.state, CallState::Ended);
    }
}
