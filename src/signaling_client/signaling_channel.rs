use crate::signaling_client::{
    call_messages::{CallAcceptance, CallInvite},
    signaling_client_error::SignalingClientError,
    signaling_event::SignalingEvent,
};

/// The relay as seen by one client.
///
/// Sends are fire-and-forget relays to an identity; there is no
/// acknowledgment and no error when the target is unknown. Incoming traffic
/// is polled with [`try_recv`](Self::try_recv).
pub trait SignalingChannel {
    /// # Errors
    ///
    /// Only when the channel itself is down.
    fn send_invite(&self, invite: CallInvite) -> Result<(), SignalingClientError>;

    /// # Errors
    ///
    /// Only when the channel itself is down.
    fn send_acceptance(&self, acceptance: CallAcceptance) -> Result<(), SignalingClientError>;

    /// Next pending event, without blocking.
    fn try_recv(&self) -> Option<SignalingEvent>;
}
