use std::sync::mpsc::Sender;

use crate::media::LocalStream;
use crate::negotiation::{negotiation_error::NegotiationError, negotiation_event::NegotiationEvent};
use crate::signaling::protocol::SignalPayload;

/// How a negotiator is set up for one call.
#[derive(Debug, Clone)]
pub struct NegotiatorConfig {
    /// `true` on the calling side: it produces the first payload.
    pub initiator: bool,
    /// Incremental candidate exchange. Calls always run with it off, so each
    /// side emits exactly one payload.
    pub trickle: bool,
    pub stream: Option<LocalStream>,
}

/// One peer-to-peer media connection in the making.
///
/// Local payloads and link state changes come back through the event
/// channel handed to [`NegotiatorFactory::create`].
pub trait Negotiator: Send {
    /// Applies the peer's payload.
    ///
    /// # Errors
    /// The payload is malformed, unexpected, or the negotiator is destroyed.
    fn signal(&mut self, payload: SignalPayload) -> Result<(), NegotiationError>;

    /// Tears the connection down. No event is emitted afterwards.
    fn destroy(&mut self);
}

pub trait NegotiatorFactory {
    /// # Errors
    /// The underlying transport could not be prepared.
    fn create(
        &mut self,
        cfg: NegotiatorConfig,
        events: Sender<NegotiationEvent>,
    ) -> Result<Box<dyn Negotiator>, NegotiationError>;
}
