//! Peer-to-peer connection setup behind an opaque signal payload.
pub mod media_packet;
pub mod negotiation_error;
pub mod negotiation_event;
pub mod negotiator;
pub mod remote_stream;
pub mod udp_negotiator;

pub use negotiation_error::NegotiationError;
pub use negotiation_event::NegotiationEvent;
pub use negotiator::{Negotiator, NegotiatorConfig, NegotiatorFactory};
pub use remote_stream::RemoteStream;
pub use udp_negotiator::{LinkDescriptor, UdpLinkConfig, UdpNegotiator, UdpNegotiatorFactory};
