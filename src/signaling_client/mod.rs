//! Client end of the relay connection, plus the [`SignalingChannel`] seam the
//! call layer is written against.
pub mod call_messages;
pub mod memory_channel;
pub mod signaling_channel;
pub mod signaling_client_c;
pub mod signaling_client_error;
pub mod signaling_command;
pub mod signaling_event;

pub use call_messages::{CallAcceptance, CallInvite, IncomingInvite};
pub use memory_channel::{MemoryChannel, MemoryRelay};
pub use signaling_channel::SignalingChannel;
pub use signaling_client_c::SignalingClient;
pub use signaling_client_error::SignalingClientError;
pub use signaling_event::SignalingEvent;
