//! The call state machine that ties signaling, negotiation and media together.
pub mod call_client;
pub mod call_error;
pub mod call_event;
pub mod call_session;
pub mod call_state;

pub use call_client::CallClient;
pub use call_error::CallError;
pub use call_event::CallEvent;
pub use call_session::{CallRole, CallSession};
pub use call_state::CallState;
