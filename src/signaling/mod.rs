//! The relay server: hands every connection a fresh identity and forwards
//! invites and acceptances to the identity they name.
pub mod identity;
pub mod protocol;
pub mod registry;
pub mod router;
pub mod run;
pub mod runtime;
pub mod server;
pub mod server_event;
pub mod signaling_server;
pub mod transport;
pub mod types;

pub use identity::IdentityGenerator;
pub use signaling_server::SignalingServer;
