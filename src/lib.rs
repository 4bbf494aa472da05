//! PeerCall: one-to-one video calls between two desktop clients.
//!
//! It provides two binaries:
//! - `peercall`: the client window, which captures local video, talks to the
//!   relay and renders both streams.
//! - `signaling_server`: the relay that hands out identities and forwards
//!   invites and acceptances between clients.
//!
//! Media never goes through the relay; once both sides have exchanged their
//! signal payloads it flows directly between the peers.

/// Desktop GUI: view model and window.
pub mod app;
/// Call state machine driven by signaling and negotiation events.
pub mod call;
/// Wall-clock helpers.
pub mod clock;
/// Handles configuration loading and management.
pub mod config;
/// Logging utilities for the application.
pub mod log;
/// Local capture devices and stream handles.
pub mod media;
/// Peer-to-peer connection setup and the direct media link.
pub mod negotiation;
/// Typed settings resolved from the configuration file.
pub mod settings;
/// Relay server: wire protocol, identity registry and routing.
pub mod signaling;
/// Client side of the relay connection.
pub mod signaling_client;
