use std::io;
use std::sync::Arc;

use crate::log::LogSink;
use crate::signaling::signaling_server::SignalingServer;

/// Binds `addr` and serves until the process exits.
///
/// # Errors
///
/// Any bind error.
pub fn run_signaling_server_with_log(addr: &str, log_sink: Arc<dyn LogSink>) -> io::Result<()> {
    SignalingServer::bind(addr, log_sink)?.run()
}

/// Same as [`run_signaling_server_with_log`] with logging disabled.
///
/// # Errors
///
/// Any bind error.
pub fn run_signaling_server(addr: &str) -> io::Result<()> {
    SignalingServer::bind_no_log(addr)?.run()
}
