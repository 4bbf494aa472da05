use std::sync::Arc;

use crate::log::LogSink;
use crate::media::{local_stream::LocalStream, media_error::MediaError};
use crate::{sink_error, sink_info};

/// What the caller wants from the capture devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaConstraints {
    pub video: bool,
    pub audio: bool,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            video: true,
            audio: true,
            width: 320,
            height: 240,
            fps: 15,
        }
    }
}

/// Access to local capture hardware (or a stand-in for it).
pub trait MediaDevices {
    /// # Errors
    /// `PermissionDenied`/`NoDevice` when capture is unavailable, or
    /// `Initialization` when the device exists but could not be opened.
    fn get_user_media(
        &mut self,
        constraints: &MediaConstraints,
        log: &Arc<dyn LogSink>,
    ) -> Result<LocalStream, MediaError>;
}

/// Requests a stream once and degrades to `None` on failure.
///
/// Calls can still be placed and answered without a local stream; the
/// remote side simply receives no video or audio.
pub fn capture_local_stream(
    devices: &mut dyn MediaDevices,
    constraints: &MediaConstraints,
    log: &Arc<dyn LogSink>,
) -> Option<LocalStream> {
    match devices.get_user_media(constraints, log) {
        Ok(stream) => {
            if stream.has_video() {
                sink_info!(
                    log,
                    "local stream {} started ({}x{} @ {} fps, audio: {})",
                    stream.id(),
                    constraints.width,
                    constraints.height,
                    constraints.fps,
                    stream.has_audio()
                );
            } else {
                sink_info!(log, "local stream {} started (audio only)", stream.id());
            }
            Some(stream)
        }
        Err(e) => {
            sink_error!(log, "could not access media devices: {}", e);
            None
        }
    }
}

pub(crate) fn new_stream_id(prefix: &str) -> String {
    format!("{prefix}-{:08x}", rand::random::<u32>())
}
