use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use crate::media::{AudioFrame, VideoFrame};

/// Received audio waiting for playback; older chunks are dropped first.
const AUDIO_BACKLOG: usize = 50;

/// The peer's media as seen locally. Written by the link, read by the view
/// (latest picture) and the speaker (queued audio).
#[derive(Clone)]
pub struct RemoteStream {
    label: String,
    latest: Arc<Mutex<Option<VideoFrame>>>,
    audio: Arc<Mutex<VecDeque<AudioFrame>>>,
}

impl std::fmt::Debug for RemoteStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteStream").field("label", &self.label).finish()
    }
}

impl RemoteStream {
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            latest: Arc::new(Mutex::new(None)),
            audio: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn latest_frame(&self) -> Option<VideoFrame> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn push_frame(&self, frame: VideoFrame) {
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = Some(frame);
    }

    pub fn push_audio(&self, chunk: AudioFrame) {
        let mut q = self.audio.lock().unwrap_or_else(PoisonError::into_inner);
        if q.len() >= AUDIO_BACKLOG {
            q.pop_front();
        }
        q.push_back(chunk);
    }

    /// Removes and returns the audio received since the previous call.
    #[must_use]
    pub fn take_audio(&self) -> Vec<AudioFrame> {
        self.audio
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }

    #[must_use]
    pub fn same_stream(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.latest, &other.latest)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    #[test]
    fn audio_is_queued_in_order_and_bounded() {
        let r = RemoteStream::new("peer");
        let reader = r.clone();
        for i in 0..(AUDIO_BACKLOG as i16 + 5) {
            r.push_audio(AudioFrame::new(8_000, 1, vec![i]));
        }
        let got = reader.take_audio();
        assert_eq!(got.len(), AUDIO_BACKLOG);
        assert_eq!(got[0].samples, vec![5]);
        assert!(reader.take_audio().is_empty());
        assert!(reader.latest_frame().is_none());
    }
}
