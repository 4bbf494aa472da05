use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use crate::log::LogSink;
use crate::media::{
    audio_frame::{AudioConfig, AudioFrame},
    local_stream::{AudioSource, FrameSource, LocalStream},
    media_devices::{MediaConstraints, MediaDevices, new_stream_id},
    media_error::MediaError,
    video_frame::VideoFrame,
};

const TONE_HZ: f32 = 440.0;

/// Synthetic capture: a moving RGB pattern for video and a sine tone for
/// audio, each only when requested.
///
/// Built with [`failing`](Self::failing) it refuses every request, which is
/// how the no-camera path gets exercised.
#[derive(Debug, Default)]
pub struct TestPatternDevices {
    failure: Option<MediaError>,
}

impl TestPatternDevices {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn failing(err: MediaError) -> Self {
        Self { failure: Some(err) }
    }
}

struct PatternSource {
    width: u32,
    height: u32,
    tick: u32,
}

impl FrameSource for PatternSource {
    fn next_frame(&mut self) -> Result<VideoFrame, MediaError> {
        self.tick = self.tick.wrapping_add(1);
        Ok(VideoFrame::synthetic(self.width, self.height, self.tick))
    }
}

/// Real-time sine tone, one frame per `frame_duration`.
pub struct ToneSource {
    config: AudioConfig,
    freq_hz: f32,
    position: u64,
    next_due: Instant,
}

impl ToneSource {
    #[must_use]
    pub fn new(config: AudioConfig, freq_hz: f32) -> Self {
        Self {
            config,
            freq_hz,
            position: 0,
            next_due: Instant::now(),
        }
    }
}

impl AudioSource for ToneSource {
    fn next_chunk(&mut self) -> Result<Option<AudioFrame>, MediaError> {
        let now = Instant::now();
        if now < self.next_due {
            thread::sleep(self.next_due - now);
        } else if now - self.next_due > Duration::from_millis(200) {
            // fell far behind; do not burst to catch up
            self.next_due = now;
        }
        let frame = AudioFrame::tone(&self.config, self.freq_hz, self.position);
        self.position += frame.frames() as u64;
        self.next_due += self.config.frame_duration;
        Ok(Some(frame))
    }
}

impl MediaDevices for TestPatternDevices {
    fn get_user_media(
        &mut self,
        constraints: &MediaConstraints,
        log: &Arc<dyn LogSink>,
    ) -> Result<LocalStream, MediaError> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        let mut builder = LocalStream::builder(new_stream_id("pattern"), log.clone());
        if constraints.video {
            let (width, height) = (constraints.width.max(1), constraints.height.max(1));
            builder = builder.video(constraints.fps, move || {
                Ok(PatternSource {
                    width,
                    height,
                    tick: 0,
                })
            })?;
        }
        if constraints.audio {
            builder = builder.audio(|| Ok(ToneSource::new(AudioConfig::default_voice(), TONE_HZ)))?;
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::log::NoopLogSink;

    fn log() -> Arc<dyn LogSink> {
        Arc::new(NoopLogSink)
    }

    fn request(video: bool, audio: bool) -> MediaConstraints {
        MediaConstraints {
            video,
            audio,
            width: 16,
            height: 12,
            ..MediaConstraints::default()
        }
    }

    fn wait_for_audio(s: &LocalStream) -> Vec<AudioFrame> {
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            let got = s.take_audio();
            if !got.is_empty() {
                return got;
            }
            assert!(Instant::now() < deadline, "no audio captured");
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn configured_failure_is_reported() {
        let mut d = TestPatternDevices::failing(MediaError::NoDevice);
        let err = d.get_user_media(&MediaConstraints::default(), &log()).unwrap_err();
        assert_eq!(err, MediaError::NoDevice);
    }

    #[test]
    fn empty_request_is_rejected() {
        assert!(matches!(
            TestPatternDevices::new().get_user_media(&request(false, false), &log()),
            Err(MediaError::Initialization(_))
        ));
    }

    #[test]
    fn audio_only_request_yields_sound_and_no_picture() {
        let s = TestPatternDevices::new()
            .get_user_media(&request(false, true), &log())
            .unwrap();
        assert!(s.has_audio());
        assert!(!s.has_video());
        let chunk = wait_for_audio(&s).remove(0);
        assert_eq!(chunk.channels, 1);
        assert!(chunk.samples.iter().any(|&v| v != 0));
        thread::sleep(Duration::from_millis(100));
        assert!(s.latest_frame().is_none());
        s.stop();
    }

    #[test]
    fn video_only_request_reports_no_audio() {
        let s = TestPatternDevices::new()
            .get_user_media(&request(true, false), &log())
            .unwrap();
        assert!(!s.has_audio());
        thread::sleep(Duration::from_millis(150));
        assert!(s.take_audio().is_empty());
        s.stop();
    }

    #[test]
    fn default_request_carries_both_tracks() {
        let s = TestPatternDevices::new()
            .get_user_media(&request(true, true), &log())
            .unwrap();
        assert!(s.has_audio() && s.has_video());
        let _ = wait_for_audio(&s);
        let deadline = Instant::now() + Duration::from_secs(2);
        while s.latest_frame().is_none() {
            assert!(Instant::now() < deadline, "no frame captured");
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(s.latest_frame().unwrap().width, 16);
        s.stop();
    }

    #[test]
    fn tone_source_keeps_real_time_pace() {
        let mut src = ToneSource::new(AudioConfig::default_voice(), 440.0);
        let start = Instant::now();
        for _ in 0..5 {
            assert!(src.next_chunk().unwrap().is_some());
        }
        // first chunk is immediate, the other four wait 20 ms each
        assert!(start.elapsed() >= Duration::from_millis(75));
    }
}
