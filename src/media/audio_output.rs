use crate::media::audio_frame::AudioFrame;

/// Where the peer's audio ends up.
pub trait AudioOutput {
    fn play(&mut self, frames: Vec<AudioFrame>);
}

/// Discards audio, keeping a count. Used when no speaker is available.
#[derive(Debug, Default)]
pub struct NullAudioOutput {
    played: usize,
}

impl NullAudioOutput {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Samples discarded so far.
    #[must_use]
    pub const fn played(&self) -> usize {
        self.played
    }
}

impl AudioOutput for NullAudioOutput {
    fn play(&mut self, frames: Vec<AudioFrame>) {
        self.played += frames.iter().map(|f| f.samples.len()).sum::<usize>();
    }
}
