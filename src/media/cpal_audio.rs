//! Microphone capture and speaker playback through `cpal`.
//!
//! Only compiled with the `cpal-audio` feature. Both sides use the default
//! device in its default configuration; samples cross the crate boundary as
//! 16-bit PCM.

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex, PoisonError,
        mpsc::{self, Receiver, RecvTimeoutError, Sender},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use cpal::{
    FromSample, Sample, SampleFormat, SizedSample,
    traits::{DeviceTrait, HostTrait, StreamTrait},
};

use crate::log::LogSink;
use crate::media::{
    audio_frame::{AudioConfig, AudioFrame},
    audio_output::AudioOutput,
    local_stream::AudioSource,
    media_error::MediaError,
};
use crate::{sink_info, sink_warn};

const CHUNK_WAIT: Duration = Duration::from_millis(50);
/// Playback latency cap: anything beyond this much buffered audio is dropped.
const MAX_BUFFERED: Duration = Duration::from_millis(300);

fn init_err(what: &str, e: impl std::fmt::Display) -> MediaError {
    MediaError::Initialization(format!("{what}: {e}"))
}

/// Default input device, cut into frames of `frame_duration`.
///
/// The `cpal` stream is not `Send`, so this must be opened on the thread
/// that reads it (which is what `StreamBuilder::audio` does).
pub struct MicrophoneSource {
    _stream: cpal::Stream,
    chunks: Receiver<AudioFrame>,
}

impl MicrophoneSource {
    /// # Errors
    /// `NoDevice` without an input device, `Initialization` if it cannot be started.
    pub fn open(frame_duration: Duration, log: Arc<dyn LogSink>) -> Result<Self, MediaError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(MediaError::NoDevice)?;
        let supported = device
            .default_input_config()
            .map_err(|e| init_err("input config", e))?;
        let format = supported.sample_format();
        let config = supported.config();
        let shape = AudioConfig {
            sample_rate_hz: config.sample_rate.0,
            channels: config.channels,
            frame_duration,
        };

        let (tx, chunks) = mpsc::channel();
        let stream = match format {
            SampleFormat::F32 => build_input::<f32>(&device, &config, shape, tx, log.clone()),
            SampleFormat::I16 => build_input::<i16>(&device, &config, shape, tx, log.clone()),
            SampleFormat::U16 => build_input::<u16>(&device, &config, shape, tx, log.clone()),
            other => {
                return Err(MediaError::Initialization(format!(
                    "unsupported input sample format {other}"
                )));
            }
        }
        .map_err(|e| init_err("input stream", e))?;
        stream
            .play()
            .map_err(|e| init_err("start input", e))?;
        sink_info!(
            log,
            "microphone open: {} Hz, {} channel(s)",
            shape.sample_rate_hz,
            shape.channels
        );
        Ok(Self {
            _stream: stream,
            chunks,
        })
    }
}

fn build_input<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    shape: AudioConfig,
    tx: Sender<AudioFrame>,
    log: Arc<dyn LogSink>,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample,
    i16: FromSample<T>,
{
    let frame_len = shape.samples_per_frame().max(1);
    let mut pending: Vec<i16> = Vec::with_capacity(frame_len);
    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            for &s in data {
                pending.push(i16::from_sample(s));
                if pending.len() == frame_len {
                    let samples = std::mem::replace(&mut pending, Vec::with_capacity(frame_len));
                    let _ = tx.send(AudioFrame::new(shape.sample_rate_hz, shape.channels, samples));
                }
            }
        },
        move |err| sink_warn!(log, "microphone: {}", err),
        None,
    )
}

impl AudioSource for MicrophoneSource {
    fn next_chunk(&mut self) -> Result<Option<AudioFrame>, MediaError> {
        match self.chunks.recv_timeout(CHUNK_WAIT) {
            Ok(frame) => Ok(Some(frame)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                Err(MediaError::Capture("microphone stream ended".into()))
            }
        }
    }
}

/// Default output device fed from a shared mono buffer.
///
/// The `cpal` stream lives on its own thread until this value is dropped.
pub struct SpeakerOutput {
    buffer: Arc<Mutex<VecDeque<i16>>>,
    sample_rate_hz: u32,
    max_buffered: usize,
    stop: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl SpeakerOutput {
    /// # Errors
    /// `NoDevice` without an output device, `Initialization` if it cannot be started.
    pub fn open(log: Arc<dyn LogSink>) -> Result<Self, MediaError> {
        let buffer = Arc::new(Mutex::new(VecDeque::new()));
        let (ready_tx, ready_rx) = mpsc::channel();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let shared = buffer.clone();
        let worker = thread::Builder::new()
            .name("speaker".into())
            .spawn(move || match start_output(shared, log) {
                Ok((stream, rate)) => {
                    let _ = ready_tx.send(Ok(rate));
                    // parked until the sender side is dropped
                    let _ = stop_rx.recv();
                    drop(stream);
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })
            .map_err(|e| init_err("spawn speaker thread", e))?;

        let sample_rate_hz = match ready_rx.recv() {
            Ok(Ok(rate)) => rate,
            Ok(Err(e)) => {
                let _ = worker.join();
                return Err(e);
            }
            Err(_) => {
                let _ = worker.join();
                return Err(MediaError::Initialization("speaker thread died".into()));
            }
        };
        let max_buffered =
            usize::try_from(u128::from(sample_rate_hz) * MAX_BUFFERED.as_millis() / 1_000)
                .unwrap_or(usize::MAX);
        Ok(Self {
            buffer,
            sample_rate_hz,
            max_buffered,
            stop: Some(stop_tx),
            worker: Some(worker),
        })
    }
}

fn start_output(
    buffer: Arc<Mutex<VecDeque<i16>>>,
    log: Arc<dyn LogSink>,
) -> Result<(cpal::Stream, u32), MediaError> {
    let host = cpal::default_host();
    let device = host.default_output_device().ok_or(MediaError::NoDevice)?;
    let supported = device
        .default_output_config()
        .map_err(|e| init_err("output config", e))?;
    let format = supported.sample_format();
    let config = supported.config();
    let rate = config.sample_rate.0;
    let stream = match format {
        SampleFormat::F32 => build_output::<f32>(&device, &config, buffer, log.clone()),
        SampleFormat::I16 => build_output::<i16>(&device, &config, buffer, log.clone()),
        SampleFormat::U16 => build_output::<u16>(&device, &config, buffer, log.clone()),
        other => {
            return Err(MediaError::Initialization(format!(
                "unsupported output sample format {other}"
            )));
        }
    }
    .map_err(|e| init_err("output stream", e))?;
    stream
        .play()
        .map_err(|e| init_err("start output", e))?;
    sink_info!(log, "speaker open: {} Hz, {} channel(s)", rate, config.channels);
    Ok((stream, rate))
}

fn build_output<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    buffer: Arc<Mutex<VecDeque<i16>>>,
    log: Arc<dyn LogSink>,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample + FromSample<i16>,
{
    let channels = usize::from(config.channels.max(1));
    device.build_output_stream(
        config,
        move |out: &mut [T], _: &cpal::OutputCallbackInfo| {
            let mut buf = buffer.lock().unwrap_or_else(PoisonError::into_inner);
            for frame in out.chunks_mut(channels) {
                // silence when the peer's audio runs dry
                let v = T::from_sample(buf.pop_front().unwrap_or(0));
                frame.fill(v);
            }
        },
        move |err| sink_warn!(log, "speaker: {}", err),
        None,
    )
}

impl AudioOutput for SpeakerOutput {
    fn play(&mut self, frames: Vec<AudioFrame>) {
        let mut buf = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        for f in &frames {
            buf.extend(f.mono_at(self.sample_rate_hz));
        }
        let excess = buf.len().saturating_sub(self.max_buffered);
        buf.drain(..excess);
    }
}

impl Drop for SpeakerOutput {
    fn drop(&mut self) {
        self.stop.take();
        if let Some(h) = self.worker.take() {
            let _ = h.join();
        }
    }
}
