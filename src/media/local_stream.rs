use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
        mpsc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crate::log::LogSink;
use crate::media::{audio_frame::AudioFrame, media_error::MediaError, video_frame::VideoFrame};
use crate::{sink_debug, sink_warn};

/// Something that yields frames on demand: a camera, a test pattern, a file.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<VideoFrame, MediaError>;
}

/// A microphone or a stand-in for one.
///
/// `next_chunk` may block briefly; `Ok(None)` means nothing arrived in time.
pub trait AudioSource {
    fn next_chunk(&mut self) -> Result<Option<AudioFrame>, MediaError>;
}

/// Captured audio kept for the sender, about one second at 20 ms per chunk.
const AUDIO_BACKLOG: usize = 50;

type FrameSlot = Arc<Mutex<Option<VideoFrame>>>;
type AudioQueue = Arc<Mutex<VecDeque<AudioFrame>>>;

struct StreamInner {
    id: String,
    video: Option<FrameSlot>,
    audio: Option<AudioQueue>,
    running: Arc<AtomicBool>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Drop for StreamInner {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Cloneable handle to a running capture with a video track, an audio track,
/// or both.
///
/// Video is a single slot the capture thread keeps overwriting, so readers
/// only ever see the most recent picture. Audio is a short queue drained by
/// whoever sends it to the peer.
#[derive(Clone)]
pub struct LocalStream {
    inner: Arc<StreamInner>,
}

impl std::fmt::Debug for LocalStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStream")
            .field("id", &self.inner.id)
            .field("video", &self.has_video())
            .field("audio", &self.has_audio())
            .field("live", &self.is_live())
            .finish()
    }
}

impl LocalStream {
    /// Starts assembling a stream track by track.
    #[must_use]
    pub fn builder(id: impl Into<String>, log: Arc<dyn LogSink>) -> StreamBuilder {
        StreamBuilder {
            id: id.into(),
            log,
            running: Arc::new(AtomicBool::new(true)),
            video: None,
            audio: None,
            workers: Vec::new(),
        }
    }

    /// A video-only stream.
    ///
    /// # Errors
    /// See [`StreamBuilder::video`].
    pub fn spawn<S, F>(
        id: impl Into<String>,
        fps: u32,
        log: Arc<dyn LogSink>,
        open: F,
    ) -> Result<Self, MediaError>
    where
        S: FrameSource,
        F: FnOnce() -> Result<S, MediaError> + Send + 'static,
    {
        Self::builder(id, log).video(fps, open)?.build()
    }

    /// A stream that always shows the same picture. No thread is spawned.
    #[must_use]
    pub fn still(id: impl Into<String>, frame: VideoFrame) -> Self {
        Self {
            inner: Arc::new(StreamInner {
                id: id.into(),
                video: Some(Arc::new(Mutex::new(Some(frame)))),
                audio: None,
                running: Arc::new(AtomicBool::new(true)),
                workers: Mutex::new(Vec::new()),
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    #[must_use]
    pub fn has_video(&self) -> bool {
        self.inner.video.is_some()
    }

    #[must_use]
    pub fn has_audio(&self) -> bool {
        self.inner.audio.is_some()
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Always `None` for a stream without video.
    #[must_use]
    pub fn latest_frame(&self) -> Option<VideoFrame> {
        self.inner
            .video
            .as_ref()?
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Removes and returns the audio captured since the previous call.
    #[must_use]
    pub fn take_audio(&self) -> Vec<AudioFrame> {
        match &self.inner.audio {
            Some(q) => q.lock().unwrap_or_else(PoisonError::into_inner).drain(..).collect(),
            None => Vec::new(),
        }
    }

    /// Stops capture and joins the threads. Idempotent; the last frame stays readable.
    pub fn stop(&self) {
        self.inner.running.store(false, Ordering::SeqCst);
        let handles: Vec<_> = self
            .inner
            .workers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for h in handles {
            if h.thread().id() != thread::current().id() {
                let _ = h.join();
            }
        }
    }

    /// Two handles are the same stream when they share the capture.
    #[must_use]
    pub fn same_stream(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Opens tracks one at a time. Dropping a builder (including through `?`
/// on a failed track) stops whatever it had already started.
pub struct StreamBuilder {
    id: String,
    log: Arc<dyn LogSink>,
    running: Arc<AtomicBool>,
    video: Option<FrameSlot>,
    audio: Option<AudioQueue>,
    workers: Vec<JoinHandle<()>>,
}

impl StreamBuilder {
    /// Adds a video track paced at `fps`.
    ///
    /// `open` runs on the capture thread, so sources that are not `Send` are
    /// fine. Its error is returned here and no thread is left behind.
    ///
    /// # Errors
    /// Whatever `open` fails with, or `Initialization` if the thread cannot spawn.
    pub fn video<S, F>(mut self, fps: u32, open: F) -> Result<Self, MediaError>
    where
        S: FrameSource,
        F: FnOnce() -> Result<S, MediaError> + Send + 'static,
    {
        let slot: FrameSlot = Arc::new(Mutex::new(None));
        let (out, run, log, id) = (slot.clone(), self.running.clone(), self.log.clone(), self.id.clone());
        let handle = spawn_capture(format!("video-{}", self.id), open, move |source| {
            video_loop(source, &out, &run, fps, log.as_ref(), &id);
        })?;
        self.workers.push(handle);
        self.video = Some(slot);
        Ok(self)
    }

    /// Adds an audio track. Same threading rules as [`video`](Self::video).
    ///
    /// # Errors
    /// Whatever `open` fails with, or `Initialization` if the thread cannot spawn.
    pub fn audio<A, F>(mut self, open: F) -> Result<Self, MediaError>
    where
        A: AudioSource,
        F: FnOnce() -> Result<A, MediaError> + Send + 'static,
    {
        let queue: AudioQueue = Arc::new(Mutex::new(VecDeque::with_capacity(AUDIO_BACKLOG)));
        let (out, run, log, id) = (queue.clone(), self.running.clone(), self.log.clone(), self.id.clone());
        let handle = spawn_capture(format!("audio-{}", self.id), open, move |source| {
            audio_loop(source, &out, &run, log.as_ref(), &id);
        })?;
        self.workers.push(handle);
        self.audio = Some(queue);
        Ok(self)
    }

    /// # Errors
    /// `Initialization` when no track was added.
    pub fn build(mut self) -> Result<LocalStream, MediaError> {
        if self.video.is_none() && self.audio.is_none() {
            return Err(MediaError::Initialization("no track requested".into()));
        }
        Ok(LocalStream {
            inner: Arc::new(StreamInner {
                id: std::mem::take(&mut self.id),
                video: self.video.take(),
                audio: self.audio.take(),
                running: self.running.clone(),
                workers: Mutex::new(std::mem::take(&mut self.workers)),
            }),
        })
    }
}

impl Drop for StreamBuilder {
    fn drop(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        self.running.store(false, Ordering::SeqCst);
        for h in self.workers.drain(..) {
            let _ = h.join();
        }
    }
}

/// Runs `open` on a fresh thread and, once it succeeds, `body` with the
/// opened source. Returns only after `open` has finished.
fn spawn_capture<T, F, B>(name: String, open: F, body: B) -> Result<JoinHandle<()>, MediaError>
where
    F: FnOnce() -> Result<T, MediaError> + Send + 'static,
    B: FnOnce(T) + Send + 'static,
{
    let (ready_tx, ready_rx) = mpsc::channel();
    let handle = thread::Builder::new()
        .name(name)
        .spawn(move || match open() {
            Ok(source) => {
                let _ = ready_tx.send(Ok(()));
                body(source);
            }
            Err(e) => {
                let _ = ready_tx.send(Err(e));
            }
        })
        .map_err(|e| MediaError::Initialization(format!("spawn capture thread: {e}")))?;

    match ready_rx.recv() {
        Ok(Ok(())) => Ok(handle),
        Ok(Err(e)) => {
            let _ = handle.join();
            Err(e)
        }
        Err(_) => {
            let _ = handle.join();
            Err(MediaError::Initialization("capture thread died".into()))
        }
    }
}

fn video_loop<S: FrameSource>(
    mut source: S,
    slot: &FrameSlot,
    running: &AtomicBool,
    fps: u32,
    log: &dyn LogSink,
    id: &str,
) {
    let fps = fps.clamp(1, 120);
    let period = Duration::from_millis(1_000 / u64::from(fps));
    let mut next_deadline = Instant::now() + period;

    while running.load(Ordering::SeqCst) {
        match source.next_frame() {
            Ok(frame) => {
                *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(frame);
            }
            Err(e) => sink_warn!(log, "stream {}: {}", id, e),
        }

        let now = Instant::now();
        if now < next_deadline {
            thread::sleep(next_deadline - now);
            next_deadline += period;
        } else {
            next_deadline = now + period;
        }
    }
    sink_debug!(log, "stream {} video stopped", id);
}

fn audio_loop<A: AudioSource>(
    mut source: A,
    queue: &AudioQueue,
    running: &AtomicBool,
    log: &dyn LogSink,
    id: &str,
) {
    while running.load(Ordering::SeqCst) {
        match source.next_chunk() {
            Ok(Some(chunk)) => {
                let mut q = queue.lock().unwrap_or_else(PoisonError::into_inner);
                if q.len() >= AUDIO_BACKLOG {
                    q.pop_front();
                }
                q.push_back(chunk);
            }
            Ok(None) => {}
            Err(e) => {
                sink_warn!(log, "stream {} audio: {}", id, e);
                thread::sleep(Duration::from_millis(20));
            }
        }
    }
    sink_debug!(log, "stream {} audio stopped", id);
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::log::NoopLogSink;
    use crate::media::audio_frame::AudioConfig;

    struct Counter(u32);

    impl FrameSource for Counter {
        fn next_frame(&mut self) -> Result<VideoFrame, MediaError> {
            self.0 += 1;
            Ok(VideoFrame::synthetic(8, 8, self.0))
        }
    }

    struct Beeper(u64);

    impl AudioSource for Beeper {
        fn next_chunk(&mut self) -> Result<Option<AudioFrame>, MediaError> {
            thread::sleep(Duration::from_millis(2));
            let f = AudioFrame::tone(&AudioConfig::default_voice(), 440.0, self.0);
            self.0 += 960;
            Ok(Some(f))
        }
    }

    fn log() -> Arc<dyn LogSink> {
        Arc::new(NoopLogSink)
    }

    fn wait_for_frame(s: &LocalStream) -> VideoFrame {
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            if let Some(f) = s.latest_frame() {
                return f;
            }
            assert!(Instant::now() < deadline, "no frame captured");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn spawned_stream_produces_frames_until_stopped() {
        let s = LocalStream::spawn("t", 60, log(), || Ok(Counter(0))).unwrap();
        assert!(s.has_video());
        assert!(!s.has_audio());
        let f = wait_for_frame(&s);
        assert_eq!((f.width, f.height), (8, 8));
        assert!(s.take_audio().is_empty());

        let clone = s.clone();
        clone.stop();
        assert!(!s.is_live());
        // stopping again is harmless
        s.stop();
        assert!(s.latest_frame().is_some());
    }

    #[test]
    fn open_failure_is_returned_to_caller() {
        let err = LocalStream::spawn("t", 30, log(), || Err::<Counter, _>(MediaError::NoDevice))
            .unwrap_err();
        assert_eq!(err, MediaError::NoDevice);
    }

    #[test]
    fn audio_only_stream_has_no_picture() {
        let s = LocalStream::builder("mic", log())
            .audio(|| Ok(Beeper(0)))
            .unwrap()
            .build()
            .unwrap();
        assert!(s.has_audio());
        assert!(!s.has_video());

        let deadline = Instant::now() + Duration::from_secs(2);
        let mut got = Vec::new();
        while got.len() < 3 {
            got.extend(s.take_audio());
            assert!(Instant::now() < deadline, "no audio captured");
            thread::sleep(Duration::from_millis(5));
        }
        assert!(s.latest_frame().is_none());
        assert_eq!(got[0].sample_rate_hz, 48_000);
        s.stop();
    }

    #[test]
    fn audio_backlog_is_bounded() {
        let s = LocalStream::builder("mic", log())
            .audio(|| Ok(Beeper(0)))
            .unwrap()
            .build()
            .unwrap();
        thread::sleep(Duration::from_millis(300));
        s.stop();
        let backlog = s.take_audio();
        assert!(!backlog.is_empty());
        assert!(backlog.len() <= AUDIO_BACKLOG);
    }

    #[test]
    fn failed_track_stops_the_ones_already_open() {
        let started = LocalStream::builder("av", log()).video(30, || Ok(Counter(0))).unwrap();
        let running = started.running.clone();
        let err = started
            .audio(|| Err::<Beeper, _>(MediaError::PermissionDenied))
            .map(|_| ())
            .unwrap_err();
        assert_eq!(err, MediaError::PermissionDenied);
        assert!(!running.load(Ordering::SeqCst));
    }

    #[test]
    fn empty_builder_is_rejected() {
        assert!(matches!(
            LocalStream::builder("none", log()).build(),
            Err(MediaError::Initialization(_))
        ));
    }

    #[test]
    fn still_stream_serves_its_frame() {
        let s = LocalStream::still("still", VideoFrame::synthetic(4, 4, 0));
        assert_eq!(s.id(), "still");
        assert!(s.same_stream(&s.clone()));
        assert!(!s.has_audio());
        assert_eq!(s.latest_frame().unwrap().width, 4);
    }
}
