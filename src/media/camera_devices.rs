//! Webcam capture through `OpenCV`'s `VideoCapture`.
//!
//! Only compiled with the `opencv-camera` feature. Frames are converted from
//! BGR to tightly packed RGB and scaled to the requested size. Audio comes
//! from the default microphone when `cpal-audio` is enabled as well.

use std::sync::Arc;

use opencv::{
    core::{self, AlgorithmHint, CV_8UC3, Mat},
    imgproc,
    prelude::*,
    videoio::{self, VideoCapture},
};

use crate::log::LogSink;
#[cfg(not(feature = "cpal-audio"))]
use crate::sink_warn;
use crate::media::{
    local_stream::{FrameSource, LocalStream, StreamBuilder},
    media_devices::{MediaConstraints, MediaDevices, new_stream_id},
    media_error::MediaError,
    video_frame::VideoFrame,
};

/// Opens camera `device` (0 is usually the built-in one).
#[derive(Debug, Clone, Copy)]
pub struct CameraDevices {
    device: i32,
}

impl CameraDevices {
    #[must_use]
    pub const fn new(device: i32) -> Self {
        Self { device }
    }
}

impl MediaDevices for CameraDevices {
    fn get_user_media(
        &mut self,
        constraints: &MediaConstraints,
        log: &Arc<dyn LogSink>,
    ) -> Result<LocalStream, MediaError> {
        let mut builder = LocalStream::builder(new_stream_id("camera"), log.clone());
        if constraints.video {
            let device = self.device;
            let (width, height) = (constraints.width.max(1), constraints.height.max(1));
            builder = builder.video(constraints.fps, move || {
                CameraSource::open(device, width, height)
            })?;
        }
        if constraints.audio {
            builder = with_microphone(builder, log)?;
        }
        builder.build()
    }
}

#[cfg(feature = "cpal-audio")]
fn with_microphone(
    builder: StreamBuilder,
    log: &Arc<dyn LogSink>,
) -> Result<StreamBuilder, MediaError> {
    let log = log.clone();
    builder.audio(move || {
        crate::media::cpal_audio::MicrophoneSource::open(
            crate::media::AudioConfig::default_voice().frame_duration,
            log,
        )
    })
}

#[cfg(not(feature = "cpal-audio"))]
fn with_microphone(
    builder: StreamBuilder,
    log: &Arc<dyn LogSink>,
) -> Result<StreamBuilder, MediaError> {
    sink_warn!(log, "built without cpal-audio: the stream carries no microphone");
    Ok(builder)
}

struct CameraSource {
    cam: VideoCapture,
    width: u32,
    height: u32,
}

impl CameraSource {
    fn open(device: i32, width: u32, height: u32) -> Result<Self, MediaError> {
        if device < 0 {
            return Err(MediaError::NoDevice);
        }
        let mut cam = VideoCapture::new(device, videoio::CAP_ANY).map_err(cv_init)?;
        if !cam.is_opened().unwrap_or(false) {
            return Err(MediaError::NoDevice);
        }
        // Best effort: drivers are free to ignore these.
        let _ = cam.set(videoio::CAP_PROP_FRAME_WIDTH, f64::from(width));
        let _ = cam.set(videoio::CAP_PROP_FRAME_HEIGHT, f64::from(height));
        Ok(Self { cam, width, height })
    }

    fn grab(&mut self) -> opencv::Result<Option<VideoFrame>> {
        let mut bgr = Mat::default();
        if !self.cam.read(&mut bgr)? || bgr.empty() {
            return Ok(None);
        }
        let mut rgb = Mat::default();
        imgproc::cvt_color(
            &bgr,
            &mut rgb,
            imgproc::COLOR_BGR2RGB,
            0,
            AlgorithmHint::ALGO_HINT_DEFAULT,
        )?;
        let (w, h) = (rgb.cols().max(0) as u32, rgb.rows().max(0) as u32);
        let bytes = packed_rgb(&rgb)?;
        Ok(Some(VideoFrame::new(w, h, bytes).scaled_to(self.width, self.height)))
    }
}

impl FrameSource for CameraSource {
    fn next_frame(&mut self) -> Result<VideoFrame, MediaError> {
        match self.grab() {
            Ok(Some(frame)) => Ok(frame),
            Ok(None) => Err(MediaError::Capture("camera returned no frame".into())),
            Err(e) => Err(MediaError::Capture(e.to_string())),
        }
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        let _ = self.cam.release();
    }
}

fn cv_init(e: opencv::Error) -> MediaError {
    MediaError::Initialization(e.to_string())
}

/// Copies an 8-bit 3-channel `Mat` row by row, dropping any stride padding.
fn packed_rgb(mat: &Mat) -> opencv::Result<Vec<u8>> {
    if mat.typ() != CV_8UC3 {
        let mut fixed = Mat::default();
        mat.convert_to(&mut fixed, CV_8UC3, 1.0, 0.0)?;
        return packed_rgb(&fixed);
    }
    let row_bytes = mat.cols().max(0) as usize * 3;
    let rows = mat.rows().max(0) as usize;
    let data = mat.data_bytes()?;
    if data.len() == row_bytes * rows {
        return Ok(data.to_vec());
    }
    let step = mat.step1(0)? * mat.elem_size1()?;
    let mut out = Vec::with_capacity(row_bytes * rows);
    for r in 0..rows {
        let start = r * step;
        match data.get(start..start + row_bytes) {
            Some(row) => out.extend_from_slice(row),
            None => {
                return Err(opencv::Error::new(
                    core::StsOutOfRange,
                    "row outside Mat buffer".to_string(),
                ));
            }
        }
    }
    Ok(out)
}
