//! Local capture: constraints, the device abstraction, the stream handle
//! and audio playback.
pub mod audio_frame;
pub mod audio_output;
#[cfg(feature = "opencv-camera")]
pub mod camera_devices;
#[cfg(feature = "cpal-audio")]
pub mod cpal_audio;
pub mod local_stream;
pub mod media_devices;
pub mod media_error;
pub mod test_pattern_devices;
pub mod video_frame;

pub use audio_frame::{AudioConfig, AudioFrame};
pub use audio_output::{AudioOutput, NullAudioOutput};
#[cfg(feature = "opencv-camera")]
pub use camera_devices::CameraDevices;
#[cfg(feature = "cpal-audio")]
pub use cpal_audio::{MicrophoneSource, SpeakerOutput};
pub use local_stream::{AudioSource, FrameSource, LocalStream, StreamBuilder};
pub use media_devices::{MediaConstraints, MediaDevices, capture_local_stream};
pub use media_error::MediaError;
pub use test_pattern_devices::{TestPatternDevices, ToneSource};
pub use video_frame::VideoFrame;
