//! Camera Capture Library for the emotion monitor
//!
//! Provides the frame sources the monitor samples from:
//! - Webcam capture through V4L2 (feature `v4l`)
//! - Directory replay of still images (demos, tests)
//! - Decoding of transported (base64) image payloads

pub mod devices;
pub mod frame;
pub mod replay;
#[cfg(feature = "v4l")]
pub mod v4l_camera;

pub use devices::{list_devices, DeviceInfo};
pub use frame::{decode_base64_frame, decode_image, VideoFrame};
pub use replay::DirectorySource;

use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

/// Camera error types
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Failed to open camera: {0}")]
    Open(String),

    #[error("Invalid format: {0}")]
    Format(String),

    #[error("Streaming error: {0}")]
    Stream(String),

    #[error("Camera backend not available: {0}")]
    Unsupported(String),

    #[error("Invalid base64 payload: {0}")]
    Base64(String),

    #[error("Image decode failed: {0}")]
    Decode(String),
}

/// Which capture backend to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraBackend {
    /// Live webcam via Video4Linux2
    #[default]
    V4l,
    /// Still images replayed from a directory
    Directory,
}

/// Camera configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Capture backend
    pub backend: CameraBackend,
    /// Device index ("0") or path ("/dev/video0")
    pub device: String,
    /// Requested capture width
    pub width: u32,
    /// Requested capture height
    pub height: u32,
    /// Requested FPS
    pub fps: u32,
    /// Image directory for the replay backend
    pub directory: Option<PathBuf>,
    /// Restart the replay from the first image after the last one
    pub loop_replay: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            backend: CameraBackend::V4l,
            device: "0".to_string(),
            width: 640,
            height: 480,
            fps: 30,
            directory: None,
            loop_replay: false,
        }
    }
}

impl CameraConfig {
    /// Resolve `device` to a device node path
    pub fn device_path(&self) -> String {
        if self.device.chars().all(|c| c.is_ascii_digit()) && !self.device.is_empty() {
            format!("/dev/video{}", self.device)
        } else {
            self.device.clone()
        }
    }
}

/// A stream of frames owned by a single reader.
///
/// `Ok(None)` signals end-of-stream; `Err` is a read failure. Both end the
/// session that owns the source.
pub trait FrameSource: Send {
    fn read_frame(&mut self) -> Result<Option<VideoFrame>, CameraError>;
}

/// Opens a fresh [`FrameSource`] for each camera session.
pub trait CameraProvider: Send + Sync {
    fn open(&self) -> Result<Box<dyn FrameSource>, CameraError>;
}

/// Provider backed by a [`CameraConfig`]
pub struct ConfiguredCamera {
    config: CameraConfig,
}

impl ConfiguredCamera {
    pub fn new(config: CameraConfig) -> Self {
        Self { config }
    }
}

impl CameraProvider for ConfiguredCamera {
    fn open(&self) -> Result<Box<dyn FrameSource>, CameraError> {
        match self.config.backend {
            CameraBackend::Directory => {
                let dir = self.config.directory.as_ref().ok_or_else(|| {
                    CameraError::Open("directory backend requires `directory`".to_string())
                })?;
                let source = DirectorySource::open(dir, self.config.loop_replay)?;
                Ok(Box::new(source))
            }
            #[cfg(feature = "v4l")]
            CameraBackend::V4l => {
                let camera = v4l_camera::V4lCamera::open(&self.config)?;
                Ok(Box::new(camera))
            }
            #[cfg(not(feature = "v4l"))]
            CameraBackend::V4l => Err(CameraError::Unsupported(
                "built without the `v4l` feature".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_path() {
        let mut config = CameraConfig::default();
        assert_eq!(config.device_path(), "/dev/video0");

        config.device = "/dev/video3".to_string();
        assert_eq!(config.device_path(), "/dev/video3");
    }

    #[test]
    fn test_directory_backend_requires_path() {
        let config = CameraConfig {
            backend: CameraBackend::Directory,
            ..Default::default()
        };
        let provider = ConfiguredCamera::new(config);
        assert!(matches!(provider.open(), Err(CameraError::Open(_))));
    }
}
