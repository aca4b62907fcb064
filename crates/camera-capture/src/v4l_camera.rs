//! V4L2 webcam capture via the `v4l` crate.

use v4l::buffer::Type as BufType;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::FourCC;

use crate::{CameraConfig, CameraError, FrameSource, VideoFrame};

/// Negotiated pixel format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PixelFormat {
    Mjpeg,
    Yuyv,
}

/// Open V4L2 capture device with a running mmap stream.
///
/// Dropping the camera stops streaming and closes the device node.
pub struct V4lCamera {
    // Field order matters: the stream must be dropped before the device.
    stream: MmapStream<'static>,
    _device: Device,
    width: u32,
    height: u32,
    pixel_format: PixelFormat,
}

impl V4lCamera {
    /// Open the configured device and start streaming
    pub fn open(config: &CameraConfig) -> Result<Self, CameraError> {
        let path = config.device_path();
        let device = Device::with_path(&path)
            .map_err(|e| CameraError::Open(format!("{path}: {e}")))?;

        let caps = device
            .query_caps()
            .map_err(|e| CameraError::Open(format!("failed to query capabilities: {e}")))?;
        if !caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
            return Err(CameraError::Open(format!("{path} is not a capture device")));
        }

        tracing::info!(device = %path, driver = %caps.driver, card = %caps.card, "opened camera");

        let (width, height, pixel_format) = negotiate(&device, config)?;

        if let Err(e) = device.set_params(&v4l::video::capture::Parameters::with_fps(config.fps)) {
            tracing::warn!("failed to set frame rate {}: {}", config.fps, e);
        }

        let stream = MmapStream::with_buffers(&device, BufType::VideoCapture, 4)
            .map_err(|e| CameraError::Stream(format!("failed to create mmap stream: {e}")))?;

        tracing::info!(width, height, format = ?pixel_format, "camera streaming");

        Ok(Self {
            stream,
            _device: device,
            width,
            height,
            pixel_format,
        })
    }
}

fn negotiate(device: &Device, config: &CameraConfig) -> Result<(u32, u32, PixelFormat), CameraError> {
    let mut fmt = device
        .format()
        .map_err(|e| CameraError::Format(format!("failed to get format: {e}")))?;

    for (fourcc, pixel_format) in [(b"MJPG", PixelFormat::Mjpeg), (b"YUYV", PixelFormat::Yuyv)] {
        fmt.fourcc = FourCC::new(fourcc);
        fmt.width = config.width;
        fmt.height = config.height;

        let negotiated = device
            .set_format(&fmt)
            .map_err(|e| CameraError::Format(format!("failed to set format: {e}")))?;
        if negotiated.fourcc == FourCC::new(fourcc) {
            return Ok((negotiated.width, negotiated.height, pixel_format));
        }
    }

    Err(CameraError::Format("device supports neither MJPG nor YUYV".to_string()))
}

impl FrameSource for V4lCamera {
    fn read_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        let (buf, meta) = self
            .stream
            .next()
            .map_err(|e| CameraError::Stream(format!("failed to dequeue buffer: {e}")))?;

        let timestamp_ns =
            meta.timestamp.sec as u64 * 1_000_000_000 + meta.timestamp.usec as u64 * 1_000;

        let mut frame = match self.pixel_format {
            PixelFormat::Mjpeg => crate::frame::decode_image(buf)?,
            PixelFormat::Yuyv => VideoFrame::new(
                yuyv_to_rgb(buf, self.width, self.height)?,
                self.width,
                self.height,
                0,
                0,
            ),
        };
        frame.timestamp_ns = timestamp_ns;
        frame.sequence = meta.sequence;
        Ok(Some(frame))
    }
}

/// Convert packed YUYV (4:2:2) to RGB24 using BT.601 coefficients.
fn yuyv_to_rgb(yuyv: &[u8], width: u32, height: u32) -> Result<Vec<u8>, CameraError> {
    let expected = (width * height * 2) as usize;
    if yuyv.len() < expected {
        return Err(CameraError::Format(format!(
            "YUYV buffer too short: expected {expected}, got {}",
            yuyv.len()
        )));
    }

    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    for chunk in yuyv[..expected].chunks_exact(4) {
        let (y0, u, y1, v) = (chunk[0] as f32, chunk[1] as f32 - 128.0, chunk[2] as f32, chunk[3] as f32 - 128.0);
        for y in [y0, y1] {
            let r = y + 1.402 * v;
            let g = y - 0.344 * u - 0.714 * v;
            let b = y + 1.772 * u;
            rgb.push(r.clamp(0.0, 255.0) as u8);
            rgb.push(g.clamp(0.0, 255.0) as u8);
            rgb.push(b.clamp(0.0, 255.0) as u8);
        }
    }
    Ok(rgb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuyv_gray() {
        // Neutral chroma: RGB equals luma
        let rgb = yuyv_to_rgb(&[100, 128, 200, 128], 2, 1).unwrap();
        assert_eq!(rgb, vec![100, 100, 100, 200, 200, 200]);
    }

    #[test]
    fn test_yuyv_short_buffer() {
        assert!(yuyv_to_rgb(&[0; 6], 2, 2).is_err());
    }
}
