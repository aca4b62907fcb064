//! Directory replay source

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::{frame, CameraError, FrameSource, VideoFrame};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp"];

/// Replays still images from a directory in lexical file-name order.
pub struct DirectorySource {
    files: Vec<PathBuf>,
    position: usize,
    looping: bool,
    sequence: u32,
}

impl DirectorySource {
    /// Scan `dir` for image files
    pub fn open(dir: &Path, looping: bool) -> Result<Self, CameraError> {
        let entries = std::fs::read_dir(dir)
            .map_err(|e| CameraError::Open(format!("{}: {e}", dir.display())))?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(CameraError::Open(format!(
                "no images found in {}",
                dir.display()
            )));
        }

        info!(dir = %dir.display(), count = files.len(), looping, "opened replay source");

        Ok(Self {
            files,
            position: 0,
            looping,
            sequence: 0,
        })
    }

    /// Number of images in the replay set
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FrameSource for DirectorySource {
    fn read_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        if self.position >= self.files.len() {
            if !self.looping {
                return Ok(None);
            }
            self.position = 0;
        }

        let path = &self.files[self.position];
        self.position += 1;
        debug!(path = %path.display(), "replaying frame");

        let bytes = std::fs::read(path)
            .map_err(|e| CameraError::Stream(format!("{}: {e}", path.display())))?;
        let mut frame = frame::decode_image(&bytes)?;
        frame.sequence = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);
        Ok(Some(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::encode_png;

    fn fixture_dir(name: &str, count: usize) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("replay-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        for i in 0..count {
            let frame = VideoFrame::solid(4, 4, [i as u8 * 10, 0, 0]);
            std::fs::write(dir.join(format!("{i:03}.png")), encode_png(&frame).unwrap()).unwrap();
        }
        std::fs::write(dir.join("notes.txt"), b"ignored").unwrap();
        dir
    }

    #[test]
    fn test_replay_ends_after_last_image() {
        let dir = fixture_dir("once", 3);
        let mut source = DirectorySource::open(&dir, false).unwrap();
        assert_eq!(source.len(), 3);

        for i in 0..3u32 {
            let frame = source.read_frame().unwrap().unwrap();
            assert_eq!(frame.sequence, i);
            assert_eq!(frame.get_pixel(0, 0), Some([i as u8 * 10, 0, 0]));
        }
        assert!(source.read_frame().unwrap().is_none());
    }

    #[test]
    fn test_replay_loops() {
        let dir = fixture_dir("loop", 2);
        let mut source = DirectorySource::open(&dir, true).unwrap();
        for _ in 0..5 {
            assert!(source.read_frame().unwrap().is_some());
        }
    }

    #[test]
    fn test_empty_directory_fails() {
        let dir = fixture_dir("empty", 0);
        assert!(DirectorySource::open(&dir, false).is_err());
    }
}
