//! A camera backed by still images on disk.
//!
//! Points at either a single image or a directory of PNG/JPEG files. Each
//! grab returns the current image and advances to the next one, wrapping
//! around. A missing path or a directory without decodable images behaves
//! like an absent device.

use std::path::{Path, PathBuf};

use derive_getters::Getters;
use image::RgbImage;
use tracing::{debug, info, instrument, warn};

use super::{Camera, CaptureError, VideoStream};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Camera reading frames from an image file or directory.
#[derive(Debug, Clone, Getters)]
pub struct StillImageCamera {
    source: PathBuf,
}

impl StillImageCamera {
    /// Creates a camera for the given file or directory.
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
        }
    }

    #[instrument(skip(self), fields(source = %self.source.display()))]
    fn frame_paths(&self) -> Result<Vec<PathBuf>, CaptureError> {
        if self.source.is_file() {
            return Ok(vec![self.source.clone()]);
        }
        if !self.source.is_dir() {
            return Err(CaptureError::unavailable(format!(
                "no device at {}",
                self.source.display()
            )));
        }

        let entries = std::fs::read_dir(&self.source).map_err(|e| {
            CaptureError::unavailable(format!("cannot open {}: {}", self.source.display(), e))
        })?;
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| has_image_extension(p))
            .collect();
        paths.sort();
        debug!(count = paths.len(), "Found candidate frames");
        Ok(paths)
    }
}

impl Camera for StillImageCamera {
    #[instrument(skip(self), fields(source = %self.source.display()))]
    fn open(&self) -> Result<Box<dyn VideoStream>, CaptureError> {
        let frames: Vec<RgbImage> = self
            .frame_paths()?
            .into_iter()
            .filter_map(|path| match image::open(&path) {
                Ok(img) => Some(img.to_rgb8()),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping undecodable frame");
                    None
                }
            })
            .collect();

        if frames.is_empty() {
            return Err(CaptureError::unavailable(format!(
                "no frames in {}",
                self.source.display()
            )));
        }

        info!(frames = frames.len(), "Still image stream opened");
        Ok(Box::new(StillImageStream {
            frames,
            cursor: 0,
            live: true,
        }))
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[derive(Debug)]
struct StillImageStream {
    frames: Vec<RgbImage>,
    cursor: usize,
    live: bool,
}

impl VideoStream for StillImageStream {
    fn resolution(&self) -> Option<(u32, u32)> {
        self.preview().map(|f| f.dimensions())
    }

    fn preview(&self) -> Option<&RgbImage> {
        if self.live {
            self.frames.get(self.cursor)
        } else {
            None
        }
    }

    fn grab(&mut self) -> Option<RgbImage> {
        let frame = self.preview()?.clone();
        self.cursor = (self.cursor + 1) % self.frames.len();
        Some(frame)
    }

    fn is_live(&self) -> bool {
        self.live
    }

    fn stop(&mut self) {
        if self.live {
            debug!("Stopping still image stream");
            self.live = false;
            self.frames.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn missing_source_is_unavailable() {
        let camera = StillImageCamera::new("/definitely/not/a/camera");
        let err = camera.open().expect_err("should fail");
        assert!(matches!(
            err.kind,
            super::super::CaptureErrorKind::CameraUnavailable(_)
        ));
    }

    #[test]
    fn stopped_stream_yields_nothing() {
        let mut stream = StillImageStream {
            frames: vec![RgbImage::from_pixel(4, 2, Rgb([1, 2, 3]))],
            cursor: 0,
            live: true,
        };
        assert_eq!(stream.resolution(), Some((4, 2)));
        assert!(stream.grab().is_some());
        stream.stop();
        assert!(stream.grab().is_none());
        assert!(stream.preview().is_none());
        assert!(!stream.is_live());
    }
}
