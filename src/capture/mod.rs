//! Camera access and still-frame capture.
//!
//! A [`Camera`] hands out a [`VideoStream`] when opened. The stream is wrapped
//! in a [`CameraHandle`] which stops it on drop, so a stream can never outlive
//! the view that opened it.
//!
//! Video devices are read through Video4Linux when the `webcam` feature is
//! enabled. A file or directory of images stands in for a camera otherwise.

mod still;
#[cfg(feature = "webcam")]
mod device;

pub use still::StillImageCamera;
#[cfg(feature = "webcam")]
pub use device::V4lCamera;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use derive_getters::Getters;
use derive_more::{Display, Error};
use image::{RgbImage, codecs::jpeg::JpegEncoder};
use tracing::{debug, error, info, instrument, warn};

/// Default JPEG quality for transmitted frames.
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// A source of video streams (webcam, capture card, image directory).
pub trait Camera: Send + Sync + std::fmt::Debug {
    /// Acquires a live stream.
    ///
    /// Fails with [`CaptureErrorKind::CameraUnavailable`] when permission is
    /// denied or no device is present.
    fn open(&self) -> Result<Box<dyn VideoStream>, CaptureError>;
}

/// A live stream of frames.
pub trait VideoStream: Send + std::fmt::Debug {
    /// Native resolution of the stream, while live.
    fn resolution(&self) -> Option<(u32, u32)>;

    /// The frame currently on screen, without consuming it.
    fn preview(&self) -> Option<&RgbImage>;

    /// Takes the current frame at native resolution.
    fn grab(&mut self) -> Option<RgbImage>;

    /// Picks up the newest frame delivered by the device, without blocking.
    fn refresh(&mut self) {}

    /// Whether the stream still delivers frames.
    fn is_live(&self) -> bool;

    /// Stops every underlying track. Idempotent.
    fn stop(&mut self);
}

/// Where the camera reads frames from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraSource {
    /// A video device node such as `/dev/video0`.
    Device(PathBuf),
    /// An image file or a directory of images.
    Stills(PathBuf),
}

impl CameraSource {
    /// Classifies a configured camera path. Anything under `/dev` or any
    /// character device is a video device.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn detect(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if path.starts_with("/dev") || is_char_device(path) {
            Self::Device(path.to_path_buf())
        } else {
            Self::Stills(path.to_path_buf())
        }
    }

    /// Builds the camera for this source.
    #[instrument]
    pub fn into_camera(self) -> Arc<dyn Camera> {
        match self {
            Self::Stills(path) => Arc::new(StillImageCamera::new(path)),
            #[cfg(feature = "webcam")]
            Self::Device(path) => Arc::new(V4lCamera::new(path)),
            #[cfg(not(feature = "webcam"))]
            Self::Device(path) => {
                warn!(device = %path.display(), "Built without the webcam feature");
                Arc::new(UnsupportedDevice::new(path))
            }
        }
    }
}

#[cfg(unix)]
fn is_char_device(path: &Path) -> bool {
    use std::os::unix::fs::FileTypeExt;
    std::fs::metadata(path)
        .map(|m| m.file_type().is_char_device())
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_char_device(_path: &Path) -> bool {
    false
}

/// Stand-in for a video device when webcam support is compiled out.
#[cfg(not(feature = "webcam"))]
#[derive(Debug, Clone, derive_new::new)]
struct UnsupportedDevice {
    device: PathBuf,
}

#[cfg(not(feature = "webcam"))]
impl Camera for UnsupportedDevice {
    fn open(&self) -> Result<Box<dyn VideoStream>, CaptureError> {
        Err(CaptureError::unavailable(format!(
            "{} is a video device; rebuild with --features webcam",
            self.device.display()
        )))
    }
}

/// Exclusive owner of an open stream. Stops the stream on drop.
#[derive(Debug)]
pub struct CameraHandle {
    stream: Box<dyn VideoStream>,
}

impl CameraHandle {
    /// Opens `camera` and takes ownership of the stream.
    #[instrument(skip(camera))]
    pub fn acquire(camera: &dyn Camera) -> Result<Self, CaptureError> {
        let stream = camera.open()?;
        info!(resolution = ?stream.resolution(), "Camera stream acquired");
        Ok(Self { stream })
    }

    /// Borrow the stream.
    pub fn stream(&self) -> &dyn VideoStream {
        self.stream.as_ref()
    }

    /// Borrow the stream mutably.
    pub fn stream_mut(&mut self) -> &mut dyn VideoStream {
        self.stream.as_mut()
    }
}

impl Drop for CameraHandle {
    fn drop(&mut self) {
        debug!("Releasing camera stream");
        self.stream.stop();
    }
}

/// A still frame ready for transmission.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct EncodedFrame {
    /// Base64 of the JPEG bytes, no data-URL prefix.
    base64: String,
    /// Width in pixels.
    width: u32,
    /// Height in pixels.
    height: u32,
}

/// Grabs the current frame from `stream` and encodes it as base64 JPEG.
///
/// The encoded image keeps the stream's native resolution.
#[instrument(skip(stream))]
pub fn capture_still(
    stream: &mut dyn VideoStream,
    quality: u8,
) -> Result<EncodedFrame, CaptureError> {
    if !stream.is_live() {
        warn!("Capture attempted on a stopped stream");
        return Err(CaptureError::new(CaptureErrorKind::NoFrame));
    }
    let frame = stream
        .grab()
        .ok_or_else(|| CaptureError::new(CaptureErrorKind::NoFrame))?;
    encode_frame(&frame, quality)
}

/// Encodes an RGB frame as base64 JPEG at the given quality (1-100).
#[instrument(skip(frame), fields(width = frame.width(), height = frame.height()))]
pub fn encode_frame(frame: &RgbImage, quality: u8) -> Result<EncodedFrame, CaptureError> {
    if frame.width() == 0 || frame.height() == 0 {
        return Err(CaptureError::new(CaptureErrorKind::NoFrame));
    }

    let mut jpeg = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut jpeg, quality.clamp(1, 100));
    frame.write_with_encoder(encoder).map_err(|e| {
        error!(error = %e, "JPEG encoding failed");
        CaptureError::new(CaptureErrorKind::Encoding(e.to_string()))
    })?;

    debug!(bytes = jpeg.len(), "Frame encoded");
    Ok(EncodedFrame {
        base64: BASE64.encode(&jpeg),
        width: frame.width(),
        height: frame.height(),
    })
}

/// Category of a capture failure.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum CaptureErrorKind {
    /// Permission denied or no device.
    #[display("camera unavailable: {}", _0)]
    CameraUnavailable(String),
    /// No active video frame.
    #[display("no frame available")]
    NoFrame,
    /// A device frame could not be decoded.
    #[display("frame decoding failed: {}", _0)]
    Decode(String),
    /// The frame could not be encoded.
    #[display("encoding failed: {}", _0)]
    Encoding(String),
}

/// Capture error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Capture error: {} at {}:{}", kind, file, line)]
pub struct CaptureError {
    /// What went wrong.
    pub kind: CaptureErrorKind,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl CaptureError {
    /// Creates a new capture error with caller location tracking.
    #[track_caller]
    pub fn new(kind: CaptureErrorKind) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            line: loc.line(),
            file: loc.file(),
        }
    }

    /// Shorthand for a camera-unavailable error.
    #[track_caller]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::new(CaptureErrorKind::CameraUnavailable(reason.into()))
    }
}
