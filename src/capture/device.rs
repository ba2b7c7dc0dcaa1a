//! Video4Linux capture devices.
//!
//! A capture thread owns the device and its mmap stream. It decodes each
//! frame into the shared slot, and the UI picks the newest one up through
//! [`VideoStream::refresh`]. Stopping the stream ends the thread, which drops
//! the mmap buffers and closes the device.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::thread::JoinHandle;
use std::time::Duration;

use derive_getters::Getters;
use image::{ImageFormat, RgbImage};
use tracing::{debug, error, info, instrument, warn};
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::{Device, Format, FourCC};

use super::{Camera, CaptureError, CaptureErrorKind, VideoStream};

const BUFFER_COUNT: u32 = 4;
const PREFERRED_SIZE: (u32, u32) = (640, 480);
const FRAME_TIMEOUT: Duration = Duration::from_millis(500);

type FrameSlot = Arc<Mutex<Option<RgbImage>>>;

/// Camera backed by a V4L2 device node.
#[derive(Debug, Clone, Getters)]
pub struct V4lCamera {
    device: PathBuf,
}

impl V4lCamera {
    /// Creates a camera for the device at `device`, e.g. `/dev/video0`.
    pub fn new(device: impl Into<PathBuf>) -> Self {
        Self {
            device: device.into(),
        }
    }
}

impl Camera for V4lCamera {
    /// Blocks until the device streams or fails to.
    #[instrument(skip(self), fields(device = %self.device.display()))]
    fn open(&self) -> Result<Box<dyn VideoStream>, CaptureError> {
        let latest: FrameSlot = Arc::new(Mutex::new(None));
        let running = Arc::new(AtomicBool::new(true));
        let (ready_tx, ready_rx) = mpsc::channel();

        let worker = {
            let device = self.device.clone();
            let latest = Arc::clone(&latest);
            let running = Arc::clone(&running);
            std::thread::Builder::new()
                .name("v4l-capture".to_string())
                .spawn(move || capture_loop(&device, &latest, &running, ready_tx))
                .map_err(|e| {
                    CaptureError::unavailable(format!("cannot start capture thread: {}", e))
                })?
        };

        let resolution = match ready_rx.recv() {
            Ok(Ok(resolution)) => resolution,
            Ok(Err(e)) => {
                let _ = worker.join();
                return Err(e);
            }
            Err(_) => {
                let _ = worker.join();
                return Err(CaptureError::unavailable("capture thread exited"));
            }
        };

        info!(width = resolution.0, height = resolution.1, "Video device streaming");
        Ok(Box::new(V4lStream {
            latest,
            running,
            worker: Some(worker),
            frame: None,
            resolution,
        }))
    }
}

fn capture_loop(
    device: &Path,
    latest: &FrameSlot,
    running: &AtomicBool,
    ready: mpsc::Sender<Result<(u32, u32), CaptureError>>,
) {
    let (mut stream, format) = match start_stream(device) {
        Ok(started) => started,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };
    if ready.send(Ok((format.width, format.height))).is_err() {
        return;
    }

    while running.load(Ordering::Acquire) {
        match stream.next() {
            Ok((data, _meta)) => match decode_frame(data, &format) {
                Ok(frame) => {
                    if let Ok(mut slot) = latest.lock() {
                        *slot = Some(frame);
                    }
                }
                Err(e) => debug!(error = %e, "Dropping undecodable frame"),
            },
            Err(e) if e.kind() == io::ErrorKind::TimedOut => continue,
            Err(e) => {
                error!(error = %e, "Video stream failed");
                break;
            }
        }
    }
    debug!("Capture thread exiting");
}

#[instrument]
fn start_stream(path: &Path) -> Result<(Stream<'static>, Format), CaptureError> {
    let unavailable =
        |e: io::Error| CaptureError::unavailable(format!("{}: {}", path.display(), e));

    let device = Device::with_path(path).map_err(unavailable)?;
    let mut wanted = device.format().map_err(unavailable)?;
    wanted.width = PREFERRED_SIZE.0;
    wanted.height = PREFERRED_SIZE.1;
    wanted.fourcc = FourCC::new(b"MJPG");

    let format = match device.set_format(&wanted) {
        Ok(format) => format,
        Err(e) => {
            warn!(error = %e, "Device rejected MJPG, keeping its current format");
            device.format().map_err(unavailable)?
        }
    };
    if format.fourcc != FourCC::new(b"MJPG") && format.fourcc != FourCC::new(b"YUYV") {
        return Err(CaptureError::unavailable(format!(
            "unsupported pixel format {}",
            format.fourcc
        )));
    }

    let mut stream =
        Stream::with_buffers(&device, Type::VideoCapture, BUFFER_COUNT).map_err(unavailable)?;
    stream.set_timeout(FRAME_TIMEOUT);
    debug!(fourcc = %format.fourcc, width = format.width, height = format.height, "Stream started");
    Ok((stream, format))
}

fn decode_frame(data: &[u8], format: &Format) -> Result<RgbImage, CaptureError> {
    if format.fourcc == FourCC::new(b"MJPG") {
        image::load_from_memory_with_format(data, ImageFormat::Jpeg)
            .map(|img| img.to_rgb8())
            .map_err(|e| CaptureError::new(CaptureErrorKind::Decode(e.to_string())))
    } else {
        yuyv_to_rgb(data, format.width, format.height)
    }
}

/// Converts packed YUYV 4:2:2 to RGB (BT.601).
fn yuyv_to_rgb(data: &[u8], width: u32, height: u32) -> Result<RgbImage, CaptureError> {
    let expected = width as usize * height as usize * 2;
    if data.len() < expected {
        return Err(CaptureError::new(CaptureErrorKind::Decode(format!(
            "short YUYV frame: {} of {} bytes",
            data.len(),
            expected
        ))));
    }

    let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);
    for px in data[..expected].chunks_exact(4) {
        let u = f32::from(px[1]) - 128.0;
        let v = f32::from(px[3]) - 128.0;
        for y in [f32::from(px[0]), f32::from(px[2])] {
            rgb.push(to_channel(y + 1.402 * v));
            rgb.push(to_channel(y - 0.344_136 * u - 0.714_136 * v));
            rgb.push(to_channel(y + 1.772 * u));
        }
    }

    RgbImage::from_raw(width, height, rgb).ok_or_else(|| {
        CaptureError::new(CaptureErrorKind::Decode(format!(
            "YUYV frame does not fit {}x{}",
            width, height
        )))
    })
}

fn to_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[derive(Debug)]
struct V4lStream {
    latest: FrameSlot,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    frame: Option<RgbImage>,
    resolution: (u32, u32),
}

impl VideoStream for V4lStream {
    fn resolution(&self) -> Option<(u32, u32)> {
        self.is_live().then_some(self.resolution)
    }

    fn preview(&self) -> Option<&RgbImage> {
        self.frame.as_ref().filter(|_| self.is_live())
    }

    fn grab(&mut self) -> Option<RgbImage> {
        self.refresh();
        self.preview().cloned()
    }

    fn refresh(&mut self) {
        if let Ok(mut slot) = self.latest.try_lock()
            && let Some(frame) = slot.take()
        {
            self.frame = Some(frame);
        }
    }

    fn is_live(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            debug!("Stopping video device");
            self.running.store(false, Ordering::Release);
            if worker.join().is_err() {
                error!("Capture thread panicked");
            }
            self.frame = None;
        }
    }
}

impl Drop for V4lStream {
    fn drop(&mut self) {
        self.stop();
    }
}
