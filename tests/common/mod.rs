//! Shared fakes for integration tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use image::{Rgb, RgbImage};

use rps_vision::{
    Camera, CaptureError, EncodedFrame, Move, PredictionError, PredictionErrorKind, Predictor,
    RoundResult, VideoStream, Winner,
};

/// How a [`FakeCamera`] behaves when opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CameraBehavior {
    /// Opens and delivers frames.
    Working,
    /// Opening fails as if permission was denied.
    Denied,
    /// Opens but never has a frame.
    Blank,
}

/// Camera double that counts opens and stops.
#[derive(Debug)]
pub struct FakeCamera {
    behavior: CameraBehavior,
    opens: Arc<AtomicUsize>,
    stops: Arc<AtomicUsize>,
}

impl FakeCamera {
    fn new(behavior: CameraBehavior) -> Self {
        Self {
            behavior,
            opens: Arc::new(AtomicUsize::new(0)),
            stops: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn working() -> Self {
        Self::new(CameraBehavior::Working)
    }

    pub fn denied() -> Self {
        Self::new(CameraBehavior::Denied)
    }

    pub fn blank() -> Self {
        Self::new(CameraBehavior::Blank)
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl Camera for FakeCamera {
    fn open(&self) -> Result<Box<dyn VideoStream>, CaptureError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            CameraBehavior::Denied => Err(CaptureError::unavailable("permission denied")),
            CameraBehavior::Working => Ok(Box::new(FakeStream {
                frame: Some(RgbImage::from_pixel(64, 48, Rgb([200, 120, 40]))),
                live: true,
                stops: Arc::clone(&self.stops),
            })),
            CameraBehavior::Blank => Ok(Box::new(FakeStream {
                frame: None,
                live: true,
                stops: Arc::clone(&self.stops),
            })),
        }
    }
}

/// Working camera that takes `delay` to open, like a device warming up.
#[derive(Debug)]
pub struct SlowCamera {
    delay: Duration,
    started: AtomicUsize,
    inner: FakeCamera,
}

impl SlowCamera {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            started: AtomicUsize::new(0),
            inner: FakeCamera::working(),
        }
    }

    /// Waits until some thread is inside `open`.
    pub async fn wait_until_opening(&self) {
        while self.started.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    pub fn stops(&self) -> usize {
        self.inner.stops()
    }
}

impl Camera for SlowCamera {
    fn open(&self) -> Result<Box<dyn VideoStream>, CaptureError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        self.inner.open()
    }
}

#[derive(Debug)]
struct FakeStream {
    frame: Option<RgbImage>,
    live: bool,
    stops: Arc<AtomicUsize>,
}

impl VideoStream for FakeStream {
    fn resolution(&self) -> Option<(u32, u32)> {
        self.frame.as_ref().map(|f| f.dimensions())
    }

    fn preview(&self) -> Option<&RgbImage> {
        self.frame.as_ref().filter(|_| self.live)
    }

    fn grab(&mut self) -> Option<RgbImage> {
        self.preview().cloned()
    }

    fn is_live(&self) -> bool {
        self.live
    }

    fn stop(&mut self) {
        if self.live {
            self.live = false;
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Predictor double answering from a script, in order.
#[derive(Debug, Default)]
pub struct ScriptedPredictor {
    script: Mutex<VecDeque<Result<RoundResult, PredictionError>>>,
    calls: AtomicUsize,
    last_cheat_flag: Mutex<Option<bool>>,
}

impl ScriptedPredictor {
    pub fn new(script: Vec<Result<RoundResult, PredictionError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_cheat_flag(&self) -> Option<bool> {
        *self.last_cheat_flag.lock().expect("lock")
    }
}

#[async_trait]
impl Predictor for ScriptedPredictor {
    async fn predict(
        &self,
        _frame: &EncodedFrame,
        cheat_mode: bool,
    ) -> Result<RoundResult, PredictionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_cheat_flag.lock().expect("lock") = Some(cheat_mode);
        self.script
            .lock()
            .expect("lock")
            .pop_front()
            .unwrap_or_else(|| {
                Err(PredictionError::new(PredictionErrorKind::Network(
                    "script exhausted".to_string(),
                )))
            })
    }
}

/// A round the player wins.
pub fn player_wins() -> Result<RoundResult, PredictionError> {
    Ok(RoundResult::new(Move::Rock, Move::Scissors, Winner::Player))
}

/// A round the computer wins.
pub fn computer_wins() -> Result<RoundResult, PredictionError> {
    Ok(RoundResult::new(Move::Rock, Move::Paper, Winner::Computer))
}

/// A drawn round.
pub fn draw() -> Result<RoundResult, PredictionError> {
    Ok(RoundResult::new(Move::Paper, Move::Paper, Winner::Draw))
}

/// A service failure.
pub fn service_down() -> Result<RoundResult, PredictionError> {
    Err(PredictionError::new(PredictionErrorKind::Status {
        code: 503,
        body: "unavailable".to_string(),
    }))
}
