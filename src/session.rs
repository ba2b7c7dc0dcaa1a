//! Game session: one match as seen from the game screen.
//!
//! The session owns every resource a match touches: the camera stream, the
//! pending camera acquisition, the countdown timer task, the in-flight
//! prediction task and the notification slot. Dropping the session cancels
//! the tasks and stops the camera.
//!
//! Opening the camera runs on the blocking pool. The opened stream, timer
//! ticks and prediction results come back over an mpsc channel and are
//! applied by [`GameSession::handle_event`] on the caller's loop, so all
//! state changes happen in one place.

use std::sync::Arc;
use std::time::Duration;

use derive_getters::Getters;
use derive_more::{Display, Error};
use image::RgbImage;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::capture::{Camera, CameraHandle, CaptureError, capture_still};
use crate::game::{
    COUNTDOWN_START, MatchConfig, MatchController, RoundError, RoundMachine, RoundPhase,
    RoundResult, Score, TickOutcome, Winner,
};
use crate::prediction::{PredictionError, Predictor};

/// How long a transient error notification stays visible.
pub const NOTIFICATION_TTL: Duration = Duration::from_secs(5);

/// Interval between countdown ticks.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Asynchronous input to a session.
#[derive(Debug)]
pub enum SessionEvent {
    /// Camera acquisition finished.
    CameraOpened {
        /// The opened stream, or why it could not be opened.
        result: Result<CameraHandle, CaptureError>,
    },
    /// One countdown second elapsed for `round`.
    Tick {
        /// Round the timer was started for.
        round: u64,
    },
    /// The prediction for `round` completed.
    PredictionFinished {
        /// Round the frame was captured in.
        round: u64,
        /// Service outcome.
        result: Result<RoundResult, PredictionError>,
    },
}

/// What [`GameSession::start_round`] set in motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundStart {
    /// The camera was already open; the countdown for this round is running.
    Countdown(u64),
    /// The camera is being opened. The countdown starts once it is ready.
    OpeningCamera,
}

/// How a notification is dismissed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// Stays until the player dismisses it.
    Alert,
    /// Disappears on its own after [`NOTIFICATION_TTL`].
    Transient,
}

/// A message shown over the game screen. At most one exists at a time.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct Notification {
    kind: NotificationKind,
    title: String,
    message: String,
    raised_at: Instant,
}

impl Notification {
    /// True once a transient notification has outlived its TTL.
    pub fn is_expired(&self, now: Instant) -> bool {
        self.kind == NotificationKind::Transient
            && now.saturating_duration_since(self.raised_at) >= NOTIFICATION_TTL
    }
}

/// Aborts the wrapped task when dropped.
#[derive(Debug)]
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// One match: round machine, score, camera and pending work.
#[derive(Debug)]
pub struct GameSession {
    controller: MatchController,
    machine: RoundMachine,
    camera: Arc<dyn Camera>,
    predictor: Arc<dyn Predictor>,
    jpeg_quality: u8,
    stream: Option<CameraHandle>,
    opening: Option<AbortOnDrop>,
    timer: Option<AbortOnDrop>,
    in_flight: Option<AbortOnDrop>,
    notification: Option<Notification>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl GameSession {
    /// Creates a session in `Waiting` with a zeroed score. The camera is not
    /// opened until the first round starts.
    #[instrument(skip(camera, predictor))]
    pub fn new(
        config: MatchConfig,
        camera: Arc<dyn Camera>,
        predictor: Arc<dyn Predictor>,
        jpeg_quality: u8,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            controller: MatchController::new(config),
            machine: RoundMachine::new(),
            camera,
            predictor,
            jpeg_quality,
            stream: None,
            opening: None,
            timer: None,
            in_flight: None,
            notification: None,
            events_tx,
            events_rx,
        }
    }

    /// Current round phase.
    pub fn phase(&self) -> RoundPhase {
        self.machine.phase()
    }

    /// Number of the current (or last) round.
    pub fn round(&self) -> u64 {
        self.machine.round()
    }

    /// Current score.
    pub fn score(&self) -> Score {
        *self.controller.score()
    }

    /// Match configuration.
    pub fn config(&self) -> MatchConfig {
        *self.controller.config()
    }

    /// Round wins needed to take the match.
    pub fn target(&self) -> u32 {
        self.controller.target()
    }

    /// True once either side reached the target.
    pub fn is_match_over(&self) -> bool {
        self.controller.is_match_over()
    }

    /// The side that took the match.
    pub fn match_winner(&self) -> Option<Winner> {
        self.controller.match_winner()
    }

    /// True while a frame is out for prediction.
    pub fn is_processing(&self) -> bool {
        self.machine.phase() == RoundPhase::Capturing
    }

    /// Visible notification, if any.
    pub fn notification(&self) -> Option<&Notification> {
        self.notification.as_ref()
    }

    /// True while the camera is being opened.
    pub fn is_opening_camera(&self) -> bool {
        self.opening.is_some()
    }

    /// True while a camera stream is held.
    pub fn has_camera(&self) -> bool {
        self.stream.as_ref().is_some_and(|h| h.stream().is_live())
    }

    /// Frame for the live preview.
    pub fn preview(&self) -> Option<&RgbImage> {
        self.stream.as_ref().and_then(|h| h.stream().preview())
    }

    /// `Waiting → Countdown`. Starts the countdown right away when the camera
    /// is already open. Otherwise the camera is opened on the blocking pool
    /// and the countdown begins when [`SessionEvent::CameraOpened`] arrives.
    ///
    /// If the camera cannot be acquired an alert is raised and the phase
    /// stays `Waiting`.
    #[instrument(skip(self), fields(phase = self.machine.phase().name()))]
    pub fn start_round(&mut self) -> Result<RoundStart, SessionError> {
        if self.controller.is_match_over() {
            return Err(SessionError::new(SessionErrorKind::MatchOver));
        }
        if self.machine.is_busy() || self.opening.is_some() {
            debug!("Round already in progress");
            return Err(SessionError::new(SessionErrorKind::Busy));
        }
        if self.machine.phase() != RoundPhase::Waiting {
            return Err(SessionError::new(SessionErrorKind::NotWaiting));
        }

        self.notification = None;
        if self.has_camera() {
            return Ok(RoundStart::Countdown(self.begin_countdown()?));
        }

        info!("Opening camera");
        self.opening = Some(self.spawn_camera_open());
        Ok(RoundStart::OpeningCamera)
    }

    /// `ResultShown → Waiting`. Refused once the match is over.
    #[instrument(skip(self), fields(phase = self.machine.phase().name()))]
    pub fn play_again(&mut self) -> Result<(), SessionError> {
        if self.controller.is_match_over() {
            return Err(SessionError::new(SessionErrorKind::MatchOver));
        }
        self.machine.play_again()?;
        Ok(())
    }

    /// Dismisses the visible notification.
    pub fn dismiss_notification(&mut self) {
        self.notification = None;
    }

    /// Drops a transient notification whose TTL has passed.
    pub fn expire_notification(&mut self, now: Instant) {
        if self.notification.as_ref().is_some_and(|n| n.is_expired(now)) {
            debug!("Notification expired");
            self.notification = None;
        }
    }

    /// Waits for the next asynchronous event.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events_rx.recv().await
    }

    /// Applies every event that is already queued and refreshes the preview
    /// frame. Returns how many events ran.
    pub fn pump(&mut self) -> usize {
        if let Some(handle) = self.stream.as_mut() {
            handle.stream_mut().refresh();
        }
        let mut applied = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
            applied += 1;
        }
        applied
    }

    /// Applies one asynchronous event.
    #[instrument(skip(self, event), fields(phase = self.machine.phase().name()))]
    pub fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::CameraOpened { result } => self.camera_opened(result),
            SessionEvent::Tick { round } => match self.machine.tick(round) {
                TickOutcome::Counting(remaining) => debug!(remaining, "Tick"),
                TickOutcome::CaptureNow => {
                    self.timer = None;
                    self.capture_and_submit(round);
                }
                TickOutcome::Ignored => {}
            },
            SessionEvent::PredictionFinished { round, result } => {
                self.finish_prediction(round, result)
            }
        }
    }

    /// Cancels pending work and releases the camera.
    #[instrument(skip(self))]
    pub fn release(&mut self) {
        self.opening = None;
        self.timer = None;
        self.in_flight = None;
        if self.stream.take().is_some() {
            info!("Camera released");
        }
    }

    fn begin_countdown(&mut self) -> Result<u64, SessionError> {
        let round = self.machine.begin_countdown()?;
        self.timer = Some(self.spawn_countdown(round));
        Ok(round)
    }

    fn spawn_camera_open(&self) -> AbortOnDrop {
        let camera = Arc::clone(&self.camera);
        let tx = self.events_tx.clone();
        AbortOnDrop(tokio::task::spawn_blocking(move || {
            let result = CameraHandle::acquire(camera.as_ref());
            // If the session is gone the handle drops here and stops the stream.
            let _ = tx.send(SessionEvent::CameraOpened { result });
        }))
    }

    #[instrument(skip(self, result))]
    fn camera_opened(&mut self, result: Result<CameraHandle, CaptureError>) {
        if self.opening.take().is_none() {
            debug!("Dropping camera opened after release");
            return;
        }
        match result {
            Ok(handle) => {
                self.stream = Some(handle);
                if let Err(e) = self.begin_countdown() {
                    warn!(error = %e, "Could not start countdown");
                }
            }
            Err(e) => {
                warn!(error = %e, "Camera unavailable");
                self.notify(
                    NotificationKind::Alert,
                    "Camera unavailable",
                    "Could not access the camera. Check permissions and try again.",
                );
            }
        }
    }

    fn spawn_countdown(&self, round: u64) -> AbortOnDrop {
        let tx = self.events_tx.clone();
        AbortOnDrop(tokio::spawn(async move {
            let mut interval =
                tokio::time::interval_at(Instant::now() + TICK_INTERVAL, TICK_INTERVAL);
            for _ in 0..COUNTDOWN_START {
                interval.tick().await;
                if tx.send(SessionEvent::Tick { round }).is_err() {
                    break;
                }
            }
        }))
    }

    #[instrument(skip(self))]
    fn capture_and_submit(&mut self, round: u64) {
        let frame = match self.stream.as_mut() {
            Some(handle) => capture_still(handle.stream_mut(), self.jpeg_quality),
            None => Err(CaptureError::new(crate::capture::CaptureErrorKind::NoFrame)),
        };

        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "Capture failed");
                self.machine.abort();
                self.notify(
                    NotificationKind::Transient,
                    "Capture failed",
                    "No camera frame was available. Start the round again.",
                );
                return;
            }
        };

        let predictor = Arc::clone(&self.predictor);
        let tx = self.events_tx.clone();
        let cheat_mode = *self.controller.config().cheat_mode();
        info!(round, "Frame captured, requesting prediction");
        self.in_flight = Some(AbortOnDrop(tokio::spawn(async move {
            let result = predictor.predict(&frame, cheat_mode).await;
            let _ = tx.send(SessionEvent::PredictionFinished { round, result });
        })));
    }

    #[instrument(skip(self, result))]
    fn finish_prediction(&mut self, round: u64, result: Result<RoundResult, PredictionError>) {
        if round != self.machine.round() || self.machine.phase() != RoundPhase::Capturing {
            debug!("Dropping stale prediction");
            return;
        }
        self.in_flight = None;

        match result {
            Ok(outcome) => {
                if let Err(e) = self.machine.resolve(round, outcome) {
                    warn!(error = %e, "Could not record round");
                    return;
                }
                self.controller.record_round_outcome(Some(*outcome.winner()));
            }
            Err(e) => {
                warn!(error = %e, "Prediction failed");
                self.machine.abort();
                self.notify(
                    NotificationKind::Transient,
                    "Gesture not understood",
                    "Try again with one of: ✊ rock, ✋ paper, ✌ scissors.",
                );
            }
        }
    }

    fn notify(&mut self, kind: NotificationKind, title: &str, message: &str) {
        self.notification = Some(Notification {
            kind,
            title: title.to_string(),
            message: message.to_string(),
            raised_at: Instant::now(),
        });
    }
}

impl Drop for GameSession {
    fn drop(&mut self) {
        self.release();
    }
}

/// Category of a refused session action.
#[derive(Debug, Clone, Display)]
pub enum SessionErrorKind {
    /// The match has been decided.
    #[display("match is over")]
    MatchOver,
    /// A countdown or prediction is already pending.
    #[display("round already in progress")]
    Busy,
    /// A result is on screen; play again first.
    #[display("round result still on screen")]
    NotWaiting,
    /// The round machine refused the transition.
    #[display("{}", _0)]
    Round(RoundError),
}

/// Session error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Session error: {} at {}:{}", kind, file, line)]
pub struct SessionError {
    /// What went wrong.
    pub kind: SessionErrorKind,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl SessionError {
    /// Creates a new session error with caller location tracking.
    #[track_caller]
    pub fn new(kind: SessionErrorKind) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            line: loc.line(),
            file: loc.file(),
        }
    }
}

impl From<RoundError> for SessionError {
    #[track_caller]
    fn from(err: RoundError) -> Self {
        Self::new(SessionErrorKind::Round(err))
    }
}
