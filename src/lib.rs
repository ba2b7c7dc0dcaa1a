//! rps_vision - camera-driven rock-paper-scissors.
//!
//! The player shows a hand gesture to the camera. A still frame goes to a
//! remote gesture recognition service, which names both moves and the round
//! winner. This crate is the client around that call.
//!
//! # Architecture
//!
//! - **Game**: moves, mode presets, the round state machine and the match
//!   controller
//! - **Capture**: camera streams and JPEG/base64 frame encoding
//! - **Prediction**: the HTTP client for the recognition service
//! - **Session**: one match with its camera, countdown timer and pending request
//! - **TUI**: mode selection and game screens
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use rps_vision::{GameMode, GameSession, PredictionClient, RoundPhase, StillImageCamera};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let camera = Arc::new(StillImageCamera::new("camera"));
//! let predictor = Arc::new(PredictionClient::new(
//!     "http://localhost:8000",
//!     Duration::from_secs(10),
//! )?);
//!
//! let mut session = GameSession::new(GameMode::BestOfThree.config(), camera, predictor, 80);
//! session.start_round()?;
//! while let Some(event) = session.next_event().await {
//!     session.handle_event(event);
//!     let running = matches!(session.phase(), RoundPhase::Countdown { .. } | RoundPhase::Capturing);
//!     if !running && !session.is_opening_camera() {
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod capture;
mod config;
mod game;
mod prediction;
mod session;
mod tui;

// Crate-level exports - Game types
pub use game::{
    COUNTDOWN_START, GameMode, MatchConfig, MatchController, Move, RoundError, RoundErrorKind,
    RoundMachine, RoundPhase, RoundResult, Score, TickOutcome, Winner,
};

// Crate-level exports - Capture
pub use capture::{
    Camera, CameraHandle, CameraSource, CaptureError, CaptureErrorKind, DEFAULT_JPEG_QUALITY,
    EncodedFrame, StillImageCamera, VideoStream, capture_still, encode_frame,
};
#[cfg(feature = "webcam")]
pub use capture::V4lCamera;

// Crate-level exports - Prediction client
pub use prediction::{
    PREDICT_PATH, PredictRequest, PredictionClient, PredictionError, PredictionErrorKind,
    PredictionResponse, Predictor,
};

// Crate-level exports - Session
pub use session::{
    GameSession, NOTIFICATION_TTL, Notification, NotificationKind, RoundStart, SessionError,
    SessionErrorKind, SessionEvent, TICK_INTERVAL,
};

// Crate-level exports - Configuration
pub use config::{ClientConfig, ConfigError, SERVICE_URL_ENV};

// Crate-level exports - Terminal UI
pub use tui::{
    ActiveScreen, AppController, GameScreen, ModeSelectScreen, Screen, ScreenTransition,
    run_client,
};
