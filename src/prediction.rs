//! HTTP client for the gesture recognition service.
//!
//! One request per round, no retries:
//!
//! ```text
//! POST {service_url}/predicao?cheat_mode=true|false
//! {"image": "<base64 jpeg>"}
//!
//! 200 {"player_move": "pedra", "computer_move": "papel", "winner": "computer"}
//! ```

use std::time::Duration;

use async_trait::async_trait;
use derive_more::{Display, Error};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use crate::capture::EncodedFrame;
use crate::game::{Move, RoundResult, Winner};

/// Path of the prediction endpoint relative to the service URL.
pub const PREDICT_PATH: &str = "predicao";

/// Anything that can turn a captured frame into a resolved round.
#[async_trait]
pub trait Predictor: Send + Sync + std::fmt::Debug {
    /// Performs one prediction exchange.
    async fn predict(
        &self,
        frame: &EncodedFrame,
        cheat_mode: bool,
    ) -> Result<RoundResult, PredictionError>;
}

/// Request body.
#[derive(Debug, Clone, Serialize)]
pub struct PredictRequest<'a> {
    /// Base64 JPEG.
    pub image: &'a str,
}

/// Response body. Every field may be null.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionResponse {
    /// Recognized player gesture.
    pub player_move: Option<Move>,
    /// Computer's gesture.
    pub computer_move: Option<Move>,
    /// Round outcome.
    pub winner: Option<Winner>,
}

impl PredictionResponse {
    /// Validates the response into a resolved round.
    ///
    /// A missing player move or winner means the gesture was not recognized.
    /// A winner that contradicts the two moves is malformed.
    #[instrument]
    pub fn into_result(self) -> Result<RoundResult, PredictionError> {
        let (Some(player), Some(winner)) = (self.player_move, self.winner) else {
            return Err(PredictionError::new(PredictionErrorKind::Unrecognized));
        };
        let computer = self.computer_move.ok_or_else(|| {
            PredictionError::new(PredictionErrorKind::Malformed(
                "missing computer_move".to_string(),
            ))
        })?;
        let expected = Winner::between(player, computer);
        if expected != winner {
            warn!(%player, %computer, %winner, %expected, "Service verdict contradicts the moves");
            return Err(PredictionError::new(PredictionErrorKind::Malformed(format!(
                "winner {} does not follow from {} vs {}",
                winner, player, computer
            ))));
        }
        Ok(RoundResult::new(player, computer, winner))
    }
}

/// reqwest-backed [`Predictor`].
#[derive(Debug, Clone)]
pub struct PredictionClient {
    endpoint: Url,
    client: reqwest::Client,
}

impl PredictionClient {
    /// Creates a client for the service at `service_url`.
    #[instrument(skip(service_url), fields(service_url = %service_url))]
    pub fn new(service_url: &str, timeout: Duration) -> Result<Self, PredictionError> {
        let mut base = service_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let endpoint = Url::parse(&base)
            .and_then(|u| u.join(PREDICT_PATH))
            .map_err(|e| {
                PredictionError::new(PredictionErrorKind::InvalidUrl(format!(
                    "{}: {}",
                    service_url, e
                )))
            })?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PredictionError::new(PredictionErrorKind::Network(e.to_string())))?;

        info!(endpoint = %endpoint, "Prediction client ready");
        Ok(Self { endpoint, client })
    }

    /// Endpoint URL for a request with the given cheat flag.
    pub fn url(&self, cheat_mode: bool) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("cheat_mode", if cheat_mode { "true" } else { "false" });
        url
    }
}

#[async_trait]
impl Predictor for PredictionClient {
    #[instrument(skip(self, frame), fields(width = frame.width(), height = frame.height()))]
    async fn predict(
        &self,
        frame: &EncodedFrame,
        cheat_mode: bool,
    ) -> Result<RoundResult, PredictionError> {
        let url = self.url(cheat_mode);
        debug!(url = %url, "Sending frame for prediction");

        let response = self
            .client
            .post(url)
            .json(&PredictRequest {
                image: frame.base64(),
            })
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Prediction request failed");
                PredictionError::new(PredictionErrorKind::Network(e.to_string()))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            error!(error = %e, "Failed to read prediction body");
            PredictionError::new(PredictionErrorKind::Network(e.to_string()))
        })?;
        debug!(status = %status, body = %body, "Prediction response");

        if !status.is_success() {
            return Err(PredictionError::new(PredictionErrorKind::Status {
                code: status.as_u16(),
                body,
            }));
        }

        let parsed: PredictionResponse = serde_json::from_str(&body).map_err(|e| {
            PredictionError::new(PredictionErrorKind::Malformed(e.to_string()))
        })?;
        let result = parsed.into_result()?;
        info!(
            player = %result.player_move(),
            computer = %result.computer_move(),
            winner = %result.winner(),
            "Prediction received"
        );
        Ok(result)
    }
}

/// Category of a prediction failure.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum PredictionErrorKind {
    /// The configured service URL does not parse.
    #[display("invalid service URL {}", _0)]
    InvalidUrl(String),
    /// Unreachable, timed out, or connection dropped.
    #[display("network error: {}", _0)]
    Network(String),
    /// Non-success HTTP status.
    #[display("service returned {}: {}", code, body)]
    Status {
        /// HTTP status code.
        code: u16,
        /// Response body.
        body: String,
    },
    /// Body is not the expected structure.
    #[display("malformed response: {}", _0)]
    Malformed(String),
    /// The service did not recognize a gesture.
    #[display("gesture not recognized")]
    Unrecognized,
}

/// Prediction error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Prediction error: {} at {}:{}", kind, file, line)]
pub struct PredictionError {
    /// What went wrong.
    pub kind: PredictionErrorKind,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl PredictionError {
    /// Creates a new prediction error with caller location tracking.
    #[track_caller]
    pub fn new(kind: PredictionErrorKind) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
