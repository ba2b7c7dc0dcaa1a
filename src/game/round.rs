//! Round lifecycle state machine.
//!
//! A round moves strictly through
//! `Waiting → Countdown → Capturing → ResultShown → Waiting`.
//! The only shortcut is the error fallback from `Countdown` or `Capturing`
//! straight back to `Waiting`.
//!
//! Every round gets a number when its countdown begins. Timer ticks and
//! prediction results carry the number of the round they were issued for,
//! and anything addressed to another round is rejected.

use derive_more::{Display, Error};
use tracing::{debug, info, instrument, warn};

use super::types::RoundResult;

/// Value the countdown starts from.
pub const COUNTDOWN_START: u8 = 3;

/// Phase of the current round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    /// Idle; waiting for the player to start a round.
    Waiting,
    /// Counting down to capture. `remaining` is 3, 2 or 1.
    Countdown {
        /// Seconds left before capture.
        remaining: u8,
    },
    /// Frame captured, prediction in flight.
    Capturing,
    /// Round resolved.
    ResultShown(RoundResult),
}

impl RoundPhase {
    /// Short name used in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Countdown { .. } => "countdown",
            Self::Capturing => "capturing",
            Self::ResultShown(_) => "result",
        }
    }
}

/// What a countdown tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Still counting; carries the new remaining value.
    Counting(u8),
    /// Countdown hit zero. Capture exactly once.
    CaptureNow,
    /// Tick was stale or arrived outside a countdown.
    Ignored,
}

/// The round state machine.
#[derive(Debug, Clone)]
pub struct RoundMachine {
    phase: RoundPhase,
    round: u64,
}

impl RoundMachine {
    /// Creates a machine in `Waiting` with no rounds played.
    #[instrument]
    pub fn new() -> Self {
        Self {
            phase: RoundPhase::Waiting,
            round: 0,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    /// Number of the current (or most recent) round. Zero before the first.
    pub fn round(&self) -> u64 {
        self.round
    }

    /// True while a countdown or a capture is outstanding.
    pub fn is_busy(&self) -> bool {
        matches!(self.phase, RoundPhase::Countdown { .. } | RoundPhase::Capturing)
    }

    /// `Waiting → Countdown`. Returns the new round number.
    #[instrument(skip(self), fields(phase = self.phase.name()))]
    pub fn begin_countdown(&mut self) -> Result<u64, RoundError> {
        if self.phase != RoundPhase::Waiting {
            return Err(RoundError::invalid("start a round", &self.phase));
        }
        self.round += 1;
        self.phase = RoundPhase::Countdown {
            remaining: COUNTDOWN_START,
        };
        info!(round = self.round, "Countdown started");
        Ok(self.round)
    }

    /// Applies one countdown tick issued for `round`.
    #[instrument(skip(self), fields(current = self.round, phase = self.phase.name()))]
    pub fn tick(&mut self, round: u64) -> TickOutcome {
        if round != self.round {
            debug!("Dropping tick for another round");
            return TickOutcome::Ignored;
        }
        match self.phase {
            RoundPhase::Countdown { remaining } if remaining > 1 => {
                let remaining = remaining - 1;
                self.phase = RoundPhase::Countdown { remaining };
                debug!(remaining, "Countdown tick");
                TickOutcome::Counting(remaining)
            }
            RoundPhase::Countdown { .. } => {
                self.phase = RoundPhase::Capturing;
                info!("Countdown finished, capturing");
                TickOutcome::CaptureNow
            }
            _ => TickOutcome::Ignored,
        }
    }

    /// `Capturing → ResultShown`.
    #[instrument(skip(self, result), fields(current = self.round, phase = self.phase.name()))]
    pub fn resolve(&mut self, round: u64, result: RoundResult) -> Result<(), RoundError> {
        if round != self.round {
            return Err(RoundError::new(RoundErrorKind::StaleRound {
                got: round,
                current: self.round,
            }));
        }
        if self.phase != RoundPhase::Capturing {
            return Err(RoundError::invalid("record a result", &self.phase));
        }
        info!(winner = %result.winner(), "Round resolved");
        self.phase = RoundPhase::ResultShown(result);
        Ok(())
    }

    /// Error fallback: `Countdown | Capturing → Waiting`.
    ///
    /// Returns false when there was nothing to abort.
    #[instrument(skip(self), fields(phase = self.phase.name()))]
    pub fn abort(&mut self) -> bool {
        if self.is_busy() {
            warn!(round = self.round, "Round aborted");
            self.phase = RoundPhase::Waiting;
            true
        } else {
            false
        }
    }

    /// `ResultShown → Waiting`.
    #[instrument(skip(self), fields(phase = self.phase.name()))]
    pub fn play_again(&mut self) -> Result<(), RoundError> {
        match self.phase {
            RoundPhase::ResultShown(_) => {
                self.phase = RoundPhase::Waiting;
                Ok(())
            }
            _ => Err(RoundError::invalid("play again", &self.phase)),
        }
    }
}

impl Default for RoundMachine {
    fn default() -> Self {
        Self::new()
    }
}

/// Category of a rejected round transition.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum RoundErrorKind {
    /// The action is not allowed in the current phase.
    #[display("cannot {} while {}", action, phase)]
    InvalidTransition {
        /// What was attempted.
        action: &'static str,
        /// Phase it was attempted in.
        phase: &'static str,
    },
    /// An event addressed to an earlier round.
    #[display("event for round {} arrived during round {}", got, current)]
    StaleRound {
        /// Round the event was issued for.
        got: u64,
        /// Round currently in progress.
        current: u64,
    },
}

/// Round transition error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Round error: {} at {}:{}", kind, file, line)]
pub struct RoundError {
    /// What went wrong.
    pub kind: RoundErrorKind,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl RoundError {
    /// Creates a new round error with caller location tracking.
    #[track_caller]
    pub fn new(kind: RoundErrorKind) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            line: loc.line(),
            file: loc.file(),
        }
    }

    #[track_caller]
    fn invalid(action: &'static str, phase: &RoundPhase) -> Self {
        Self::new(RoundErrorKind::InvalidTransition {
            action,
            phase: phase.name(),
        })
    }
}
