mod match_controller;
mod mode;
mod round;
mod types;

pub use match_controller::MatchController;
pub use mode::{GameMode, MatchConfig};
pub use round::{
    COUNTDOWN_START, RoundError, RoundErrorKind, RoundMachine, RoundPhase, TickOutcome,
};
pub use types::{Move, RoundResult, Score, Winner};
