//! Core domain types for rock-paper-scissors.

use derive_getters::Getters;
use derive_new::new;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// A hand gesture.
///
/// The recognition service speaks Portuguese (`pedra`, `papel`, `tesoura`);
/// English names are accepted when decoding.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter,
)]
pub enum Move {
    /// Closed fist.
    #[serde(rename = "pedra", alias = "rock")]
    Rock,
    /// Open hand.
    #[serde(rename = "papel", alias = "paper")]
    Paper,
    /// Two extended fingers.
    #[serde(rename = "tesoura", alias = "scissors")]
    Scissors,
}

impl Move {
    /// Returns true if this move defeats `other`.
    pub fn beats(self, other: Move) -> bool {
        matches!(
            (self, other),
            (Move::Rock, Move::Scissors) | (Move::Paper, Move::Rock) | (Move::Scissors, Move::Paper)
        )
    }

    /// Returns the move that defeats this one.
    pub fn counter(self) -> Move {
        match self {
            Move::Rock => Move::Paper,
            Move::Paper => Move::Scissors,
            Move::Scissors => Move::Rock,
        }
    }

    /// Hand glyph used by the terminal UI.
    pub fn glyph(self) -> &'static str {
        match self {
            Move::Rock => "✊",
            Move::Paper => "✋",
            Move::Scissors => "✌",
        }
    }
}

/// Outcome of a single round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    /// The human player won the round.
    Player,
    /// The computer won the round.
    Computer,
    /// Both sides showed the same gesture.
    Draw,
}

impl Winner {
    /// Resolves a round under standard rules.
    pub fn between(player: Move, computer: Move) -> Winner {
        if player == computer {
            Winner::Draw
        } else if player.beats(computer) {
            Winner::Player
        } else {
            Winner::Computer
        }
    }
}

/// A resolved round: both gestures and who won.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Getters, new, Serialize, Deserialize)]
pub struct RoundResult {
    /// Gesture recognized for the player.
    player_move: Move,
    /// Gesture chosen by the computer.
    computer_move: Move,
    /// Round outcome.
    winner: Winner,
}

/// Cumulative match score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct Score {
    /// Rounds won by the player.
    player: u32,
    /// Rounds won by the computer.
    computer: u32,
}

impl Score {
    /// Creates a zeroed score.
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits one round to the winning side. Draws change nothing.
    pub(crate) fn credit(&mut self, winner: Winner) {
        match winner {
            Winner::Player => self.player += 1,
            Winner::Computer => self.computer += 1,
            Winner::Draw => {}
        }
    }

    /// Highest count of either side.
    pub fn leader_count(&self) -> u32 {
        self.player.max(self.computer)
    }
}
