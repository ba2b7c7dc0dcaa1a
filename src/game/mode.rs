//! Game mode presets and the match configuration they produce.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use strum::EnumIter;
use tracing::instrument;

/// Preset offered on the mode-selection screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, EnumIter)]
pub enum GameMode {
    /// First to two round wins.
    #[default]
    BestOfThree,
    /// First to three round wins.
    BestOfFive,
    /// The service always counters the player's gesture, and the client reveals it.
    Cheat,
}

impl GameMode {
    /// Returns the display name.
    pub fn title(self) -> &'static str {
        match self {
            Self::BestOfThree => "Best of 3",
            Self::BestOfFive => "Best of 5",
            Self::Cheat => "Cheat Mode",
        }
    }

    /// Returns the one-line description shown under the title.
    pub fn description(self) -> &'static str {
        match self {
            Self::BestOfThree => "The classic! Win 2 rounds to become champion.",
            Self::BestOfFive => "For the determined. First to win 3 rounds takes it.",
            Self::Cheat => "See the computer's move before you throw yours!",
        }
    }

    /// Builds the immutable configuration for a match in this mode.
    #[instrument]
    pub fn config(self) -> MatchConfig {
        match self {
            Self::BestOfThree => MatchConfig::best_of(3, false),
            Self::BestOfFive => MatchConfig::best_of(5, false),
            // No round count of its own; plays to the longer target.
            Self::Cheat => MatchConfig::best_of(5, true),
        }
    }
}

/// Match configuration, fixed for the lifetime of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Round wins needed to take the match.
    target: u32,
    /// Whether the computer's move is revealed before capture.
    cheat_mode: bool,
}

impl MatchConfig {
    /// Configuration for a "best of `rounds`" match.
    ///
    /// The target is the smallest majority of `rounds`.
    #[instrument]
    pub fn best_of(rounds: u32, cheat_mode: bool) -> Self {
        Self {
            target: rounds / 2 + 1,
            cheat_mode,
        }
    }
}
