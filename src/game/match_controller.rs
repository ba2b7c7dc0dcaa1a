//! Match controller: cumulative score and the win condition.

use derive_getters::Getters;
use tracing::{debug, info, instrument};

use super::mode::MatchConfig;
use super::types::{Score, Winner};

/// Tracks the score of one match against its fixed configuration.
#[derive(Debug, Clone, Getters)]
pub struct MatchController {
    config: MatchConfig,
    score: Score,
}

impl MatchController {
    /// Starts a match with a zeroed score.
    #[instrument]
    pub fn new(config: MatchConfig) -> Self {
        info!(target_wins = config.target(), cheat = config.cheat_mode(), "Match started");
        Self {
            config,
            score: Score::new(),
        }
    }

    /// Round wins needed to take the match.
    pub fn target(&self) -> u32 {
        *self.config.target()
    }

    /// Credits the round winner. Draws, absent winners and rounds recorded
    /// after the match has ended leave the score untouched.
    #[instrument(skip(self))]
    pub fn record_round_outcome(&mut self, winner: Option<Winner>) {
        if self.is_match_over() {
            debug!("Match already decided, ignoring outcome");
            return;
        }
        let Some(winner) = winner else {
            debug!("No winner reported");
            return;
        };
        self.score.credit(winner);
        debug!(
            player = self.score.player(),
            computer = self.score.computer(),
            "Score updated"
        );
        if self.is_match_over() {
            info!(winner = ?self.match_winner(), "Match over");
        }
    }

    /// True once either side has reached the target.
    pub fn is_match_over(&self) -> bool {
        self.score.leader_count() >= self.target()
    }

    /// The side that took the match, if it is over.
    pub fn match_winner(&self) -> Option<Winner> {
        let target = self.target();
        if *self.score.player() >= target {
            Some(Winner::Player)
        } else if *self.score.computer() >= target {
            Some(Winner::Computer)
        } else {
            None
        }
    }
}
