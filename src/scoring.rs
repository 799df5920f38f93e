//! Star rating and move-count banding

use serde::{Deserialize, Serialize};

use crate::consts::MAX_STARS;

/// Stars earned for finishing in `score` moves against a par of `target`
///
/// At or under par earns the maximum; each move over par costs one star.
pub fn score_to_stars(score: u32, target: u32) -> u32 {
    MAX_STARS - score.saturating_sub(target).min(MAX_STARS)
}

/// How the current move count compares with par
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveBand {
    /// Still on track for full stars
    UnderTarget,
    /// Over par but stars remain
    WithinStars,
    /// No stars left to earn
    OverStars,
}

impl MoveBand {
    pub fn classify(moves: u32, target: u32) -> Self {
        if moves <= target {
            MoveBand::UnderTarget
        } else if moves <= target.saturating_add(MAX_STARS) {
            MoveBand::WithinStars
        } else {
            MoveBand::OverStars
        }
    }

    /// Colour name the HUD uses for this band
    pub fn colour(&self) -> &'static str {
        match self {
            MoveBand::UnderTarget => "green",
            MoveBand::WithinStars => "yellow",
            MoveBand::OverStars => "red",
        }
    }
}
