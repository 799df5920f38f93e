//! Per-world progress derived from stored solutions
//!
//! Persisted to the solution store, one record per puzzle.

use serde::{Deserialize, Serialize};

use crate::consts::MAX_STARS;
use crate::persistence::SolutionStore;
use crate::scoring::score_to_stars;
use crate::world::World;

/// Play order of the shipped worlds
pub const WORLD_ORDER: [&str; 16] = [
    "tutorial", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
    "eleven", "twelve", "thirteen", "fourteen", "fifteen",
];

/// World that follows `world`; the last (or an unknown) one wraps to the tutorial
pub fn next_world(world: &str) -> &'static str {
    WORLD_ORDER
        .iter()
        .position(|w| *w == world)
        .and_then(|i| WORLD_ORDER.get(i + 1))
        .copied()
        .unwrap_or(WORLD_ORDER[0])
}

/// Stars earned on each puzzle of a world (`None` = unsolved)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldProgress {
    pub world: String,
    pub stars: Vec<Option<u32>>,
}

impl WorldProgress {
    /// Look up every puzzle's solution in `store`
    pub fn load(world: &World, store: &SolutionStore) -> Self {
        let stars = world
            .puzzles
            .iter()
            .map(|puzzle| {
                let hash = match puzzle.content_hash() {
                    Ok(hash) => hash,
                    Err(e) => {
                        log::warn!("Cannot hash puzzle in '{}': {e}", world.name);
                        return None;
                    }
                };
                store
                    .load(&world.name, &hash)
                    .map(|s| score_to_stars(s.score, puzzle.target))
            })
            .collect();
        Self {
            world: world.name.clone(),
            stars,
        }
    }

    pub fn total_stars(&self) -> u32 {
        self.stars.iter().flatten().sum()
    }

    pub fn max_stars(&self) -> u32 {
        self.stars.len() as u32 * MAX_STARS
    }

    pub fn is_solved(&self, index: usize) -> bool {
        matches!(self.stars.get(index), Some(Some(_)))
    }

    /// First puzzle is always open; others open once solved or once the previous one is
    pub fn is_unlocked(&self, index: usize) -> bool {
        if index >= self.stars.len() {
            return false;
        }
        index == 0 || self.is_solved(index) || self.is_solved(index - 1)
    }

    pub fn is_complete(&self) -> bool {
        !self.stars.is_empty() && self.stars.iter().all(Option::is_some)
    }
}
