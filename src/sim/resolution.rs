//! Game resolution after a launch
//!
//! Any sphere out of bounds loses the puzzle, even if others reached goals.
//! Otherwise every sphere on a goal wins. Anything else continues play and
//! may trigger narrative dialogs.

use glam::Vec3;

use super::geometry::CellKey;
use super::launch::LaunchOutcome;
use super::state::Layout;
use crate::world::Dialog;

/// What a finished launch means for the puzzle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Lost,
    Won,
    /// Dialog names triggered by where the spheres came to rest
    Continue { dialogs: Vec<String> },
}

/// Classify the resting spheres of a completed launch
pub fn resolve(layout: &Layout, outcome: &LaunchOutcome) -> Verdict {
    if outcome.spheres.iter().any(|s| s.out_of_bounds) {
        return Verdict::Lost;
    }
    if outcome.spheres.iter().all(|s| layout.is_goal(s.position)) {
        return Verdict::Won;
    }
    let resting: Vec<Vec3> = outcome.spheres.iter().map(|s| s.position).collect();
    Verdict::Continue {
        dialogs: triggered_dialogs(&layout.dialogs, &resting),
    }
}

/// Dialogs whose cell holds a sphere, by numeric suffix then name
pub fn triggered_dialogs(dialogs: &[Dialog], spheres: &[Vec3]) -> Vec<String> {
    let occupied: Vec<CellKey> = spheres.iter().map(|p| CellKey::from_vec3(*p)).collect();
    let mut triggered: Vec<&Dialog> = dialogs
        .iter()
        .filter(|d| occupied.contains(&CellKey::from(d.location)))
        .collect();
    triggered.sort_by(|a, b| a.order().cmp(&b.order()).then_with(|| a.name.cmp(&b.name)));
    triggered.into_iter().map(|d| d.name.clone()).collect()
}
