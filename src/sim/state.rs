//! Live puzzle state and the records derived from play
//!
//! `Layout` is built from a `Puzzle` at import and owns every live
//! position. The puzzle itself is never mutated.

use std::collections::{BTreeMap, BTreeSet};

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use super::geometry::CellKey;
use crate::error::WorldError;
use crate::world::{Dialog, ElementKind, Location, Puzzle};

/// Current phase of the perspective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Waiting for a gesture or a launch
    Idle,
    /// A drag gesture is rotating the world
    Rotating,
    /// A launch is in flight
    Animating,
    /// Puzzle finished; no further input is accepted
    GameOver { won: bool },
}

/// Outcome events, in the order they occur
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    TravelStart,
    /// The burn ended or the ship came to rest
    BlastComplete,
    TravelComplete,
    /// A rotation snap finished
    TurnComplete,
    BlockHit { sphere: String, block: String },
    /// Stopped against another ship already at rest
    SphereHit { sphere: String, other: String },
    PortalTraversed { sphere: String, from: Location, to: Location },
    /// Left the visible play volume
    OutlineCrossed { sphere: String },
    MoveRecorded { score: u32 },
    GameLost,
    GameWon { score: u32, stars: u32 },
    /// Dialog names to present, in order
    DialogsReady(Vec<String>),
}

/// Portal pairs keyed by entry cell
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkedPortals {
    links: BTreeMap<CellKey, Location>,
}

impl LinkedPortals {
    /// Pair portals two at a time in declaration order; links are bidirectional
    pub fn pair(portals: &[Location]) -> Result<Self, WorldError> {
        if portals.len() % 2 != 0 {
            return Err(WorldError::OddPortalCount {
                count: portals.len(),
            });
        }
        let mut links = BTreeMap::new();
        for pair in portals.chunks_exact(2) {
            links.insert(CellKey::from(pair[0]), pair[1]);
            links.insert(CellKey::from(pair[1]), pair[0]);
        }
        Ok(Self { links })
    }

    /// Exit cell for a sphere entering at `entry`
    #[inline]
    pub fn exit(&self, entry: CellKey) -> Option<Location> {
        self.links.get(&entry).copied()
    }

    /// Number of linked entries (two per pair)
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

/// Live positions of every cell-bound element in the current puzzle
#[derive(Debug, Clone)]
pub struct Layout {
    /// World edge length in cells
    pub size: f32,
    pub spheres: BTreeMap<String, Vec3>,
    pub blocks: BTreeMap<String, Vec3>,
    pub goals: BTreeMap<String, Vec3>,
    pub portals: BTreeMap<String, Vec3>,
    pub scenery: BTreeMap<String, Vec3>,
    pub links: LinkedPortals,
    pub dialogs: Vec<Dialog>,
    initial: BTreeMap<String, Vec3>,
}

impl Layout {
    pub fn from_puzzle(puzzle: &Puzzle, size: u32) -> Result<Self, WorldError> {
        if size == 0 {
            return Err(WorldError::InvalidSize);
        }

        let mut layout = Self {
            size: size as f32,
            spheres: BTreeMap::new(),
            blocks: BTreeMap::new(),
            goals: BTreeMap::new(),
            portals: BTreeMap::new(),
            scenery: BTreeMap::new(),
            links: LinkedPortals::default(),
            dialogs: puzzle.dialogs.clone(),
            initial: BTreeMap::new(),
        };
        let mut portal_cells = Vec::new();

        for element in &puzzle.elements {
            let kind = element.kind()?;
            if !kind.has_location() {
                continue;
            }
            let cell = element.cell()?;
            let position = cell.to_vec3();
            let name = element.name.clone();
            match kind {
                ElementKind::Sphere => {
                    layout.initial.insert(name.clone(), position);
                    layout.spheres.insert(name, position);
                }
                ElementKind::Block => {
                    layout.blocks.insert(name, position);
                }
                ElementKind::Goal => {
                    layout.goals.insert(name, position);
                }
                ElementKind::Portal => {
                    portal_cells.push(cell);
                    layout.portals.insert(name, position);
                }
                ElementKind::Scenery => {
                    layout.scenery.insert(name, position);
                }
                ElementKind::Sky | ElementKind::Outline => {}
            }
        }

        layout.links = LinkedPortals::pair(&portal_cells)?;
        Ok(layout)
    }

    /// Put every sphere back where the puzzle declares it
    pub fn reset(&mut self) {
        self.spheres = self.initial.clone();
    }

    /// Half the world size: anything beyond is outside the outline
    #[inline]
    pub fn half_extent(&self) -> f32 {
        self.size / 2.0
    }

    pub fn is_goal(&self, position: Vec3) -> bool {
        let key = CellKey::from_vec3(position);
        self.goals.values().any(|g| CellKey::from_vec3(*g) == key)
    }
}

/// One recorded player action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "move", rename_all = "lowercase")]
pub enum Move {
    /// Where a sphere came to rest after a launch
    Launch { sphere: String, location: Location },
    /// A snap to a new axis orientation (index into the 24 orientations)
    Rotate { orientation: usize },
}

/// Moves made during one attempt at a puzzle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub moves: Vec<Move>,
    /// Player actions taken; a launch counts once however many spheres move
    pub score: u32,
}

impl Solution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_rotation(&mut self, orientation: usize) {
        self.moves.push(Move::Rotate { orientation });
        self.score += 1;
    }

    pub fn record_launch<'a>(&mut self, resting: impl IntoIterator<Item = (&'a str, Location)>) {
        for (sphere, location) in resting {
            self.moves.push(Move::Launch {
                sphere: sphere.to_string(),
                location,
            });
        }
        self.score += 1;
    }

    pub fn clear(&mut self) {
        self.moves.clear();
        self.score = 0;
    }
}

/// Read-only view of the simulation for the rendering layer
#[derive(Debug, Clone)]
pub struct SceneSnapshot {
    pub phase: GamePhase,
    pub rotation: Mat4,
    pub inverse_rotation: Option<Mat4>,
    pub spheres: BTreeMap<String, Vec3>,
    pub blocks: BTreeMap<String, Vec3>,
    pub goals: BTreeMap<String, Vec3>,
    pub portals: BTreeMap<String, Vec3>,
    pub scenery: BTreeMap<String, Vec3>,
    /// Thruster effect active
    pub blast: bool,
    /// Spheres currently outside the outline
    pub out_of_bounds: BTreeSet<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::Element;

    fn portal_puzzle(count: i32) -> Puzzle {
        let mut elements = vec![Element::new("ship", ElementKind::Sphere, Location::new(0, 2, 0))];
        for i in 0..count {
            elements.push(Element::new(
                &format!("p{}", i + 1),
                ElementKind::Portal,
                Location::new(i, 0, 0),
            ));
        }
        Puzzle {
            target: 1,
            description: String::new(),
            elements,
            dialogs: Vec::new(),
        }
    }

    #[test]
    fn test_portals_pair_in_declaration_order() {
        let layout = Layout::from_puzzle(&portal_puzzle(4), 9).unwrap();
        let links = &layout.links;
        assert_eq!(links.len(), 4);
        let key = |x| CellKey::from(Location::new(x, 0, 0));
        assert_eq!(links.exit(key(0)), Some(Location::new(1, 0, 0)));
        assert_eq!(links.exit(key(1)), Some(Location::new(0, 0, 0)));
        assert_eq!(links.exit(key(2)), Some(Location::new(3, 0, 0)));
        assert_eq!(links.exit(key(3)), Some(Location::new(2, 0, 0)));
        assert_eq!(links.exit(key(4)), None);
    }

    #[test]
    fn test_odd_portal_count_fails_import() {
        assert!(matches!(
            Layout::from_puzzle(&portal_puzzle(3), 9),
            Err(WorldError::OddPortalCount { count: 3 })
        ));
    }

    #[test]
    fn test_unknown_kind_fails_import() {
        let mut puzzle = portal_puzzle(0);
        puzzle.elements[0].kind = "comet".to_string();
        assert!(matches!(
            Layout::from_puzzle(&puzzle, 9),
            Err(WorldError::UnknownElementKind { .. })
        ));
    }

    #[test]
    fn test_reset_restores_spheres() {
        let mut layout = Layout::from_puzzle(&portal_puzzle(0), 9).unwrap();
        layout.spheres.insert("ship".to_string(), Vec3::new(4.0, 0.0, 0.0));
        layout.reset();
        assert_eq!(layout.spheres["ship"], Vec3::new(0.0, 2.0, 0.0));
    }

    #[test]
    fn test_solution_scoring() {
        let mut solution = Solution::new();
        solution.record_rotation(3);
        solution.record_launch([("a", Location::new(0, 0, 0)), ("b", Location::new(1, 0, 0))]);
        assert_eq!(solution.score, 2);
        assert_eq!(solution.moves.len(), 3);
        solution.clear();
        assert_eq!(solution, Solution::default());
    }
}
