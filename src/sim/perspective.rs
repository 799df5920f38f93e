//! Rotation state machine and launch driver
//!
//! `Perspective` owns the main rotation and the live puzzle state. Input
//! arrives as drag deltas, snap requests and launch requests; outcomes
//! leave as `GameEvent`s drained by the host.

use std::collections::BTreeSet;

use glam::{Mat4, Vec3};

use super::geometry::{
    drag_rotation, is_out_of_bounds, orientation_index, snap_to_axis, try_inverse,
};
use super::launch::{LaunchOutcome, LaunchSimulation, LaunchStatus};
use super::resolution::{Verdict, resolve};
use super::state::{GameEvent, GamePhase, Layout, SceneSnapshot, Solution};
use crate::error::PerspectiveError;
use crate::scoring::score_to_stars;
use crate::settings::Settings;
use crate::world::Puzzle;

/// Result of advancing the perspective by a frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    /// No launch in flight
    Idle,
    InProgress,
    Completed(Verdict),
}

#[derive(Debug)]
struct ActiveLaunch {
    sim: LaunchSimulation,
    elapsed: f32,
}

/// The player's view of one world
#[derive(Debug)]
pub struct Perspective {
    size: u32,
    settings: Settings,
    rotation: Mat4,
    inverse_rotation: Option<Mat4>,
    /// Orientation index of the last snap
    orientation: Option<usize>,
    phase: GamePhase,
    puzzle: Option<Puzzle>,
    layout: Option<Layout>,
    solution: Solution,
    launch: Option<ActiveLaunch>,
    events: Vec<GameEvent>,
}

impl Perspective {
    pub fn new(size: u32, settings: Settings) -> Self {
        Self {
            size,
            settings,
            rotation: Mat4::IDENTITY,
            inverse_rotation: Some(Mat4::IDENTITY),
            orientation: orientation_index(&Mat4::IDENTITY),
            phase: GamePhase::Idle,
            puzzle: None,
            layout: None,
            solution: Solution::new(),
            launch: None,
            events: Vec::new(),
        }
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn is_game_over(&self) -> bool {
        matches!(self.phase, GamePhase::GameOver { .. })
    }

    pub fn rotation(&self) -> Mat4 {
        self.rotation
    }

    pub fn inverse_rotation(&self) -> Option<Mat4> {
        self.inverse_rotation
    }

    pub fn solution(&self) -> &Solution {
        &self.solution
    }

    pub fn puzzle(&self) -> Option<&Puzzle> {
        self.puzzle.as_ref()
    }

    pub fn layout(&self) -> Option<&Layout> {
        self.layout.as_ref()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn has_active_launch(&self) -> bool {
        self.launch.is_some()
    }

    /// Take the events produced since the last call
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Load a puzzle into live state, replacing any previous one
    ///
    /// On failure the current puzzle is left untouched.
    pub fn import_puzzle(&mut self, puzzle: &Puzzle) -> Result<(), PerspectiveError> {
        let layout = Layout::from_puzzle(puzzle, self.size).inspect_err(|e| {
            log::error!("Puzzle import failed: {e}");
        })?;
        log::info!(
            "Imported puzzle: {} spheres, {} blocks, {} goals, {} portals (target {})",
            layout.spheres.len(),
            layout.blocks.len(),
            layout.goals.len(),
            layout.portals.len(),
            puzzle.target
        );
        self.puzzle = Some(puzzle.clone());
        self.layout = Some(layout);
        self.set_rotation(Mat4::IDENTITY);
        self.restart();
        Ok(())
    }

    /// Put every sphere back at its start and forget the attempt so far
    pub fn clear_all_locations(&mut self) -> Result<(), PerspectiveError> {
        let layout = self.layout.as_mut().ok_or(PerspectiveError::NoPuzzle)?;
        layout.reset();
        self.restart();
        Ok(())
    }

    fn restart(&mut self) {
        self.solution.clear();
        self.launch = None;
        self.events.clear();
        self.phase = GamePhase::Idle;
    }

    /// Replace the main rotation (host-driven animation or restore)
    pub fn set_rotation(&mut self, rotation: Mat4) {
        self.rotation = rotation;
        self.inverse_rotation = try_inverse(&rotation);
        if self.inverse_rotation.is_none() {
            log::warn!("Main rotation set to a singular matrix");
        }
        self.orientation = orientation_index(&rotation);
    }

    /// Compose a drag of (dx, dy) into the main rotation
    ///
    /// Ignored while a launch is in flight or once the game is over.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        if !self.accepts_rotation() {
            return;
        }
        if let Some(delta) = drag_rotation(dx, dy, self.settings.rotation_sensitivity) {
            self.rotation = delta * self.rotation;
            if self.phase == GamePhase::Idle {
                self.phase = GamePhase::Rotating;
            }
        }
    }

    /// Snap to the nearest axis-aligned orientation and refresh the inverse
    ///
    /// Landing on a new orientation counts as a move.
    pub fn rotate_to_axis(&mut self) -> Result<(), PerspectiveError> {
        if !self.accepts_rotation() {
            return Ok(());
        }
        let snapped = snap_to_axis(&self.rotation);
        self.rotation = snapped;
        self.inverse_rotation = try_inverse(&snapped);
        if self.phase == GamePhase::Rotating {
            self.phase = GamePhase::Idle;
        }
        if self.inverse_rotation.is_none() {
            log::warn!("Snapped rotation is not invertible");
            return Err(PerspectiveError::SingularRotation);
        }

        let index = orientation_index(&snapped);
        if index != self.orientation {
            self.orientation = index;
            if let (Some(i), Some(_)) = (index, &self.puzzle) {
                self.solution.record_rotation(i);
                self.events.push(GameEvent::MoveRecorded {
                    score: self.solution.score,
                });
            }
        }
        self.events.push(GameEvent::TurnComplete);
        Ok(())
    }

    fn accepts_rotation(&self) -> bool {
        matches!(self.phase, GamePhase::Idle | GamePhase::Rotating)
    }

    /// Launch along the configured view direction
    ///
    /// Returns `Ok(false)` when the request is ignored: another launch is
    /// in flight, a drag is unsnapped, or the game is over.
    pub fn launch(&mut self) -> Result<bool, PerspectiveError> {
        self.launch_along(self.settings.launch_direction)
    }

    /// Launch along a view-space direction
    pub fn launch_along(&mut self, view_axis: Vec3) -> Result<bool, PerspectiveError> {
        match self.phase {
            GamePhase::Idle => {}
            phase => {
                log::debug!("Launch ignored in {phase:?}");
                return Ok(false);
            }
        }
        let layout = self.layout.as_ref().ok_or(PerspectiveError::NoPuzzle)?;
        let Some(inverse) = self.inverse_rotation else {
            log::warn!("Launch rejected: main rotation is not invertible");
            return Err(PerspectiveError::SingularRotation);
        };
        let sim = LaunchSimulation::new(layout, inverse, view_axis, self.settings.profile)
            .inspect_err(|e| log::warn!("Launch rejected: {e}"))?;

        self.launch = Some(ActiveLaunch { sim, elapsed: 0.0 });
        self.phase = GamePhase::Animating;
        Ok(true)
    }

    /// Advance an in-flight launch by `dt` seconds of wall-clock time
    pub fn advance(&mut self, dt: f32) -> StepStatus {
        let Some(active) = self.launch.as_mut() else {
            return StepStatus::Idle;
        };
        active.elapsed += dt.max(0.0);
        let status = active.sim.step(active.elapsed);
        self.collect_from_launch();

        match status {
            LaunchStatus::InProgress { .. } => StepStatus::InProgress,
            LaunchStatus::Completed(outcome) => StepStatus::Completed(self.settle(&outcome)),
        }
    }

    /// Finish an in-flight launch immediately
    pub fn complete_launch(&mut self) -> Option<Verdict> {
        let outcome = self.launch.as_mut()?.sim.finish();
        self.collect_from_launch();
        Some(self.settle(&outcome))
    }

    fn collect_from_launch(&mut self) {
        let (Some(active), Some(layout)) = (self.launch.as_mut(), self.layout.as_mut()) else {
            return;
        };
        self.events.extend(active.sim.drain_events());
        for (name, position) in active.sim.positions() {
            if let Some(live) = layout.spheres.get_mut(name) {
                *live = position;
            }
        }
    }

    /// Record the launch and decide the puzzle's fate
    fn settle(&mut self, outcome: &LaunchOutcome) -> Verdict {
        self.launch = None;
        let Some(layout) = self.layout.as_ref() else {
            self.phase = GamePhase::Idle;
            return Verdict::Continue {
                dialogs: Vec::new(),
            };
        };
        let verdict = resolve(layout, outcome);

        self.solution.record_launch(
            outcome
                .spheres
                .iter()
                .map(|s| (s.name.as_str(), s.location())),
        );
        let score = self.solution.score;
        self.events.push(GameEvent::MoveRecorded { score });

        match &verdict {
            Verdict::Lost => {
                log::info!("Game lost after {score} moves");
                self.phase = GamePhase::GameOver { won: false };
                self.events.push(GameEvent::GameLost);
            }
            Verdict::Won => {
                let target = self.puzzle.as_ref().map_or(0, |p| p.target);
                let stars = score_to_stars(score, target);
                log::info!("Game won in {score} moves (target {target}): {stars} stars");
                self.phase = GamePhase::GameOver { won: true };
                self.events.push(GameEvent::GameWon { score, stars });
            }
            Verdict::Continue { dialogs } => {
                self.phase = GamePhase::Idle;
                if !dialogs.is_empty() {
                    self.events.push(GameEvent::DialogsReady(dialogs.clone()));
                }
            }
        }
        verdict
    }

    /// Read-only view for the rendering layer
    pub fn snapshot(&self) -> SceneSnapshot {
        let (spheres, blocks, goals, portals, scenery, half) = match &self.layout {
            Some(l) => (
                l.spheres.clone(),
                l.blocks.clone(),
                l.goals.clone(),
                l.portals.clone(),
                l.scenery.clone(),
                l.half_extent(),
            ),
            None => Default::default(),
        };
        let out_of_bounds: BTreeSet<String> = spheres
            .iter()
            .filter(|(_, p)| is_out_of_bounds(**p, half))
            .map(|(name, _)| name.clone())
            .collect();

        SceneSnapshot {
            phase: self.phase,
            rotation: self.rotation,
            inverse_rotation: self.inverse_rotation,
            spheres,
            blocks,
            goals,
            portals,
            scenery,
            blast: self.launch.as_ref().is_some_and(|l| l.sim.is_blasting()),
            out_of_bounds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::geometry::CellKey;
    use crate::world::{Element, ElementKind, Location, World};

    const TUTORIAL: &str = include_str!("../../worlds/tutorial.json");
    /// Drag length for a quarter turn at the default sensitivity
    const QUARTER: f32 = std::f32::consts::FRAC_PI_2 / 0.01;

    fn perspective(puzzle: usize) -> Perspective {
        let world = World::from_json(TUTORIAL).unwrap();
        let mut p = Perspective::new(world.size, Settings::default());
        p.import_puzzle(world.puzzle(puzzle).unwrap()).unwrap();
        p
    }

    /// Turn the cube so the launch travels along world +X
    fn face_positive_x(p: &mut Perspective) {
        p.rotate(QUARTER, 0.0);
        p.rotate(0.0, -QUARTER);
        p.rotate_to_axis().unwrap();
    }

    fn sphere_key(p: &Perspective, name: &str) -> CellKey {
        CellKey::from_vec3(p.layout().unwrap().spheres[name])
    }

    #[test]
    fn test_launch_to_goal_wins() {
        let mut p = perspective(1);
        assert!(p.launch().unwrap());
        assert_eq!(p.phase(), GamePhase::Animating);

        let status = loop {
            match p.advance(5.0) {
                StepStatus::InProgress => {}
                other => break other,
            }
        };
        assert_eq!(status, StepStatus::Completed(Verdict::Won));
        assert!(p.is_game_over());
        assert_eq!(sphere_key(&p, "ship"), CellKey::from(Location::new(0, -2, 0)));

        let events = p.drain_events();
        assert_eq!(events.first(), Some(&GameEvent::TravelStart));
        assert!(events.contains(&GameEvent::TravelComplete));
        assert_eq!(events.last(), Some(&GameEvent::GameWon { score: 1, stars: 5 }));

        // Terminal: no more input
        assert!(!p.launch().unwrap());
        p.rotate(QUARTER, 0.0);
        assert_eq!(p.rotation(), Mat4::IDENTITY);
    }

    #[test]
    fn test_block_dialogs_then_rotate_to_win() {
        let mut p = perspective(2);
        assert!(p.launch().unwrap());
        assert_eq!(
            p.complete_launch(),
            Some(Verdict::Continue {
                dialogs: vec!["stuck-1".to_string(), "stuck-2".to_string()]
            })
        );
        assert_eq!(sphere_key(&p, "ship"), CellKey::from(Location::new(0, 0, 0)));
        let events = p.drain_events();
        assert!(events.contains(&GameEvent::BlockHit {
            sphere: "ship".to_string(),
            block: "block-0".to_string(),
        }));
        assert_eq!(
            events.last(),
            Some(&GameEvent::DialogsReady(vec![
                "stuck-1".to_string(),
                "stuck-2".to_string()
            ]))
        );

        face_positive_x(&mut p);
        assert_eq!(p.solution().score, 2);
        assert_eq!(
            p.drain_events(),
            vec![GameEvent::MoveRecorded { score: 2 }, GameEvent::TurnComplete]
        );

        assert!(p.launch().unwrap());
        assert_eq!(p.complete_launch(), Some(Verdict::Won));
        assert_eq!(
            p.drain_events().last(),
            Some(&GameEvent::GameWon { score: 3, stars: 5 })
        );
        assert_eq!(p.solution().moves.len(), 3);
    }

    #[test]
    fn test_out_of_bounds_loses() {
        let mut p = perspective(1);
        face_positive_x(&mut p);
        assert!(p.launch().unwrap());
        assert_eq!(p.complete_launch(), Some(Verdict::Lost));
        assert_eq!(p.phase(), GamePhase::GameOver { won: false });
        assert!(p.snapshot().out_of_bounds.contains("ship"));

        let events = p.drain_events();
        assert!(events.contains(&GameEvent::OutlineCrossed {
            sphere: "ship".to_string()
        }));
        assert_eq!(events.last(), Some(&GameEvent::GameLost));
    }

    #[test]
    fn test_portal_puzzle() {
        let mut p = perspective(3);
        assert!(p.launch().unwrap());
        assert_eq!(p.complete_launch(), Some(Verdict::Won));
        assert_eq!(sphere_key(&p, "ship"), CellKey::from(Location::new(2, -2, 0)));
    }

    #[test]
    fn test_second_launch_ignored() {
        let mut p = perspective(1);
        assert!(p.launch().unwrap());
        assert_eq!(p.advance(0.5), StepStatus::InProgress);
        assert!(p.snapshot().blast);
        assert!(!p.launch().unwrap());
        assert!(p.has_active_launch());
    }

    #[test]
    fn test_launch_ignored_mid_drag() {
        let mut p = perspective(1);
        p.rotate(10.0, 5.0);
        assert_eq!(p.phase(), GamePhase::Rotating);
        assert!(!p.launch().unwrap());
        p.rotate_to_axis().unwrap();
        assert_eq!(p.phase(), GamePhase::Idle);
        // Small drag snaps back to where it started: no move
        assert_eq!(p.solution().score, 0);
        assert_eq!(p.drain_events(), vec![GameEvent::TurnComplete]);
    }

    #[test]
    fn test_rotation_frozen_during_flight() {
        let mut p = perspective(2);
        assert!(p.launch().unwrap());
        p.rotate(QUARTER / 2.0, 0.0);
        assert_eq!(p.rotation(), Mat4::IDENTITY);
        assert_eq!(p.phase(), GamePhase::Animating);

        // A snap mid-flight records nothing
        p.rotate_to_axis().unwrap();
        assert_eq!(p.solution().score, 0);
        assert!(!p.drain_events().contains(&GameEvent::TurnComplete));

        assert!(p.complete_launch().is_some());
        assert_eq!(p.phase(), GamePhase::Idle);
        assert_eq!(p.rotation(), Mat4::IDENTITY);
        assert_eq!(p.solution().score, 1);

        // The next launch uses an inverse that matches the live rotation
        assert!(p.launch().unwrap());
        assert_eq!(p.inverse_rotation(), Some(Mat4::IDENTITY));
    }

    #[test]
    fn test_singular_rotation_rejects_launch() {
        let mut p = perspective(1);
        p.set_rotation(Mat4::ZERO);
        assert!(p.inverse_rotation().is_none());
        assert!(matches!(p.launch(), Err(PerspectiveError::SingularRotation)));
        assert_eq!(p.phase(), GamePhase::Idle);
        assert!(!p.has_active_launch());
    }

    #[test]
    fn test_launch_without_puzzle() {
        let mut p = Perspective::new(5, Settings::default());
        assert!(matches!(p.launch(), Err(PerspectiveError::NoPuzzle)));
        assert!(matches!(
            p.clear_all_locations(),
            Err(PerspectiveError::NoPuzzle)
        ));
    }

    #[test]
    fn test_clear_all_locations_resets_attempt() {
        let mut p = perspective(2);
        p.launch().unwrap();
        p.complete_launch();
        assert_eq!(p.solution().score, 1);

        p.clear_all_locations().unwrap();
        assert_eq!(p.solution(), &Solution::new());
        assert_eq!(sphere_key(&p, "ship"), CellKey::from(Location::new(0, 2, 0)));
        assert_eq!(p.phase(), GamePhase::Idle);
    }

    #[test]
    fn test_bad_import_keeps_current_puzzle() {
        let mut p = perspective(1);
        let bad = Puzzle {
            target: 1,
            description: String::new(),
            elements: vec![Element::new("p", ElementKind::Portal, Location::new(0, 0, 0))],
            dialogs: Vec::new(),
        };
        assert!(matches!(
            p.import_puzzle(&bad),
            Err(PerspectiveError::World(_))
        ));
        assert_eq!(p.puzzle().unwrap().target, 1);
        assert!(p.layout().unwrap().spheres.contains_key("ship"));
    }
}
