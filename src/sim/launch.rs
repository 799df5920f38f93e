//! Launch trajectory simulation
//!
//! A launch pushes every sphere along one world axis. Progress comes from
//! elapsed time through the burn/coast profile; the distance covered since
//! the previous step is scanned in fixed increments, and each time a
//! sphere lands on a cell center the following checks run in order:
//!
//! 1. outline: beyond half the world size flags the sphere once, beyond
//!    twice the world size ends its flight
//! 2. goal: stops the sphere on the goal cell
//! 3. portal: moves the sphere to the paired exit and keeps going
//!
//! Before each increment, a sphere sitting on a cell center stops where it
//! is if the next cell along the axis holds a block, a sphere already at
//! rest, or a portal whose exit is taken.
//!
//! Spheres move in lockstep, front-most first along the axis, so a sphere
//! that stops is at rest before the ones behind it move. A sphere whose
//! portal exit is reached by another sphere at the same moment stays on
//! the entry cell. Two spheres never end up resting in the same cell.
//!
//! The simulation works on copies taken at launch: the rotation snapshot,
//! the obstacle sets and the sphere positions. Nothing shared is touched
//! until the caller copies positions back.

use std::collections::{BTreeMap, BTreeSet};

use glam::{Mat4, Vec3};

use super::geometry::{CellKey, face_normal, is_out_of_bounds, next_cell, round3_vec};
use super::state::{GameEvent, Layout, LinkedPortals};
use crate::error::PerspectiveError;
use crate::tuning::LaunchProfile;
use crate::world::Location;

/// Why a sphere stopped moving
#[derive(Debug, Clone, PartialEq)]
pub enum StopReason {
    Goal,
    Block(String),
    Sphere(String),
    /// Flew past twice the world size
    Departed,
    /// Scan budget ran out (e.g. a portal loop)
    BudgetExhausted,
}

/// Final state of one sphere
#[derive(Debug, Clone, PartialEq)]
pub struct SphereOutcome {
    pub name: String,
    pub position: Vec3,
    pub stop: StopReason,
    /// Resting outside the outline
    pub out_of_bounds: bool,
}

impl SphereOutcome {
    pub fn location(&self) -> Location {
        Location::from_vec3(self.position)
    }
}

/// Result of a finished launch, spheres in name order
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchOutcome {
    pub spheres: Vec<SphereOutcome>,
}

/// Status returned from each step
#[derive(Debug, Clone, PartialEq)]
pub enum LaunchStatus {
    /// Still moving; `distance` scanned so far
    InProgress { distance: f32 },
    Completed(LaunchOutcome),
}

#[derive(Debug, Clone)]
struct Track {
    name: String,
    position: Vec3,
    outline_crossed: bool,
    stop: Option<StopReason>,
}

/// One launch in flight
#[derive(Debug, Clone)]
pub struct LaunchSimulation {
    profile: LaunchProfile,
    /// Launch direction in world-local axes, a unit face normal
    axis: Vec3,
    /// Step vector, `axis * increment`
    step: Vec3,
    outline_limit: f32,
    departure_limit: f32,
    budget_steps: u64,
    blocks: BTreeMap<CellKey, String>,
    goals: BTreeSet<CellKey>,
    links: LinkedPortals,
    tracks: Vec<Track>,
    /// Scratch buffer for the per-increment move order
    order: Vec<usize>,
    steps_done: u64,
    started: bool,
    blast_complete: bool,
    outcome: Option<LaunchOutcome>,
    events: Vec<GameEvent>,
}

impl LaunchSimulation {
    /// Prepare a launch along `view_axis`, un-rotated by `inverse_rotation`
    pub fn new(
        layout: &Layout,
        inverse_rotation: Mat4,
        view_axis: Vec3,
        profile: LaunchProfile,
    ) -> Result<Self, PerspectiveError> {
        let rotated = inverse_rotation.transform_vector3(view_axis);
        let axis =
            face_normal(rotated).ok_or(PerspectiveError::InvalidLaunchAxis(rotated.to_array()))?;

        let budget = profile.travel_budget(layout.size, layout.links.len());
        let tracks = layout
            .spheres
            .iter()
            .map(|(name, position)| Track {
                name: name.clone(),
                position: round3_vec(*position),
                outline_crossed: false,
                stop: None,
            })
            .collect();

        Ok(Self {
            profile,
            axis,
            step: axis * profile.increment,
            outline_limit: layout.half_extent(),
            departure_limit: layout.size * 2.0,
            budget_steps: profile.steps_for(budget),
            blocks: layout
                .blocks
                .iter()
                .map(|(name, p)| (CellKey::from_vec3(*p), name.clone()))
                .collect(),
            goals: layout.goals.values().map(|g| CellKey::from_vec3(*g)).collect(),
            links: layout.links.clone(),
            tracks,
            order: Vec::new(),
            steps_done: 0,
            started: false,
            blast_complete: false,
            outcome: None,
            events: Vec::new(),
        })
    }

    pub fn axis(&self) -> Vec3 {
        self.axis
    }

    /// Current sphere positions, name order
    pub fn positions(&self) -> impl Iterator<Item = (&str, Vec3)> {
        self.tracks.iter().map(|t| (t.name.as_str(), t.position))
    }

    /// Spheres that have crossed the outline during this launch
    pub fn outline_crossed(&self) -> impl Iterator<Item = &str> {
        self.tracks
            .iter()
            .filter(|t| t.outline_crossed)
            .map(|t| t.name.as_str())
    }

    /// Thruster still burning
    pub fn is_blasting(&self) -> bool {
        self.started && !self.blast_complete
    }

    pub fn is_complete(&self) -> bool {
        self.outcome.is_some()
    }

    /// Take the events produced since the last call
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Advance to `elapsed` seconds after launch
    ///
    /// Safe to call at irregular intervals; only the distance not yet
    /// scanned is processed.
    pub fn step(&mut self, elapsed: f32) -> LaunchStatus {
        if let Some(outcome) = &self.outcome {
            return LaunchStatus::Completed(outcome.clone());
        }
        self.begin();

        if self.profile.burn_complete(elapsed) {
            self.complete_blast();
        }

        let target = self
            .profile
            .steps_for(self.profile.distance_at(elapsed))
            .min(self.budget_steps);
        self.scan_to(target)
    }

    /// Run the launch to completion regardless of time
    pub fn finish(&mut self) -> LaunchOutcome {
        self.begin();
        match self.scan_to(self.budget_steps) {
            LaunchStatus::Completed(outcome) => outcome,
            // scan_to always completes once the budget is reached
            LaunchStatus::InProgress { .. } => self.complete(),
        }
    }

    fn begin(&mut self) {
        if !self.started {
            self.started = true;
            log::info!("Launch along {:?} ({} spheres)", self.axis, self.tracks.len());
            self.events.push(GameEvent::TravelStart);
        }
    }

    fn complete_blast(&mut self) {
        if !self.blast_complete {
            self.blast_complete = true;
            self.events.push(GameEvent::BlastComplete);
        }
    }

    fn scan_to(&mut self, target: u64) -> LaunchStatus {
        if self.tracks.iter().all(|t| t.stop.is_some()) {
            return LaunchStatus::Completed(self.complete());
        }
        let mut order = std::mem::take(&mut self.order);
        while self.steps_done < target {
            self.steps_done += 1;

            // Front-most sphere first so whoever stops ahead is already at rest
            order.clear();
            order.extend((0..self.tracks.len()).filter(|&i| self.tracks[i].stop.is_none()));
            let axis = self.axis;
            let tracks = &self.tracks;
            order.sort_by(|&a, &b| {
                tracks[b]
                    .position
                    .dot(axis)
                    .total_cmp(&tracks[a].position.dot(axis))
            });
            for &i in &order {
                self.advance(i);
            }

            if self.tracks.iter().all(|t| t.stop.is_some()) {
                self.order = order;
                return LaunchStatus::Completed(self.complete());
            }
        }
        self.order = order;

        if self.steps_done >= self.budget_steps {
            for track in self.tracks.iter_mut().filter(|t| t.stop.is_none()) {
                log::warn!("Sphere '{}' ran out of travel budget", track.name);
                track.stop = Some(StopReason::BudgetExhausted);
            }
            return LaunchStatus::Completed(self.complete());
        }

        LaunchStatus::InProgress {
            distance: self.steps_done as f32 * self.profile.increment,
        }
    }

    /// Move one sphere a single increment
    fn advance(&mut self, i: usize) {
        let position = self.tracks[i].position;
        if CellKey::from_vec3(position).is_cell_center() {
            let next = CellKey::from_vec3(next_cell(position, self.axis));
            if let Some(block) = self.blocks.get(&next).cloned() {
                log::debug!("Sphere '{}' stopped at block '{block}'", self.tracks[i].name);
                self.events.push(GameEvent::BlockHit {
                    sphere: self.tracks[i].name.clone(),
                    block: block.clone(),
                });
                self.stop(i, StopReason::Block(block));
                return;
            }
            // A portal whose exit is taken counts as taken itself
            let blocker = self.resting_sphere_at(next, i).or_else(|| {
                self.links
                    .exit(next)
                    .and_then(|exit| self.resting_sphere_at(CellKey::from(exit), i))
            });
            if let Some(other) = blocker {
                self.hit_sphere(i, other);
                return;
            }
        }

        let mut dest = round3_vec(position + self.step);
        let key = CellKey::from_vec3(dest);

        if key.is_cell_center() {
            if is_out_of_bounds(dest, self.outline_limit) {
                let track = &mut self.tracks[i];
                if !track.outline_crossed {
                    track.outline_crossed = true;
                    log::debug!("Sphere '{}' crossed the outline at {dest}", track.name);
                    self.events.push(GameEvent::OutlineCrossed {
                        sphere: track.name.clone(),
                    });
                }
                if is_out_of_bounds(dest, self.departure_limit) {
                    log::debug!("Sphere '{}' departed at {dest}", track.name);
                    track.position = dest;
                    self.stop(i, StopReason::Departed);
                    return;
                }
            }

            if self.goals.contains(&key) {
                log::debug!("Sphere '{}' reached goal at {dest}", self.tracks[i].name);
                self.tracks[i].position = dest;
                self.stop(i, StopReason::Goal);
                return;
            }

            if let Some(exit) = self.links.exit(key) {
                // Exit reached by another sphere this very increment
                if let Some(other) = self.occupant(CellKey::from(exit), i) {
                    self.tracks[i].position = dest;
                    self.hit_sphere(i, other);
                    return;
                }
                let from = Location::from_vec3(dest);
                dest = exit.to_vec3();
                let track = &self.tracks[i];
                log::debug!("Sphere '{}' traversed portal {from:?} -> {exit:?}", track.name);
                self.events.push(GameEvent::PortalTraversed {
                    sphere: track.name.clone(),
                    from,
                    to: exit,
                });
            }
        }

        self.tracks[i].position = dest;
    }

    fn hit_sphere(&mut self, i: usize, other: String) {
        log::debug!("Sphere '{}' stopped at sphere '{other}'", self.tracks[i].name);
        self.events.push(GameEvent::SphereHit {
            sphere: self.tracks[i].name.clone(),
            other: other.clone(),
        });
        self.stop(i, StopReason::Sphere(other));
    }

    /// Sphere at rest on `key`; departed spheres have left play
    fn resting_sphere_at(&self, key: CellKey, except: usize) -> Option<String> {
        self.tracks
            .iter()
            .enumerate()
            .find(|(j, t)| {
                *j != except
                    && matches!(&t.stop, Some(stop) if *stop != StopReason::Departed)
                    && CellKey::from_vec3(t.position) == key
            })
            .map(|(_, t)| t.name.clone())
    }

    /// Any other sphere, moving or not, whose nearest cell is `key`
    fn occupant(&self, key: CellKey, except: usize) -> Option<String> {
        self.tracks
            .iter()
            .enumerate()
            .find(|(j, t)| *j != except && CellKey::from_vec3(t.position.round()) == key)
            .map(|(_, t)| t.name.clone())
    }

    fn stop(&mut self, i: usize, reason: StopReason) {
        self.tracks[i].stop = Some(reason);
        self.complete_blast();
    }

    fn complete(&mut self) -> LaunchOutcome {
        if let Some(outcome) = &self.outcome {
            return outcome.clone();
        }
        self.complete_blast();
        let outcome = LaunchOutcome {
            spheres: self
                .tracks
                .iter()
                .map(|t| SphereOutcome {
                    name: t.name.clone(),
                    position: t.position,
                    stop: t.stop.clone().unwrap_or(StopReason::BudgetExhausted),
                    out_of_bounds: is_out_of_bounds(t.position, self.outline_limit),
                })
                .collect(),
        };
        log::info!(
            "Launch complete after {} steps: {:?}",
            self.steps_done,
            outcome
                .spheres
                .iter()
                .map(|s| (s.name.as_str(), s.location()))
                .collect::<Vec<_>>()
        );
        self.events.push(GameEvent::TravelComplete);
        self.outcome = Some(outcome.clone());
        outcome
    }
}
