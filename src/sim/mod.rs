//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Progress derived from elapsed time only
//! - Positions compared at 3 decimal places
//! - Stable iteration order (by entity name)
//! - No rendering or platform dependencies

pub mod geometry;
pub mod launch;
pub mod perspective;
pub mod resolution;
pub mod state;

pub use geometry::{CellKey, is_cell_center, is_out_of_bounds, next_cell, snap_to_axis};
pub use launch::{LaunchOutcome, LaunchSimulation, LaunchStatus, SphereOutcome, StopReason};
pub use perspective::{Perspective, StepStatus};
pub use resolution::{Verdict, resolve, triggered_dialogs};
pub use state::{GameEvent, GamePhase, Layout, LinkedPortals, Move, SceneSnapshot, Solution};
