//! Perspective on the Vortex - puzzle simulation core
//!
//! Core modules:
//! - `sim`: Deterministic simulation (rotation state, launch trajectory, game resolution)
//! - `world`: World/puzzle records loaded from JSON
//! - `scoring`: Move counting and star rating
//! - `progress`: Per-world progress derived from stored solutions
//! - `persistence`: Solution store with integrity verification
//! - `tuning`: Data-driven launch profile

pub mod error;
pub mod persistence;
pub mod progress;
pub mod scoring;
pub mod settings;
pub mod sim;
pub mod tuning;
pub mod world;

pub use error::{PerspectiveError, PersistenceError, WorldError};
pub use scoring::{MoveBand, score_to_stars};
pub use settings::Settings;
pub use world::{Dialog, Element, ElementKind, Location, Puzzle, World};

/// Game configuration constants
pub mod consts {
    /// Launch acceleration during the burn (units/s²)
    pub const ACCELERATION: f32 = 0.01;
    /// Burn duration in seconds; the ship coasts at burn-end velocity afterwards
    pub const BURN_DURATION: f32 = 1.6;
    /// Scan step along the launch axis (units)
    pub const INCREMENT: f32 = 0.001;

    /// Decimal places kept when comparing positions
    pub const ROUND_PLACES: u32 = 3;

    /// Maximum star rating for a puzzle
    pub const MAX_STARS: u32 = 5;

    /// Name of the tutorial world (outline always shown)
    pub const WORLD_TUTORIAL: &str = "tutorial";
}

/// Round a value to `places` decimal places
#[inline]
pub fn round_to(value: f32, places: u32) -> f32 {
    let scale = 10f32.powi(places as i32);
    (value * scale).round() / scale
}

/// Round a value to the simulation's comparison precision
#[inline]
pub fn round3(value: f32) -> f32 {
    round_to(value, consts::ROUND_PLACES)
}
