//! Data-driven launch tuning
//!
//! The launch follows a two-stage profile: a constant-acceleration burn,
//! then a coast at the burn-end velocity.

use serde::{Deserialize, Serialize};

use crate::consts::{ACCELERATION, BURN_DURATION, INCREMENT};

/// Shape of the launch trajectory and how finely it is scanned
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchProfile {
    /// Acceleration during the burn (units/s²)
    pub acceleration: f32,
    /// Burn duration (seconds)
    pub burn_duration: f32,
    /// Scan step along the launch axis (units)
    pub increment: f32,
    /// Scan budget per launch in world sizes, scaled by (portal cells + 1)
    pub travel_budget_factor: f32,
}

impl Default for LaunchProfile {
    fn default() -> Self {
        Self {
            acceleration: ACCELERATION,
            burn_duration: BURN_DURATION,
            increment: INCREMENT,
            travel_budget_factor: 4.0,
        }
    }
}

impl LaunchProfile {
    /// Velocity reached when the burn ends
    #[inline]
    pub fn burn_velocity(&self) -> f32 {
        self.acceleration * self.burn_duration
    }

    /// Distance covered `elapsed` seconds after launch
    pub fn distance_at(&self, elapsed: f32) -> f32 {
        let t = elapsed.max(0.0);
        if t < self.burn_duration {
            0.5 * self.acceleration * t * t
        } else {
            let burn = 0.5 * self.acceleration * self.burn_duration * self.burn_duration;
            burn + self.burn_velocity() * (t - self.burn_duration)
        }
    }

    /// Whether the burn is over at `elapsed`
    #[inline]
    pub fn burn_complete(&self, elapsed: f32) -> bool {
        elapsed >= self.burn_duration
    }

    /// Scan steps needed to cover `distance`
    #[inline]
    pub fn steps_for(&self, distance: f32) -> u64 {
        if distance <= 0.0 {
            return 0;
        }
        // Float-to-int casts saturate, so an unbounded distance stays finite
        (distance / self.increment).ceil() as u64
    }

    /// Scan budget for one launch in a world of `size` with `portals` portal cells
    pub fn travel_budget(&self, size: f32, portals: usize) -> f32 {
        self.travel_budget_factor * size * (portals as f32 + 1.0)
    }
}
