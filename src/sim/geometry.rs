//! Grid geometry and rotation helpers
//!
//! Positions are continuous `Vec3`s, but every comparison goes through
//! `CellKey`, which holds coordinates as integer thousandths. Two positions
//! are the same point exactly when their keys are equal.

use std::sync::OnceLock;

use glam::{Mat3, Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::{round_to, round3};

/// Scale between a unit and a key step (3 decimal places)
const KEY_SCALE: f32 = 1000.0;
const KEY_UNIT: i32 = 1000;

/// Determinants smaller than this are treated as singular
const SINGULAR_EPSILON: f32 = 1e-6;

/// A position rounded to 3 decimal places, usable as a map key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellKey(pub [i32; 3]);

impl CellKey {
    pub fn from_vec3(v: Vec3) -> Self {
        Self([
            (v.x * KEY_SCALE).round() as i32,
            (v.y * KEY_SCALE).round() as i32,
            (v.z * KEY_SCALE).round() as i32,
        ])
    }

    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(
            self.0[0] as f32 / KEY_SCALE,
            self.0[1] as f32 / KEY_SCALE,
            self.0[2] as f32 / KEY_SCALE,
        )
    }

    /// All three coordinates sit on integer grid lines
    #[inline]
    pub fn is_cell_center(self) -> bool {
        self.0.iter().all(|c| c % KEY_UNIT == 0)
    }
}

impl From<crate::world::Location> for CellKey {
    fn from(l: crate::world::Location) -> Self {
        Self([l.x * KEY_UNIT, l.y * KEY_UNIT, l.z * KEY_UNIT])
    }
}

/// Round every component to `places` decimal places
#[inline]
pub fn round_vec(v: Vec3, places: u32) -> Vec3 {
    Vec3::new(
        round_to(v.x, places),
        round_to(v.y, places),
        round_to(v.z, places),
    )
}

/// Round every component to the simulation's comparison precision
#[inline]
pub fn round3_vec(v: Vec3) -> Vec3 {
    Vec3::new(round3(v.x), round3(v.y), round3(v.z))
}

#[inline]
pub fn is_cell_center(v: Vec3) -> bool {
    CellKey::from_vec3(v).is_cell_center()
}

/// Any coordinate further than `limit` from the origin
#[inline]
pub fn is_out_of_bounds(v: Vec3, limit: f32) -> bool {
    v.abs().max_element() > limit
}

/// The neighbouring cell one step along `axis`
#[inline]
pub fn next_cell(position: Vec3, axis: Vec3) -> Vec3 {
    round3_vec(position + axis)
}

/// Snap a direction to a unit face normal (±X, ±Y or ±Z)
///
/// Returns `None` when the rounded direction is not exactly one unit axis.
pub fn face_normal(direction: Vec3) -> Option<Vec3> {
    let rounded = direction.round();
    let nonzero = rounded.to_array().iter().filter(|c| **c != 0.0).count();
    if nonzero == 1 && rounded.abs().max_element() == 1.0 {
        // Normalize -0.0 so keys and comparisons stay clean
        Some(rounded + Vec3::ZERO)
    } else {
        None
    }
}

/// Incremental rotation for a drag of (dx, dy)
///
/// Horizontal drags spin about the view Y axis, vertical drags about X.
pub fn drag_rotation(dx: f32, dy: f32, sensitivity: f32) -> Option<Mat4> {
    let length = (dx * dx + dy * dy).sqrt();
    if length <= f32::EPSILON || !length.is_finite() {
        return None;
    }
    let axis = Vec3::new(dy, dx, 0.0) / length;
    Some(Mat4::from_axis_angle(axis, length * sensitivity))
}

/// Inverse of `m`, or `None` when it is singular or not finite
pub fn try_inverse(m: &Mat4) -> Option<Mat4> {
    let det = m.determinant();
    if !det.is_finite() || det.abs() < SINGULAR_EPSILON {
        return None;
    }
    let inverse = m.inverse();
    inverse.is_finite().then_some(inverse)
}

/// The 24 rotations mapping the cube onto itself
pub fn axis_orientations() -> &'static [Mat3; 24] {
    static ORIENTATIONS: OnceLock<[Mat3; 24]> = OnceLock::new();
    ORIENTATIONS.get_or_init(|| {
        let axes = [
            Vec3::X,
            Vec3::NEG_X,
            Vec3::Y,
            Vec3::NEG_Y,
            Vec3::Z,
            Vec3::NEG_Z,
        ];
        let mut out = [Mat3::IDENTITY; 24];
        let mut n = 0;
        for x in axes {
            for y in axes {
                if x.dot(y) != 0.0 {
                    continue;
                }
                out[n] = Mat3::from_cols(x, y, x.cross(y));
                n += 1;
            }
        }
        out
    })
}

/// Nearest axis-aligned orientation to the rotation part of `m`
pub fn snap_to_axis(m: &Mat4) -> Mat4 {
    let current = Mat3::from_mat4(*m);
    let score = |candidate: &Mat3| {
        current.x_axis.dot(candidate.x_axis)
            + current.y_axis.dot(candidate.y_axis)
            + current.z_axis.dot(candidate.z_axis)
    };
    let best = axis_orientations()
        .iter()
        .max_by(|a, b| score(a).total_cmp(&score(b)))
        .copied()
        .unwrap_or(Mat3::IDENTITY);
    Mat4::from_mat3(best)
}

/// Index of `m` among the axis orientations, if it is one
pub fn orientation_index(m: &Mat4) -> Option<usize> {
    let rotation = Mat3::from_mat4(*m);
    axis_orientations()
        .iter()
        .position(|o| o.abs_diff_eq(rotation, 1e-4))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_cell_center() {
        assert!(is_cell_center(Vec3::new(0.0, 2.0, -3.0)));
        assert!(is_cell_center(Vec3::new(0.0, 1.9999, 0.0)));
        assert!(!is_cell_center(Vec3::new(0.0, 1.999, 0.0)));
        assert!(!is_cell_center(Vec3::new(0.5, 0.0, 0.0)));
    }

    #[test]
    fn test_out_of_bounds() {
        assert!(!is_out_of_bounds(Vec3::new(2.0, -2.5, 0.0), 2.5));
        assert!(is_out_of_bounds(Vec3::new(0.0, -3.0, 0.0), 2.5));
        assert!(is_out_of_bounds(Vec3::new(0.0, 0.0, 10.001), 10.0));
    }

    #[test]
    fn test_next_cell() {
        let next = next_cell(Vec3::new(0.0, 0.0, 1.0), Vec3::Z);
        assert_eq!(CellKey::from_vec3(next), CellKey([0, 0, 2000]));
    }

    #[test]
    fn test_face_normal() {
        assert_eq!(face_normal(Vec3::new(0.0, -0.9999, 0.0001)), Some(Vec3::NEG_Y));
        assert_eq!(face_normal(Vec3::new(0.7, 0.7, 0.0)), None);
        assert_eq!(face_normal(Vec3::ZERO), None);
    }

    #[test]
    fn test_orientations_are_distinct_rotations() {
        let all = axis_orientations();
        for (i, a) in all.iter().enumerate() {
            assert!((a.determinant() - 1.0).abs() < 1e-6);
            for b in &all[i + 1..] {
                assert!(!a.abs_diff_eq(*b, 1e-4));
            }
        }
    }

    #[test]
    fn test_snap_to_axis() {
        let nearly = Mat4::from_rotation_z(FRAC_PI_2 - 0.2) * Mat4::from_rotation_x(0.1);
        let snapped = snap_to_axis(&nearly);
        assert!(snapped.abs_diff_eq(Mat4::from_rotation_z(FRAC_PI_2), 1e-5));
        assert!(orientation_index(&snapped).is_some());
        assert_eq!(orientation_index(&Mat4::from_rotation_z(0.3)), None);
    }

    #[test]
    fn test_try_inverse() {
        let r = Mat4::from_rotation_y(0.7);
        let inv = try_inverse(&r).unwrap();
        assert!((inv * r).abs_diff_eq(Mat4::IDENTITY, 1e-5));
        assert!(try_inverse(&Mat4::ZERO).is_none());
        assert!(try_inverse(&Mat4::from_scale(Vec3::new(1.0, 0.0, 1.0))).is_none());
        assert!(try_inverse(&Mat4::from_cols_array(&[f32::NAN; 16])).is_none());
    }

    #[test]
    fn test_drag_rotation() {
        assert!(drag_rotation(0.0, 0.0, 0.01).is_none());
        let r = drag_rotation(157.07964, 0.0, 0.01).unwrap();
        // Quarter turn about Y
        let v = r.transform_vector3(Vec3::X);
        assert!(v.abs_diff_eq(Vec3::NEG_Z, 1e-4));
    }

    proptest! {
        #[test]
        fn prop_rounding_is_stable(x in -100f32..100.0, y in -100f32..100.0, z in -100f32..100.0) {
            let v = round3_vec(Vec3::new(x, y, z));
            prop_assert_eq!(round3_vec(v), v);
            prop_assert_eq!(CellKey::from_vec3(v), CellKey::from_vec3(round3_vec(v)));
        }

        #[test]
        fn prop_key_equality_symmetric(x in -100f32..100.0, y in -100f32..100.0, z in -100f32..100.0) {
            let a = CellKey::from_vec3(Vec3::new(x, y, z));
            let b = CellKey::from_vec3(round_vec(Vec3::new(x, y, z), 3));
            prop_assert_eq!(a, a);
            prop_assert_eq!(a == b, b == a);
        }
    }
}
