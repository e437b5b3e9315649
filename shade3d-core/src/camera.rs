/// Spherical camera state and the matrices derived from it
use std::str::FromStr;

use nalgebra::{Matrix4, Vector3};
use serde::Deserialize;

use crate::transform::Transform;

/// Rotation axis accepted by [`CameraState::rotate_camera`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl FromStr for Axis {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "x" => Ok(Axis::X),
            "y" => Ok(Axis::Y),
            "z" => Ok(Axis::Z),
            _ => Err(()),
        }
    }
}

/// Camera orbit described by a distance and three angles (radians).
///
/// Angles are stored as set, never wrapped. The distance is not validated:
/// zero or negative values are accepted and simply move the camera through
/// or behind the origin.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct CameraState {
    pub distance: f32,
    pub x_radian: f32,
    pub y_radian: f32,
    pub z_radian: f32,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            distance: 5.0,
            x_radian: 0.0,
            y_radian: 0.0,
            z_radian: 0.0,
        }
    }
}

impl CameraState {
    pub fn new(distance: f32) -> Self {
        Self {
            distance,
            ..Self::default()
        }
    }

    pub fn move_camera_to(&mut self, distance: f32) {
        self.distance = distance;
    }

    /// Set the angle about `axis` to `degrees`. Unknown axes are ignored.
    pub fn rotate_camera(&mut self, degrees: f32, axis: &str) {
        if let Ok(axis) = axis.parse() {
            self.set_rotation(axis, degrees);
        }
    }

    /// Typed form of [`CameraState::rotate_camera`]
    pub fn set_rotation(&mut self, axis: Axis, degrees: f32) {
        let radian = degrees.to_radians();
        match axis {
            Axis::X => self.x_radian = radian,
            Axis::Y => self.y_radian = radian,
            Axis::Z => self.z_radian = radian,
        }
    }

    /// `T(0, 0, -distance) * Rx * Ry * Rz`; the rotation order is fixed.
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Transform::translation_matrix(0.0, 0.0, -self.distance)
            * Transform::rotation_x(self.x_radian)
            * Transform::rotation_y(self.y_radian)
            * Transform::rotation_z(self.z_radian)
    }

    /// Camera position on the orbit sphere. The z angle only rolls the view
    /// and does not move the camera.
    pub fn world_position(&self) -> Vector3<f32> {
        let d = self.distance;
        let (sin_y, cos_y) = self.y_radian.sin_cos();
        let (sin_x, cos_x) = self.x_radian.sin_cos();
        Vector3::new(d * sin_y * cos_x, d * sin_y * sin_x, d * cos_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_default_state() {
        let state = CameraState::default();
        assert_eq!(state.distance, 5.0);
        assert_eq!(state.x_radian, 0.0);
        assert_eq!(state.y_radian, 0.0);
        assert_eq!(state.z_radian, 0.0);
    }

    #[test]
    fn test_view_at_zero_angles_is_translation() {
        for d in [0.0, 1.0, 5.0, 12.5, -3.0] {
            let state = CameraState::new(d);
            let expected = Matrix4::new_translation(&Vector3::new(0.0, 0.0, -d));
            assert!((state.view_matrix() - expected).norm() < 1e-6);
        }
    }

    #[test]
    fn test_view_rotation_order() {
        let mut state = CameraState::new(3.0);
        state.rotate_camera(30.0, "x");
        state.rotate_camera(60.0, "y");
        state.rotate_camera(15.0, "z");

        let (x, y, z) = (30f32.to_radians(), 60f32.to_radians(), 15f32.to_radians());
        let expected = Transform::translation_matrix(0.0, 0.0, -3.0)
            * Transform::rotation_x(x)
            * Transform::rotation_y(y)
            * Transform::rotation_z(z);
        assert!((state.view_matrix() - expected).norm() < 1e-6);

        let reordered = Transform::translation_matrix(0.0, 0.0, -3.0)
            * Transform::rotation_z(z)
            * Transform::rotation_y(y)
            * Transform::rotation_x(x);
        assert!((state.view_matrix() - reordered).norm() > 1e-2);
    }

    #[test]
    fn test_rotate_sets_rather_than_accumulates() {
        let mut state = CameraState::default();
        state.rotate_camera(90.0, "y");
        state.rotate_camera(90.0, "y");
        assert!((state.y_radian - FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn test_unknown_axis_is_ignored() {
        let mut state = CameraState::default();
        state.rotate_camera(10.0, "x");
        let before = state;
        state.rotate_camera(45.0, "w");
        state.rotate_camera(45.0, "X");
        state.rotate_camera(45.0, "");
        assert_eq!(state, before);
    }

    #[test]
    fn test_move_accepts_non_positive_distance() {
        let mut state = CameraState::default();
        state.move_camera_to(-2.0);
        assert_eq!(state.distance, -2.0);
        state.move_camera_to(0.0);
        assert_eq!(state.distance, 0.0);
    }

    #[test]
    fn test_world_position_on_x_axis() {
        let mut state = CameraState::new(5.0);
        state.y_radian = FRAC_PI_2;
        let p = state.world_position();
        assert!((p - Vector3::new(5.0, 0.0, 0.0)).norm() < 1e-5);
    }

    #[test]
    fn test_world_position_ignores_x_when_y_is_zero() {
        let mut state = CameraState::new(7.0);
        for x in [0.0, 0.5, 2.0, -4.0] {
            state.x_radian = x;
            let p = state.world_position();
            assert!((p - Vector3::new(0.0, 0.0, 7.0)).norm() < 1e-5);
        }
    }

    #[test]
    fn test_roll_does_not_move_camera() {
        let mut state = CameraState::new(5.0);
        state.rotate_camera(40.0, "y");
        let before = state.world_position();
        state.rotate_camera(75.0, "z");
        assert_eq!(state.world_position(), before);
    }
}
