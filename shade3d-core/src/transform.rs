/// Elementary affine transforms used by the camera and by callers that build
/// model matrices
use nalgebra::{Matrix4, Vector3};

/// Transform builder for 3D transformations
pub struct Transform;

impl Transform {
    /// Rotation about +X; `[1 0 0; 0 c -s; 0 s c]`
    #[rustfmt::skip]
    pub fn rotation_x(radians: f32) -> Matrix4<f32> {
        let (s, c) = radians.sin_cos();
        Matrix4::new(
            1.0, 0.0, 0.0, 0.0,
            0.0, c,   -s,  0.0,
            0.0, s,   c,   0.0,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    /// Rotation about +Y; `[c 0 s; 0 1 0; -s 0 c]`
    #[rustfmt::skip]
    pub fn rotation_y(radians: f32) -> Matrix4<f32> {
        let (s, c) = radians.sin_cos();
        Matrix4::new(
            c,   0.0, s,   0.0,
            0.0, 1.0, 0.0, 0.0,
            -s,  0.0, c,   0.0,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    /// Rotation about +Z; `[c -s 0; s c 0; 0 0 1]`
    #[rustfmt::skip]
    pub fn rotation_z(radians: f32) -> Matrix4<f32> {
        let (s, c) = radians.sin_cos();
        Matrix4::new(
            c,   -s,  0.0, 0.0,
            s,   c,   0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    /// Create a translation matrix
    pub fn translation_matrix(x: f32, y: f32, z: f32) -> Matrix4<f32> {
        Matrix4::new_translation(&Vector3::new(x, y, z))
    }

    /// Create a scale matrix
    pub fn scale_matrix(sx: f32, sy: f32, sz: f32) -> Matrix4<f32> {
        Matrix4::new_nonuniform_scaling(&Vector3::new(sx, sy, sz))
    }

    /// Model matrix for an object spun about its own axes: Rz * Ry * Rx
    pub fn euler_model(x: f32, y: f32, z: f32) -> Matrix4<f32> {
        Self::rotation_z(z) * Self::rotation_y(y) * Self::rotation_x(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    #[test]
    fn test_rotations_match_axis_angle() {
        let angle = 0.7;
        let cases = [
            (Transform::rotation_x(angle), Vector3::x_axis()),
            (Transform::rotation_y(angle), Vector3::y_axis()),
            (Transform::rotation_z(angle), Vector3::z_axis()),
        ];
        for (matrix, axis) in cases {
            let expected = Matrix4::from_axis_angle(&axis, angle);
            assert!((matrix - expected).norm() < 1e-6);
        }
    }

    #[test]
    fn test_identity_rotation() {
        let matrix = Transform::euler_model(0.0, 0.0, 0.0);
        assert!((matrix - Matrix4::identity()).norm() < 1e-6);
    }

    #[test]
    fn test_translation_lives_in_last_column() {
        let m = Transform::translation_matrix(1.0, 2.0, 3.0);
        assert_eq!(m[(0, 3)], 1.0);
        assert_eq!(m[(1, 3)], 2.0);
        assert_eq!(m[(2, 3)], 3.0);
        let p = m.transform_point(&Point3::origin());
        assert_eq!(p, Point3::new(1.0, 2.0, 3.0));
    }
}
