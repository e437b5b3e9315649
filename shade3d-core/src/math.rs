/// Pure 4x4 / 3x3 matrix helpers
///
/// Matrices use the column-vector convention: a point transforms as `M * p`
/// and translations live in the last column. `multiply4x4(a, b)` is the plain
/// product `a * b`.
use nalgebra::{Matrix3, Matrix4};

use crate::error::MathError;

/// Determinants at or below this magnitude are treated as singular.
pub const SINGULAR_EPSILON: f32 = f32::EPSILON;

pub fn multiply4x4(a: &Matrix4<f32>, b: &Matrix4<f32>) -> Matrix4<f32> {
    a * b
}

pub fn transpose3x3(m: &Matrix3<f32>) -> Matrix3<f32> {
    m.transpose()
}

pub fn transpose4x4(m: &Matrix4<f32>) -> Matrix4<f32> {
    m.transpose()
}

/// Invert a 4x4 matrix, failing when it is (numerically) singular
pub fn invert4x4(m: &Matrix4<f32>) -> Result<Matrix4<f32>, MathError> {
    let determinant = m.determinant();
    if !determinant.is_finite() || determinant.abs() <= SINGULAR_EPSILON {
        return Err(MathError::SingularMatrix { determinant });
    }
    m.try_inverse()
        .ok_or(MathError::SingularMatrix { determinant })
}

/// The linear part of an affine transform
pub fn upper_left3x3(m: &Matrix4<f32>) -> Matrix3<f32> {
    m.fixed_view::<3, 3>(0, 0).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    #[test]
    fn test_multiply_is_not_commutative() {
        let t = Matrix4::new_translation(&Vector3::new(1.0, 2.0, 3.0));
        let s = Matrix4::new_nonuniform_scaling(&Vector3::new(2.0, 2.0, 2.0));
        let ts = multiply4x4(&t, &s);
        let st = multiply4x4(&s, &t);
        assert!((ts - st).norm() > 1e-3);
        // Translation column of T*S is untouched by the scale
        assert!((ts[(0, 3)] - 1.0).abs() < 1e-6);
        assert!((st[(0, 3)] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_invert_round_trip() {
        let m = Matrix4::new_translation(&Vector3::new(1.0, -2.0, 0.5))
            * Matrix4::new_nonuniform_scaling(&Vector3::new(2.0, 3.0, 0.5));
        let inv = invert4x4(&m).unwrap();
        assert!((m * inv - Matrix4::identity()).norm() < 1e-5);
    }

    #[test]
    fn test_invert_singular() {
        let m = Matrix4::new_nonuniform_scaling(&Vector3::new(1.0, 0.0, 1.0));
        let err = invert4x4(&m).unwrap_err();
        assert!(matches!(err, MathError::SingularMatrix { .. }));
    }

    #[test]
    fn test_transpose3x3() {
        let m = Matrix3::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0);
        let t = transpose3x3(&m);
        assert_eq!(t[(0, 1)], 4.0);
        assert_eq!(t[(2, 0)], 3.0);
    }

    #[test]
    fn test_upper_left3x3() {
        let m = Matrix4::new_translation(&Vector3::new(5.0, 6.0, 7.0));
        assert_eq!(upper_left3x3(&m), Matrix3::identity());
    }
}
