/// Inverse-transpose used to carry normals and tangents through non-uniform
/// transforms
use log::warn;
use nalgebra::Matrix4;

use crate::math;

/// `transpose(invert(model * view))`, or identity when the product is
/// singular. A singular product never aborts the frame.
pub fn normal_transform(model: &Matrix4<f32>, view: &Matrix4<f32>) -> Matrix4<f32> {
    let model_view = math::multiply4x4(model, view);
    match math::invert4x4(&model_view) {
        Ok(inverse) => math::transpose4x4(&inverse),
        Err(err) => {
            warn!("normal transform falls back to identity: {err}");
            Matrix4::identity()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CameraState;
    use crate::transform::Transform;
    use nalgebra::Vector3;

    #[test]
    fn test_orthonormal_input_is_returned_unchanged() {
        let model = Transform::euler_model(0.3, -1.1, 0.8);
        let view = Transform::rotation_x(0.4) * Transform::rotation_y(2.0);
        let model_view = model * view;
        let normal = normal_transform(&model, &view);
        assert!((normal - model_view).norm() < 1e-5);
    }

    #[test]
    fn test_singular_input_falls_back_to_identity() {
        let model = Transform::scale_matrix(1.0, 0.0, 1.0);
        let view = CameraState::default().view_matrix();
        assert_eq!(normal_transform(&model, &view), Matrix4::identity());
    }

    #[test]
    fn test_non_uniform_scale_keeps_normals_perpendicular() {
        let model = Transform::scale_matrix(4.0, 1.0, 1.0);
        let view = Matrix4::identity();
        let normal_matrix = normal_transform(&model, &view);

        // Surface spanned by tangent (1, -1, 0) with normal (1, 1, 0)
        let tangent = model.transform_vector(&Vector3::new(1.0, -1.0, 0.0));
        let normal = normal_matrix.transform_vector(&Vector3::new(1.0, 1.0, 0.0));
        assert!(tangent.dot(&normal).abs() < 1e-5);

        // The naive transform would not stay perpendicular
        let naive = model.transform_vector(&Vector3::new(1.0, 1.0, 0.0));
        assert!(tangent.dot(&naive).abs() > 1.0);
    }
}
