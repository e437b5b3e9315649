/// Single directional light plus ambient, evaluated per vertex
use nalgebra::{Matrix3, Vector3};

pub const AMBIENT: Vector3<f32> = Vector3::new(0.3, 0.3, 0.3);
pub const DIRECTIONAL_COLOR: Vector3<f32> = Vector3::new(0.35, 0.35, 0.35);
/// Fraction of the bump albedo added regardless of light direction
pub const BUMP_AMBIENT: f32 = 0.3;
/// View-space light position used by bump mapping
pub const BUMP_LIGHT: Vector3<f32> = Vector3::new(0.0, 0.0, 1.0);

/// Unit direction towards the directional light
pub fn directional_vector() -> Vector3<f32> {
    Vector3::new(1.0, 1.0, 1.0).normalize()
}

/// `ambient + color * max(dot(normalize(N * n), dir), 0)` when shading is on,
/// full-bright white otherwise
pub fn vertex_lighting(
    shading_on: bool,
    normal_matrix: &Matrix3<f32>,
    normal: &Vector3<f32>,
) -> Vector3<f32> {
    if !shading_on {
        return Vector3::new(1.0, 1.0, 1.0);
    }
    let transformed = (normal_matrix * normal)
        .try_normalize(1e-12)
        .unwrap_or_else(Vector3::zeros);
    let directional = transformed.dot(&directional_vector()).max(0.0);
    AMBIENT + DIRECTIONAL_COLOR * directional
}

/// Mirror `incident` about `normal` (both expected normalised)
pub fn reflect(incident: &Vector3<f32>, normal: &Vector3<f32>) -> Vector3<f32> {
    incident - normal * (2.0 * normal.dot(incident))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shading_off_is_full_bright() {
        let lit = vertex_lighting(false, &Matrix3::identity(), &Vector3::new(0.0, -1.0, 0.0));
        assert_eq!(lit, Vector3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_facing_light_gets_full_directional() {
        let n = Vector3::new(1.0, 1.0, 1.0);
        let lit = vertex_lighting(true, &Matrix3::identity(), &n);
        assert!((lit - Vector3::new(0.65, 0.65, 0.65)).norm() < 1e-5);
    }

    #[test]
    fn test_facing_away_is_ambient_only() {
        let n = Vector3::new(-1.0, 0.0, 0.0);
        let lit = vertex_lighting(true, &Matrix3::identity(), &n);
        assert!((lit - AMBIENT).norm() < 1e-6);
    }

    #[test]
    fn test_lighting_normalizes_transformed_normal() {
        let scale = Matrix3::from_diagonal(&Vector3::new(5.0, 5.0, 5.0));
        let n = Vector3::new(0.0, 0.0, 1.0);
        let scaled = vertex_lighting(true, &scale, &n);
        let unit = vertex_lighting(true, &Matrix3::identity(), &n);
        assert!((scaled - unit).norm() < 1e-6);
    }

    #[test]
    fn test_reflect() {
        let incident = Vector3::new(1.0, -1.0, 0.0).normalize();
        let r = reflect(&incident, &Vector3::y());
        assert!((r - Vector3::new(1.0, 1.0, 0.0).normalize()).norm() < 1e-6);
    }
}
