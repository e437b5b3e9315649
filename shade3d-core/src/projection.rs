/// Projection matrices and the fixed presets used by the renderer
use std::fmt;
use std::str::FromStr;

use nalgebra::Matrix4;
use serde::Deserialize;

use crate::error::ProjectionError;

/// Projection mode selected by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectionMode {
    #[default]
    Perspective,
    Orthographic,
    Oblique,
}

impl ProjectionMode {
    pub fn name(self) -> &'static str {
        match self {
            ProjectionMode::Perspective => "perspective",
            ProjectionMode::Orthographic => "orthographic",
            ProjectionMode::Oblique => "oblique",
        }
    }
}

impl fmt::Display for ProjectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProjectionMode {
    type Err = ProjectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "perspective" => Ok(ProjectionMode::Perspective),
            "orthographic" => Ok(ProjectionMode::Orthographic),
            "oblique" => Ok(ProjectionMode::Oblique),
            other => Err(ProjectionError::UnknownMode(other.to_string())),
        }
    }
}

/// Symmetric frustum parameters; the aspect ratio comes from the viewport
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PerspectiveParams {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
}

/// Six clip planes of an orthographic box
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ClipBox {
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
    pub near: f32,
    pub far: f32,
}

/// Orthographic box sheared along z by two angles
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ObliqueParams {
    pub theta_degrees: f32,
    pub phi_degrees: f32,
    #[serde(flatten)]
    pub bounds: ClipBox,
}

/// Fully specified projection request
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProjectionParams {
    Perspective {
        fov_degrees: f32,
        aspect: f32,
        near: f32,
        far: f32,
    },
    Orthographic(ClipBox),
    Oblique(ObliqueParams),
}

impl ProjectionParams {
    pub fn mode(&self) -> ProjectionMode {
        match self {
            ProjectionParams::Perspective { .. } => ProjectionMode::Perspective,
            ProjectionParams::Orthographic(_) => ProjectionMode::Orthographic,
            ProjectionParams::Oblique(_) => ProjectionMode::Oblique,
        }
    }
}

/// Parameter sets used when a mode is selected by name
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProjectionPresets {
    pub perspective: PerspectiveParams,
    pub orthographic: ClipBox,
    pub oblique: ObliqueParams,
}

impl Default for ProjectionPresets {
    fn default() -> Self {
        Self {
            perspective: PerspectiveParams {
                fov_degrees: 45.0,
                near: 0.1,
                far: 15.0,
            },
            orthographic: ClipBox {
                left: -4.0,
                right: 4.0,
                bottom: -4.0,
                top: 4.0,
                near: 0.1,
                far: 15.0,
            },
            oblique: ObliqueParams {
                theta_degrees: 45.0,
                phi_degrees: 45.0,
                bounds: ClipBox {
                    left: -6.0,
                    right: 2.0,
                    bottom: -6.0,
                    top: 2.0,
                    near: -2.0,
                    far: 10.0,
                },
            },
        }
    }
}

impl ProjectionPresets {
    /// Resolve a mode into concrete parameters for the given viewport aspect
    pub fn params(&self, mode: ProjectionMode, aspect: f32) -> ProjectionParams {
        match mode {
            ProjectionMode::Perspective => ProjectionParams::Perspective {
                fov_degrees: self.perspective.fov_degrees,
                aspect,
                near: self.perspective.near,
                far: self.perspective.far,
            },
            ProjectionMode::Orthographic => ProjectionParams::Orthographic(self.orthographic),
            ProjectionMode::Oblique => ProjectionParams::Oblique(self.oblique),
        }
    }

    pub fn build(&self, mode: ProjectionMode, aspect: f32) -> Result<Matrix4<f32>, ProjectionError> {
        build(&self.params(mode, aspect))
    }
}

/// Build a projection matrix, rejecting degenerate parameters
pub fn build(params: &ProjectionParams) -> Result<Matrix4<f32>, ProjectionError> {
    match *params {
        ProjectionParams::Perspective {
            fov_degrees,
            aspect,
            near,
            far,
        } => perspective(fov_degrees, aspect, near, far),
        ProjectionParams::Orthographic(clip) => orthographic(&clip),
        ProjectionParams::Oblique(oblique_params) => oblique(&oblique_params),
    }
}

pub fn perspective(
    fov_degrees: f32,
    aspect: f32,
    near: f32,
    far: f32,
) -> Result<Matrix4<f32>, ProjectionError> {
    if !(fov_degrees > 0.0 && fov_degrees < 180.0) {
        return Err(invalid(format!(
            "field of view must be within (0, 180) degrees, got {fov_degrees}"
        )));
    }
    if !(aspect > 0.0 && aspect.is_finite()) {
        return Err(invalid(format!("aspect must be positive, got {aspect}")));
    }
    if !(near > 0.0) {
        return Err(invalid(format!("near plane must be positive, got {near}")));
    }
    if !(far > near) {
        return Err(invalid(format!(
            "far plane ({far}) must lie beyond near plane ({near})"
        )));
    }
    Ok(Matrix4::new_perspective(
        aspect,
        fov_degrees.to_radians(),
        near,
        far,
    ))
}

pub fn orthographic(clip: &ClipBox) -> Result<Matrix4<f32>, ProjectionError> {
    validate_box(clip)?;
    Ok(Matrix4::new_orthographic(
        clip.left,
        clip.right,
        clip.bottom,
        clip.top,
        clip.near,
        clip.far,
    ))
}

/// Cavalier/cabinet style projection: the box is sheared so that depth
/// displaces x and y by the cotangents of the two angles.
pub fn oblique(params: &ObliqueParams) -> Result<Matrix4<f32>, ProjectionError> {
    let cot_theta = cotangent(params.theta_degrees)?;
    let cot_phi = cotangent(params.phi_degrees)?;
    let ortho = orthographic(&params.bounds)?;

    #[rustfmt::skip]
    let shear = Matrix4::new(
        1.0, 0.0, cot_theta, 0.0,
        0.0, 1.0, cot_phi,   0.0,
        0.0, 0.0, 1.0,       0.0,
        0.0, 0.0, 0.0,       1.0,
    );
    Ok(ortho * shear)
}

fn cotangent(degrees: f32) -> Result<f32, ProjectionError> {
    let radians = degrees.to_radians();
    let sin = radians.sin();
    if !degrees.is_finite() || sin.abs() < 1e-6 {
        return Err(invalid(format!(
            "oblique angle {degrees} has no finite cotangent"
        )));
    }
    Ok(radians.cos() / sin)
}

fn validate_box(clip: &ClipBox) -> Result<(), ProjectionError> {
    if !(clip.right > clip.left) {
        return Err(invalid(format!(
            "right ({}) must exceed left ({})",
            clip.right, clip.left
        )));
    }
    if !(clip.top > clip.bottom) {
        return Err(invalid(format!(
            "top ({}) must exceed bottom ({})",
            clip.top, clip.bottom
        )));
    }
    if !(clip.far > clip.near) {
        return Err(invalid(format!(
            "far ({}) must exceed near ({})",
            clip.far, clip.near
        )));
    }
    Ok(())
}

fn invalid(message: String) -> ProjectionError {
    ProjectionError::InvalidParameter(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Point3, Vector4};

    #[test]
    fn test_mode_parsing() {
        assert_eq!(
            "orthographic".parse::<ProjectionMode>().unwrap(),
            ProjectionMode::Orthographic
        );
        assert!(matches!(
            "fisheye".parse::<ProjectionMode>(),
            Err(ProjectionError::UnknownMode(_))
        ));
    }

    #[test]
    fn test_perspective_is_idempotent() {
        let presets = ProjectionPresets::default();
        let a = presets.build(ProjectionMode::Perspective, 800.0 / 600.0).unwrap();
        let b = presets.build(ProjectionMode::Perspective, 800.0 / 600.0).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_perspective_maps_near_and_far_planes() {
        let m = perspective(45.0, 1.0, 0.1, 15.0).unwrap();
        let near = m * Vector4::new(0.0, 0.0, -0.1, 1.0);
        let far = m * Vector4::new(0.0, 0.0, -15.0, 1.0);
        assert!((near.z / near.w + 1.0).abs() < 1e-4);
        assert!((far.z / far.w - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_perspective_rejects_far_before_near() {
        assert!(matches!(
            perspective(45.0, 1.0, 10.0, 1.0),
            Err(ProjectionError::InvalidParameter(_))
        ));
        assert!(perspective(0.0, 1.0, 0.1, 1.0).is_err());
        assert!(perspective(45.0, 1.0, 0.0, 1.0).is_err());
    }

    #[test]
    fn test_orthographic_maps_box_corners() {
        let presets = ProjectionPresets::default();
        let m = orthographic(&presets.orthographic).unwrap();
        let corner = m.transform_point(&Point3::new(4.0, -4.0, -0.1));
        assert!((corner.x - 1.0).abs() < 1e-5);
        assert!((corner.y + 1.0).abs() < 1e-5);
        assert!((corner.z + 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_orthographic_rejects_inverted_box() {
        let mut clip = ProjectionPresets::default().orthographic;
        clip.top = clip.bottom;
        assert!(orthographic(&clip).is_err());
    }

    #[test]
    fn test_oblique_shears_by_cotangent() {
        let params = ProjectionPresets::default().oblique;
        let ortho = orthographic(&params.bounds).unwrap();
        let m = oblique(&params).unwrap();
        // A point one unit deep is displaced by cot(45) = 1 along x and y
        let sheared = m.transform_point(&Point3::new(0.0, 0.0, 1.0));
        let expected = ortho.transform_point(&Point3::new(1.0, 1.0, 1.0));
        assert!((sheared - expected).norm() < 1e-5);
        // Points on the z = 0 plane are not sheared
        let flat = m.transform_point(&Point3::new(1.0, 1.0, 0.0));
        let flat_ortho = ortho.transform_point(&Point3::new(1.0, 1.0, 0.0));
        assert!((flat - flat_ortho).norm() < 1e-6);
    }

    #[test]
    fn test_oblique_rejects_flat_angle() {
        let mut params = ProjectionPresets::default().oblique;
        params.theta_degrees = 180.0;
        assert!(oblique(&params).is_err());
    }
}
