/// The seam to whatever executes the shading program: a GPU API, a software
/// rasteriser or a recorder used by tests.
pub mod recording;

use nalgebra::{Matrix4, Vector3};

use crate::error::{BackendError, CompileFailure};
use crate::geometry::VertexAttribute;
use crate::shading::ProgramDescriptor;

pub use recording::{BackendCall, RecordingBackend};

/// Opaque program handle issued by a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u32);

/// Opaque uniform location issued by a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

/// Uniform payloads. Matrices travel as computed by the core; backends
/// that want flat arrays use [`row_major`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Mat4(Matrix4<f32>),
    Vec3(Vector3<f32>),
    Int(i32),
    Bool(bool),
}

/// Flatten a matrix row by row, the order it is written in source
pub fn row_major(m: &Matrix4<f32>) -> [f32; 16] {
    let mut out = [0.0; 16];
    for row in 0..4 {
        for col in 0..4 {
            out[row * 4 + col] = m[(row, col)];
        }
    }
    out
}

/// Operations the frame orchestrator needs from a graphics backend
pub trait GraphicsBackend {
    /// Build a program. A failed build still yields an inert handle inside
    /// the error so callers can keep going.
    fn compile(&mut self, descriptor: &ProgramDescriptor) -> Result<ProgramHandle, CompileFailure>;

    fn uniform_location(&mut self, program: ProgramHandle, name: &str) -> Option<UniformLocation>;

    /// Replace the contents of one attribute stream
    fn upload_attribute(
        &mut self,
        program: ProgramHandle,
        attribute: VertexAttribute,
        data: &[f32],
    ) -> Result<(), BackendError>;

    fn use_program(&mut self, program: ProgramHandle) -> Result<(), BackendError>;

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) -> Result<(), BackendError>;

    /// Draw `count` vertices as a triangle list starting at `first`
    fn draw_triangles(&mut self, first: usize, count: usize) -> Result<(), BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::Transform;

    #[test]
    fn test_row_major_keeps_translation_in_last_column() {
        let flat = row_major(&Transform::translation_matrix(1.0, 2.0, 3.0));
        assert_eq!(flat[3], 1.0);
        assert_eq!(flat[7], 2.0);
        assert_eq!(flat[11], 3.0);
        assert_eq!(flat[12], 0.0);
    }
}
