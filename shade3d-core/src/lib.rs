/// shade3d core - camera, projection and shading pipeline
///
/// Everything here is backend independent: the matrices a frame needs, the
/// four shading modes with their texture-unit table, a CPU version of the
/// shading program and the orchestrator that pushes a frame through any
/// [`GraphicsBackend`].
pub mod backend;
pub mod camera;
pub mod config;
pub mod error;
pub mod geometry;
pub mod math;
pub mod normal;
pub mod projection;
pub mod renderer;
pub mod shading;
pub mod stl;
pub mod texture;
pub mod transform;

// Re-export commonly used types
pub use backend::{GraphicsBackend, ProgramHandle, RecordingBackend, UniformLocation, UniformValue};
pub use camera::{Axis, CameraState};
pub use config::{RendererConfig, Viewport};
pub use error::{BackendError, CompileFailure, ConfigError, ProjectionError, RenderError, TextureError};
pub use geometry::{Mesh, Triangle, Vertex, VertexAttribute, VertexStreams};
pub use projection::{ProjectionMode, ProjectionPresets};
pub use renderer::{FrameMatrices, RenderState, Renderer};
pub use shading::{ProgramDescriptor, SamplerBindings, ShadingMode, ShadingProgram, TextureSampler};
pub use texture::{CubeTexture, Texture2d, TextureDelivery, TextureSlot};
pub use transform::Transform;
