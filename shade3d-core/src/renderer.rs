/// Per-frame orchestration: derive matrices from the render state, push them
/// with the mode uniforms to the backend and issue the draw
use std::collections::HashMap;

use log::{debug, error, info, warn};
use nalgebra::{Matrix4, Vector3};

use crate::backend::{GraphicsBackend, ProgramHandle, UniformLocation, UniformValue};
use crate::camera::CameraState;
use crate::config::{RendererConfig, Viewport};
use crate::error::{ProjectionError, RenderError};
use crate::geometry::{VertexAttribute, VertexStreams};
use crate::normal::normal_transform;
use crate::projection::{ProjectionMode, ProjectionPresets};
use crate::shading::{ProgramDescriptor, SamplerBindings, ShadingMode, ShadingUniforms, Uniform};

/// Everything that persists between frames
#[derive(Debug, Clone, PartialEq)]
pub struct RenderState {
    pub camera: CameraState,
    pub projection_mode: ProjectionMode,
    pub projection: Matrix4<f32>,
    pub mode: ShadingMode,
    pub shading: bool,
}

impl RenderState {
    pub fn from_config(config: &RendererConfig) -> Result<Self, ProjectionError> {
        let projection = config
            .presets
            .build(config.projection, config.viewport.aspect())?;
        Ok(Self {
            camera: config.camera,
            projection_mode: config.projection,
            projection,
            mode: config.shading_mode,
            shading: config.shading,
        })
    }

    /// Complete uniform set for one draw
    pub fn uniforms(&self, frame: &FrameMatrices) -> ShadingUniforms {
        ShadingUniforms {
            projection: frame.projection,
            view: frame.view,
            model: frame.model,
            normal_transform: frame.normal_transform,
            camera_position: frame.camera_position,
            shading_on: self.shading,
            mode: self.mode,
            samplers: self.mode.sampler_bindings(),
        }
    }
}

/// Matrices derived for a single draw; never cached across frames
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameMatrices {
    pub projection: Matrix4<f32>,
    pub view: Matrix4<f32>,
    pub model: Matrix4<f32>,
    pub normal_transform: Matrix4<f32>,
    pub camera_position: Vector3<f32>,
}

impl FrameMatrices {
    /// View first, then the normal transform that depends on it
    pub fn compute(state: &RenderState, model: &Matrix4<f32>) -> Self {
        let view = state.camera.view_matrix();
        let camera_position = state.camera.world_position();
        Self {
            projection: state.projection,
            view,
            model: *model,
            normal_transform: normal_transform(model, &view),
            camera_position,
        }
    }
}

/// Drives one backend with the mesh program
pub struct Renderer<B: GraphicsBackend> {
    backend: B,
    program: ProgramHandle,
    locations: HashMap<Uniform, UniformLocation>,
    presets: ProjectionPresets,
    viewport: Viewport,
    state: RenderState,
}

impl<B: GraphicsBackend> Renderer<B> {
    /// Compile the mesh program and look up its uniforms. A program that
    /// fails to build is logged and kept as an inert handle.
    pub fn new(mut backend: B, config: &RendererConfig) -> Result<Self, ProjectionError> {
        let state = RenderState::from_config(config)?;
        let descriptor = ProgramDescriptor::mesh();

        let program = match backend.compile(&descriptor) {
            Ok(program) => program,
            Err(failure) => {
                error!("{}", failure);
                failure.program
            }
        };

        let mut locations = HashMap::new();
        for uniform in descriptor.uniforms {
            match backend.uniform_location(program, uniform.name()) {
                Some(location) => {
                    locations.insert(*uniform, location);
                }
                None => debug!("uniform `{}` has no location", uniform.name()),
            }
        }

        info!(
            "renderer ready: {} projection, {} shading, {}x{} viewport",
            state.projection_mode, state.mode, config.viewport.width, config.viewport.height
        );

        Ok(Self {
            backend,
            program,
            locations,
            presets: config.presets,
            viewport: config.viewport,
            state,
        })
    }

    pub fn state(&self) -> &RenderState {
        &self.state
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn program(&self) -> ProgramHandle {
        self.program
    }

    pub fn sampler_bindings(&self) -> SamplerBindings {
        self.state.mode.sampler_bindings()
    }

    pub fn move_camera_to(&mut self, distance: f32) {
        self.state.camera.move_camera_to(distance);
    }

    /// Set the camera angle about "x", "y" or "z"; other axes are ignored
    pub fn rotate_camera(&mut self, degrees: f32, axis: &str) {
        self.state.camera.rotate_camera(degrees, axis);
    }

    pub fn set_mapping_type(&mut self, mode: ShadingMode) {
        if self.state.mode != mode {
            debug!("shading mode {} -> {}", self.state.mode, mode);
        }
        self.state.mode = mode;
    }

    /// Loosely typed form; ordinals outside 0..=3 shade unlit
    pub fn set_mapping_type_ordinal(&mut self, ordinal: i32) {
        self.set_mapping_type(ShadingMode::from_ordinal_or_unlit(ordinal));
    }

    pub fn set_shading(&mut self, enabled: bool) {
        self.state.shading = enabled;
    }

    /// Switch projection using the preset parameters for `mode`
    pub fn set_projection(&mut self, mode: ProjectionMode) -> Result<(), ProjectionError> {
        let projection = self.presets.build(mode, self.viewport.aspect())?;
        info!("projection set to {mode}");
        self.state.projection_mode = mode;
        self.state.projection = projection;
        Ok(())
    }

    pub fn set_projection_by_name(&mut self, name: &str) -> Result<(), ProjectionError> {
        self.set_projection(name.parse()?)
    }

    /// Track a new viewport; the active projection is rebuilt for its aspect
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), ProjectionError> {
        self.viewport = Viewport::new(width, height);
        self.set_projection(self.state.projection_mode)
    }

    /// Render `streams` placed in the world by `model`. Returns the matrices
    /// that were pushed.
    pub fn draw(
        &mut self,
        streams: &VertexStreams,
        model: &Matrix4<f32>,
    ) -> Result<FrameMatrices, RenderError> {
        let frame = FrameMatrices::compute(&self.state, model);
        let vertex_count = streams.validate()?;

        for attribute in VertexAttribute::ALL {
            self.backend
                .upload_attribute(self.program, attribute, streams.stream(attribute))?;
        }

        self.backend.use_program(self.program)?;

        let uniforms = self.state.uniforms(&frame);
        self.set(Uniform::Projection, UniformValue::Mat4(uniforms.projection))?;
        self.set(Uniform::View, UniformValue::Mat4(uniforms.view))?;
        self.set(Uniform::Model, UniformValue::Mat4(uniforms.model))?;
        self.set(
            Uniform::NormalTransform,
            UniformValue::Mat4(uniforms.normal_transform),
        )?;
        self.set(
            Uniform::CameraPosition,
            UniformValue::Vec3(uniforms.camera_position),
        )?;
        self.set(Uniform::ShadingOn, UniformValue::Bool(uniforms.shading_on))?;
        self.set(Uniform::MappingType, UniformValue::Int(uniforms.mode.ordinal()))?;

        let units = uniforms.samplers;
        self.set(Uniform::Sampler, UniformValue::Int(units.diffuse as i32))?;
        self.set(Uniform::SamplerCube, UniformValue::Int(units.cubemap as i32))?;
        self.set(Uniform::SamplerBump, UniformValue::Int(units.bump as i32))?;

        self.backend.draw_triangles(0, vertex_count)?;
        Ok(frame)
    }

    fn set(&mut self, uniform: Uniform, value: UniformValue) -> Result<(), RenderError> {
        match self.locations.get(&uniform) {
            Some(location) => self.backend.set_uniform(*location, value)?,
            None => warn!("skipping uniform `{}` without a location", uniform.name()),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendCall, RecordingBackend};
    use crate::error::BackendError;
    use crate::geometry::Mesh;

    fn renderer() -> Renderer<RecordingBackend> {
        Renderer::new(RecordingBackend::new(), &RendererConfig::default()).unwrap()
    }

    fn bound_units(backend: &RecordingBackend) -> (i32, i32, i32) {
        let unit = |name| match backend.last_uniform(name) {
            Some(UniformValue::Int(unit)) => unit,
            other => panic!("{name} not set as int: {other:?}"),
        };
        (unit("uSampler"), unit("uSamplerCube"), unit("uSamplerBump"))
    }

    #[test]
    fn test_startup_state() {
        let renderer = renderer();
        let state = renderer.state();
        assert_eq!(state.camera, CameraState::default());
        assert_eq!(state.projection_mode, ProjectionMode::Perspective);
        assert_eq!(state.mode, ShadingMode::Unlit);
        assert!(!state.shading);
    }

    #[test]
    fn test_draw_pushes_streams_uniforms_then_draws() {
        let mut renderer = renderer();
        let streams = Mesh::cube(2.0).expand();
        renderer.draw(&streams, &Matrix4::identity()).unwrap();

        let calls = renderer.backend().calls();
        let uploads = calls
            .iter()
            .filter(|c| matches!(c, BackendCall::Upload { .. }))
            .count();
        assert_eq!(uploads, 6);
        assert_eq!(renderer.backend().uploaded(VertexAttribute::TexCoord).unwrap().len(), 72);
        assert_eq!(renderer.backend().draws(), vec![(0, 36)]);
        assert!(matches!(calls.last(), Some(BackendCall::Draw { .. })));

        let uniform_count = calls
            .iter()
            .filter(|c| matches!(c, BackendCall::SetUniform { .. }))
            .count();
        assert_eq!(uniform_count, Uniform::ALL.len());
    }

    #[test]
    fn test_binding_table_follows_mode_switches() {
        let mut renderer = renderer();
        let streams = Mesh::cube(1.0).expand();
        let model = Matrix4::identity();

        renderer.set_mapping_type(ShadingMode::Environment);
        renderer.draw(&streams, &model).unwrap();
        assert_eq!(bound_units(renderer.backend()), (1, 0, 2));

        renderer.set_mapping_type(ShadingMode::Bump);
        renderer.draw(&streams, &model).unwrap();
        assert_eq!(bound_units(renderer.backend()), (1, 2, 0));

        renderer.set_mapping_type(ShadingMode::Unlit);
        renderer.draw(&streams, &model).unwrap();
        assert_eq!(bound_units(renderer.backend()), (0, 1, 2));

        renderer.set_mapping_type(ShadingMode::Textured);
        renderer.draw(&streams, &model).unwrap();
        assert_eq!(bound_units(renderer.backend()), (0, 1, 2));
        assert_eq!(
            renderer.backend().last_uniform("mappingType"),
            Some(UniformValue::Int(1))
        );
    }

    #[test]
    fn test_out_of_range_ordinal_shades_unlit() {
        let mut renderer = renderer();
        renderer.set_mapping_type_ordinal(3);
        assert_eq!(renderer.state().mode, ShadingMode::Bump);
        renderer.set_mapping_type_ordinal(9);
        assert_eq!(renderer.state().mode, ShadingMode::Unlit);
    }

    #[test]
    fn test_shading_toggle_reaches_backend() {
        let mut renderer = renderer();
        let streams = Mesh::cube(1.0).expand();
        renderer.set_shading(true);
        renderer.draw(&streams, &Matrix4::identity()).unwrap();
        assert_eq!(
            renderer.backend().last_uniform("shadingOn"),
            Some(UniformValue::Bool(true))
        );
    }

    #[test]
    fn test_set_projection_is_idempotent() {
        let mut renderer = renderer();
        renderer.set_projection(ProjectionMode::Perspective).unwrap();
        let first = renderer.state().projection;
        renderer.set_projection(ProjectionMode::Perspective).unwrap();
        assert_eq!(renderer.state().projection, first);

        renderer.set_projection_by_name("oblique").unwrap();
        assert_eq!(renderer.state().projection_mode, ProjectionMode::Oblique);
        assert_ne!(renderer.state().projection, first);
    }

    #[test]
    fn test_unknown_projection_name_leaves_state() {
        let mut renderer = renderer();
        let before = renderer.state().clone();
        assert!(renderer.set_projection_by_name("fisheye").is_err());
        assert_eq!(renderer.state(), &before);
    }

    #[test]
    fn test_resize_updates_perspective_aspect() {
        let mut renderer = renderer();
        let before = renderer.state().projection;
        renderer.resize(1000, 500).unwrap();
        let after = renderer.state().projection;
        assert!((after[(1, 1)] - before[(1, 1)]).abs() < 1e-6);
        assert!((after[(0, 0)] * 2.0 - after[(1, 1)]).abs() < 1e-5);
    }

    #[test]
    fn test_invalid_streams_issue_no_backend_calls() {
        let mut renderer = renderer();
        renderer.backend_mut().clear();
        let mut streams = Mesh::cube(1.0).expand();
        streams.colors.truncate(3);
        let err = renderer.draw(&streams, &Matrix4::identity()).unwrap_err();
        assert!(matches!(err, RenderError::InvalidStreams(_)));
        assert!(renderer.backend().calls().is_empty());
    }

    #[test]
    fn test_singular_model_uses_identity_normal_transform() {
        let mut renderer = renderer();
        let streams = Mesh::cube(1.0).expand();
        let flat = Matrix4::new_nonuniform_scaling(&Vector3::new(1.0, 1.0, 0.0));
        let frame = renderer.draw(&streams, &flat).unwrap();
        assert_eq!(frame.normal_transform, Matrix4::identity());
    }

    #[test]
    fn test_failed_compile_is_not_fatal() {
        let mut backend = RecordingBackend::new();
        backend.fail_next_compile(BackendError::ShaderLink {
            log: "varying mismatch".into(),
        });
        let mut renderer = Renderer::new(backend, &RendererConfig::default()).unwrap();
        renderer.move_camera_to(3.0);
        let streams = Mesh::cube(1.0).expand();
        let err = renderer.draw(&streams, &Matrix4::identity()).unwrap_err();
        assert_eq!(
            err,
            RenderError::Backend(BackendError::InertProgram(renderer.program()))
        );
    }
}
