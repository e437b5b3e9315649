/// Software backend: runs the shading program on the CPU and rasterizes
/// into a character grid for the terminal
use crossterm::{
    style::{Color, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use log::{debug, trace};
use nalgebra::{Matrix4, Vector2, Vector3, Vector4};
use shade3d_core::backend::{GraphicsBackend, ProgramHandle, UniformLocation, UniformValue};
use shade3d_core::error::{BackendError, CompileFailure};
use shade3d_core::shading::{ShadingUniforms, Uniform, Varyings};
use shade3d_core::{
    CubeTexture, ProgramDescriptor, ShadingMode, ShadingProgram, Texture2d, TextureSampler,
    TextureSlot, VertexAttribute, VertexStreams,
};
use std::collections::HashMap;
use std::io::Write;

/// Character luminosity ramp for shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Triangles with a vertex this close to the eye plane are dropped
const MIN_CLIP_W: f32 = 1e-5;

/// Handle to a 2D texture owned by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Texture2dId(usize);

/// Handle to a cube texture owned by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CubeTextureId(usize);

/// A texture unit has one binding point per target, like GL
#[derive(Debug, Clone, Copy, Default)]
struct UnitTargets {
    flat: Option<usize>,
    cube: Option<usize>,
}

/// Texture storage and unit bindings
#[derive(Debug, Default)]
pub struct TextureBank {
    flat: Vec<TextureSlot<Texture2d>>,
    cube: Vec<TextureSlot<CubeTexture>>,
    units: HashMap<u32, UnitTargets>,
}

impl TextureBank {
    /// Pick up finished loads. Returns true if any texture changed.
    pub fn refresh(&mut self) -> bool {
        let mut changed = false;
        for slot in &mut self.flat {
            changed |= slot.refresh();
        }
        for slot in &mut self.cube {
            changed |= slot.refresh();
        }
        changed
    }
}

/// Incomplete or missing bindings read as opaque black
fn unbound() -> Vector4<f32> {
    Vector4::new(0.0, 0.0, 0.0, 1.0)
}

impl TextureSampler for TextureBank {
    fn sample_2d(&self, unit: u32, uv: &Vector2<f32>) -> Vector4<f32> {
        self.units
            .get(&unit)
            .and_then(|targets| targets.flat)
            .and_then(|index| self.flat.get(index))
            .map_or_else(unbound, |slot| slot.current().sample(uv))
    }

    fn sample_cube(&self, unit: u32, direction: &Vector3<f32>) -> Vector4<f32> {
        self.units
            .get(&unit)
            .and_then(|targets| targets.cube)
            .and_then(|index| self.cube.get(index))
            .map_or_else(unbound, |slot| slot.current().sample(direction))
    }
}

#[derive(Debug)]
struct ProgramRecord {
    linked: bool,
}

/// Color and depth targets
#[derive(Debug)]
pub struct Framebuffer {
    width: usize,
    height: usize,
    depth_buffer: Vec<f32>,
    color_buffer: Vec<Option<Vector3<f32>>>,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Self {
        let size = width * height;
        Self {
            width,
            height,
            depth_buffer: vec![f32::INFINITY; size],
            color_buffer: vec![None; size],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn clear(&mut self) {
        self.depth_buffer.fill(f32::INFINITY);
        self.color_buffer.fill(None);
    }

    /// Shaded color at a cell, `None` where nothing was drawn
    pub fn pixel(&self, x: usize, y: usize) -> Option<Vector3<f32>> {
        self.color_buffer.get(y * self.width + x).copied().flatten()
    }

    pub fn covered(&self) -> usize {
        self.color_buffer.iter().filter(|c| c.is_some()).count()
    }

    fn rasterize_triangle<S: TextureSampler>(
        &mut self,
        program: &ShadingProgram,
        varyings: [&Varyings; 3],
        sampler: &S,
    ) {
        if varyings.iter().any(|v| v.clip_position.w < MIN_CLIP_W) {
            return;
        }

        let (w, h) = (self.width as f32, self.height as f32);
        let screen = varyings.map(|v| {
            let ndc = v.clip_position.xyz() / v.clip_position.w;
            (
                (ndc.x + 1.0) * 0.5 * w,
                (1.0 - ndc.y) * 0.5 * h,
                ndc.z,
            )
        });
        let inv_w = varyings.map(|v| 1.0 / v.clip_position.w);
        let (v0, v1, v2) = (screen[0], screen[1], screen[2]);

        // Bounding box
        let min_x = v0.0.min(v1.0).min(v2.0).floor() as i32;
        let max_x = v0.0.max(v1.0).max(v2.0).ceil() as i32;
        let min_y = v0.1.min(v1.1).min(v2.1).floor() as i32;
        let max_y = v0.1.max(v1.1).max(v2.1).ceil() as i32;

        // Clip to screen bounds
        let min_x = min_x.max(0);
        let max_x = max_x.min(self.width as i32 - 1);
        let min_y = min_y.max(0);
        let max_y = max_y.min(self.height as i32 - 1);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let px = x as f32 + 0.5;
                let py = y as f32 + 0.5;

                let Some((w0, w1, w2)) =
                    barycentric((v0.0, v0.1), (v1.0, v1.1), (v2.0, v2.1), (px, py))
                else {
                    continue;
                };
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }

                let depth = w0 * v0.2 + w1 * v1.2 + w2 * v2.2;
                if !(-1.0..=1.0).contains(&depth) {
                    continue;
                }
                let idx = y as usize * self.width + x as usize;
                if depth >= self.depth_buffer[idx] {
                    continue;
                }

                // Perspective-correct weights for the varyings
                let c = [w0 * inv_w[0], w1 * inv_w[1], w2 * inv_w[2]];
                let sum = c[0] + c[1] + c[2];
                let weights = [c[0] / sum, c[1] / sum, c[2] / sum];

                let fragment = Varyings::interpolate(varyings, weights);
                let color = program.fragment(&fragment, sampler);
                self.depth_buffer[idx] = depth;
                self.color_buffer[idx] = Some(color.xyz());
            }
        }
    }

    /// Luminosity character for every covered cell, blank elsewhere
    pub fn to_ascii(&self) -> String {
        let mut out = String::with_capacity((self.width + 1) * self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                out.push(self.pixel(x, y).map_or(' ', ramp_char));
            }
            out.push('\n');
        }
        out
    }

    pub fn draw<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for y in 0..self.height {
            for x in 0..self.width {
                match self.pixel(x, y) {
                    Some(color) => {
                        writer.queue(SetForegroundColor(to_terminal_color(&color)))?;
                        writer.queue(Print(ramp_char(color)))?;
                    }
                    None => {
                        writer.queue(Print(' '))?;
                    }
                }
            }
            if y + 1 < self.height {
                writer.queue(Print("\r\n"))?;
            }
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

fn luminance(color: &Vector3<f32>) -> f32 {
    (0.2126 * color.x + 0.7152 * color.y + 0.0722 * color.z).clamp(0.0, 1.0)
}

/// Covered cells never map to the blank first ramp entry
fn ramp_char(color: Vector3<f32>) -> char {
    let last = LUMINOSITY_RAMP.len() - 1;
    let index = (luminance(&color) * last as f32).round() as usize;
    LUMINOSITY_RAMP[index.clamp(1, last)]
}

fn to_terminal_color(color: &Vector3<f32>) -> Color {
    let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    Color::Rgb {
        r: channel(color.x),
        g: channel(color.y),
        b: channel(color.z),
    }
}

/// [`GraphicsBackend`] that shades on the CPU into a [`Framebuffer`]
#[derive(Debug)]
pub struct SoftwareBackend {
    programs: Vec<ProgramRecord>,
    active: Option<ProgramHandle>,
    locations: Vec<Uniform>,
    streams: VertexStreams,
    uniforms: ShadingUniforms,
    textures: TextureBank,
    framebuffer: Framebuffer,
}

impl SoftwareBackend {
    pub fn new(width: usize, height: usize) -> Self {
        let mode = ShadingMode::default();
        Self {
            programs: Vec::new(),
            active: None,
            locations: Vec::new(),
            streams: VertexStreams::default(),
            uniforms: ShadingUniforms {
                projection: Matrix4::identity(),
                view: Matrix4::identity(),
                model: Matrix4::identity(),
                normal_transform: Matrix4::identity(),
                camera_position: Vector3::zeros(),
                shading_on: false,
                mode,
                samplers: mode.sampler_bindings(),
            },
            textures: TextureBank::default(),
            framebuffer: Framebuffer::new(width, height),
        }
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.framebuffer = Framebuffer::new(width, height);
    }

    pub fn clear(&mut self) {
        self.framebuffer.clear();
    }

    pub fn add_texture_2d(&mut self, slot: TextureSlot<Texture2d>) -> Texture2dId {
        self.textures.flat.push(slot);
        Texture2dId(self.textures.flat.len() - 1)
    }

    pub fn add_cube_texture(&mut self, slot: TextureSlot<CubeTexture>) -> CubeTextureId {
        self.textures.cube.push(slot);
        CubeTextureId(self.textures.cube.len() - 1)
    }

    /// Bind to the 2D target of `unit`; the cube target is left alone
    pub fn bind_texture_2d(&mut self, unit: u32, texture: Texture2dId) {
        self.textures.units.entry(unit).or_default().flat = Some(texture.0);
    }

    pub fn bind_cube_texture(&mut self, unit: u32, texture: CubeTextureId) {
        self.textures.units.entry(unit).or_default().cube = Some(texture.0);
    }

    pub fn refresh_textures(&mut self) -> bool {
        self.textures.refresh()
    }

    pub fn textures(&self) -> &TextureBank {
        &self.textures
    }

    fn stream_mut(&mut self, attribute: VertexAttribute) -> &mut Vec<f32> {
        match attribute {
            VertexAttribute::Position => &mut self.streams.positions,
            VertexAttribute::Color => &mut self.streams.colors,
            VertexAttribute::Normal => &mut self.streams.normals,
            VertexAttribute::TexCoord => &mut self.streams.tex_coords,
            VertexAttribute::Tangent => &mut self.streams.tangents,
            VertexAttribute::Bitangent => &mut self.streams.bitangents,
        }
    }
}

fn type_mismatch(uniform: Uniform, value: &UniformValue) -> BackendError {
    BackendError::Other(format!(
        "uniform `{}` cannot take {:?}",
        uniform.name(),
        value
    ))
}

fn unit(uniform: Uniform, value: i32) -> Result<u32, BackendError> {
    u32::try_from(value).map_err(|_| {
        BackendError::Other(format!("uniform `{}` got negative unit {value}", uniform.name()))
    })
}

impl GraphicsBackend for SoftwareBackend {
    /// The CPU program implements every mode already; compiling only checks
    /// that the descriptor feeds it everything it reads.
    fn compile(&mut self, descriptor: &ProgramDescriptor) -> Result<ProgramHandle, CompileFailure> {
        let program = ProgramHandle(self.programs.len() as u32);
        let missing_uniform = Uniform::ALL
            .into_iter()
            .find(|u| !descriptor.uniforms.contains(u));
        let missing_attribute = VertexAttribute::ALL
            .into_iter()
            .find(|a| !descriptor.attributes.contains(a));

        let error = match (missing_uniform, missing_attribute) {
            (Some(uniform), _) => Some(BackendError::MissingUniform(uniform.name())),
            (None, Some(attribute)) => Some(BackendError::MissingAttribute(attribute.name())),
            (None, None) => None,
        };
        self.programs.push(ProgramRecord {
            linked: error.is_none(),
        });
        debug!("compiled `{}` as program {}", descriptor.label, program.0);

        match error {
            None => Ok(program),
            Some(source) => Err(CompileFailure { program, source }),
        }
    }

    fn uniform_location(&mut self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        let linked = self.programs.get(program.0 as usize)?.linked;
        let uniform = Uniform::from_name(name).filter(|_| linked)?;
        self.locations.push(uniform);
        Some(UniformLocation(self.locations.len() as u32 - 1))
    }

    fn upload_attribute(
        &mut self,
        _program: ProgramHandle,
        attribute: VertexAttribute,
        data: &[f32],
    ) -> Result<(), BackendError> {
        let stream = self.stream_mut(attribute);
        stream.clear();
        stream.extend_from_slice(data);
        Ok(())
    }

    fn use_program(&mut self, program: ProgramHandle) -> Result<(), BackendError> {
        match self.programs.get(program.0 as usize) {
            Some(record) if record.linked => {
                self.active = Some(program);
                Ok(())
            }
            _ => Err(BackendError::InertProgram(program)),
        }
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) -> Result<(), BackendError> {
        let uniform = *self
            .locations
            .get(location.0 as usize)
            .ok_or_else(|| BackendError::Other(format!("unknown uniform location {}", location.0)))?;
        let u = &mut self.uniforms;
        match (uniform, value) {
            (Uniform::Projection, UniformValue::Mat4(m)) => u.projection = m,
            (Uniform::View, UniformValue::Mat4(m)) => u.view = m,
            (Uniform::Model, UniformValue::Mat4(m)) => u.model = m,
            (Uniform::NormalTransform, UniformValue::Mat4(m)) => u.normal_transform = m,
            (Uniform::CameraPosition, UniformValue::Vec3(v)) => u.camera_position = v,
            (Uniform::ShadingOn, UniformValue::Bool(on)) => u.shading_on = on,
            (Uniform::ShadingOn, UniformValue::Int(on)) => u.shading_on = on != 0,
            (Uniform::MappingType, UniformValue::Int(ordinal)) => {
                u.mode = ShadingMode::from_ordinal_or_unlit(ordinal)
            }
            (Uniform::Sampler, UniformValue::Int(n)) => u.samplers.diffuse = unit(uniform, n)?,
            (Uniform::SamplerCube, UniformValue::Int(n)) => u.samplers.cubemap = unit(uniform, n)?,
            (Uniform::SamplerBump, UniformValue::Int(n)) => u.samplers.bump = unit(uniform, n)?,
            (uniform, value) => return Err(type_mismatch(uniform, &value)),
        }
        Ok(())
    }

    fn draw_triangles(&mut self, first: usize, count: usize) -> Result<(), BackendError> {
        let program = self
            .active
            .ok_or_else(|| BackendError::Other("draw without a program in use".into()))?;
        let available = self.streams.vertex_count();
        if first + count > available {
            return Err(BackendError::DrawRange {
                first,
                end: first + count,
                available,
            });
        }
        trace!("program {} draws {count} vertices from {first}", program.0);

        let shading = ShadingProgram::new(self.uniforms);
        let varyings: Vec<Varyings> = (first..first + count)
            .map(|i| shading.vertex(&self.streams.vertex(i)))
            .collect();

        for triangle in varyings.chunks_exact(3) {
            self.framebuffer.rasterize_triangle(
                &shading,
                [&triangle[0], &triangle[1], &triangle[2]],
                &self.textures,
            );
        }
        Ok(())
    }
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(
    v0: (f32, f32),
    v1: (f32, f32),
    v2: (f32, f32),
    p: (f32, f32),
) -> Option<(f32, f32, f32)> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);

    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shade3d_core::texture::PLACEHOLDER_TEXEL;
    use shade3d_core::{Mesh, Renderer, RendererConfig, TextureError};

    fn renderer(width: usize, height: usize) -> Renderer<SoftwareBackend> {
        let config = RendererConfig::default().with_viewport(width as u32, height as u32);
        Renderer::new(SoftwareBackend::new(width, height), &config).unwrap()
    }

    #[test]
    fn test_barycentric_corners_and_degenerate() {
        let w = barycentric((0.0, 0.0), (4.0, 0.0), (0.0, 4.0), (0.0, 0.0)).unwrap();
        assert!((w.0 - 1.0).abs() < 1e-6);
        assert!(barycentric((0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (0.5, 0.5)).is_none());
    }

    #[test]
    fn test_unlit_cube_covers_center() {
        let mut renderer = renderer(40, 40);
        renderer
            .draw(&Mesh::cube(2.0).expand(), &Matrix4::identity())
            .unwrap();
        let fb = renderer.backend().framebuffer();
        assert!(fb.pixel(20, 20).is_some());
        assert!(fb.pixel(0, 0).is_none());
        // Front face of the cube is the red one, shading off multiplies by 1
        let front = fb.pixel(20, 20).unwrap();
        assert!((front - Vector3::new(1.0, 0.3, 0.3)).norm() < 1e-3);
    }

    #[test]
    fn test_depth_keeps_nearest_face() {
        let mut renderer = renderer(32, 32);
        let streams = Mesh::cube(2.0).expand();
        renderer.rotate_camera(180.0, "y");
        renderer.draw(&streams, &Matrix4::identity()).unwrap();
        // Looking from the other side the green back face is in front
        let color = renderer.backend().framebuffer().pixel(16, 16).unwrap();
        assert!((color - Vector3::new(0.3, 1.0, 0.3)).norm() < 1e-3);
    }

    #[test]
    fn test_textured_reads_primary_unit() {
        let mut renderer = renderer(32, 32);
        let white = renderer
            .backend_mut()
            .add_texture_2d(TextureSlot::ready("white", Texture2d::solid([255; 4])));
        renderer.backend_mut().bind_texture_2d(0, white);
        renderer.set_mapping_type(ShadingMode::Textured);
        renderer
            .draw(&Mesh::cube(2.0).expand(), &Matrix4::identity())
            .unwrap();
        let color = renderer.backend().framebuffer().pixel(16, 16).unwrap();
        assert!((color - Vector3::new(1.0, 1.0, 1.0)).norm() < 1e-3);
    }

    #[test]
    fn test_unbound_unit_samples_black() {
        let bank = TextureBank::default();
        assert_eq!(bank.sample_2d(0, &Vector2::zeros()), unbound());
        assert_eq!(bank.sample_cube(3, &Vector3::z()), unbound());
    }

    #[test]
    fn test_placeholder_until_delivery() {
        let mut backend = SoftwareBackend::new(4, 4);
        let (slot, delivery) = TextureSlot::new("diffuse", Texture2d::placeholder());
        let id = backend.add_texture_2d(slot);
        backend.bind_texture_2d(0, id);

        let uv = Vector2::new(0.5, 0.5);
        let blue = Vector4::new(
            PLACEHOLDER_TEXEL[0] as f32 / 255.0,
            PLACEHOLDER_TEXEL[1] as f32 / 255.0,
            PLACEHOLDER_TEXEL[2] as f32 / 255.0,
            1.0,
        );
        assert_eq!(backend.textures().sample_2d(0, &uv), blue);

        delivery.complete(Texture2d::solid([255, 0, 0, 255]));
        assert!(backend.refresh_textures());
        assert_eq!(backend.textures().sample_2d(0, &uv), Vector4::new(1.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn test_failed_delivery_keeps_placeholder() {
        let mut backend = SoftwareBackend::new(4, 4);
        let (slot, delivery) = TextureSlot::new("bump", Texture2d::placeholder());
        let id = backend.add_texture_2d(slot);
        backend.bind_texture_2d(0, id);
        delivery.fail(TextureError::Load("missing.png".into()));
        assert!(!backend.refresh_textures());
        assert_eq!(backend.textures().sample_2d(0, &Vector2::zeros()).z, 1.0);
    }

    #[test]
    fn test_wrong_uniform_type_is_rejected() {
        let mut backend = SoftwareBackend::new(4, 4);
        let program = backend.compile(&ProgramDescriptor::mesh()).unwrap();
        let location = backend.uniform_location(program, "Pmatrix").unwrap();
        assert!(backend.set_uniform(location, UniformValue::Int(1)).is_err());
        assert!(backend.uniform_location(program, "uUnknown").is_none());
    }

    #[test]
    fn test_ascii_dump_marks_covered_cells() {
        let mut renderer = renderer(24, 24);
        renderer
            .draw(&Mesh::cube(2.0).expand(), &Matrix4::identity())
            .unwrap();
        let fb = renderer.backend().framebuffer();
        let ascii = fb.to_ascii();
        assert_eq!(ascii.lines().count(), 24);
        let marked = ascii.chars().filter(|c| !c.is_whitespace()).count();
        assert_eq!(marked, fb.covered());
    }
}
