/// CPU reference implementation of the shading program.
///
/// The vertex and fragment stages here compute exactly what the GLSL in
/// [`super::descriptor`] computes, so a software backend can rasterise with
/// them and tests can check the per-mode math directly.
use nalgebra::{Matrix3, Matrix4, Vector2, Vector3, Vector4};

use super::lighting::{self, BUMP_AMBIENT, BUMP_LIGHT};
use super::mode::{SamplerBindings, ShadingMode};
use crate::geometry::Vertex;
use crate::math;

/// Texture lookups by unit, as the program's samplers see them
pub trait TextureSampler {
    fn sample_2d(&self, unit: u32, uv: &Vector2<f32>) -> Vector4<f32>;
    fn sample_cube(&self, unit: u32, direction: &Vector3<f32>) -> Vector4<f32>;
}

/// Every uniform the program declares
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadingUniforms {
    pub projection: Matrix4<f32>,
    pub view: Matrix4<f32>,
    pub model: Matrix4<f32>,
    pub normal_transform: Matrix4<f32>,
    pub camera_position: Vector3<f32>,
    pub shading_on: bool,
    pub mode: ShadingMode,
    pub samplers: SamplerBindings,
}

/// Per-vertex outputs, interpolated across a triangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Varyings {
    pub clip_position: Vector4<f32>,
    pub color: Vector3<f32>,
    pub lighting: Vector3<f32>,
    pub tex_coord: Vector2<f32>,
    pub world_position: Vector3<f32>,
    pub world_normal: Vector3<f32>,
    pub view_model_position: Vector3<f32>,
    /// Rows are the view-space tangent, bitangent and normal
    pub btn: Matrix3<f32>,
}

impl Varyings {
    /// Barycentric blend of three vertices' outputs
    pub fn interpolate(v: [&Varyings; 3], w: [f32; 3]) -> Varyings {
        Varyings {
            clip_position: v[0].clip_position * w[0]
                + v[1].clip_position * w[1]
                + v[2].clip_position * w[2],
            color: v[0].color * w[0] + v[1].color * w[1] + v[2].color * w[2],
            lighting: v[0].lighting * w[0] + v[1].lighting * w[1] + v[2].lighting * w[2],
            tex_coord: v[0].tex_coord * w[0] + v[1].tex_coord * w[1] + v[2].tex_coord * w[2],
            world_position: v[0].world_position * w[0]
                + v[1].world_position * w[1]
                + v[2].world_position * w[2],
            world_normal: v[0].world_normal * w[0]
                + v[1].world_normal * w[1]
                + v[2].world_normal * w[2],
            view_model_position: v[0].view_model_position * w[0]
                + v[1].view_model_position * w[1]
                + v[2].view_model_position * w[2],
            btn: v[0].btn * w[0] + v[1].btn * w[1] + v[2].btn * w[2],
        }
    }
}

/// The shading program bound to one set of uniforms
#[derive(Debug, Clone)]
pub struct ShadingProgram {
    uniforms: ShadingUniforms,
    clip_from_object: Matrix4<f32>,
    view_model: Matrix4<f32>,
    model_linear: Matrix3<f32>,
    normal_linear: Matrix3<f32>,
}

impl ShadingProgram {
    pub fn new(uniforms: ShadingUniforms) -> Self {
        let view_model = uniforms.view * uniforms.model;
        Self {
            clip_from_object: uniforms.projection * view_model,
            view_model,
            model_linear: math::upper_left3x3(&uniforms.model),
            normal_linear: math::upper_left3x3(&uniforms.normal_transform),
            uniforms,
        }
    }

    pub fn uniforms(&self) -> &ShadingUniforms {
        &self.uniforms
    }

    pub fn vertex(&self, input: &Vertex) -> Varyings {
        let position = input.position.to_homogeneous();

        let t = normalize(self.normal_linear * input.tangent);
        let b = normalize(self.normal_linear * input.bitangent);
        let n = normalize(self.normal_linear * input.normal);
        let btn = Matrix3::from_columns(&[t, b, n]).transpose();

        Varyings {
            clip_position: self.clip_from_object * position,
            color: input.color,
            lighting: lighting::vertex_lighting(
                self.uniforms.shading_on,
                &self.normal_linear,
                &input.normal,
            ),
            tex_coord: input.tex_coord,
            world_position: (self.uniforms.model * position).xyz(),
            world_normal: self.model_linear * input.normal,
            view_model_position: (self.view_model * position).xyz(),
            btn,
        }
    }

    pub fn fragment<S: TextureSampler + ?Sized>(&self, v: &Varyings, sampler: &S) -> Vector4<f32> {
        let units = self.uniforms.samplers;
        match self.uniforms.mode {
            ShadingMode::Unlit => shade_unlit(v),
            ShadingMode::Textured => shade_textured(v, sampler, units.diffuse),
            ShadingMode::Environment => {
                shade_environment(v, &self.uniforms.camera_position, sampler, units.cubemap)
            }
            ShadingMode::Bump => shade_bump(v, sampler, units.bump),
        }
    }
}

fn normalize(v: Vector3<f32>) -> Vector3<f32> {
    v.try_normalize(1e-12).unwrap_or_else(Vector3::zeros)
}

pub fn shade_unlit(v: &Varyings) -> Vector4<f32> {
    v.color.component_mul(&v.lighting).push(1.0)
}

pub fn shade_textured<S: TextureSampler + ?Sized>(
    v: &Varyings,
    sampler: &S,
    unit: u32,
) -> Vector4<f32> {
    let texel = sampler.sample_2d(unit, &v.tex_coord);
    texel.xyz().component_mul(&v.lighting).push(texel.w)
}

/// Reflect the eye ray about the world normal and look it up in the cubemap
pub fn shade_environment<S: TextureSampler + ?Sized>(
    v: &Varyings,
    camera_position: &Vector3<f32>,
    sampler: &S,
    unit: u32,
) -> Vector4<f32> {
    let world_normal = normalize(v.world_normal);
    let eye_to_surface = normalize(v.world_position - camera_position);
    let direction = lighting::reflect(&eye_to_surface, &world_normal);
    let texel = sampler.sample_cube(unit, &direction);
    texel.xyz().component_mul(&v.lighting).push(texel.w)
}

/// Relight in tangent space, decoding the bump texel as a packed normal
pub fn shade_bump<S: TextureSampler + ?Sized>(v: &Varyings, sampler: &S, unit: u32) -> Vector4<f32> {
    let light_dir = normalize(v.btn * BUMP_LIGHT.normalize() - v.btn * v.view_model_position);
    let albedo = sampler.sample_2d(unit, &v.tex_coord).xyz();
    let decoded = normalize(albedo * 2.0 - Vector3::repeat(1.0));
    let diffuse = light_dir.dot(&decoded).max(0.0);
    (albedo * diffuse + albedo * BUMP_AMBIENT).push(1.0)
}
