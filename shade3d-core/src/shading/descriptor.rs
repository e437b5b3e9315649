/// The shading program as data: source text, uniform names and attribute
/// layout. Backends compile it once; the core never interprets the source.
use crate::geometry::VertexAttribute;

const MESH_VERTEX_SOURCE: &str = include_str!("../shaders/mesh.vert");
const MESH_FRAGMENT_SOURCE: &str = include_str!("../shaders/mesh.frag");

/// Uniforms declared by the mesh program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Uniform {
    Projection,
    View,
    Model,
    NormalTransform,
    ShadingOn,
    MappingType,
    CameraPosition,
    Sampler,
    SamplerCube,
    SamplerBump,
}

impl Uniform {
    pub const ALL: [Uniform; 10] = [
        Uniform::Projection,
        Uniform::View,
        Uniform::Model,
        Uniform::NormalTransform,
        Uniform::ShadingOn,
        Uniform::MappingType,
        Uniform::CameraPosition,
        Uniform::Sampler,
        Uniform::SamplerCube,
        Uniform::SamplerBump,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Uniform::Projection => "Pmatrix",
            Uniform::View => "Vmatrix",
            Uniform::Model => "Mmatrix",
            Uniform::NormalTransform => "TransformNormalMatrix",
            Uniform::ShadingOn => "shadingOn",
            Uniform::MappingType => "mappingType",
            Uniform::CameraPosition => "uWorldCameraPosition",
            Uniform::Sampler => "uSampler",
            Uniform::SamplerCube => "uSamplerCube",
            Uniform::SamplerBump => "uSamplerBump",
        }
    }

    pub fn from_name(name: &str) -> Option<Uniform> {
        Uniform::ALL.into_iter().find(|u| u.name() == name)
    }
}

/// Everything a backend needs to build the program
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramDescriptor {
    pub label: &'static str,
    pub vertex_source: &'static str,
    pub fragment_source: &'static str,
    pub uniforms: &'static [Uniform],
    pub attributes: &'static [VertexAttribute],
}

impl ProgramDescriptor {
    /// The single-mesh program with all four shading modes
    pub fn mesh() -> Self {
        Self {
            label: "mesh",
            vertex_source: MESH_VERTEX_SOURCE,
            fragment_source: MESH_FRAGMENT_SOURCE,
            uniforms: &Uniform::ALL,
            attributes: &VertexAttribute::ALL,
        }
    }
}
