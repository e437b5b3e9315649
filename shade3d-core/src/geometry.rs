/// Geometry primitives and the flat per-vertex streams handed to a backend
use nalgebra::{Point3, Vector2, Vector3};

use crate::error::RenderError;

/// Vertex attributes of the shading program, in upload order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexAttribute {
    Position,
    Color,
    Normal,
    TexCoord,
    Tangent,
    Bitangent,
}

impl VertexAttribute {
    pub const ALL: [VertexAttribute; 6] = [
        VertexAttribute::Position,
        VertexAttribute::Color,
        VertexAttribute::Normal,
        VertexAttribute::TexCoord,
        VertexAttribute::Tangent,
        VertexAttribute::Bitangent,
    ];

    /// Attribute name as declared in the shading program
    pub fn name(self) -> &'static str {
        match self {
            VertexAttribute::Position => "position",
            VertexAttribute::Color => "color",
            VertexAttribute::Normal => "normal",
            VertexAttribute::TexCoord => "texCoord",
            VertexAttribute::Tangent => "a_tangent",
            VertexAttribute::Bitangent => "a_bitangent",
        }
    }

    pub fn components(self) -> usize {
        match self {
            VertexAttribute::TexCoord => 2,
            _ => 3,
        }
    }
}

/// A vertex carrying every attribute the shading modes read
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Point3<f32>,
    pub color: Vector3<f32>,
    pub normal: Vector3<f32>,
    pub tex_coord: Vector2<f32>,
    pub tangent: Vector3<f32>,
    pub bitangent: Vector3<f32>,
}

impl Vertex {
    /// A vertex with white color, no UVs and a tangent frame derived from the normal
    pub fn new(x: f32, y: f32, z: f32, nx: f32, ny: f32, nz: f32) -> Self {
        let normal = Vector3::new(nx, ny, nz);
        let (tangent, bitangent) = orthogonal_frame(&normal);
        Self {
            position: Point3::new(x, y, z),
            color: Vector3::new(1.0, 1.0, 1.0),
            normal,
            tex_coord: Vector2::zeros(),
            tangent,
            bitangent,
        }
    }

    pub fn with_color(mut self, r: f32, g: f32, b: f32) -> Self {
        self.color = Vector3::new(r, g, b);
        self
    }

    pub fn with_tex_coord(mut self, u: f32, v: f32) -> Self {
        self.tex_coord = Vector2::new(u, v);
        self
    }
}

/// Any unit tangent/bitangent pair perpendicular to `normal`
fn orthogonal_frame(normal: &Vector3<f32>) -> (Vector3<f32>, Vector3<f32>) {
    let n = normal.try_normalize(1e-12).unwrap_or_else(Vector3::z);
    let helper = if n.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    let tangent = (helper - n * n.dot(&helper)).normalize();
    let bitangent = n.cross(&tangent);
    (tangent, bitangent)
}

/// A triangle face defined by three vertices
#[derive(Debug, Clone)]
pub struct Triangle {
    pub vertices: [Vertex; 3],
}

impl Triangle {
    pub fn new(v0: Vertex, v1: Vertex, v2: Vertex) -> Self {
        Self {
            vertices: [v0, v1, v2],
        }
    }

    /// Calculate the face normal from the triangle's vertices
    pub fn calculate_normal(&self) -> Vector3<f32> {
        let v0 = self.vertices[0].position;
        let v1 = self.vertices[1].position;
        let v2 = self.vertices[2].position;

        let edge1 = v1 - v0;
        let edge2 = v2 - v0;

        edge1.cross(&edge2).normalize()
    }

    /// Derive tangent and bitangent from the UV parameterisation and store
    /// them on all three vertices. Degenerate UVs leave the frame unchanged.
    pub fn compute_tangent_frame(&mut self) {
        let [a, b, c] = self.vertices;
        let edge1 = b.position - a.position;
        let edge2 = c.position - a.position;
        let duv1 = b.tex_coord - a.tex_coord;
        let duv2 = c.tex_coord - a.tex_coord;

        let det = duv1.x * duv2.y - duv2.x * duv1.y;
        if det.abs() < 1e-8 {
            return;
        }
        let r = 1.0 / det;
        let tangent = ((edge1 * duv2.y - edge2 * duv1.y) * r).normalize();
        let bitangent = ((edge2 * duv1.x - edge1 * duv2.x) * r).normalize();
        for vertex in &mut self.vertices {
            vertex.tangent = tangent;
            vertex.bitangent = bitangent;
        }
    }
}

/// A 3D mesh composed of triangles
#[derive(Debug, Clone)]
pub struct Mesh {
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    pub fn new() -> Self {
        Self {
            triangles: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            triangles: Vec::with_capacity(capacity),
        }
    }

    pub fn add_triangle(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    /// Planar UVs projected along each face's dominant axis, followed by
    /// tangent frames derived from them. Used for meshes that arrive
    /// without texture coordinates.
    pub fn project_tex_coords(&mut self, scale: f32) {
        for triangle in &mut self.triangles {
            let n = triangle.calculate_normal();
            let (ax, ay, az) = (n.x.abs(), n.y.abs(), n.z.abs());
            for vertex in &mut triangle.vertices {
                let p = vertex.position;
                let (u, v) = if ax >= ay && ax >= az {
                    (p.z, p.y)
                } else if ay >= az {
                    (p.x, p.z)
                } else {
                    (p.x, p.y)
                };
                vertex.tex_coord = Vector2::new(u * scale, v * scale);
            }
            triangle.compute_tangent_frame();
        }
    }

    /// Bounding-sphere normalisation: centre the mesh and scale it to `radius`
    pub fn fit_to_radius(&mut self, radius: f32) {
        let count = (self.triangles.len() * 3) as f32;
        if count == 0.0 {
            return;
        }
        let centre = self
            .triangles
            .iter()
            .flat_map(|t| t.vertices.iter())
            .fold(Vector3::zeros(), |acc, v| acc + v.position.coords)
            / count;
        let extent = self
            .triangles
            .iter()
            .flat_map(|t| t.vertices.iter())
            .map(|v| (v.position.coords - centre).norm())
            .fold(0.0f32, f32::max);
        let scale = if extent > 0.0 { radius / extent } else { 1.0 };
        for vertex in self.triangles.iter_mut().flat_map(|t| t.vertices.iter_mut()) {
            vertex.position = Point3::from((vertex.position.coords - centre) * scale);
        }
    }

    /// Flatten into the six per-vertex streams of a non-indexed triangle list
    pub fn expand(&self) -> VertexStreams {
        let mut streams = VertexStreams::with_capacity(self.triangles.len() * 3);
        for vertex in self.triangles.iter().flat_map(|t| t.vertices.iter()) {
            streams.push(vertex);
        }
        streams
    }

    /// Create a simple cube mesh for testing, one color and UV square per face
    pub fn cube(size: f32) -> Self {
        let half = size / 2.0;
        let mut mesh = Self::new();

        // (normal, u axis, v axis, color)
        let faces: [([f32; 3], [f32; 3], [f32; 3], [f32; 3]); 6] = [
            ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 0.3, 0.3]),
            ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.3, 1.0, 0.3]),
            ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.3, 0.3, 1.0]),
            ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 1.0, 0.3]),
            ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0], [1.0, 0.3, 1.0]),
            ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0], [0.3, 1.0, 1.0]),
        ];

        for (normal, u_axis, v_axis, color) in faces {
            let n = Vector3::from(normal);
            let u = Vector3::from(u_axis);
            let v = Vector3::from(v_axis);
            let corner = |su: f32, sv: f32, tu: f32, tv: f32| {
                let p = (n + u * su + v * sv) * half;
                let mut vertex = Vertex::new(p.x, p.y, p.z, n.x, n.y, n.z)
                    .with_color(color[0], color[1], color[2])
                    .with_tex_coord(tu, tv);
                vertex.tangent = u;
                vertex.bitangent = v;
                vertex
            };
            let bl = corner(-1.0, -1.0, 0.0, 0.0);
            let br = corner(1.0, -1.0, 1.0, 0.0);
            let tr = corner(1.0, 1.0, 1.0, 1.0);
            let tl = corner(-1.0, 1.0, 0.0, 1.0);
            mesh.add_triangle(Triangle::new(bl, br, tr));
            mesh.add_triangle(Triangle::new(bl, tr, tl));
        }

        mesh
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-vertex attribute arrays of a non-indexed triangle list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexStreams {
    pub positions: Vec<f32>,
    pub colors: Vec<f32>,
    pub normals: Vec<f32>,
    pub tex_coords: Vec<f32>,
    pub tangents: Vec<f32>,
    pub bitangents: Vec<f32>,
}

impl VertexStreams {
    pub fn with_capacity(vertices: usize) -> Self {
        Self {
            positions: Vec::with_capacity(vertices * 3),
            colors: Vec::with_capacity(vertices * 3),
            normals: Vec::with_capacity(vertices * 3),
            tex_coords: Vec::with_capacity(vertices * 2),
            tangents: Vec::with_capacity(vertices * 3),
            bitangents: Vec::with_capacity(vertices * 3),
        }
    }

    pub fn push(&mut self, vertex: &Vertex) {
        self.positions.extend_from_slice(vertex.position.coords.as_slice());
        self.colors.extend_from_slice(vertex.color.as_slice());
        self.normals.extend_from_slice(vertex.normal.as_slice());
        self.tex_coords.extend_from_slice(vertex.tex_coord.as_slice());
        self.tangents.extend_from_slice(vertex.tangent.as_slice());
        self.bitangents.extend_from_slice(vertex.bitangent.as_slice());
    }

    pub fn stream(&self, attribute: VertexAttribute) -> &[f32] {
        match attribute {
            VertexAttribute::Position => &self.positions,
            VertexAttribute::Color => &self.colors,
            VertexAttribute::Normal => &self.normals,
            VertexAttribute::TexCoord => &self.tex_coords,
            VertexAttribute::Tangent => &self.tangents,
            VertexAttribute::Bitangent => &self.bitangents,
        }
    }

    /// Number of vertices, taken from the position stream
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Check the 1:1 per-vertex correspondence and the triangle-list shape
    pub fn validate(&self) -> Result<usize, RenderError> {
        let count = self.vertex_count();
        for attribute in VertexAttribute::ALL {
            let data = self.stream(attribute);
            let components = attribute.components();
            if data.len() % components != 0 || data.len() / components != count {
                return Err(RenderError::InvalidStreams(format!(
                    "`{}` holds {} floats, expected {}",
                    attribute.name(),
                    data.len(),
                    count * components
                )));
            }
        }
        if count % 3 != 0 {
            return Err(RenderError::InvalidStreams(format!(
                "{count} vertices do not form whole triangles"
            )));
        }
        Ok(count)
    }

    /// Read back one vertex; `index` must be below [`VertexStreams::vertex_count`]
    pub fn vertex(&self, index: usize) -> Vertex {
        let v3 = |data: &[f32]| Vector3::new(data[index * 3], data[index * 3 + 1], data[index * 3 + 2]);
        Vertex {
            position: Point3::from(v3(&self.positions)),
            color: v3(&self.colors),
            normal: v3(&self.normals),
            tex_coord: Vector2::new(self.tex_coords[index * 2], self.tex_coords[index * 2 + 1]),
            tangent: v3(&self.tangents),
            bitangent: v3(&self.bitangents),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_expands_to_consistent_streams() {
        let streams = Mesh::cube(2.0).expand();
        assert_eq!(streams.vertex_count(), 36);
        assert_eq!(streams.validate().unwrap(), 36);
        assert_eq!(streams.tex_coords.len(), 72);
    }

    #[test]
    fn test_cube_tangent_frames_are_orthonormal() {
        for triangle in Mesh::cube(1.0).triangles {
            for v in triangle.vertices {
                assert!(v.tangent.dot(&v.normal).abs() < 1e-6);
                assert!(v.bitangent.dot(&v.normal).abs() < 1e-6);
                assert!((v.tangent.cross(&v.bitangent) - v.normal).norm() < 1e-6);
            }
        }
    }

    #[test]
    fn test_cube_winding_matches_normals() {
        for triangle in Mesh::cube(2.0).triangles {
            let face = triangle.calculate_normal();
            assert!((face - triangle.vertices[0].normal).norm() < 1e-5);
        }
    }

    #[test]
    fn test_tangent_frame_follows_uvs() {
        let mut triangle = Triangle::new(
            Vertex::new(0.0, 0.0, 0.0, 0.0, 0.0, 1.0).with_tex_coord(0.0, 0.0),
            Vertex::new(2.0, 0.0, 0.0, 0.0, 0.0, 1.0).with_tex_coord(1.0, 0.0),
            Vertex::new(0.0, 3.0, 0.0, 0.0, 0.0, 1.0).with_tex_coord(0.0, 1.0),
        );
        triangle.compute_tangent_frame();
        assert!((triangle.vertices[1].tangent - Vector3::x()).norm() < 1e-6);
        assert!((triangle.vertices[2].bitangent - Vector3::y()).norm() < 1e-6);
    }

    #[test]
    fn test_validate_rejects_mismatched_streams() {
        let mut streams = Mesh::cube(2.0).expand();
        streams.tangents.pop();
        assert!(matches!(
            streams.validate(),
            Err(RenderError::InvalidStreams(_))
        ));
    }

    #[test]
    fn test_validate_rejects_partial_triangles() {
        let mut streams = VertexStreams::default();
        let v = Vertex::new(0.0, 0.0, 0.0, 0.0, 0.0, 1.0);
        streams.push(&v);
        streams.push(&v);
        assert!(streams.validate().is_err());
    }

    #[test]
    fn test_vertex_read_back() {
        let mesh = Mesh::cube(2.0);
        let streams = mesh.expand();
        assert_eq!(streams.vertex(4), mesh.triangles[1].vertices[1]);
    }

    #[test]
    fn test_fit_to_radius() {
        let mut mesh = Mesh::cube(10.0);
        mesh.fit_to_radius(1.0);
        let max = mesh
            .triangles
            .iter()
            .flat_map(|t| t.vertices.iter())
            .map(|v| v.position.coords.norm())
            .fold(0.0f32, f32::max);
        assert!((max - 1.0).abs() < 1e-5);
    }
}
