use bytemuck::{Pod, Zeroable};
use glam::Vec3;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable, PartialEq)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub fn new(position: Vec3, normal: Vec3, uv: [f32; 2]) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            uv,
        }
    }

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: (std::mem::size_of::<[f32; 3]>() * 2) as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

/// Supplies non-indexed triangle-list vertices for a drawable.
pub trait GeometrySource {
    fn vertices(&self) -> &[Vertex];

    fn vertex_count(&self) -> u32 {
        self.vertices().len() as u32
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometry {
    vertices: Vec<Vertex>,
}

impl GeometrySource for Geometry {
    fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }
}

impl Geometry {
    pub fn from_vertices(vertices: Vec<Vertex>) -> Self {
        Self { vertices }
    }

    /// Horizontal quad at y = 0 facing +Y, `width` along x and `depth` along z.
    pub fn quad(width: f32, depth: f32) -> Self {
        let hw = 0.5 * width;
        let hd = 0.5 * depth;
        let a = Vertex::new(Vec3::new(-hw, 0.0, hd), Vec3::Y, [0.0, 0.0]);
        let b = Vertex::new(Vec3::new(hw, 0.0, hd), Vec3::Y, [1.0, 0.0]);
        let c = Vertex::new(Vec3::new(hw, 0.0, -hd), Vec3::Y, [1.0, 1.0]);
        let d = Vertex::new(Vec3::new(-hw, 0.0, -hd), Vec3::Y, [0.0, 1.0]);
        Self {
            vertices: vec![a, b, c, a, c, d],
        }
    }

    /// Closed box between `min` and `max`, counter-clockwise when seen from outside.
    pub fn cuboid(min: Vec3, max: Vec3) -> Self {
        let (x0, y0, z0) = (min.x, min.y, min.z);
        let (x1, y1, z1) = (max.x, max.y, max.z);

        let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
            ([0.0, 1.0, 0.0], [[x0, y1, z1], [x1, y1, z1], [x1, y1, z0], [x0, y1, z0]]),
            ([0.0, -1.0, 0.0], [[x0, y0, z0], [x1, y0, z0], [x1, y0, z1], [x0, y0, z1]]),
            ([0.0, 0.0, 1.0], [[x0, y0, z1], [x1, y0, z1], [x1, y1, z1], [x0, y1, z1]]),
            ([0.0, 0.0, -1.0], [[x1, y0, z0], [x0, y0, z0], [x0, y1, z0], [x1, y1, z0]]),
            ([1.0, 0.0, 0.0], [[x1, y0, z1], [x1, y0, z0], [x1, y1, z0], [x1, y1, z1]]),
            ([-1.0, 0.0, 0.0], [[x0, y0, z0], [x0, y0, z1], [x0, y1, z1], [x0, y1, z0]]),
        ];

        let uvs = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
        let mut vertices = Vec::with_capacity(36);
        for (normal, corners) in faces {
            let n = Vec3::from_array(normal);
            for i in [0, 1, 2, 0, 2, 3] {
                vertices.push(Vertex::new(Vec3::from_array(corners[i]), n, uvs[i]));
            }
        }
        Self { vertices }
    }

    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.vertices.iter().map(|v| Vec3::from_array(v.position))
    }

    /// Axis-aligned bounds of all vertices, `None` for empty geometry.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut positions = self.positions();
        let first = positions.next()?;
        Some(positions.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p))))
    }
}
