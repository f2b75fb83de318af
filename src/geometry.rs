//! Static bird mesh.
//!
//! Each bird is three triangles (body, left wing, right wing), nine
//! vertices in all. The mesh never changes after it is built; all motion
//! comes from the vertex stage reading agent state through `reference`.

use bytemuck::{Pod, Zeroable};

/// Vertices per bird.
pub const VERTICES_PER_BIRD: u32 = 9;
/// Local-space scale applied to the silhouette.
pub const BIRD_SCALE: f32 = 0.2;
/// Roles of the two wingtips, the only vertices that flap.
pub const WINGTIP_ROLES: [u32; 2] = [4, 7];

const WING_SPAN: f32 = 20.0;

/// Unscaled silhouette, one bird.
const BIRD: [[f32; 3]; 9] = [
    // Body
    [0.0, 0.0, -20.0],
    [0.0, -8.0, 10.0],
    [0.0, 0.0, 30.0],
    // Left wing
    [0.0, 0.0, -15.0],
    [-WING_SPAN, 0.0, 5.0],
    [0.0, 0.0, 15.0],
    // Right wing
    [0.0, 0.0, 15.0],
    [WING_SPAN, 0.0, 5.0],
    [0.0, 0.0, -15.0],
];

/// One mesh vertex as laid out in the vertex buffer.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct BirdVertex {
    pub position: [f32; 3],
    /// Owning agent.
    pub reference: u32,
    /// Role within the bird, `0..9`.
    pub bird_vertex: u32,
}

impl BirdVertex {
    pub const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Uint32, 2 => Uint32];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<BirdVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }

    #[inline]
    pub fn is_wingtip(&self) -> bool {
        WINGTIP_ROLES.contains(&self.bird_vertex)
    }
}

/// The whole flock's mesh with its two index buffers kept side by side.
#[derive(Clone, Debug, PartialEq)]
pub struct BirdGeometry {
    pub positions: Vec<[f32; 3]>,
    pub reference: Vec<u32>,
    pub bird_vertex: Vec<u32>,
}

impl BirdGeometry {
    /// Build the mesh for `agent_count` birds. Pure function of the count.
    pub fn new(agent_count: u32) -> Self {
        let total = (agent_count * VERTICES_PER_BIRD) as usize;
        let mut positions = Vec::with_capacity(total);
        let mut reference = Vec::with_capacity(total);
        let mut bird_vertex = Vec::with_capacity(total);

        for v in 0..agent_count * VERTICES_PER_BIRD {
            let role = v % VERTICES_PER_BIRD;
            let [x, y, z] = BIRD[role as usize];
            positions.push([x * BIRD_SCALE, y * BIRD_SCALE, z * BIRD_SCALE]);
            reference.push(v / VERTICES_PER_BIRD);
            bird_vertex.push(role);
        }

        Self {
            positions,
            reference,
            bird_vertex,
        }
    }

    pub fn vertex_count(&self) -> u32 {
        self.positions.len() as u32
    }

    /// Interleave into the GPU vertex layout.
    pub fn vertices(&self) -> Vec<BirdVertex> {
        self.positions
            .iter()
            .zip(&self.reference)
            .zip(&self.bird_vertex)
            .map(|((&position, &reference), &bird_vertex)| BirdVertex {
                position,
                reference,
                bird_vertex,
            })
            .collect()
    }
}
