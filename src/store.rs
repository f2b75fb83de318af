//! Agent state: position, velocity and wing phase for every bird.
//!
//! Three parallel buffers indexed by agent id. On the GPU backend these are
//! uploaded once and from then on the storage buffers are the state; on the
//! CPU backend this struct is mutated in place by the two passes.

use std::f32::consts::TAU;

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{FlockConfig, SeedPolicy, PHASE_WRAP};

/// Phase every bird starts at under the quadrant layout.
const QUADRANT_PHASE: f32 = 1.0;
/// Cluster centers along x.
const CLUSTER_CENTERS: [f32; 3] = [-200.0, 0.0, 200.0];

/// Flat per-agent buffers. Equal length, fixed for the life of the flock.
#[derive(Clone, Debug, PartialEq)]
pub struct AgentStore {
    position: Vec<Vec3>,
    velocity: Vec<Vec3>,
    phase: Vec<f32>,
}

impl AgentStore {
    /// Seed a flock according to the config's policy.
    pub fn seeded(config: &FlockConfig) -> Self {
        let seed = config.seed.unwrap_or_else(clock_seed);
        let mut rng = StdRng::seed_from_u64(seed);
        let n = config.agent_count as usize;
        match config.seed_policy {
            SeedPolicy::Quadrant => seed_quadrants(n, config.seed_width, &mut rng),
            SeedPolicy::Cluster => seed_clusters(n, &mut rng),
        }
    }

    /// Build a store from explicit buffers. `None` if the lengths differ.
    pub fn from_parts(position: Vec<Vec3>, velocity: Vec<Vec3>, phase: Vec<f32>) -> Option<Self> {
        if position.len() != velocity.len() || position.len() != phase.len() {
            return None;
        }
        Some(Self {
            position,
            velocity,
            phase,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.position.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.position.is_empty()
    }

    #[inline]
    pub fn positions(&self) -> &[Vec3] {
        &self.position
    }

    #[inline]
    pub fn velocities(&self) -> &[Vec3] {
        &self.velocity
    }

    #[inline]
    pub fn phases(&self) -> &[f32] {
        &self.phase
    }

    pub(crate) fn velocities_mut(&mut self) -> &mut [Vec3] {
        &mut self.velocity
    }

    /// Split borrow for the integration pass.
    pub(crate) fn integration_view(&mut self) -> (&mut [Vec3], &[Vec3], &mut [f32]) {
        (&mut self.position, &self.velocity, &mut self.phase)
    }

    /// Positions as tightly packed `f32` triples for a storage buffer.
    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.position)
    }

    pub fn velocity_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.velocity)
    }

    pub fn phase_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.phase)
    }
}

fn clock_seed() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(42)
}

/// Four equal groups. Groups 0 and 1 sit left of the viewport center and fly
/// right, groups 2 and 3 sit right and fly left. Odd groups are flattened in
/// depth. The vertical spread feeds on the previous bird's depth, so the
/// layout is a chain rather than independent samples.
fn seed_quadrants(n: usize, width: f32, rng: &mut StdRng) -> AgentStore {
    let mut position = Vec::with_capacity(n);
    let mut velocity = Vec::with_capacity(n);
    let mut z = 0.0f32;

    for i in 0..n {
        let group = (i * 4 / n.max(1)).min(3);
        let side = if group < 2 { -1.0 } else { 1.0 };

        let x = side * width * 0.3 + side * width * 0.5 * rng.gen::<f32>();
        let y = ((x * 0.5).sin() + (z * 0.5).sin()) * 500.0;
        let depth = (x * 0.5).sin() + (y * 0.5).sin();
        z = if group % 2 == 0 { depth * 500.0 } else { depth };

        let vx = if group < 2 {
            rng.gen::<f32>() + 1.0
        } else {
            rng.gen::<f32>() - 1.0
        };
        let vy = rng.gen::<f32>() - 1.0;
        let vz = rng.gen::<f32>() - 1.0;

        position.push(Vec3::new(x, y, z));
        velocity.push(Vec3::new(vx, vy, vz) * 10.0);
    }

    AgentStore {
        position,
        velocity,
        phase: vec![QUADRANT_PHASE; n],
    }
}

/// Three equal groups, each a ball of birds around its center on the x axis,
/// circling that center.
fn seed_clusters(n: usize, rng: &mut StdRng) -> AgentStore {
    let mut position = Vec::with_capacity(n);
    let mut velocity = Vec::with_capacity(n);
    let mut phase = Vec::with_capacity(n);

    for i in 0..n {
        let group = (i * 3 / n.max(1)).min(2);
        let center = Vec3::new(CLUSTER_CENTERS[group], 0.0, 0.0);

        let radius = rng.gen_range(80.0..140.0);
        let offset = random_in_sphere(rng, radius);
        let jitter = Vec3::new(
            rng.gen_range(-5.0..5.0),
            rng.gen_range(-5.0..5.0),
            rng.gen_range(-5.0..5.0),
        );
        let pos = center + offset + jitter;

        let tangent = tangent_direction(pos - center);
        let lift = Vec3::new(0.0, rng.gen_range(-0.5..0.5), 0.0);

        position.push(pos);
        velocity.push((tangent + lift) * 5.0);
        phase.push(rng.gen_range(0.0..PHASE_WRAP));
    }

    AgentStore {
        position,
        velocity,
        phase,
    }
}

/// Uniform over the ball's volume.
fn random_in_sphere(rng: &mut StdRng, radius: f32) -> Vec3 {
    let theta = rng.gen_range(0.0..TAU);
    let cos_phi: f32 = rng.gen_range(-1.0..1.0);
    let sin_phi = (1.0 - cos_phi * cos_phi).max(0.0).sqrt();
    // Cube root for uniform volume distribution
    let r = radius * rng.gen::<f32>().cbrt();

    Vec3::new(r * sin_phi * theta.cos(), r * cos_phi, r * sin_phi * theta.sin())
}

/// Unit vector perpendicular to `radial` in the XZ plane.
fn tangent_direction(radial: Vec3) -> Vec3 {
    let tangent = Vec3::new(-radial.z, 0.0, radial.x);
    if tangent.length_squared() > 0.0001 {
        tangent.normalize()
    } else {
        Vec3::X
    }
}
