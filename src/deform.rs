//! Per-vertex deformation: wing flap, heading, projection.
//!
//! Mirrors `vs_main` in the render shader. The heading matrix is built from
//! the normalized velocity's components directly, with no trig calls: the
//! horizontal components over their length give yaw's cosine and sine, the
//! vertical component gives pitch's sine.

use std::f32::consts::FRAC_PI_2;

use glam::{Mat3, Mat4, Vec3, Vec4};

use crate::geometry::WINGTIP_ROLES;

/// Wingtip excursion at the top of a flap.
pub const FLAP_AMPLITUDE: f32 = 3.0;

pub(crate) const HEADING_EPSILON: f32 = 1e-6;

/// Fixed model transform of the flock mesh: a quarter turn about Y.
pub fn model_matrix() -> Mat4 {
    Mat4::from_rotation_y(FRAC_PI_2)
}

/// Local vertex after the wing flap. Only wingtips move.
#[inline]
pub fn flap(local: Vec3, role: u32, phase: f32) -> Vec3 {
    if WINGTIP_ROLES.contains(&role) {
        Vec3::new(local.x, phase.sin() * FLAP_AMPLITUDE, local.z)
    } else {
        local
    }
}

/// Rotation taking the bird's forward axis onto its velocity.
///
/// A zero velocity keeps the rest pose; a purely vertical one keeps yaw at
/// zero and only pitches.
pub fn heading(velocity: Vec3) -> Mat3 {
    let mut v = velocity.normalize_or_zero();
    if v == Vec3::ZERO {
        return Mat3::IDENTITY;
    }
    v.z = -v.z;

    let xz = (v.x * v.x + v.z * v.z).sqrt();
    let (cos_ry, sin_ry) = if xz > HEADING_EPSILON {
        (v.x / xz, v.z / xz)
    } else {
        (1.0, 0.0)
    };

    let cos_rz = (1.0 - v.y * v.y).max(0.0).sqrt();
    let sin_rz = v.y;

    let yaw = Mat3::from_cols(
        Vec3::new(cos_ry, 0.0, -sin_ry),
        Vec3::Y,
        Vec3::new(sin_ry, 0.0, cos_ry),
    );
    let pitch = Mat3::from_cols(
        Vec3::new(cos_rz, sin_rz, 0.0),
        Vec3::new(-sin_rz, cos_rz, 0.0),
        Vec3::Z,
    );

    yaw * pitch
}

/// World-space position of one mesh vertex.
pub fn deform_vertex(
    local: Vec3,
    role: u32,
    agent_position: Vec3,
    agent_velocity: Vec3,
    phase: f32,
    model: &Mat4,
) -> Vec3 {
    let flapped = flap(local, role, phase);
    let oriented = model.transform_vector3(flapped);
    heading(agent_velocity) * oriented + agent_position
}

/// Clip-space position.
#[inline]
pub fn project(world: Vec3, view_proj: &Mat4) -> Vec4 {
    *view_proj * world.extend(1.0)
}
