//! Reference kernels for the two compute passes.
//!
//! These are the same per-agent functions the WGSL in [`crate::shader`]
//! runs, written against plain slices. The CPU backend runs them directly;
//! the GPU backend is checked against them.
//!
//! The velocity pass reads every agent's state as it was when the pass
//! began. [`velocity_pass`] collects all new velocities before writing any
//! of them back, so no agent ever sees a neighbor's update from the same
//! pass.

use std::f32::consts::TAU;

use glam::Vec3;

use crate::config::{PHASE_WRAP, POSITION_SCALE};
use crate::store::AgentStore;
use crate::uniforms::SimUniforms;

/// Neighbors closer than this are treated as coincident and skipped.
pub const NEIGHBOR_EPSILON: f32 = 0.0001;

/// Which rule a neighbor falls under.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Zone {
    Separation,
    Alignment,
    Cohesion,
}

/// Zone boundaries, normalized against the squared zone radius.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoneThresholds {
    pub zone_radius_sq: f32,
    pub separation: f32,
    pub alignment: f32,
}

impl ZoneThresholds {
    pub fn new(separation: f32, alignment: f32, cohesion: f32) -> Self {
        let zone_radius = separation + alignment + cohesion;
        Self {
            zone_radius_sq: zone_radius * zone_radius,
            separation: separation / zone_radius,
            alignment: (separation + alignment) / zone_radius,
        }
    }

    pub fn from_uniforms(u: &SimUniforms) -> Self {
        Self::new(u.separation, u.alignment, u.cohesion)
    }

    /// Zone for a neighbor at `percent = dist² / zoneRadius²`.
    ///
    /// Exactly one zone for every `percent` in `[0, 1]`.
    #[inline]
    pub fn classify(&self, percent: f32) -> Zone {
        if percent < self.separation {
            Zone::Separation
        } else if percent < self.alignment {
            Zone::Alignment
        } else {
            Zone::Cohesion
        }
    }
}

/// Velocity an agent leaves the pass with, and the limit it was clamped to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AgentVelocity {
    pub velocity: Vec3,
    pub limit: f32,
}

/// Pull toward the closest point on the pointer ray.
///
/// `None` when the agent is outside the pointer radius.
pub fn pointer_pull(position: Vec3, u: &SimUniforms) -> Option<Vec3> {
    let origin = u.ray_origin();
    let direction = u.ray_direction();

    let to_ray = origin - position;
    let projection = to_ray.dot(direction);
    let closest = origin - direction * projection;
    let to_closest = closest - position;
    let dist_sq = to_closest.length_squared();
    let radius_sq = u.pointer_radius * u.pointer_radius;

    if dist_sq >= radius_sq {
        return None;
    }

    let strength = (1.0 - dist_sq / radius_sq) * u.delta_time * u.pointer_strength;
    Some(to_closest.normalize_or_zero() * strength)
}

/// Change in velocity from the pull toward the origin.
pub fn center_pull(position: Vec3, u: &SimUniforms) -> Vec3 {
    let weighted = position * u.center_weight();
    if weighted.length_squared() < NEIGHBOR_EPSILON * NEIGHBOR_EPSILON {
        return Vec3::ZERO;
    }
    let drift = 1.0 + u.center_drift * (position.x * 0.005 + position.z * 0.003).sin();
    -weighted.normalize() * u.delta_time * u.center_pull * drift
}

/// Small deterministic wobble keyed on agent index and time.
pub fn wobble(index: u32, u: &SimUniforms) -> Vec3 {
    if u.noise == 0.0 {
        return Vec3::ZERO;
    }
    let f = index as f32;
    let t = u.time;
    Vec3::new(
        (f * 0.1237 + t * 0.7).sin(),
        (f * 0.2719 + t * 0.9).sin() * 0.5,
        (f * 0.3571 + t * 1.1).sin(),
    ) * u.noise
        * u.delta_time
}

/// Sum of separation, alignment and cohesion over every other agent.
pub fn neighbor_steering(
    index: usize,
    positions: &[Vec3],
    velocities: &[Vec3],
    u: &SimUniforms,
) -> Vec3 {
    let zones = ZoneThresholds::from_uniforms(u);
    let position = positions[index];
    let dt = u.delta_time;
    let mut steer = Vec3::ZERO;

    for (i, (&other, &other_velocity)) in positions.iter().zip(velocities).enumerate() {
        if i == index {
            continue;
        }

        let to_bird = other - position;
        let dist = to_bird.length();
        if dist < NEIGHBOR_EPSILON {
            continue;
        }

        let dist_sq = dist * dist;
        if dist_sq > zones.zone_radius_sq {
            continue;
        }

        let percent = dist_sq / zones.zone_radius_sq;
        let dir = to_bird / dist;

        match zones.classify(percent) {
            Zone::Separation => {
                // Move apart for comfort
                let adjust = (zones.separation / percent - 1.0) * dt;
                steer -= dir * adjust;
            }
            Zone::Alignment => {
                let span = zones.alignment - zones.separation;
                let t = (percent - zones.separation) / span;
                let adjust = (0.5 - (t * TAU).cos() * 0.5 + 0.7) * dt;
                steer += other_velocity.normalize_or_zero() * adjust;
            }
            Zone::Cohesion => {
                let span = 1.0 - zones.alignment;
                let t = if span == 0.0 {
                    1.0
                } else {
                    (percent - zones.alignment) / span
                };
                let adjust = 0.5 * (t * TAU).cos() * dt;
                steer += dir * adjust;
            }
        }
    }

    steer
}

/// Full velocity update for one agent, against state as of pass start.
pub fn update_velocity(
    index: usize,
    positions: &[Vec3],
    velocities: &[Vec3],
    u: &SimUniforms,
) -> AgentVelocity {
    let position = positions[index];
    let previous = velocities[index];
    let mut velocity = previous;
    let mut limit = u.speed_limit;

    if let Some(pull) = pointer_pull(position, u) {
        velocity += pull;
        limit += u.pointer_boost;
    }

    velocity += center_pull(position, u);
    velocity += neighbor_steering(index, positions, velocities, u);
    velocity += wobble(index as u32, u);

    // A non-finite result would stick to this bird forever; drop the update.
    if !velocity.is_finite() {
        velocity = previous;
    }

    if velocity.length() > limit {
        velocity = velocity.normalize_or_zero() * limit;
    }

    AgentVelocity { velocity, limit }
}

/// Run the velocity pass over the whole flock.
pub fn velocity_pass(store: &mut AgentStore, u: &SimUniforms) {
    let updated: Vec<Vec3> = (0..store.len())
        .map(|i| update_velocity(i, store.positions(), store.velocities(), u).velocity)
        .collect();
    store.velocities_mut().copy_from_slice(&updated);
}

/// Advance one agent's position and wing phase.
pub fn integrate(position: Vec3, velocity: Vec3, phase: f32, delta_time: f32) -> (Vec3, f32) {
    let position = position + velocity * delta_time * POSITION_SCALE;

    let horizontal = Vec3::new(velocity.x, 0.0, velocity.z).length();
    let advanced = phase
        + delta_time
        + horizontal * delta_time * 3.0
        + velocity.y.max(0.0) * delta_time * 6.0;

    (position, wrap_phase(advanced))
}

/// Run the position pass over the whole flock.
pub fn position_pass(store: &mut AgentStore, u: &SimUniforms) {
    let (positions, velocities, phases) = store.integration_view();
    let agents = positions.iter_mut().zip(velocities).zip(phases.iter_mut());
    for ((position, &velocity), phase) in agents {
        let (p, ph) = integrate(*position, velocity, *phase, u.delta_time);
        *position = p;
        *phase = ph;
    }
}

/// `phase mod 62.83`, always in `[0, 62.83)`.
#[inline]
pub fn wrap_phase(phase: f32) -> f32 {
    let wrapped = phase.rem_euclid(PHASE_WRAP);
    if wrapped >= PHASE_WRAP {
        0.0
    } else {
        wrapped
    }
}
