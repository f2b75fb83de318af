//! WGSL sources for the velocity pass, the position pass and the bird mesh.
//!
//! Agent state lives in flat `array<f32>` storage buffers: three floats per
//! agent for position and velocity, one for phase. The math follows
//! [`crate::flock`] and [`crate::deform`] line for line; constants are
//! formatted in from the Rust side so the two never drift apart.

use crate::config::{PHASE_WRAP, POSITION_SCALE};
use crate::deform::{FLAP_AMPLITUDE, HEADING_EPSILON};
use crate::flock::NEIGHBOR_EPSILON;
use crate::geometry::WINGTIP_ROLES;

/// Threads per compute workgroup.
pub const WORKGROUP_SIZE: u32 = 256;

/// Layout of [`SimUniforms`](crate::uniforms::SimUniforms).
const SIM_UNIFORMS_WGSL: &str = r#"struct SimUniforms {
    ray_origin: vec3<f32>,
    delta_time: f32,
    ray_direction: vec3<f32>,
    time: f32,
    center_weight: vec3<f32>,
    center_pull: f32,
    separation: f32,
    alignment: f32,
    cohesion: f32,
    speed_limit: f32,
    pointer_radius: f32,
    pointer_strength: f32,
    pointer_boost: f32,
    center_drift: f32,
    noise: f32,
    agent_count: u32,
    _pad0: u32,
    _pad1: u32,
};
"#;

/// Velocity pass. Reads `positions` and `velocities`, writes `velocity_next`.
///
/// Writing to a separate buffer keeps every lane reading neighbor velocities
/// as they were when the pass began.
pub fn velocity_shader() -> String {
    format!(
        r#"{SIM_UNIFORMS_WGSL}
const EPSILON: f32 = {NEIGHBOR_EPSILON:?};
const TAU: f32 = 6.283185307;
const FLOAT_MAX: f32 = 3.4e38;

@group(0) @binding(0)
var<uniform> sim: SimUniforms;

@group(0) @binding(1)
var<storage, read> positions: array<f32>;

@group(0) @binding(2)
var<storage, read> velocities: array<f32>;

@group(0) @binding(3)
var<storage, read_write> velocity_next: array<f32>;

fn agent_position(i: u32) -> vec3<f32> {{
    let b = i * 3u;
    return vec3<f32>(positions[b], positions[b + 1u], positions[b + 2u]);
}}

fn agent_velocity(i: u32) -> vec3<f32> {{
    let b = i * 3u;
    return vec3<f32>(velocities[b], velocities[b + 1u], velocities[b + 2u]);
}}

fn safe_normalize(v: vec3<f32>) -> vec3<f32> {{
    let len = length(v);
    if len > 0.0 {{
        return v / len;
    }}
    return vec3<f32>(0.0);
}}

// NaN fails every comparison
fn is_finite3(v: vec3<f32>) -> bool {{
    return all(abs(v) <= vec3<f32>(FLOAT_MAX));
}}

@compute @workgroup_size({WORKGROUP_SIZE})
fn main(@builtin(global_invocation_id) global_id: vec3<u32>) {{
    let index = global_id.x;
    if index >= sim.agent_count {{
        return;
    }}

    let position = agent_position(index);
    let previous = agent_velocity(index);
    let dt = sim.delta_time;
    var velocity = previous;
    var limit = sim.speed_limit;

    // Pointer ray
    let to_ray = sim.ray_origin - position;
    let projection = dot(to_ray, sim.ray_direction);
    let closest = sim.ray_origin - sim.ray_direction * projection;
    let to_closest = closest - position;
    let ray_dist_sq = dot(to_closest, to_closest);
    let radius_sq = sim.pointer_radius * sim.pointer_radius;
    if ray_dist_sq < radius_sq {{
        let strength = (1.0 - ray_dist_sq / radius_sq) * dt * sim.pointer_strength;
        velocity += safe_normalize(to_closest) * strength;
        limit += sim.pointer_boost;
    }}

    // Center
    let weighted = position * sim.center_weight;
    if dot(weighted, weighted) >= EPSILON * EPSILON {{
        let drift = 1.0 + sim.center_drift * sin(position.x * 0.005 + position.z * 0.003);
        velocity -= normalize(weighted) * dt * sim.center_pull * drift;
    }}

    // Zones
    let zone_radius = sim.separation + sim.alignment + sim.cohesion;
    let zone_radius_sq = zone_radius * zone_radius;
    let separation_thresh = sim.separation / zone_radius;
    let alignment_thresh = (sim.separation + sim.alignment) / zone_radius;

    var steer = vec3<f32>(0.0);
    for (var i = 0u; i < sim.agent_count; i++) {{
        if i == index {{
            continue;
        }}

        let to_bird = agent_position(i) - position;
        let dist = length(to_bird);
        if dist < EPSILON {{
            continue;
        }}

        let dist_sq = dist * dist;
        if dist_sq > zone_radius_sq {{
            continue;
        }}

        let percent = dist_sq / zone_radius_sq;
        let dir = to_bird / dist;

        if percent < separation_thresh {{
            let adjust = (separation_thresh / percent - 1.0) * dt;
            steer -= dir * adjust;
        }} else if percent < alignment_thresh {{
            let t = (percent - separation_thresh) / (alignment_thresh - separation_thresh);
            let adjust = (0.5 - cos(t * TAU) * 0.5 + 0.7) * dt;
            steer += safe_normalize(agent_velocity(i)) * adjust;
        }} else {{
            let span = 1.0 - alignment_thresh;
            var t = 1.0;
            if span != 0.0 {{
                t = (percent - alignment_thresh) / span;
            }}
            steer += dir * (0.5 * cos(t * TAU) * dt);
        }}
    }}
    velocity += steer;

    if sim.noise != 0.0 {{
        let f = f32(index);
        let wobble = vec3<f32>(
            sin(f * 0.1237 + sim.time * 0.7),
            sin(f * 0.2719 + sim.time * 0.9) * 0.5,
            sin(f * 0.3571 + sim.time * 1.1),
        );
        velocity += wobble * sim.noise * dt;
    }}

    if !is_finite3(velocity) {{
        velocity = previous;
    }}

    let speed = length(velocity);
    if speed > limit {{
        velocity = velocity / speed * limit;
    }}

    let b = index * 3u;
    velocity_next[b] = velocity.x;
    velocity_next[b + 1u] = velocity.y;
    velocity_next[b + 2u] = velocity.z;
}}
"#
    )
}

/// Position pass. Integrates positions and wing phases in place.
pub fn position_shader() -> String {
    format!(
        r#"{SIM_UNIFORMS_WGSL}
const POSITION_SCALE: f32 = {POSITION_SCALE:?};
const PHASE_WRAP: f32 = {PHASE_WRAP:?};

@group(0) @binding(0)
var<uniform> sim: SimUniforms;

@group(0) @binding(1)
var<storage, read_write> positions: array<f32>;

@group(0) @binding(2)
var<storage, read> velocities: array<f32>;

@group(0) @binding(3)
var<storage, read_write> phases: array<f32>;

@compute @workgroup_size({WORKGROUP_SIZE})
fn main(@builtin(global_invocation_id) global_id: vec3<u32>) {{
    let index = global_id.x;
    if index >= sim.agent_count {{
        return;
    }}

    let dt = sim.delta_time;
    let b = index * 3u;
    let velocity = vec3<f32>(velocities[b], velocities[b + 1u], velocities[b + 2u]);

    let step = velocity * dt * POSITION_SCALE;
    positions[b] += step.x;
    positions[b + 1u] += step.y;
    positions[b + 2u] += step.z;

    let horizontal = length(vec3<f32>(velocity.x, 0.0, velocity.z));
    var phase = phases[index] + dt + horizontal * dt * 3.0 + max(velocity.y, 0.0) * dt * 6.0;
    phase = phase - floor(phase / PHASE_WRAP) * PHASE_WRAP;
    if phase < 0.0 || phase >= PHASE_WRAP {{
        phase = 0.0;
    }}
    phases[index] = phase;
}}
"#
    )
}

/// Bird mesh: flap, heading, projection, then a flat translucent fill.
pub fn render_shader() -> String {
    let [wing_a, wing_b] = WINGTIP_ROLES;
    format!(
        r#"struct ViewUniforms {{
    view_proj: mat4x4<f32>,
    model: mat4x4<f32>,
    color: vec4<f32>,
    time: f32,
    start_time: f32,
    fade_in: f32,
    phase_pulse: f32,
}};

const FLAP_AMPLITUDE: f32 = {FLAP_AMPLITUDE:?};
const HEADING_EPSILON: f32 = {HEADING_EPSILON:.7};

@group(0) @binding(0)
var<uniform> view: ViewUniforms;

@group(0) @binding(1)
var<storage, read> positions: array<f32>;

@group(0) @binding(2)
var<storage, read> velocities: array<f32>;

@group(0) @binding(3)
var<storage, read> phases: array<f32>;

struct VertexInput {{
    @location(0) position: vec3<f32>,
    @location(1) reference: u32,
    @location(2) bird_vertex: u32,
}};

struct VertexOutput {{
    @builtin(position) clip_position: vec4<f32>,
    @location(0) opacity: f32,
}};

fn heading(velocity: vec3<f32>) -> mat3x3<f32> {{
    let len = length(velocity);
    if !(len > 0.0) {{
        return mat3x3<f32>(
            vec3<f32>(1.0, 0.0, 0.0),
            vec3<f32>(0.0, 1.0, 0.0),
            vec3<f32>(0.0, 0.0, 1.0),
        );
    }}
    var v = velocity / len;
    v.z = -v.z;

    let xz = sqrt(v.x * v.x + v.z * v.z);
    var cos_ry = 1.0;
    var sin_ry = 0.0;
    if xz > HEADING_EPSILON {{
        cos_ry = v.x / xz;
        sin_ry = v.z / xz;
    }}

    let cos_rz = sqrt(max(1.0 - v.y * v.y, 0.0));
    let sin_rz = v.y;

    let yaw = mat3x3<f32>(
        vec3<f32>(cos_ry, 0.0, -sin_ry),
        vec3<f32>(0.0, 1.0, 0.0),
        vec3<f32>(sin_ry, 0.0, cos_ry),
    );
    let pitch = mat3x3<f32>(
        vec3<f32>(cos_rz, sin_rz, 0.0),
        vec3<f32>(-sin_rz, cos_rz, 0.0),
        vec3<f32>(0.0, 0.0, 1.0),
    );
    return yaw * pitch;
}}

fn agent_phase(bird: u32) -> f32 {{
    return phases[bird];
}}

/// World position of mesh vertex `local` with role `bird_vertex` on `bird`.
fn bird_world_position(local_position: vec3<f32>, bird_vertex: u32, bird: u32) -> vec3<f32> {{
    let b = bird * 3u;
    let agent_position = vec3<f32>(positions[b], positions[b + 1u], positions[b + 2u]);
    let agent_velocity = vec3<f32>(velocities[b], velocities[b + 1u], velocities[b + 2u]);

    var local = local_position;
    if bird_vertex == {wing_a}u || bird_vertex == {wing_b}u {{
        local.y = sin(agent_phase(bird)) * FLAP_AMPLITUDE;
    }}

    let oriented = (view.model * vec4<f32>(local, 0.0)).xyz;
    return heading(agent_velocity) * oriented + agent_position;
}}

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {{
    let phase = agent_phase(in.reference);
    let world = bird_world_position(in.position, in.bird_vertex, in.reference);

    var fade = 1.0;
    if view.fade_in > 0.0 {{
        fade = clamp((view.time - view.start_time) / view.fade_in, 0.0, 1.0);
    }}
    var pulse = 1.0;
    if view.phase_pulse > 0.0 {{
        pulse = 0.75 + 0.25 * sin(phase);
    }}

    var out: VertexOutput;
    out.clip_position = view.view_proj * vec4<f32>(world, 1.0);
    out.opacity = view.color.a * fade * pulse;
    return out;
}}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {{
    return vec4<f32>(view.color.rgb, in.opacity);
}}
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants_are_formatted_in() {
        let velocity = velocity_shader();
        assert!(velocity.contains("const EPSILON: f32 = 0.0001;"));
        assert!(velocity.contains("@workgroup_size(256)"));

        let position = position_shader();
        assert!(position.contains("const POSITION_SCALE: f32 = 15.0;"));
        assert!(position.contains("const PHASE_WRAP: f32 = 62.83;"));

        let render = render_shader();
        assert!(render.contains("const FLAP_AMPLITUDE: f32 = 3.0;"));
        assert!(render.contains("const HEADING_EPSILON: f32 = 0.0000010;"));
        assert!(render.contains("bird_vertex == 4u || bird_vertex == 7u"));
    }

    #[test]
    fn test_no_unfilled_placeholders() {
        for source in [velocity_shader(), position_shader(), render_shader()] {
            assert!(!source.contains("{WORKGROUP_SIZE}"));
            assert!(!source.contains("{{"));
        }
    }
}
