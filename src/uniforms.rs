//! Uniform blocks shared by the passes.
//!
//! The same structs feed the WGSL kernels and the CPU reference kernels, so
//! there is exactly one place where a parameter is defined. Field order and
//! padding follow WGSL uniform layout: every `vec3` is followed by a scalar
//! that fills its fourth lane.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::config::{FlockConfig, POINTER_SENTINEL};

/// Parameters read by the velocity and position passes.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct SimUniforms {
    pub ray_origin: [f32; 3],
    pub delta_time: f32,
    pub ray_direction: [f32; 3],
    /// Seconds since the flock started.
    pub time: f32,
    pub center_weight: [f32; 3],
    pub center_pull: f32,
    pub separation: f32,
    pub alignment: f32,
    pub cohesion: f32,
    pub speed_limit: f32,
    pub pointer_radius: f32,
    pub pointer_strength: f32,
    pub pointer_boost: f32,
    pub center_drift: f32,
    pub noise: f32,
    pub agent_count: u32,
    pub _padding: [u32; 2],
}

impl SimUniforms {
    pub fn from_config(config: &FlockConfig) -> Self {
        Self {
            // Far off to the side until the first pointer ray arrives.
            ray_origin: [POINTER_SENTINEL[0] * 1000.0, POINTER_SENTINEL[1] * 1000.0, 0.0],
            delta_time: 0.0,
            ray_direction: [0.0, 0.0, -1.0],
            time: 0.0,
            center_weight: config.center_weight.to_array(),
            center_pull: config.center_pull,
            separation: config.radii.separation,
            alignment: config.radii.alignment,
            cohesion: config.radii.cohesion,
            speed_limit: config.speed_limit,
            pointer_radius: config.pointer_radius,
            pointer_strength: config.pointer_strength,
            pointer_boost: config.pointer_boost,
            center_drift: config.center_drift,
            noise: config.noise,
            agent_count: config.agent_count,
            _padding: [0; 2],
        }
    }

    pub fn set_ray(&mut self, origin: Vec3, direction: Vec3) {
        self.ray_origin = origin.to_array();
        self.ray_direction = direction.to_array();
    }

    #[inline]
    pub fn ray_origin(&self) -> Vec3 {
        Vec3::from_array(self.ray_origin)
    }

    #[inline]
    pub fn ray_direction(&self) -> Vec3 {
        Vec3::from_array(self.ray_direction)
    }

    #[inline]
    pub fn center_weight(&self) -> Vec3 {
        Vec3::from_array(self.center_weight)
    }
}

/// Parameters read by the vertex and fragment stages.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct ViewUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    /// Linear RGB plus base opacity.
    pub color: [f32; 4],
    pub time: f32,
    /// Time the fade-in starts from.
    pub start_time: f32,
    /// Fade-in length in seconds; zero means fully opaque from the start.
    pub fade_in: f32,
    /// 1.0 to modulate opacity with the wing phase.
    pub phase_pulse: f32,
}

impl ViewUniforms {
    pub fn new(config: &FlockConfig, view_proj: Mat4, model: Mat4) -> Self {
        let [r, g, b] = config.color.map(crate::config::srgb_to_linear);
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            model: model.to_cols_array_2d(),
            color: [r, g, b, 1.0],
            time: 0.0,
            start_time: 0.0,
            fade_in: config.fade_in.unwrap_or(0.0),
            phase_pulse: if config.phase_pulse { 1.0 } else { 0.0 },
        }
    }

    /// Opacity the fragment stage will use for a bird at `phase`.
    pub fn opacity(&self, phase: f32) -> f32 {
        let fade = if self.fade_in > 0.0 {
            ((self.time - self.start_time) / self.fade_in).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let pulse = if self.phase_pulse > 0.0 {
            0.75 + 0.25 * phase.sin()
        } else {
            1.0
        };
        self.color[3] * fade * pulse
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Scenario;

    #[test]
    fn test_uniform_sizes_are_16_byte_multiples() {
        assert_eq!(std::mem::size_of::<SimUniforms>(), 96);
        assert_eq!(std::mem::size_of::<ViewUniforms>(), 160);
    }

    #[test]
    fn test_from_config_copies_radii() {
        let config = FlockConfig::default();
        let u = SimUniforms::from_config(&config);
        assert_eq!(u.separation, 15.0);
        assert_eq!(u.alignment, 20.0);
        assert_eq!(u.cohesion, 20.0);
        assert_eq!(u.agent_count, 2000);
    }

    #[test]
    fn test_fade_in_ramp() {
        let config = FlockConfig::from_scenario(Scenario::Murmuration);
        let mut v = ViewUniforms::new(&config, Mat4::IDENTITY, Mat4::IDENTITY);
        v.start_time = 1.0;
        v.time = 1.0;
        assert_eq!(v.opacity(0.0), 0.0);
        v.time = 3.5;
        assert!((v.opacity(0.0) - 0.5).abs() < 1e-6);
        v.time = 60.0;
        assert_eq!(v.opacity(0.0), 1.0);
    }

    #[test]
    fn test_phase_pulse_bounds() {
        let config = FlockConfig::from_scenario(Scenario::Swarm);
        let v = ViewUniforms::new(&config, Mat4::IDENTITY, Mat4::IDENTITY);
        for i in 0..100 {
            let o = v.opacity(i as f32 * 0.6283);
            assert!((0.5..=1.0).contains(&o));
        }
    }
}
