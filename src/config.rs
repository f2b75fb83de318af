//! Flock configuration.
//!
//! One engine drives every scenario; what differs between them lives here as
//! plain data. Build a [`FlockConfig`] from a [`Scenario`] preset, adjust it
//! with the `with_*` methods, and hand it to [`Simulation`](crate::Simulation).
//!
//! ```ignore
//! let config = FlockConfig::from_scenario(Scenario::Swarm)
//!     .with_agent_count(2_500)
//!     .with_seed(7);
//! ```

use std::fmt;
use std::str::FromStr;

use glam::Vec3;

use crate::error::ConfigError;

/// Hard cap on a bird's speed outside the pointer's influence.
pub const SPEED_LIMIT: f32 = 9.0;
/// Extra speed granted to a bird while the pointer ray is near it.
pub const POINTER_SPEED_BOOST: f32 = 5.0;
/// Radius around the pointer ray inside which birds are pulled.
pub const POINTER_RADIUS: f32 = 150.0;
/// Scale applied to the pointer pull before `delta_time`.
pub const POINTER_STRENGTH: f32 = 100.0;
/// Wing phase wraps at ten full turns.
pub const PHASE_WRAP: f32 = 62.83;
/// Velocity-to-position scale used by the integration pass.
pub const POSITION_SCALE: f32 = 15.0;
/// Longest frame step the scheduler will feed the passes, in seconds.
pub const MAX_DELTA_TIME: f32 = 1.0;
/// Pointer position used when no pointer is over the window.
pub const POINTER_SENTINEL: [f32; 2] = [1000.0, 1000.0];

/// Radii of the three concentric interaction zones.
///
/// Zone order is fixed: separation, then alignment, then cohesion, each
/// band starting where the previous one ends.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoneRadii {
    pub separation: f32,
    pub alignment: f32,
    pub cohesion: f32,
}

impl ZoneRadii {
    pub const fn new(separation: f32, alignment: f32, cohesion: f32) -> Self {
        Self {
            separation,
            alignment,
            cohesion,
        }
    }

    /// Outer radius of the cohesion band.
    #[inline]
    pub fn zone_radius(&self) -> f32 {
        self.separation + self.alignment + self.cohesion
    }
}

/// The two fixed constant sets. Picked once from the adapter, never blended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Profile {
    /// Full accelerator support.
    Full,
    /// Downlevel (GL) adapters: wider separation, looser cohesion.
    Fallback,
}

impl Profile {
    pub fn radii(self) -> ZoneRadii {
        match self {
            Profile::Full => ZoneRadii::new(15.0, 20.0, 20.0),
            Profile::Fallback => ZoneRadii::new(35.0, 20.0, 10.0),
        }
    }

    /// Profile for the backend a device was created on.
    pub fn for_backend(backend: wgpu::Backend) -> Self {
        match backend {
            wgpu::Backend::Gl => Profile::Fallback,
            _ => Profile::Full,
        }
    }
}

/// How initial positions and velocities are laid out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeedPolicy {
    /// Four groups, two horizontally opposed clusters driven by viewport width.
    Quadrant,
    /// Three spherical clusters at x = -200, 0 and 200 with orbital velocity.
    Cluster,
}

/// Named presets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scenario {
    /// Wide, slow murmuration that fades in over five seconds.
    Murmuration,
    /// Three orbiting swarms with drift and shimmer.
    Swarm,
}

impl Scenario {
    pub fn name(self) -> &'static str {
        match self {
            Scenario::Murmuration => "murmuration",
            Scenario::Swarm => "swarm",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scenario {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "murmuration" | "quadrant" => Ok(Scenario::Murmuration),
            "swarm" | "cluster" => Ok(Scenario::Swarm),
            other => Err(ConfigError::UnknownScenario(other.to_string())),
        }
    }
}

/// Everything the engine needs to know about a flock.
#[derive(Clone, Debug, PartialEq)]
pub struct FlockConfig {
    pub agent_count: u32,
    pub seed_policy: SeedPolicy,
    pub radii: ZoneRadii,
    /// Let the runner replace `radii` with the adapter's [`Profile`].
    pub auto_profile: bool,
    pub speed_limit: f32,
    pub pointer_boost: f32,
    pub pointer_radius: f32,
    pub pointer_strength: f32,
    /// Strength of the pull toward the origin.
    pub center_pull: f32,
    /// Per-axis weight applied to the position before it is normalized for
    /// the center pull. Larger values mean stronger pull along that axis.
    pub center_weight: Vec3,
    /// Amplitude of the positional modulation of the center pull.
    pub center_drift: f32,
    /// Amplitude of the index/time sinusoidal perturbation.
    pub noise: f32,
    /// Seconds for the flock to fade from transparent to opaque.
    pub fade_in: Option<f32>,
    /// Modulate fragment opacity with each bird's wing phase.
    pub phase_pulse: bool,
    /// Send the pointer back to the sentinel after every frame.
    pub reset_pointer: bool,
    /// Bird colour, sRGB.
    pub color: [f32; 3],
    /// Clear colour, sRGB.
    pub background: [f32; 3],
    /// `None` seeds from the wall clock.
    pub seed: Option<u64>,
    /// Viewport width used by the quadrant layout.
    pub seed_width: f32,
}

impl FlockConfig {
    pub fn from_scenario(scenario: Scenario) -> Self {
        let base = Self {
            agent_count: 2000,
            seed_policy: SeedPolicy::Quadrant,
            radii: Profile::Full.radii(),
            auto_profile: true,
            speed_limit: SPEED_LIMIT,
            pointer_boost: POINTER_SPEED_BOOST,
            pointer_radius: POINTER_RADIUS,
            pointer_strength: POINTER_STRENGTH,
            center_pull: 6.0,
            center_weight: Vec3::new(1.0, 3.5, 1.0),
            center_drift: 0.0,
            noise: 0.0,
            fade_in: Some(5.0),
            phase_pulse: false,
            reset_pointer: false,
            color: hex_rgb(0x72767a),
            background: hex_rgb(0xf3f7fc),
            seed: None,
            seed_width: 1280.0,
        };

        match scenario {
            Scenario::Murmuration => base,
            Scenario::Swarm => Self {
                agent_count: 3000,
                seed_policy: SeedPolicy::Cluster,
                center_pull: 4.0,
                center_weight: Vec3::new(1.0, 2.0, 1.5),
                center_drift: 0.35,
                noise: 0.6,
                fade_in: None,
                phase_pulse: true,
                reset_pointer: true,
                ..base
            },
        }
    }

    pub fn with_agent_count(mut self, count: u32) -> Self {
        self.agent_count = count;
        self
    }

    pub fn with_seed_policy(mut self, policy: SeedPolicy) -> Self {
        self.seed_policy = policy;
        self
    }

    /// Fixed radii. Turns off adapter-driven profile selection.
    pub fn with_radii(mut self, radii: ZoneRadii) -> Self {
        self.radii = radii;
        self.auto_profile = false;
        self
    }

    /// Swap in the radii of a profile, leaving everything else alone.
    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.radii = profile.radii();
        self
    }

    pub fn with_center_pull(mut self, pull: f32) -> Self {
        self.center_pull = pull;
        self
    }

    pub fn with_noise(mut self, noise: f32) -> Self {
        self.noise = noise;
        self
    }

    pub fn with_center_drift(mut self, drift: f32) -> Self {
        self.center_drift = drift;
        self
    }

    pub fn with_fade_in(mut self, seconds: Option<f32>) -> Self {
        self.fade_in = seconds;
        self
    }

    pub fn with_reset_pointer(mut self, reset: bool) -> Self {
        self.reset_pointer = reset;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_seed_width(mut self, width: f32) -> Self {
        self.seed_width = width;
        self
    }

    /// Check the values the kernels divide by or clamp against.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent_count == 0 {
            return Err(ConfigError::NoAgents);
        }
        let r = self.radii;
        for (name, value) in [
            ("separation", r.separation),
            ("alignment", r.alignment),
            ("cohesion", r.cohesion),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidRadius { name, value });
            }
        }
        if r.zone_radius() <= 0.0 {
            return Err(ConfigError::EmptyZone);
        }
        if !self.speed_limit.is_finite() || self.speed_limit <= 0.0 {
            return Err(ConfigError::InvalidSpeedLimit(self.speed_limit));
        }
        Ok(())
    }
}

impl Default for FlockConfig {
    fn default() -> Self {
        Self::from_scenario(Scenario::Murmuration)
    }
}

/// `0xRRGGBB` to sRGB floats.
pub fn hex_rgb(hex: u32) -> [f32; 3] {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    ]
}

/// sRGB channel to linear, for writing into an sRGB surface.
pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles_keep_zone_order() {
        for profile in [Profile::Full, Profile::Fallback] {
            let r = profile.radii();
            assert!(r.separation <= r.separation + r.alignment);
            assert!(r.separation + r.alignment <= r.zone_radius());
        }
        assert_eq!(Profile::Full.radii().zone_radius(), 55.0);
        assert_eq!(Profile::Fallback.radii().zone_radius(), 65.0);
    }

    #[test]
    fn test_gl_backend_selects_fallback() {
        assert_eq!(Profile::for_backend(wgpu::Backend::Gl), Profile::Fallback);
        assert_eq!(Profile::for_backend(wgpu::Backend::Vulkan), Profile::Full);
        assert_eq!(Profile::for_backend(wgpu::Backend::Metal), Profile::Full);
    }

    #[test]
    fn test_scenario_from_str() {
        assert_eq!("Swarm".parse::<Scenario>().unwrap(), Scenario::Swarm);
        assert_eq!("quadrant".parse::<Scenario>().unwrap(), Scenario::Murmuration);
        assert!("starlings".parse::<Scenario>().is_err());
    }

    #[test]
    fn test_presets_differ_only_in_data() {
        let a = FlockConfig::from_scenario(Scenario::Murmuration);
        let b = FlockConfig::from_scenario(Scenario::Swarm);
        assert_eq!(a.seed_policy, SeedPolicy::Quadrant);
        assert_eq!(b.seed_policy, SeedPolicy::Cluster);
        assert_eq!(a.speed_limit, b.speed_limit);
        assert!(a.fade_in.is_some() && b.fade_in.is_none());
        assert!(b.reset_pointer);
    }

    #[test]
    fn test_validate() {
        assert!(FlockConfig::default().validate().is_ok());
        assert!(FlockConfig::default().with_agent_count(0).validate().is_err());
        let zero = FlockConfig::default().with_radii(ZoneRadii::new(0.0, 0.0, 0.0));
        assert!(matches!(zero.validate(), Err(ConfigError::EmptyZone)));
        let neg = FlockConfig::default().with_radii(ZoneRadii::new(-1.0, 2.0, 2.0));
        assert!(matches!(neg.validate(), Err(ConfigError::InvalidRadius { .. })));
        // alignment == 0 is legal; the kernels special-case it
        let no_align = FlockConfig::default().with_radii(ZoneRadii::new(10.0, 0.0, 10.0));
        assert!(no_align.validate().is_ok());
    }

    #[test]
    fn test_hex_rgb() {
        let c = hex_rgb(0x72767a);
        assert!((c[0] - 114.0 / 255.0).abs() < 1e-6);
        assert!((c[2] - 122.0 / 255.0).abs() < 1e-6);
        assert!((srgb_to_linear(1.0) - 1.0).abs() < 1e-6);
        assert_eq!(srgb_to_linear(0.0), 0.0);
    }
}
