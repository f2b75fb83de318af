//! # Murmuration
//!
//! A full-window flock of birds, simulated and drawn on the GPU.
//!
//! Every bird has a position, a velocity and a wing phase. Each frame runs
//! two compute passes over the whole flock and then draws one 9-vertex mesh
//! per bird:
//!
//! 1. **Velocity pass**: pull toward the pointer ray and the origin, then
//!    separation, alignment and cohesion against every other bird, then a
//!    speed clamp.
//! 2. **Position pass**: integrate position, advance the wing phase.
//! 3. **Draw**: flap the wingtips, turn the mesh to face along the velocity,
//!    project.
//!
//! ## Quick Start
//!
//! ```ignore
//! use murmuration::prelude::*;
//!
//! fn main() -> Result<(), SimulationError> {
//!     Simulation::new(
//!         FlockConfig::from_scenario(Scenario::Murmuration)
//!             .with_agent_count(4000),
//!     )
//!     .run()
//! }
//! ```
//!
//! ## Headless
//!
//! The same passes run on the CPU through [`CpuBackend`], driven by the same
//! [`FrameScheduler`]:
//!
//! ```ignore
//! let config = FlockConfig::default().with_agent_count(256).with_seed(1);
//! let backend = CpuBackend::new(&config);
//! let mut scheduler = FrameScheduler::start(config, backend, 1280, 720);
//! for _ in 0..60 {
//!     scheduler.tick_with_delta(1.0 / 60.0)?;
//! }
//! ```
//!
//! ## Zones
//!
//! Neighbors are classified by `percent = dist² / zoneRadius²`, where
//! `zoneRadius = separation + alignment + cohesion`:
//!
//! | Band | Rule |
//! |------|------|
//! | `percent < separation / zoneRadius` | push apart |
//! | `percent < (separation + alignment) / zoneRadius` | match heading |
//! | otherwise, up to 1 | pull together |

pub mod camera;
pub mod config;
pub mod deform;
pub mod error;
pub mod flock;
pub mod geometry;
pub mod gpu;
pub mod input;
pub mod scheduler;
pub mod shader;
pub mod simulation;
pub mod store;
pub mod time;
pub mod uniforms;

pub use bytemuck;
pub use glam::{Vec2, Vec3, Vec4};

pub use config::{FlockConfig, Profile, Scenario, SeedPolicy, ZoneRadii};
pub use error::{ConfigError, GpuError, SimulationError};
pub use scheduler::{CpuBackend, FrameBackend, FrameScheduler, SchedulerState};
pub use simulation::Simulation;
pub use store::AgentStore;

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use murmuration::prelude::*;
/// ```
pub mod prelude {
    pub use crate::camera::Camera;
    pub use crate::config::{FlockConfig, Profile, Scenario, SeedPolicy, ZoneRadii};
    pub use crate::error::SimulationError;
    pub use crate::geometry::BirdGeometry;
    pub use crate::input::PointerInput;
    pub use crate::scheduler::{CpuBackend, FrameBackend, FrameScheduler, SchedulerState};
    pub use crate::simulation::Simulation;
    pub use crate::store::AgentStore;
    pub use crate::time::Time;
    pub use crate::{Vec2, Vec3, Vec4};
}
