//! Per-frame loop: timestep, pointer ray, the two compute passes, the draw.
//!
//! The scheduler owns the ordering. A [`FrameBackend`] only knows how to run
//! each step; whether that is wgpu ([`crate::gpu::GpuState`]) or the CPU
//! reference kernels ([`CpuBackend`]) does not change the sequence:
//!
//! ```text
//! upload -> velocity pass -> position pass -> draw
//! ```
//!
//! Every tick runs all four, in that order, or none of them.

use glam::{Mat4, Vec3, Vec4};
use log::{debug, info, trace, warn};
use winit::event::WindowEvent;

use crate::camera::Camera;
use crate::config::FlockConfig;
use crate::deform;
use crate::flock;
use crate::geometry::{BirdGeometry, BirdVertex};
use crate::input::PointerInput;
use crate::store::AgentStore;
use crate::time::Time;
use crate::uniforms::{SimUniforms, ViewUniforms};

/// One way of running a frame's passes.
pub trait FrameBackend {
    /// Stage this frame's uniforms. Called once per tick, before any pass.
    fn upload(&mut self, sim: &SimUniforms, view: &ViewUniforms);

    /// New velocity for every agent, reading state as of pass start.
    fn dispatch_velocity(&mut self);

    /// Integrate positions and wing phases. Runs after the velocity pass.
    fn dispatch_position(&mut self);

    /// Deform, project and draw the flock.
    fn draw(&mut self) -> Result<(), wgpu::SurfaceError>;

    /// Output size changed. Must not touch agent state.
    fn resize(&mut self, width: u32, height: u32);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerState {
    /// No accelerator, or disposed. Nothing runs.
    Idle,
    Running,
}

/// Drives the frame loop for one flock.
pub struct FrameScheduler<B: FrameBackend> {
    state: SchedulerState,
    backend: Option<B>,
    config: FlockConfig,
    camera: Camera,
    input: PointerInput,
    time: Time,
    sim: SimUniforms,
    view: ViewUniforms,
}

impl<B: FrameBackend> FrameScheduler<B> {
    /// A scheduler that never runs.
    pub fn idle(config: FlockConfig) -> Self {
        let camera = Camera::default();
        let sim = SimUniforms::from_config(&config);
        let view = ViewUniforms::new(&config, camera.view_projection(), deform::model_matrix());
        Self {
            state: SchedulerState::Idle,
            backend: None,
            config,
            camera,
            input: PointerInput::new(0, 0),
            time: Time::new(),
            sim,
            view,
        }
    }

    /// Start running on `backend` with a `width` x `height` viewport.
    pub fn start(config: FlockConfig, backend: B, width: u32, height: u32) -> Self {
        let mut scheduler = Self::idle(config);
        scheduler.camera.set_viewport(width, height);
        scheduler.input = PointerInput::new(width, height);
        scheduler.view.view_proj = scheduler.camera.view_projection().to_cols_array_2d();
        scheduler.backend = Some(backend);
        scheduler.state = SchedulerState::Running;
        info!(
            "Flock running: {} birds, radii {}/{}/{}",
            scheduler.config.agent_count,
            scheduler.config.radii.separation,
            scheduler.config.radii.alignment,
            scheduler.config.radii.cohesion,
        );
        scheduler
    }

    /// Start only if the accelerator is available. Otherwise stay idle and
    /// never call `create`.
    pub fn launch<F, E>(
        config: FlockConfig,
        capable: bool,
        width: u32,
        height: u32,
        create: F,
    ) -> Result<Self, E>
    where
        F: FnOnce(&FlockConfig) -> Result<B, E>,
    {
        if !capable {
            warn!("No compute-capable GPU adapter; flock stays idle");
            return Ok(Self::idle(config));
        }
        let backend = create(&config)?;
        Ok(Self::start(config, backend, width, height))
    }

    #[inline]
    pub fn state(&self) -> SchedulerState {
        self.state
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.state == SchedulerState::Running
    }

    pub fn config(&self) -> &FlockConfig {
        &self.config
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn time(&self) -> &Time {
        &self.time
    }

    pub fn input(&self) -> &PointerInput {
        &self.input
    }

    /// Uniforms handed to the backend on the last tick.
    pub fn sim_uniforms(&self) -> &SimUniforms {
        &self.sim
    }

    pub fn view_uniforms(&self) -> &ViewUniforms {
        &self.view
    }

    pub fn backend(&self) -> Option<&B> {
        self.backend.as_ref()
    }

    pub fn backend_mut(&mut self) -> Option<&mut B> {
        self.backend.as_mut()
    }

    /// Stage a window event. Ignored while idle.
    pub fn handle_event(&mut self, event: &WindowEvent) -> bool {
        if !self.is_running() {
            return false;
        }
        self.input.handle_event(event)
    }

    /// Pointer moved, in window pixels.
    pub fn pointer_moved(&mut self, x: f64, y: f64, is_primary: bool) {
        if self.is_running() {
            self.input.pointer_moved(x, y, is_primary);
        }
    }

    /// Stage a viewport change. Applied at the start of the next tick.
    pub fn resize(&mut self, width: u32, height: u32) {
        if self.is_running() {
            self.input.resize(width, height);
        }
    }

    /// Apply a staged resize to the camera and the backend output.
    pub fn apply_pending_resize(&mut self) {
        let Some((width, height)) = self.input.take_resize() else {
            return;
        };
        debug!("Resize to {}x{}", width, height);
        self.camera.set_viewport(width, height);
        if let Some(backend) = self.backend.as_mut() {
            backend.resize(width, height);
        }
    }

    /// Run one frame against the wall clock.
    ///
    /// Returns `Ok(false)` when idle and nothing ran.
    pub fn tick(&mut self) -> Result<bool, wgpu::SurfaceError> {
        if !self.is_running() {
            return Ok(false);
        }
        let (elapsed, delta) = self.time.update();
        self.run_frame(elapsed, delta)
    }

    /// Run one frame with an explicit raw delta. The delta is capped the same
    /// way a wall-clock delta is.
    pub fn tick_with_delta(&mut self, raw_delta: f32) -> Result<bool, wgpu::SurfaceError> {
        if !self.is_running() {
            return Ok(false);
        }
        let (elapsed, delta) = self.time.advance(raw_delta);
        self.run_frame(elapsed, delta)
    }

    fn run_frame(&mut self, elapsed: f32, delta: f32) -> Result<bool, wgpu::SurfaceError> {
        self.apply_pending_resize();

        let (origin, direction) = self.camera.ray_from_ndc(self.input.pointer_ndc());
        self.sim.set_ray(origin, direction);
        self.sim.delta_time = delta;
        self.sim.time = elapsed;

        self.view.view_proj = self.camera.view_projection().to_cols_array_2d();
        self.view.time = elapsed;

        let Some(backend) = self.backend.as_mut() else {
            return Ok(false);
        };

        trace!("Frame {} dt={:.4}", self.time.frame(), delta);
        backend.upload(&self.sim, &self.view);
        backend.dispatch_velocity();
        backend.dispatch_position();
        let drawn = backend.draw();

        if self.config.reset_pointer {
            self.input.reset_pointer();
        }

        drawn.map(|()| true)
    }

    /// Stop for good and hand the backend back. Later ticks do nothing.
    pub fn dispose(&mut self) -> Option<B> {
        if self.state == SchedulerState::Running {
            info!(
                "Flock disposed after {} frames in {:.1}s ({:.0} fps)",
                self.time.frame(),
                self.time.wall_elapsed().as_secs_f32(),
                self.time.fps()
            );
        }
        self.state = SchedulerState::Idle;
        self.backend.take()
    }
}

/// Runs the passes on the CPU with the reference kernels.
///
/// Draw fills [`CpuBackend::clip_positions`] with one clip-space position per
/// mesh vertex instead of rasterizing.
#[derive(Debug, Clone)]
pub struct CpuBackend {
    store: AgentStore,
    vertices: Vec<BirdVertex>,
    sim: SimUniforms,
    view: ViewUniforms,
    clip: Vec<Vec4>,
    viewport: (u32, u32),
    frames_drawn: u64,
}

impl CpuBackend {
    pub fn new(config: &FlockConfig) -> Self {
        Self::with_store(config, AgentStore::seeded(config))
    }

    /// Run against an existing agent state.
    pub fn with_store(config: &FlockConfig, store: AgentStore) -> Self {
        let geometry = BirdGeometry::new(store.len() as u32);
        Self {
            vertices: geometry.vertices(),
            sim: SimUniforms::from_config(config),
            view: ViewUniforms::new(config, Mat4::IDENTITY, deform::model_matrix()),
            store,
            clip: Vec::new(),
            viewport: (0, 0),
            frames_drawn: 0,
        }
    }

    pub fn store(&self) -> &AgentStore {
        &self.store
    }

    /// Clip-space positions from the last draw, `9 * N` of them.
    pub fn clip_positions(&self) -> &[Vec4] {
        &self.clip
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }
}

impl FrameBackend for CpuBackend {
    fn upload(&mut self, sim: &SimUniforms, view: &ViewUniforms) {
        self.sim = *sim;
        self.view = *view;
    }

    fn dispatch_velocity(&mut self) {
        flock::velocity_pass(&mut self.store, &self.sim);
    }

    fn dispatch_position(&mut self) {
        flock::position_pass(&mut self.store, &self.sim);
    }

    fn draw(&mut self) -> Result<(), wgpu::SurfaceError> {
        let view_proj = Mat4::from_cols_array_2d(&self.view.view_proj);
        let model = Mat4::from_cols_array_2d(&self.view.model);
        let positions = self.store.positions();
        let velocities = self.store.velocities();
        let phases = self.store.phases();

        self.clip.clear();
        self.clip.reserve(self.vertices.len());
        for vertex in &self.vertices {
            let bird = vertex.reference as usize;
            let world = deform::deform_vertex(
                Vec3::from_array(vertex.position),
                vertex.bird_vertex,
                positions[bird],
                velocities[bird],
                phases[bird],
                &model,
            );
            self.clip.push(deform::project(world, &view_proj));
        }
        self.frames_drawn += 1;
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
    }
}
