//! Windowed runner: capability gate, winit event loop, frame scheduling.

use std::sync::Arc;

use log::{error, info, warn};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::config::{FlockConfig, Profile, Scenario};
use crate::error::SimulationError;
use crate::gpu::{self, GpuState};
use crate::scheduler::FrameScheduler;
use crate::store::AgentStore;

/// A full-window flock.
///
/// ```ignore
/// use murmuration::prelude::*;
///
/// fn main() -> Result<(), SimulationError> {
///     Simulation::from_scenario(Scenario::Swarm).run()
/// }
/// ```
pub struct Simulation {
    config: FlockConfig,
    title: String,
}

impl Simulation {
    pub fn new(config: FlockConfig) -> Self {
        Self {
            config,
            title: "Murmuration".to_string(),
        }
    }

    pub fn from_scenario(scenario: Scenario) -> Self {
        Self::new(FlockConfig::from_scenario(scenario))
            .with_title(format!("Murmuration - {}", scenario))
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn config(&self) -> &FlockConfig {
        &self.config
    }

    /// Run until the window closes.
    ///
    /// Without a compute-capable adapter this logs a warning and returns
    /// `Ok(())` without opening a window or an event loop.
    pub fn run(self) -> Result<(), SimulationError> {
        self.config.validate()?;

        let adapter = gpu::probe();
        let Some(config) = gate(self.config, adapter.as_ref()) else {
            warn!("No GPU adapter with compute support found; not starting");
            return Ok(());
        };

        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut app = App::new(config, self.title);
        event_loop.run_app(&mut app)?;

        match app.error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Apply the capability check to a config.
///
/// `None` if there is no adapter. Otherwise the config, with its zone radii
/// replaced by the adapter's profile when `auto_profile` is set.
pub fn gate(config: FlockConfig, adapter: Option<&wgpu::AdapterInfo>) -> Option<FlockConfig> {
    let adapter = adapter?;
    info!("GPU available: {} ({:?})", adapter.name, adapter.backend);
    if !config.auto_profile {
        return Some(config);
    }
    let profile = Profile::for_backend(adapter.backend);
    info!("Using {:?} profile", profile);
    Some(config.with_profile(profile))
}

/// Width the quadrant layout spreads over: the window's logical width, so a
/// high-DPI display gets the same layout as a standard one.
fn seed_width(size: winit::dpi::PhysicalSize<u32>, scale_factor: f64) -> f32 {
    size.to_logical::<f32>(scale_factor).width.max(1.0)
}

struct App {
    config: FlockConfig,
    title: String,
    window: Option<Arc<Window>>,
    scheduler: Option<FrameScheduler<GpuState>>,
    error: Option<SimulationError>,
}

impl App {
    fn new(config: FlockConfig, title: String) -> Self {
        Self {
            config,
            title,
            window: None,
            scheduler: None,
            error: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, e: SimulationError) {
        error!("{}", e);
        self.error = Some(e);
        event_loop.exit();
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<(), SimulationError> {
        let window_attrs = Window::default_attributes()
            .with_title(self.title.as_str())
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));

        let window = Arc::new(event_loop.create_window(window_attrs)?);
        let size = window.inner_size();

        let config = self
            .config
            .clone()
            .with_seed_width(seed_width(size, window.scale_factor()));
        let store = AgentStore::seeded(&config);

        let scheduler = FrameScheduler::launch(config, true, size.width, size.height, |config| {
            pollster::block_on(GpuState::new(window.clone(), config, &store))
        })?;

        self.window = Some(window);
        self.scheduler = Some(scheduler);
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.start(event_loop) {
                self.fail(event_loop, e);
                return;
            }
        }
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(scheduler) = self.scheduler.as_mut() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                scheduler.dispose();
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => {
                match scheduler.tick() {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        info!("Surface lost; reconfiguring");
                        if let Some(gpu_state) = scheduler.backend_mut() {
                            gpu_state.reconfigure();
                        }
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        error!("GPU out of memory");
                        scheduler.dispose();
                        event_loop.exit();
                        return;
                    }
                    Err(e) => warn!("Frame skipped: {:?}", e),
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            other => {
                scheduler.handle_event(&other);
            }
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(scheduler) = self.scheduler.as_mut() {
            scheduler.dispose();
        }
    }
}
