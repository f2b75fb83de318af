//! Frame ordering, clamping, resize and the capability gate.

use murmuration::prelude::*;
use murmuration::simulation;
use murmuration::uniforms::{SimUniforms, ViewUniforms};

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Upload { delta_time: f32 },
    Velocity,
    Position,
    Draw,
    Resize(u32, u32),
}

#[derive(Default)]
struct RecordingBackend {
    calls: Vec<Call>,
}

impl FrameBackend for RecordingBackend {
    fn upload(&mut self, sim: &SimUniforms, _view: &ViewUniforms) {
        self.calls.push(Call::Upload {
            delta_time: sim.delta_time,
        });
    }

    fn dispatch_velocity(&mut self) {
        self.calls.push(Call::Velocity);
    }

    fn dispatch_position(&mut self) {
        self.calls.push(Call::Position);
    }

    fn draw(&mut self) -> Result<(), wgpu::SurfaceError> {
        self.calls.push(Call::Draw);
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.calls.push(Call::Resize(width, height));
    }
}

fn config() -> FlockConfig {
    FlockConfig::from_scenario(Scenario::Murmuration)
        .with_agent_count(8)
        .with_seed(2)
}

#[test]
fn test_every_frame_runs_passes_in_order() {
    let mut scheduler = FrameScheduler::start(config(), RecordingBackend::default(), 800, 600);
    for _ in 0..3 {
        assert_eq!(scheduler.tick_with_delta(0.02), Ok(true));
    }

    let calls = &scheduler.backend().unwrap().calls;
    assert_eq!(calls.len(), 12);
    for frame in calls.chunks(4) {
        assert!(matches!(frame[0], Call::Upload { .. }));
        assert_eq!(&frame[1..], &[Call::Velocity, Call::Position, Call::Draw]);
    }
}

#[test]
fn test_stalled_frame_is_clamped_to_one_second() {
    let mut scheduler = FrameScheduler::start(config(), RecordingBackend::default(), 800, 600);
    scheduler.tick_with_delta(5.0).unwrap();
    assert_eq!(
        scheduler.backend().unwrap().calls[0],
        Call::Upload { delta_time: 1.0 }
    );
    assert_eq!(scheduler.time().raw_delta(), 5.0);
}

#[test]
fn test_resize_lands_before_the_next_frame() {
    let mut scheduler = FrameScheduler::start(config(), RecordingBackend::default(), 800, 600);
    scheduler.resize(1000, 250);
    // staged only
    assert!(scheduler.backend().unwrap().calls.is_empty());

    scheduler.tick_with_delta(0.016).unwrap();
    let calls = &scheduler.backend().unwrap().calls;
    assert_eq!(calls[0], Call::Resize(1000, 250));
    assert!(matches!(calls[1], Call::Upload { .. }));
    assert_eq!(scheduler.camera().aspect, 4.0);
}

#[test]
fn test_resize_does_not_touch_agents() {
    let config = config();
    let backend = CpuBackend::new(&config);
    let mut scheduler = FrameScheduler::start(config, backend, 800, 600);
    scheduler.tick_with_delta(0.016).unwrap();
    let before = scheduler.backend().unwrap().store().clone();

    scheduler.resize(1024, 512);
    scheduler.apply_pending_resize();

    let backend = scheduler.backend().unwrap();
    assert_eq!(backend.viewport(), (1024, 512));
    assert_eq!(scheduler.camera().aspect, 2.0);
    assert_eq!(backend.store(), &before);
}

#[test]
fn test_no_capability_never_dispatches() {
    let mut created = false;
    let mut scheduler = FrameScheduler::<RecordingBackend>::launch(config(), false, 800, 600, |_| {
        created = true;
        Ok::<_, ()>(RecordingBackend::default())
    })
    .unwrap();

    assert!(!created);
    assert_eq!(scheduler.state(), SchedulerState::Idle);
    for _ in 0..5 {
        assert_eq!(scheduler.tick_with_delta(0.016), Ok(false));
    }
    scheduler.resize(640, 480);
    scheduler.pointer_moved(10.0, 10.0, true);
    assert!(scheduler.backend().is_none());
    assert_eq!(scheduler.input().pointer_ndc(), Vec2::new(1000.0, 1000.0));
}

#[test]
fn test_gate_without_adapter_stays_inert() {
    assert!(simulation::gate(config(), None).is_none());
}

#[test]
fn test_capable_launch_runs() {
    let mut scheduler = FrameScheduler::launch(config(), true, 800, 600, |_| {
        Ok::<_, ()>(RecordingBackend::default())
    })
    .unwrap();
    assert!(scheduler.is_running());
    assert_eq!(scheduler.tick_with_delta(0.016), Ok(true));
}

#[test]
fn test_dispose_stops_dispatch() {
    let mut scheduler = FrameScheduler::start(config(), RecordingBackend::default(), 800, 600);
    scheduler.tick_with_delta(0.016).unwrap();
    let backend = scheduler.dispose().unwrap();
    assert_eq!(backend.calls.len(), 4);
    assert_eq!(scheduler.tick_with_delta(0.016), Ok(false));
    assert_eq!(scheduler.state(), SchedulerState::Idle);
}
