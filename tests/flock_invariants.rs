//! Flock behavior over many frames, on the CPU backend.

use murmuration::config::PHASE_WRAP;
use murmuration::flock;
use murmuration::prelude::*;
use murmuration::uniforms::SimUniforms;

const FRAME: f32 = 1.0 / 60.0;

fn run_frames(config: FlockConfig, frames: usize) -> FrameScheduler<CpuBackend> {
    let backend = CpuBackend::new(&config);
    let mut scheduler = FrameScheduler::start(config, backend, 800, 600);
    for _ in 0..frames {
        scheduler.tick_with_delta(FRAME).unwrap();
    }
    scheduler
}

/// Run `frames` ticks and check every agent's speed against the limit it
/// was clamped to on that frame. Every tenth frame is a one-second stall.
/// Returns how many agent-frames were under the pointer boost.
fn check_speed_every_frame(
    config: FlockConfig,
    frames: usize,
    pointer: Option<(f64, f64)>,
) -> usize {
    let backend = CpuBackend::new(&config);
    let mut scheduler = FrameScheduler::start(config, backend, 800, 600);
    let mut boosted = 0;

    for frame in 0..frames {
        if let Some((x, y)) = pointer {
            scheduler.pointer_moved(x, y, true);
        }
        let before = scheduler.backend().unwrap().store().clone();
        let dt = if frame % 10 == 9 { 1.0 } else { FRAME };
        scheduler.tick_with_delta(dt).unwrap();

        let u = scheduler.sim_uniforms();
        let after = scheduler.backend().unwrap().store();
        for (i, v) in after.velocities().iter().enumerate() {
            let limit =
                flock::update_velocity(i, before.positions(), before.velocities(), u).limit;
            assert!(
                limit == 9.0 || limit == 14.0,
                "frame {} agent {} limit {}",
                frame,
                i,
                limit
            );
            assert!(
                v.length() <= limit * (1.0 + 1e-5),
                "frame {} agent {} speed {} limit {}",
                frame,
                i,
                v.length(),
                limit
            );
            if limit == 14.0 {
                boosted += 1;
            }
        }
    }

    boosted
}

#[test]
fn test_speed_within_limit_every_frame_without_pointer() {
    let config = FlockConfig::from_scenario(Scenario::Swarm)
        .with_agent_count(200)
        .with_seed(11);
    check_speed_every_frame(config, 120, None);
}

#[test]
fn test_speed_within_limit_every_frame_with_pointer() {
    let config = FlockConfig::from_scenario(Scenario::Swarm)
        .with_agent_count(200)
        .with_seed(3);
    let boosted = check_speed_every_frame(config, 120, Some((400.0, 300.0)));
    assert!(boosted > 0, "pointer never reached a bird");
}

#[test]
fn test_phase_stays_wrapped() {
    let config = FlockConfig::from_scenario(Scenario::Swarm)
        .with_agent_count(120)
        .with_seed(5);
    let backend = CpuBackend::new(&config);
    let mut scheduler = FrameScheduler::start(config, backend, 800, 600);
    for _ in 0..60 {
        // large steps push phases across the wrap point quickly
        scheduler.tick_with_delta(0.5).unwrap();
        for &phase in scheduler.backend().unwrap().store().phases() {
            assert!((0.0..PHASE_WRAP).contains(&phase), "phase {}", phase);
        }
    }
}

#[test]
fn test_replay_is_deterministic() {
    let deltas = [0.016, 0.033, 0.5, 5.0, 0.0, 0.016];
    let pointer = [(10.0, 10.0), (400.0, 300.0), (790.0, 20.0)];

    let run = || {
        let config = FlockConfig::from_scenario(Scenario::Swarm)
            .with_agent_count(64)
            .with_seed(99);
        let backend = CpuBackend::new(&config);
        let mut scheduler = FrameScheduler::start(config, backend, 800, 600);
        for (i, &dt) in deltas.iter().enumerate() {
            let (x, y) = pointer[i % pointer.len()];
            scheduler.pointer_moved(x, y, true);
            scheduler.tick_with_delta(dt).unwrap();
        }
        scheduler.dispose().unwrap().store().clone()
    };

    assert_eq!(run(), run());
}

#[test]
fn test_close_pair_separates() {
    // separation=12, alignment=20, cohesion=24: zone radius 56
    let config = FlockConfig::default()
        .with_radii(ZoneRadii::new(12.0, 20.0, 24.0))
        .with_center_pull(0.0)
        .with_agent_count(4);
    let mut u = SimUniforms::from_config(&config);
    u.delta_time = FRAME;

    let positions = vec![
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(5.0, 0.0, 0.0),
        Vec3::new(500.0, 0.0, 0.0),
        Vec3::new(-500.0, 0.0, 0.0),
    ];
    let mut store = AgentStore::from_parts(positions, vec![Vec3::ZERO; 4], vec![0.0; 4]).unwrap();

    flock::velocity_pass(&mut store, &u);

    let v = store.velocities();
    assert!(v[0].x < 0.0, "left bird moves left: {:?}", v[0]);
    assert!(v[1].x > 0.0, "right bird moves right: {:?}", v[1]);
    assert!((v[0].x + v[1].x).abs() < 1e-5);
    assert_eq!(v[2], Vec3::ZERO);
    assert_eq!(v[3], Vec3::ZERO);
}

#[test]
fn test_velocity_pass_reads_start_of_pass_state() {
    let config = FlockConfig::default()
        .with_radii(ZoneRadii::new(12.0, 20.0, 24.0))
        .with_center_pull(0.0)
        .with_agent_count(3);
    let mut u = SimUniforms::from_config(&config);
    u.delta_time = FRAME;

    let positions = vec![Vec3::ZERO, Vec3::new(20.0, 0.0, 0.0), Vec3::new(40.0, 0.0, 0.0)];
    let velocities = vec![Vec3::X, Vec3::Y * 3.0, Vec3::Z * 2.0];

    // every agent computed against the same untouched snapshot
    let expected: Vec<Vec3> = (0..3)
        .map(|i| flock::update_velocity(i, &positions, &velocities, &u).velocity)
        .collect();

    let mut store = AgentStore::from_parts(positions, velocities, vec![0.0; 3]).unwrap();
    flock::velocity_pass(&mut store, &u);
    assert_eq!(store.velocities(), expected.as_slice());
}

#[test]
fn test_nan_velocity_does_not_spread() {
    let config = FlockConfig::default().with_agent_count(2);
    let mut u = SimUniforms::from_config(&config);
    u.delta_time = FRAME;

    let positions = vec![Vec3::ZERO, Vec3::new(f32::NAN, 0.0, 0.0)];
    let velocities = vec![Vec3::X, Vec3::X];
    let out = flock::update_velocity(0, &positions, &velocities, &u);
    assert!(out.velocity.is_finite());
}

#[test]
fn test_draw_covers_every_vertex() {
    let config = FlockConfig::from_scenario(Scenario::Murmuration)
        .with_agent_count(10)
        .with_seed(1);
    let scheduler = run_frames(config, 2);
    let clip = scheduler.backend().unwrap().clip_positions();
    assert_eq!(clip.len(), 90);
    assert!(clip.iter().all(|c| c.is_finite()));
}
