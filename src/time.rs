//! Frame clock.
//!
//! Wall-clock delta between ticks, capped so a stalled or backgrounded
//! window does not hand the passes one enormous step.
//!
//! ```ignore
//! let mut time = Time::new();
//!
//! // In the frame loop:
//! let (elapsed, delta) = time.update();
//! ```

use std::time::{Duration, Instant};

use crate::config::MAX_DELTA_TIME;

/// Time tracking for the frame loop.
#[derive(Debug)]
pub struct Time {
    /// When the timer was created.
    start: Instant,
    /// When the last frame occurred.
    last_frame: Instant,
    /// Total elapsed time in seconds.
    elapsed_secs: f32,
    /// Delta handed to the passes, after the cap.
    delta_secs: f32,
    /// Delta as measured, before the cap.
    raw_delta_secs: f32,
    /// Total frames since start.
    frame_count: u64,
    /// Calculated FPS (updated periodically).
    fps: f32,
    fps_frame_count: u64,
    fps_update_time: Instant,
    fps_update_interval: Duration,
    /// Fixed delta for deterministic replay.
    fixed_delta: Option<f32>,
}

impl Time {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_frame: now,
            elapsed_secs: 0.0,
            delta_secs: 0.0,
            raw_delta_secs: 0.0,
            frame_count: 0,
            fps: 0.0,
            fps_frame_count: 0,
            fps_update_time: now,
            fps_update_interval: Duration::from_millis(500),
            fixed_delta: None,
        }
    }

    /// Measure the time since the last call. Call once per frame.
    ///
    /// Returns `(elapsed_time, delta_time)` with the delta already capped.
    pub fn update(&mut self) -> (f32, f32) {
        let now = Instant::now();
        let raw = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        // Update FPS periodically
        let fps_elapsed = now.duration_since(self.fps_update_time);
        if fps_elapsed >= self.fps_update_interval {
            let frames_since = self.frame_count + 1 - self.fps_frame_count;
            self.fps = frames_since as f32 / fps_elapsed.as_secs_f32();
            self.fps_frame_count = self.frame_count + 1;
            self.fps_update_time = now;
        }

        self.advance(self.fixed_delta.unwrap_or(raw))
    }

    /// Advance by an explicit raw delta instead of reading the clock.
    pub fn advance(&mut self, raw_delta: f32) -> (f32, f32) {
        self.raw_delta_secs = raw_delta;
        self.delta_secs = clamp_delta(raw_delta, MAX_DELTA_TIME);
        self.elapsed_secs += self.delta_secs;
        self.frame_count += 1;
        (self.elapsed_secs, self.delta_secs)
    }

    /// Total simulated time in seconds. Sum of the capped deltas.
    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.elapsed_secs
    }

    /// Capped delta of the last frame.
    #[inline]
    pub fn delta(&self) -> f32 {
        self.delta_secs
    }

    /// Delta of the last frame before the cap.
    #[inline]
    pub fn raw_delta(&self) -> f32 {
        self.raw_delta_secs
    }

    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// Wall-clock time since the clock was created.
    pub fn wall_elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Use a fixed delta instead of the wall clock. `None` restores real
    /// frame timing.
    pub fn set_fixed_delta(&mut self, delta: Option<f32>) {
        self.fixed_delta = delta;
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}

/// Non-finite and negative deltas become zero; large ones are capped.
#[inline]
pub fn clamp_delta(raw: f32, max: f32) -> f32 {
    if !raw.is_finite() || raw < 0.0 {
        0.0
    } else {
        raw.min(max)
    }
}
