//! Pointer and viewport tracking.
//!
//! Window events only stage state here. The frame scheduler reads it once
//! per frame, so input never interrupts a frame in flight.
//!
//! Only the primary pointer steers the flock: the mouse cursor, or the first
//! finger to touch down while no finger held the pointer.

use glam::Vec2;
use winit::event::{TouchPhase, WindowEvent};

use crate::config::POINTER_SENTINEL;

/// Latest pointer position and viewport size.
#[derive(Debug, Clone, PartialEq)]
pub struct PointerInput {
    pointer_ndc: Vec2,
    viewport: (u32, u32),
    primary_touch: Option<u64>,
    pending_resize: Option<(u32, u32)>,
}

impl PointerInput {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pointer_ndc: Vec2::from_array(POINTER_SENTINEL),
            viewport: (width, height),
            primary_touch: None,
            pending_resize: None,
        }
    }

    /// Pointer in normalized device coordinates (-1 to 1, Y up).
    #[inline]
    pub fn pointer_ndc(&self) -> Vec2 {
        self.pointer_ndc
    }

    #[inline]
    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    /// Pointer moved to a pixel position. Non-primary pointers are ignored.
    pub fn pointer_moved(&mut self, x: f64, y: f64, is_primary: bool) {
        if !is_primary {
            return;
        }
        let (w, h) = self.viewport;
        if w == 0 || h == 0 {
            return;
        }
        self.pointer_ndc = Vec2::new(
            (x as f32 / w as f32) * 2.0 - 1.0,
            1.0 - (y as f32 / h as f32) * 2.0,
        );
    }

    /// Park the pointer off screen.
    pub fn reset_pointer(&mut self) {
        self.pointer_ndc = Vec2::from_array(POINTER_SENTINEL);
    }

    /// Touch contact update. The first finger down becomes primary until it
    /// lifts.
    pub fn touch(&mut self, id: u64, phase: TouchPhase, x: f64, y: f64) {
        match phase {
            TouchPhase::Started => {
                if self.primary_touch.is_none() {
                    self.primary_touch = Some(id);
                }
                let primary = self.primary_touch == Some(id);
                self.pointer_moved(x, y, primary);
            }
            TouchPhase::Moved => {
                let primary = self.primary_touch == Some(id);
                self.pointer_moved(x, y, primary);
            }
            TouchPhase::Ended | TouchPhase::Cancelled => {
                if self.primary_touch == Some(id) {
                    self.primary_touch = None;
                }
            }
        }
    }

    /// Record a new viewport size. Applied by the scheduler on its next tick.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.viewport = (width, height);
        self.pending_resize = Some((width, height));
    }

    /// Take the staged resize, if one arrived since the last call.
    pub fn take_resize(&mut self) -> Option<(u32, u32)> {
        self.pending_resize.take()
    }

    /// Feed a winit window event. Returns `true` if the event was consumed.
    pub fn handle_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.pointer_moved(position.x, position.y, true);
                true
            }
            WindowEvent::CursorLeft { .. } => {
                self.reset_pointer();
                true
            }
            WindowEvent::Touch(touch) => {
                self.touch(touch.id, touch.phase, touch.location.x, touch.location.y);
                true
            }
            WindowEvent::Resized(size) => {
                self.resize(size.width, size.height);
                true
            }
            _ => false,
        }
    }
}
