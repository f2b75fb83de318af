//! Perspective camera and pointer ray casting.

use glam::{Mat4, Vec2, Vec3};

/// Fixed perspective camera looking down -Z at the flock.
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    /// Vertical field of view in degrees.
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    projection: Mat4,
}

impl Camera {
    pub fn new(aspect: f32) -> Self {
        let mut camera = Self {
            position: Vec3::new(0.0, 0.0, 1000.0),
            fov_y: 50.0,
            aspect,
            near: 1.0,
            far: 5000.0,
            projection: Mat4::IDENTITY,
        };
        camera.update_projection();
        camera
    }

    /// Recompute the projection after changing `aspect` or the frustum.
    pub fn update_projection(&mut self) {
        self.projection =
            Mat4::perspective_rh(self.fov_y.to_radians(), self.aspect, self.near, self.far);
    }

    /// Set the aspect from a viewport size. Zero-sized viewports are ignored.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.aspect = width as f32 / height as f32;
        self.update_projection();
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + Vec3::NEG_Z, Vec3::Y)
    }

    #[inline]
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view_matrix()
    }

    /// World-space ray from the camera through a point in normalized device
    /// coordinates. Returns `(origin, unit direction)`.
    pub fn ray_from_ndc(&self, ndc: Vec2) -> (Vec3, Vec3) {
        let inverse = self.view_projection().inverse();
        let target = inverse.project_point3(Vec3::new(ndc.x, ndc.y, 0.5));
        let direction = (target - self.position).normalize_or_zero();
        let direction = if direction == Vec3::ZERO { Vec3::NEG_Z } else { direction };
        (self.position, direction)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(16.0 / 9.0)
    }
}
