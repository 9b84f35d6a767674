//! Fly camera.

use glam::{Mat4, Vec3};

/// Position, Euler rotation in degrees and scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Rotation about X, then Y, then Z.
    pub fn rotation_matrix(&self) -> Mat4 {
        Mat4::from_rotation_x(self.rotation.x.to_radians())
            * Mat4::from_rotation_y(self.rotation.y.to_radians())
            * Mat4::from_rotation_z(self.rotation.z.to_radians())
    }

    /// Translation, rotation, then scale.
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.position) * self.rotation_matrix() * Mat4::from_scale(self.scale)
    }

    /// Local forward axis.
    pub fn forward(&self) -> Vec3 {
        self.rotation_matrix().row(2).truncate()
    }

    /// Local right axis.
    pub fn right(&self) -> Vec3 {
        self.rotation_matrix().row(0).truncate()
    }

    /// Move along the local forward (z) and right (x) axes, and along world
    /// y.
    pub fn local_translate(&mut self, translation: Vec3) {
        self.position += translation.z * self.forward();
        self.position += translation.x * self.right();
        self.position.y += translation.y;
    }
}

/// Camera with a perspective projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct View {
    pub transform: Transform,
    /// Vertical field of view in degrees.
    pub vertical_fov: f32,
    pub z_near: f32,
    pub z_far: f32,
    /// Largest pitch in degrees either way.
    pub max_pitch: f32,
}

impl Default for View {
    fn default() -> Self {
        Self {
            transform: Transform {
                position: Vec3::new(0.0, 0.0, -1.0),
                ..Transform::default()
            },
            vertical_fov: 90.0,
            z_near: 0.1,
            z_far: 1000.0,
            max_pitch: 89.0,
        }
    }
}

impl View {
    /// Pitch and yaw by `(dx, dy)` degrees, clamping the pitch.
    pub fn rotate(&mut self, pitch: f32, yaw: f32) {
        let rotation = &mut self.transform.rotation;
        rotation.x = (rotation.x + pitch).clamp(-self.max_pitch, self.max_pitch);
        rotation.y += yaw;
    }

    pub fn view_matrix(&self) -> Mat4 {
        let eye = self.transform.position;
        Mat4::look_at_rh(eye, eye + self.transform.forward(), Vec3::NEG_Y)
    }

    /// Perspective projection with Y flipped for Vulkan clip space.
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        let mut projection =
            Mat4::perspective_rh(self.vertical_fov.to_radians(), aspect, self.z_near, self.z_far);
        projection.y_axis.y *= -1.0;
        projection
    }

    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }
}
