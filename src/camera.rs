use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Perspective camera the effect can orient itself towards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub fov: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            target: Vec3::ZERO,
            fov: 75.0,
        }
    }
}

impl Camera {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// The camera is never parented, so its world position is its position.
    pub fn world_position(&self) -> Vec3 {
        self.position
    }

    pub fn view_proj(&self, aspect: f32) -> Mat4 {
        let view = Mat4::look_at_rh(self.position, self.target, Vec3::Y);
        let projection = Mat4::perspective_rh_gl(self.fov.to_radians(), aspect.max(0.01), 0.1, 100.0);
        projection * view
    }
}
