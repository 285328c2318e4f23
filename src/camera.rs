use glam::{Mat4, Vec3, Vec4};

use crate::config::RendererConfig;

/// Maps light clip space to shadow-map texture space: x, y from [-1, 1] to [0, 1]
/// with v pointing down. Depth is already in [0, 1].
pub const DEPTH_BIAS: Mat4 = Mat4::from_cols(
    Vec4::new(0.5, 0.0, 0.0, 0.0),
    Vec4::new(0.0, -0.5, 0.0, 0.0),
    Vec4::new(0.0, 0.0, 1.0, 0.0),
    Vec4::new(0.5, 0.5, 0.0, 1.0),
);

// Rays this close to parallel with a plane count as missing it
const PARALLEL_EPSILON: f32 = 1e-6;

/// `look_at_rh` with an up vector that never lines up with the view direction.
fn look_at(eye: Vec3, target: Vec3) -> Mat4 {
    let forward = (target - eye).normalize_or_zero();
    let up = if forward.cross(Vec3::Y).length_squared() < 1e-8 {
        Vec3::NEG_Z
    } else {
        Vec3::Y
    };
    Mat4::look_at_rh(eye, target, up)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewCamera {
    pub position: Vec3,
    pub target: Vec3,
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl ViewCamera {
    pub fn from_config(config: &RendererConfig) -> Self {
        Self {
            position: config.camera_position,
            target: config.camera_target,
            fov_y: config.fov_degrees.to_radians(),
            aspect: config.aspect(),
            near: config.near,
            far: config.far,
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        look_at(self.position, self.target)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// World position of a normalized-device-coordinate point.
    pub fn unproject(&self, ndc: Vec3) -> Vec3 {
        self.view_projection().inverse().project_point3(ndc)
    }

    /// Ray from the eye through pixel `(x, y)` of a `width` x `height` viewport.
    pub fn screen_ray(&self, x: f32, y: f32, width: f32, height: f32) -> Option<Ray> {
        if width <= 0.0 || height <= 0.0 {
            return None;
        }
        let ndc = Vec3::new((x / width) * 2.0 - 1.0, -(y / height) * 2.0 + 1.0, 0.5);
        let point = self.unproject(ndc);
        let direction = (point - self.position).try_normalize()?;
        Some(Ray {
            origin: self.position,
            direction,
        })
    }
}

/// Orthographic camera looking from the light position at its target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightCamera {
    pub position: Vec3,
    pub target: Vec3,
    pub half_extent: f32,
    pub near: f32,
    pub far: f32,
}

impl LightCamera {
    pub fn from_config(config: &RendererConfig) -> Self {
        Self {
            position: config.light,
            target: Vec3::ZERO,
            half_extent: config.light_half_extent,
            near: config.light_near,
            far: config.light_far,
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        look_at(self.position, self.target)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        let r = self.half_extent;
        Mat4::orthographic_rh(-r, r, -r, r, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// World space to shadow-map texture space (`xy` = texel coordinate, `z` = depth).
    pub fn depth_bias_matrix(&self) -> Mat4 {
        DEPTH_BIAS * self.view_projection()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Intersection with the plane through `point` with normal `normal`.
    ///
    /// `None` when the ray runs parallel to the plane or the plane lies behind the origin.
    pub fn intersect_plane(&self, point: Vec3, normal: Vec3) -> Option<Vec3> {
        let denom = self.direction.dot(normal);
        if denom.abs() < PARALLEL_EPSILON {
            return None;
        }
        let t = (point - self.origin).dot(normal) / denom;
        if !t.is_finite() || t < 0.0 {
            return None;
        }
        Some(self.at(t))
    }
}
