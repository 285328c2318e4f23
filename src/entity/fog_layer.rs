use glam::{Mat4, Vec2, Vec3, Vec4};

use super::fog_volume::reveal_fade;
use super::{Capabilities, Entity, EntityKind, EntityUniforms, FogLayerUniforms, ShadingMode, vec4};
use crate::config::REVEAL_RADIUS;
use crate::geometry::{Geometry, GeometrySource};
use crate::noise::NoiseSource;

const UV_SCALE: f32 = 10.0;
const UV_DRIFT: f32 = 0.02;
const NOISE_FREQUENCY: f32 = 8.0;
const HEIGHT_EXPONENT: f32 = 0.01;
const BRIGHTNESS_EXPONENT: f32 = 0.5;
const BRIGHTNESS: f32 = 1.5;
pub const NORMAL_EPSILON: f32 = 0.01;

/// Flat sheet of fog at a fixed height, lit through a noise height field.
///
/// All positions taken by the shading helpers are in the layer's local frame,
/// so the reveal point is compared in the plane of the sheet.
pub struct FogLayer {
    label: String,
    geometry: Geometry,
    y_offset: f32,
    light: Vec3,
    time: f32,
    reveal_point: Vec3,
    reveal_radius: f32,
    mode: ShadingMode,
}

impl FogLayer {
    pub fn new(label: impl Into<String>, width: f32, depth: f32, y_offset: f32) -> Self {
        Self {
            label: label.into(),
            geometry: Geometry::quad(width, depth),
            y_offset,
            light: Vec3::new(1.0, 1.0, 0.0),
            time: 0.0,
            reveal_point: Vec3::ZERO,
            reveal_radius: REVEAL_RADIUS,
            mode: ShadingMode::default(),
        }
    }

    pub fn y_offset(&self) -> f32 {
        self.y_offset
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn set_reveal_radius(&mut self, radius: f32) {
        self.reveal_radius = radius;
    }

    /// Noise in [0, 1] at a local position; only `x` and `z` matter.
    pub fn noise_at<N: NoiseSource + ?Sized>(&self, local: Vec3, noise: &N) -> f32 {
        let uv = Vec2::new(local.x, local.z) / UV_SCALE + 0.5 + UV_DRIFT * self.time;
        let st = uv * NOISE_FREQUENCY;
        noise
            .fractal01(Vec3::new(st.x, st.y, self.time))
            .clamp(0.0, 1.0)
    }

    pub fn height_at<N: NoiseSource + ?Sized>(&self, local: Vec3, noise: &N) -> f32 {
        self.noise_at(local, noise).powf(HEIGHT_EXPONENT)
    }

    /// Upward normal of the height field, by forward differences.
    pub fn normal_at<N: NoiseSource + ?Sized>(&self, local: Vec3, noise: &N) -> Vec3 {
        let h = self.height_at(local, noise);
        let hx = self.height_at(local + Vec3::X * NORMAL_EPSILON, noise);
        let hz = self.height_at(local + Vec3::Z * NORMAL_EPSILON, noise);
        let tangent_x = Vec3::new(NORMAL_EPSILON, hx - h, 0.0);
        let tangent_z = Vec3::new(0.0, hz - h, NORMAL_EPSILON);
        tangent_z.cross(tangent_x).normalize_or(Vec3::Y)
    }

    pub fn shade<N: NoiseSource + ?Sized>(&self, local: Vec3, noise: &N) -> Vec4 {
        let n = self.noise_at(local, noise);
        let normal = self.normal_at(local, noise);
        let lambert = self.light.normalize_or_zero().dot(normal).max(0.0);
        let color = Vec3::ONE * lambert * n.powf(BRIGHTNESS_EXPONENT) * BRIGHTNESS;
        let alpha = reveal_fade(local, self.reveal_point, self.reveal_radius);
        color.extend(alpha)
    }
}

impl Entity for FogLayer {
    fn label(&self) -> &str {
        &self.label
    }

    fn kind(&self) -> EntityKind {
        EntityKind::FogLayer
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::LIGHT_DEPENDENT | Capabilities::ANIMATED | Capabilities::TRANSPARENT
    }

    fn geometry(&self) -> &dyn GeometrySource {
        &self.geometry
    }

    fn model_matrix(&self) -> Mat4 {
        Mat4::from_translation(Vec3::Y * self.y_offset)
    }

    fn set_light(&mut self, light: Vec3) {
        self.light = light;
    }

    fn set_time(&mut self, time: f32) {
        self.time = time;
    }

    fn set_reveal_point(&mut self, point: Vec3) {
        self.reveal_point = point;
    }

    fn mode(&self) -> ShadingMode {
        self.mode
    }

    fn set_mode(&mut self, mode: ShadingMode) {
        self.mode = mode;
    }

    fn uniforms(&self, view_proj: Mat4) -> EntityUniforms {
        if self.mode.is_shadow() {
            return EntityUniforms::depth(self.model_matrix(), view_proj);
        }
        EntityUniforms::FogLayer(FogLayerUniforms {
            model: self.model_matrix().to_cols_array_2d(),
            view_proj: view_proj.to_cols_array_2d(),
            light: vec4(self.light, 0.0),
            reveal: vec4(self.reveal_point, self.reveal_radius),
            params: [self.time, NORMAL_EPSILON, 0.0, 0.0],
        })
    }
}
