use glam::{Mat4, Vec3, Vec4};

use super::{Capabilities, Entity, EntityKind, EntityUniforms, FogUniforms, ShadingMode, vec4};
use crate::config::{FogSettings, REVEAL_RADIUS};
use crate::geometry::{Geometry, GeometrySource};
use crate::noise::NoiseSource;
use crate::raymarch::Raymarcher;
use crate::volume::{VolumeBounds, smoothstep};

/// Opacity multiplier that clears fog within `radius` of the reveal point.
pub fn reveal_fade(position: Vec3, reveal_point: Vec3, radius: f32) -> f32 {
    if radius <= 0.0 {
        return 1.0;
    }
    let d = position.distance(reveal_point);
    if d < radius {
        smoothstep(0.8 * radius, radius, d)
    } else {
        1.0
    }
}

/// Raymarched box of animated fog.
///
/// Consumes light, time, camera position and reveal point. It is drawn after
/// the opaque entities and takes no part in the shadow pass.
pub struct FogVolume {
    label: String,
    geometry: Geometry,
    bounds: VolumeBounds,
    marcher: Raymarcher,
    light: Vec3,
    time: f32,
    camera_position: Vec3,
    reveal_point: Vec3,
    reveal_radius: f32,
    mode: ShadingMode,
}

impl FogVolume {
    pub fn new(label: impl Into<String>, bounds: VolumeBounds) -> Self {
        Self {
            label: label.into(),
            geometry: Geometry::cuboid(bounds.min, bounds.max),
            bounds,
            marcher: Raymarcher::default(),
            light: Vec3::Y,
            time: 0.0,
            camera_position: Vec3::ZERO,
            reveal_point: Vec3::ZERO,
            reveal_radius: REVEAL_RADIUS,
            mode: ShadingMode::default(),
        }
    }

    /// Centered on the y axis: `width` along x, `depth` along z, `thickness` up from `y_offset`.
    pub fn from_dimensions(
        label: impl Into<String>,
        width: f32,
        depth: f32,
        thickness: f32,
        y_offset: f32,
    ) -> Self {
        let (hw, hd) = (0.5 * width, 0.5 * depth);
        Self::new(
            label,
            VolumeBounds::from_intervals((-hw, hw), (y_offset, y_offset + thickness), (-hd, hd)),
        )
    }

    pub fn with_settings(mut self, settings: FogSettings) -> Self {
        self.marcher = Raymarcher::new(settings);
        self
    }

    pub fn set_reveal_radius(&mut self, radius: f32) {
        self.reveal_radius = radius;
    }

    pub fn bounds(&self) -> &VolumeBounds {
        &self.bounds
    }

    pub fn settings(&self) -> &FogSettings {
        &self.marcher.settings
    }

    pub fn light(&self) -> Vec3 {
        self.light
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn camera_position(&self) -> Vec3 {
        self.camera_position
    }

    pub fn reveal_point(&self) -> Vec3 {
        self.reveal_point
    }

    /// Fragment colour for a point on the volume's far surface, premultiplied.
    pub fn shade<N: NoiseSource + ?Sized>(&self, fragment: Vec3, noise: &N) -> Vec4 {
        let color = self
            .marcher
            .march(self.camera_position, fragment, &self.bounds, self.time, noise);
        color * reveal_fade(fragment, self.reveal_point, self.reveal_radius)
    }
}

impl Entity for FogVolume {
    fn label(&self) -> &str {
        &self.label
    }

    fn kind(&self) -> EntityKind {
        EntityKind::FogVolume
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::LIGHT_DEPENDENT | Capabilities::ANIMATED | Capabilities::TRANSPARENT
    }

    fn geometry(&self) -> &dyn GeometrySource {
        &self.geometry
    }

    fn set_light(&mut self, light: Vec3) {
        self.light = light;
    }

    fn set_time(&mut self, time: f32) {
        self.time = time;
    }

    fn set_camera_position(&mut self, position: Vec3) {
        self.camera_position = position;
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

        let s = &self.marcher.settings;
        EntityUniforms::Fog(FogUniforms {
            model: self.model_matrix().to_cols_array_2d(),
            view_proj: view_proj.to_cols_array_2d(),
            light: vec4(self.light, 0.0),
            camera_time: vec4(self.camera_position, self.time),
            reveal: vec4(self.reveal_point, self.reveal_radius),
            bounds_min: vec4(self.bounds.min, s.step_size),
            bounds_max: vec4(self.bounds.max, s.step_count as f32),
            march: [
                s.extinction_scale,
                s.noise_scale,
                s.alpha_cutoff,
                if s.early_exit { 1.0 } else { 0.0 },
            ],
            drift: vec4(s.drift, 0.0),
        })
    }
}
