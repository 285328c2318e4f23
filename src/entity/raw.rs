use glam::{Mat4, Vec3};

use super::{Capabilities, Entity, EntityKind, EntityUniforms, QuadUniforms, ShadingMode, vec4};
use crate::geometry::{Geometry, GeometrySource};

/// Unlit geometry that bypasses shadow coordination.
///
/// Drawn in the main pass with its colour as-is and never asked for depth.
pub struct RawMesh {
    label: String,
    geometry: Geometry,
    color: Vec3,
    transform: Mat4,
    mode: ShadingMode,
}

impl RawMesh {
    pub fn new(label: impl Into<String>, geometry: Geometry, color: Vec3) -> Self {
        Self {
            label: label.into(),
            geometry,
            color,
            transform: Mat4::IDENTITY,
            mode: ShadingMode::default(),
        }
    }

    pub fn set_transform(&mut self, transform: Mat4) {
        self.transform = transform;
    }

    pub fn color(&self) -> Vec3 {
        self.color
    }
}

impl Entity for RawMesh {
    fn label(&self) -> &str {
        &self.label
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Raw
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::empty()
    }

    fn geometry(&self) -> &dyn GeometrySource {
        &self.geometry
    }

    fn model_matrix(&self) -> Mat4 {
        self.transform
    }

    fn set_light(&mut self, _light: Vec3) {}

    fn mode(&self) -> ShadingMode {
        self.mode
    }

    fn set_mode(&mut self, mode: ShadingMode) {
        self.mode = mode;
    }

    fn uniforms(&self, view_proj: Mat4) -> EntityUniforms {
        EntityUniforms::Quad(QuadUniforms {
            model: self.model_matrix().to_cols_array_2d(),
            view_proj: view_proj.to_cols_array_2d(),
            depth_bias: Mat4::IDENTITY.to_cols_array_2d(),
            light: [0.0, 1.0, 0.0, 0.0],
            color: vec4(self.color, 1.0),
            params: [1.0, 0.0, 0.0, 0.0],
        })
    }
}
