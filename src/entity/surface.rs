use glam::{Mat4, Quat, Vec3};

use super::{Capabilities, Entity, EntityKind, EntityUniforms, QuadUniforms, ShadingMode, vec4};
use crate::config::{AMBIENT, SHADOW_TOLERANCE};
use crate::error::{RenderError, RenderResult};
use crate::geometry::{Geometry, GeometrySource};

/// Tightly packed 8-bit RGBA pixels, row-major from the top-left texel.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRgba8 {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl ImageRgba8 {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> RenderResult<Self> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || pixels.len() != expected {
            return Err(RenderError::InvalidImage {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn aspect(&self) -> f32 {
        self.height as f32 / self.width as f32
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceMaterial {
    Flat(Vec3),
    Image(ImageRgba8),
}

/// World position to shadow-map texture space.
pub fn shadow_coord(depth_bias: Mat4, world: Vec3) -> Vec3 {
    depth_bias.project_point3(world)
}

/// 0.0 when `stored_depth` occludes the fragment at `coord` by more than the
/// tolerance, 1.0 otherwise. Fragments outside the map are never shadowed.
pub fn shadow_visibility(coord: Vec3, stored_depth: f32) -> f32 {
    let on_map = (0.0..=1.0).contains(&coord.x) && (0.0..=1.0).contains(&coord.y);
    if on_map && coord.z - stored_depth > SHADOW_TOLERANCE {
        0.0
    } else {
        1.0
    }
}

/// Flat or image-textured horizontal quad. Casts and receives shadows.
pub struct SurfaceQuad {
    label: String,
    geometry: Geometry,
    material: SurfaceMaterial,
    position: Vec3,
    scale: f32,
    light: Vec3,
    mode: ShadingMode,
}

impl SurfaceQuad {
    pub fn flat(label: impl Into<String>, width: f32, depth: f32, color: Vec3) -> Self {
        Self::with_material(label, Geometry::quad(width, depth), SurfaceMaterial::Flat(color))
    }

    /// Quad `width` wide whose depth follows the image's aspect ratio.
    pub fn image(label: impl Into<String>, image: ImageRgba8, width: f32) -> Self {
        let depth = width * image.aspect();
        Self::with_material(label, Geometry::quad(width, depth), SurfaceMaterial::Image(image))
    }

    fn with_material(label: impl Into<String>, geometry: Geometry, material: SurfaceMaterial) -> Self {
        Self {
            label: label.into(),
            geometry,
            material,
            position: Vec3::ZERO,
            scale: 1.0,
            light: Vec3::Y,
            mode: ShadingMode::default(),
        }
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
    }

    pub fn light(&self) -> Vec3 {
        self.light
    }

    pub fn material(&self) -> &SurfaceMaterial {
        &self.material
    }

    /// Ambient plus shadow-gated Lambert term.
    pub fn lambert(&self, normal: Vec3, albedo: Vec3, visibility: f32) -> Vec3 {
        let l = self.light.normalize_or_zero();
        let diffuse = normal.normalize_or_zero().dot(l).max(0.0);
        (AMBIENT + diffuse * visibility) * albedo
    }
}

impl Entity for SurfaceQuad {
    fn label(&self) -> &str {
        &self.label
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Surface
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::CASTS_SHADOWS | Capabilities::RECEIVES_SHADOWS | Capabilities::LIGHT_DEPENDENT
    }

    fn geometry(&self) -> &dyn GeometrySource {
        &self.geometry
    }

    fn model_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(Vec3::splat(self.scale), Quat::IDENTITY, self.position)
    }

    fn set_light(&mut self, light: Vec3) {
        self.light = light;
    }

    fn mode(&self) -> ShadingMode {
        self.mode
    }

    fn set_mode(&mut self, mode: ShadingMode) {
        self.mode = mode;
    }

    fn uniforms(&self, view_proj: Mat4) -> EntityUniforms {
        let shadow = match self.mode {
            ShadingMode::Shadow => return EntityUniforms::depth(self.model_matrix(), view_proj),
            ShadingMode::Lit(shadow) => shadow,
        };

        let (color, textured) = match &self.material {
            SurfaceMaterial::Flat(color) => (*color, 0.0),
            SurfaceMaterial::Image(_) => (Vec3::ONE, 1.0),
        };

        EntityUniforms::Quad(QuadUniforms {
            model: self.model_matrix().to_cols_array_2d(),
            view_proj: view_proj.to_cols_array_2d(),
            depth_bias: shadow
                .map(|s| s.depth_bias)
                .unwrap_or(Mat4::IDENTITY)
                .to_cols_array_2d(),
            light: vec4(self.light, 0.0),
            color: vec4(color, 1.0),
            params: [AMBIENT, 1.0, if shadow.is_some() { 1.0 } else { 0.0 }, textured],
        })
    }

    fn image(&self) -> Option<&ImageRgba8> {
        match &self.material {
            SurfaceMaterial::Image(image) => Some(image),
            SurfaceMaterial::Flat(_) => None,
        }
    }
}
