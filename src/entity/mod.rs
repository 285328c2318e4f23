//! Renderable entities and the typed uniform blocks they hand to the backend.
//!
//! Every entity has exactly one active [`ShadingMode`]. Entities never pick it
//! themselves: the shadow coordinator flips every managed entity to
//! [`ShadingMode::Shadow`] before the depth pass and back to
//! [`ShadingMode::Lit`] before the main pass.

mod fog_layer;
mod fog_volume;
mod raw;
mod surface;

pub use fog_layer::FogLayer;
pub use fog_volume::{FogVolume, reveal_fade};
pub use raw::RawMesh;
pub use surface::{ImageRgba8, SurfaceMaterial, SurfaceQuad, shadow_coord, shadow_visibility};

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::geometry::GeometrySource;

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Capabilities: u8 {
        const CASTS_SHADOWS = 1 << 0;
        const RECEIVES_SHADOWS = 1 << 1;
        const LIGHT_DEPENDENT = 1 << 2;
        const ANIMATED = 1 << 3;
        const TRANSPARENT = 1 << 4;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub(crate) u32);

impl EntityId {
    pub fn index(&self) -> u32 {
        self.0
    }
}

/// Names the shadow map contents written by one frame's shadow pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ShadowMapHandle {
    pub frame: u64,
}

/// What a receiving entity needs to sample the shadow map.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadowInput {
    pub depth_bias: Mat4,
    pub shadow_map: ShadowMapHandle,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ShadingMode {
    /// Depth-only output for the light's view.
    Shadow,
    /// Regular shading; receivers get the current shadow map.
    Lit(Option<ShadowInput>),
}

impl Default for ShadingMode {
    fn default() -> Self {
        ShadingMode::Lit(None)
    }
}

impl ShadingMode {
    pub fn is_shadow(&self) -> bool {
        matches!(self, ShadingMode::Shadow)
    }

    pub fn shadow_input(&self) -> Option<&ShadowInput> {
        match self {
            ShadingMode::Lit(input) => input.as_ref(),
            ShadingMode::Shadow => None,
        }
    }
}

/// Selects the shader program family on the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Surface,
    FogVolume,
    FogLayer,
    Raw,
}

// === UNIFORM BLOCKS ===
// All members are vec4 or mat4 so the Rust and WGSL layouts agree without padding.

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable, PartialEq)]
pub struct DepthUniforms {
    pub model: [[f32; 4]; 4],
    pub view_proj: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable, PartialEq)]
pub struct QuadUniforms {
    pub model: [[f32; 4]; 4],
    pub view_proj: [[f32; 4]; 4],
    pub depth_bias: [[f32; 4]; 4],
    pub light: [f32; 4],
    pub color: [f32; 4],
    /// ambient, diffuse scale, shadows enabled, textured
    pub params: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable, PartialEq)]
pub struct FogUniforms {
    pub model: [[f32; 4]; 4],
    pub view_proj: [[f32; 4]; 4],
    pub light: [f32; 4],
    /// xyz camera position, w time
    pub camera_time: [f32; 4],
    /// xyz reveal point, w reveal radius
    pub reveal: [f32; 4],
    /// xyz bounds min, w step size
    pub bounds_min: [f32; 4],
    /// xyz bounds max, w step count
    pub bounds_max: [f32; 4],
    /// extinction scale, noise scale, alpha cutoff, early exit
    pub march: [f32; 4],
    pub drift: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable, PartialEq)]
pub struct FogLayerUniforms {
    pub model: [[f32; 4]; 4],
    pub view_proj: [[f32; 4]; 4],
    pub light: [f32; 4],
    /// xyz reveal point, w reveal radius
    pub reveal: [f32; 4],
    /// time, normal epsilon, unused, unused
    pub params: [f32; 4],
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum EntityUniforms {
    Depth(DepthUniforms),
    Quad(QuadUniforms),
    Fog(FogUniforms),
    FogLayer(FogLayerUniforms),
}

impl EntityUniforms {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            EntityUniforms::Depth(u) => bytemuck::bytes_of(u),
            EntityUniforms::Quad(u) => bytemuck::bytes_of(u),
            EntityUniforms::Fog(u) => bytemuck::bytes_of(u),
            EntityUniforms::FogLayer(u) => bytemuck::bytes_of(u),
        }
    }

    pub(crate) fn depth(model: Mat4, view_proj: Mat4) -> Self {
        EntityUniforms::Depth(DepthUniforms {
            model: model.to_cols_array_2d(),
            view_proj: view_proj.to_cols_array_2d(),
        })
    }
}

/// A drawable with its per-frame shading state.
///
/// Setters for state an entity doesn't consume default to no-ops. The scene
/// sends light updates only to `LIGHT_DEPENDENT` entities and time only to
/// `ANIMATED` ones; camera and reveal updates reach everything it owns.
pub trait Entity {
    fn label(&self) -> &str;
    fn kind(&self) -> EntityKind;
    fn capabilities(&self) -> Capabilities;
    fn geometry(&self) -> &dyn GeometrySource;

    fn model_matrix(&self) -> Mat4 {
        Mat4::IDENTITY
    }

    fn set_light(&mut self, light: Vec3);

    fn set_time(&mut self, _time: f32) {}

    fn set_camera_position(&mut self, _position: Vec3) {}

    fn set_reveal_point(&mut self, _point: Vec3) {}

    fn mode(&self) -> ShadingMode;

    fn set_mode(&mut self, mode: ShadingMode);

    /// Uniform block for the active mode, given the pass camera's view-projection.
    fn uniforms(&self, view_proj: Mat4) -> EntityUniforms;

    fn image(&self) -> Option<&ImageRgba8> {
        None
    }
}

/// An entity registered with a scene.
pub struct EntitySlot {
    pub id: EntityId,
    /// Managed entities take part in shadow/lit mode switching; raw ones are drawn as-is.
    pub managed: bool,
    pub entity: Box<dyn Entity>,
}

impl EntitySlot {
    pub fn casts_shadows(&self) -> bool {
        self.managed && self.entity.capabilities().contains(Capabilities::CASTS_SHADOWS)
    }

    pub fn receives_shadows(&self) -> bool {
        self.managed && self.entity.capabilities().contains(Capabilities::RECEIVES_SHADOWS)
    }

    pub fn is_light_dependent(&self) -> bool {
        self.entity.capabilities().contains(Capabilities::LIGHT_DEPENDENT)
    }

    pub fn is_animated(&self) -> bool {
        self.entity.capabilities().contains(Capabilities::ANIMATED)
    }

    pub fn is_transparent(&self) -> bool {
        self.entity.capabilities().contains(Capabilities::TRANSPARENT)
    }
}

pub(crate) fn vec4(v: Vec3, w: f32) -> [f32; 4] {
    [v.x, v.y, v.z, w]
}
