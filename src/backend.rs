//! The seam between frame orchestration and the graphics API.
//!
//! The coordinator only talks to a [`ShadingBackend`]: it opens a pass, submits
//! draw calls and closes the pass. Closing a shadow pass must leave the map
//! readable by every draw of the following main pass. The wgpu implementation
//! lives in [`crate::gpu`]; tests drive the coordinator with a recording mock.

use glam::Mat4;

use crate::entity::{EntityId, EntityKind, EntityUniforms, ImageRgba8, ShadingMode};
use crate::error::RenderResult;
use crate::geometry::GeometrySource;

/// Clear colour for the shadow map. A stored depth of 1.0 never occludes.
pub const SHADOW_CLEAR: [f64; 4] = [1.0, 1.0, 1.0, 1.0];
pub const MAIN_CLEAR: [f64; 4] = [0.0, 0.0, 0.0, 0.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassKind {
    Shadow,
    Main,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassDescriptor {
    pub kind: PassKind,
    pub frame: u64,
    pub clear: [f64; 4],
    /// View-projection of the camera this pass renders from.
    pub view_proj: Mat4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetFormat {
    Rgba32Float,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetFilter {
    Nearest,
}

/// Description of the off-screen shadow target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTarget {
    pub width: u32,
    pub height: u32,
    pub format: TargetFormat,
    pub filter: TargetFilter,
    pub mip_levels: u32,
}

impl RenderTarget {
    /// Square float target, sampled without filtering or mipmaps.
    pub fn shadow_map(size: u32) -> Self {
        Self {
            width: size,
            height: size,
            format: TargetFormat::Rgba32Float,
            filter: TargetFilter::Nearest,
            mip_levels: 1,
        }
    }
}

/// One entity drawn in one pass.
pub struct DrawCall<'a> {
    pub entity: EntityId,
    pub kind: EntityKind,
    pub mode: ShadingMode,
    pub geometry: &'a dyn GeometrySource,
    pub uniforms: EntityUniforms,
    pub image: Option<&'a ImageRgba8>,
}

pub trait ShadingBackend {
    fn shadow_target(&self) -> RenderTarget;

    fn begin_pass(&mut self, pass: &PassDescriptor) -> RenderResult<()>;

    fn draw(&mut self, call: DrawCall<'_>) -> RenderResult<()>;

    /// Completes the open pass. After a shadow pass returns, its output is
    /// visible to every later read.
    fn end_pass(&mut self) -> RenderResult<()>;

    /// Viewport size changed. Backends without a surface ignore it.
    fn resize(&mut self, _width: u32, _height: u32) {}
}
