//! Volumetric fog and shadow-mapped surfaces on wgpu.
//!
//! The CPU side mirrors the shader math ([`noise`], [`volume`], [`raymarch`])
//! so fog shading can be checked without a GPU. [`scene::Scene`] owns the
//! entities and drives each frame through a [`coordinator::ShadowCoordinator`]
//! against any [`backend::ShadingBackend`]; [`gpu::GpuBackend`] is the wgpu one.

pub mod app;
pub mod backend;
pub mod camera;
pub mod config;
pub mod coordinator;
pub mod entity;
pub mod error;
pub mod geometry;
pub mod gpu;
pub mod noise;
pub mod raymarch;
pub mod scene;
pub mod shaders;
pub mod volume;

pub use backend::{DrawCall, PassDescriptor, PassKind, RenderTarget, ShadingBackend};
pub use camera::{LightCamera, Ray, ViewCamera};
pub use config::{FogSettings, RendererConfig};
pub use coordinator::{FramePhase, ShadowCoordinator};
pub use entity::{
    Capabilities, Entity, EntityId, EntityKind, FogLayer, FogVolume, ImageRgba8, RawMesh, ShadingMode,
    SurfaceQuad,
};
pub use error::{RenderError, RenderResult};
pub use geometry::{Geometry, GeometrySource, Vertex};
pub use noise::{NoiseSource, SimplexNoise};
pub use raymarch::Raymarcher;
pub use scene::Scene;
pub use volume::VolumeBounds;

use log::error;
use winit::event_loop::{ControlFlow, EventLoop};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

// ======================================
// === MAIN ENTRY POINT ===
// ======================================

#[cfg_attr(target_arch = "wasm32", wasm_bindgen(start))]
pub fn run() {
    cfg_if::cfg_if! {
        if #[cfg(target_arch = "wasm32")] {
            std::panic::set_hook(Box::new(console_error_panic_hook::hook));
            if console_log::init_with_level(log::Level::Info).is_err() {
                web_sys::console::log_1(&"Logger already initialised".into());
            }
        } else {
            env_logger::init();
        }
    }
    log::info!("Started wfog v{}", env!("CARGO_PKG_VERSION"));

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            error!("Failed to create event loop: {e}");
            return;
        }
    };
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = app::FogApp::new(RendererConfig::default());
    if let Err(e) = event_loop.run_app(&mut app) {
        error!("Event loop terminated: {e}");
    }
}
