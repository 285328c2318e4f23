//! Two-pass frame orchestration: light-view depth first, then the lit scene.
//!
//! A frame walks `Idle -> ShadowPass -> ShadowReady -> MainPass -> Idle`.
//! Every managed entity is put into the mode of the pass that is about to run,
//! and the main pass is refused until the same frame's shadow pass has ended.

use glam::Mat4;
use log::debug;

use crate::backend::{DrawCall, MAIN_CLEAR, PassDescriptor, PassKind, SHADOW_CLEAR, ShadingBackend};
use crate::camera::LightCamera;
use crate::entity::{EntitySlot, ShadingMode, ShadowInput, ShadowMapHandle};
use crate::error::{RenderError, RenderResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePhase {
    Idle,
    ShadowPass,
    ShadowReady,
    MainPass,
}

#[derive(Debug)]
pub struct ShadowCoordinator {
    phase: FramePhase,
    frame: u64,
    depth_bias: Mat4,
}

impl Default for ShadowCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ShadowCoordinator {
    pub fn new() -> Self {
        Self {
            phase: FramePhase::Idle,
            frame: 0,
            depth_bias: Mat4::IDENTITY,
        }
    }

    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    /// Number of the frame currently in flight, or of the last one finished.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// World to shadow-map texture space, as computed by the last shadow pass.
    pub fn depth_bias(&self) -> Mat4 {
        self.depth_bias
    }

    /// The map receivers may read, once this frame's shadow pass has ended.
    pub fn shadow_map(&self) -> Option<ShadowMapHandle> {
        match self.phase {
            FramePhase::ShadowReady | FramePhase::MainPass => Some(ShadowMapHandle { frame: self.frame }),
            FramePhase::Idle | FramePhase::ShadowPass => None,
        }
    }

    /// Abandons a half-finished frame.
    pub fn reset(&mut self) {
        self.phase = FramePhase::Idle;
    }

    pub fn render_shadow_pass<B: ShadingBackend + ?Sized>(
        &mut self,
        slots: &mut [EntitySlot],
        light: &LightCamera,
        backend: &mut B,
    ) -> RenderResult<()> {
        self.expect(FramePhase::Idle)?;
        self.frame += 1;
        self.phase = FramePhase::ShadowPass;

        let result = self.shadow_pass(slots, light, backend);
        self.phase = match result {
            Ok(()) => FramePhase::ShadowReady,
            Err(_) => FramePhase::Idle,
        };
        result
    }

    pub fn render_main_pass<B: ShadingBackend + ?Sized>(
        &mut self,
        slots: &mut [EntitySlot],
        view_proj: Mat4,
        backend: &mut B,
    ) -> RenderResult<()> {
        self.expect(FramePhase::ShadowReady)?;
        self.phase = FramePhase::MainPass;

        let result = self.main_pass(slots, view_proj, backend);
        self.phase = FramePhase::Idle;
        result
    }

    fn expect(&self, expected: FramePhase) -> RenderResult<()> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(RenderError::PassOrder {
                expected,
                found: self.phase,
            })
        }
    }

    fn shadow_pass<B: ShadingBackend + ?Sized>(
        &mut self,
        slots: &mut [EntitySlot],
        light: &LightCamera,
        backend: &mut B,
    ) -> RenderResult<()> {
        for slot in slots.iter_mut().filter(|s| s.managed) {
            slot.entity.set_mode(ShadingMode::Shadow);
        }

        let view_proj = light.view_projection();
        backend.begin_pass(&PassDescriptor {
            kind: PassKind::Shadow,
            frame: self.frame,
            clear: SHADOW_CLEAR,
            view_proj,
        })?;

        let mut drawn = 0usize;
        for slot in slots.iter().filter(|s| s.casts_shadows()) {
            backend.draw(draw_call(slot, view_proj))?;
            drawn += 1;
        }
        backend.end_pass()?;

        self.depth_bias = light.depth_bias_matrix();
        debug!("Frame {}: shadow pass drew {} casters", self.frame, drawn);
        Ok(())
    }

    fn main_pass<B: ShadingBackend + ?Sized>(
        &mut self,
        slots: &mut [EntitySlot],
        view_proj: Mat4,
        backend: &mut B,
    ) -> RenderResult<()> {
        let input = ShadowInput {
            depth_bias: self.depth_bias,
            shadow_map: ShadowMapHandle { frame: self.frame },
        };
        for slot in slots.iter_mut().filter(|s| s.managed) {
            let shadow = slot.receives_shadows().then_some(input);
            slot.entity.set_mode(ShadingMode::Lit(shadow));
        }

        backend.begin_pass(&PassDescriptor {
            kind: PassKind::Main,
            frame: self.frame,
            clear: MAIN_CLEAR,
            view_proj,
        })?;

        // Blended entities go last so they composite over the finished opaque image
        let opaque = slots.iter().filter(|s| !s.is_transparent());
        let transparent = slots.iter().filter(|s| s.is_transparent());
        let mut drawn = 0usize;
        for slot in opaque.chain(transparent) {
            backend.draw(draw_call(slot, view_proj))?;
            drawn += 1;
        }
        backend.end_pass()?;

        debug!("Frame {}: main pass drew {} entities", self.frame, drawn);
        Ok(())
    }
}

fn draw_call(slot: &EntitySlot, view_proj: Mat4) -> DrawCall<'_> {
    DrawCall {
        entity: slot.id,
        kind: slot.entity.kind(),
        mode: slot.entity.mode(),
        geometry: slot.entity.geometry(),
        uniforms: slot.entity.uniforms(view_proj),
        image: slot.entity.image(),
    }
}
