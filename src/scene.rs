//! Owns entities, cameras and the light, and drives the two-pass frame.

use glam::Vec3;
use log::info;

use crate::backend::ShadingBackend;
use crate::camera::{LightCamera, ViewCamera};
use crate::config::RendererConfig;
use crate::coordinator::{FramePhase, ShadowCoordinator};
use crate::entity::{Capabilities, Entity, EntityId, EntitySlot};
use crate::error::{RenderError, RenderResult};

pub struct Scene<B: ShadingBackend> {
    backend: B,
    config: RendererConfig,
    light: Vec3,
    time: f32,
    reveal_point: Vec3,
    view_camera: ViewCamera,
    light_camera: LightCamera,
    coordinator: ShadowCoordinator,
    slots: Vec<EntitySlot>,
    next_id: u32,
}

impl<B: ShadingBackend> Scene<B> {
    pub fn new(backend: B, config: RendererConfig) -> Self {
        let target = backend.shadow_target();
        info!(
            "Scene created: {}x{} viewport, {}x{} shadow map",
            config.width, config.height, target.width, target.height
        );
        Self {
            view_camera: ViewCamera::from_config(&config),
            light_camera: LightCamera::from_config(&config),
            light: config.light,
            time: 0.0,
            reveal_point: Vec3::ZERO,
            coordinator: ShadowCoordinator::new(),
            slots: Vec::new(),
            next_id: 0,
            backend,
            config,
        }
    }

    /// Registers an entity for shadow coordination and hands it the current
    /// camera position and reveal point, plus light and time when its
    /// capabilities ask for them.
    pub fn add_entity(&mut self, entity: impl Entity + 'static) -> EntityId {
        self.insert(Box::new(entity), true)
    }

    /// Adds geometry that is drawn in the main pass as-is and never mode-switched.
    pub fn add_raw(&mut self, entity: impl Entity + 'static) -> EntityId {
        self.insert(Box::new(entity), false)
    }

    fn insert(&mut self, mut entity: Box<dyn Entity>, managed: bool) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;

        let caps = entity.capabilities();
        if caps.contains(Capabilities::LIGHT_DEPENDENT) {
            entity.set_light(self.light);
        }
        if caps.contains(Capabilities::ANIMATED) {
            entity.set_time(self.time);
        }
        entity.set_camera_position(self.view_camera.position);
        entity.set_reveal_point(self.reveal_point);

        info!("Added {:?} entity '{}' as {:?}", entity.kind(), entity.label(), id);
        self.slots.push(EntitySlot { id, managed, entity });
        id
    }

    pub fn entity(&self, id: EntityId) -> RenderResult<&dyn Entity> {
        self.slots
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.entity.as_ref())
            .ok_or(RenderError::UnknownEntity(id))
    }

    pub fn entity_mut(&mut self, id: EntityId) -> RenderResult<&mut dyn Entity> {
        match self.slots.iter_mut().find(|s| s.id == id) {
            Some(slot) => Ok(slot.entity.as_mut()),
            None => Err(RenderError::UnknownEntity(id)),
        }
    }

    pub fn entity_count(&self) -> usize {
        self.slots.len()
    }

    pub fn light(&self) -> Vec3 {
        self.light
    }

    /// Moves the light. The light camera follows it, still aimed at its target.
    pub fn set_light(&mut self, light: Vec3) {
        self.light = light;
        self.light_camera.position = light;
        for slot in self.slots.iter_mut().filter(|s| s.is_light_dependent()) {
            slot.entity.set_light(light);
        }
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn set_time(&mut self, time: f32) {
        self.time = time;
        for slot in self.slots.iter_mut().filter(|s| s.is_animated()) {
            slot.entity.set_time(time);
        }
    }

    pub fn set_camera_position(&mut self, position: Vec3) {
        self.view_camera.position = position;
        for slot in &mut self.slots {
            slot.entity.set_camera_position(position);
        }
    }

    pub fn set_camera_target(&mut self, target: Vec3) {
        self.view_camera.target = target;
    }

    pub fn reveal_point(&self) -> Vec3 {
        self.reveal_point
    }

    pub fn set_reveal_point(&mut self, point: Vec3) {
        self.reveal_point = point;
        for slot in &mut self.slots {
            slot.entity.set_reveal_point(point);
        }
    }

    pub fn set_size(&mut self, width: u32, height: u32) {
        self.config.width = width;
        self.config.height = height;
        self.view_camera.aspect = self.config.aspect();
        self.backend.resize(width, height);
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn view_camera(&self) -> &ViewCamera {
        &self.view_camera
    }

    pub fn light_camera(&self) -> &LightCamera {
        &self.light_camera
    }

    pub fn phase(&self) -> FramePhase {
        self.coordinator.phase()
    }

    pub fn frame(&self) -> u64 {
        self.coordinator.frame()
    }

    pub fn coordinator(&self) -> &ShadowCoordinator {
        &self.coordinator
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn render_shadow_pass(&mut self) -> RenderResult<()> {
        self.coordinator
            .render_shadow_pass(&mut self.slots, &self.light_camera, &mut self.backend)
    }

    pub fn render_main_pass(&mut self) -> RenderResult<()> {
        let view_proj = self.view_camera.view_projection();
        self.coordinator
            .render_main_pass(&mut self.slots, view_proj, &mut self.backend)
    }

    /// Shadow pass, then main pass. A failure abandons the whole frame.
    pub fn render_frame(&mut self) -> RenderResult<()> {
        self.render_shadow_pass()?;
        self.render_main_pass()
    }

    /// World point on the y = 0 plane under screen pixel `(x, y)`.
    ///
    /// `None` when the view ray runs parallel to the ground or points away from it.
    pub fn intersect_ground_plane(&self, x: f32, y: f32) -> Option<Vec3> {
        self.view_camera
            .screen_ray(x, y, self.config.width as f32, self.config.height as f32)?
            .intersect_plane(Vec3::ZERO, Vec3::Y)
    }
}

#[cfg(test)]
mod tests {
    use bytemuck::Zeroable;
    use glam::Mat4;

    use super::*;
    use crate::backend::{DrawCall, PassDescriptor, RenderTarget};
    use crate::entity::{EntityKind, EntityUniforms, FogVolume, QuadUniforms, ShadingMode, SurfaceQuad};
    use crate::geometry::{Geometry, GeometrySource};

    struct NullBackend;

    impl ShadingBackend for NullBackend {
        fn shadow_target(&self) -> RenderTarget {
            RenderTarget::shadow_map(64)
        }

        fn begin_pass(&mut self, _pass: &PassDescriptor) -> RenderResult<()> {
            Ok(())
        }

        fn draw(&mut self, _call: DrawCall<'_>) -> RenderResult<()> {
            Ok(())
        }

        fn end_pass(&mut self) -> RenderResult<()> {
            Ok(())
        }
    }

    fn scene() -> Scene<NullBackend> {
        Scene::new(NullBackend, RendererConfig::default())
    }

    /// Reports the last light and time it was handed through its uniforms.
    struct Tracker {
        caps: Capabilities,
        geometry: Geometry,
        light: Vec3,
        time: f32,
        mode: ShadingMode,
    }

    impl Tracker {
        fn new(caps: Capabilities) -> Self {
            Self {
                caps,
                geometry: Geometry::default(),
                light: Vec3::ZERO,
                time: -1.0,
                mode: ShadingMode::default(),
            }
        }
    }

    impl Entity for Tracker {
        fn label(&self) -> &str {
            "tracker"
        }

        fn kind(&self) -> EntityKind {
            EntityKind::Raw
        }

        fn capabilities(&self) -> Capabilities {
            self.caps
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

        fn mode(&self) -> ShadingMode {
            self.mode
        }

        fn set_mode(&mut self, mode: ShadingMode) {
            self.mode = mode;
        }

        fn uniforms(&self, _view_proj: Mat4) -> EntityUniforms {
            let mut u = QuadUniforms::zeroed();
            u.light = [self.light.x, self.light.y, self.light.z, 0.0];
            u.params[0] = self.time;
            EntityUniforms::Quad(u)
        }
    }

    fn tracked(scene: &Scene<NullBackend>, id: EntityId) -> ([f32; 4], f32) {
        match scene.entity(id).unwrap().uniforms(Mat4::IDENTITY) {
            EntityUniforms::Quad(u) => (u.light, u.params[0]),
            other => panic!("expected quad uniforms, got {other:?}"),
        }
    }

    #[test]
    fn updates_reach_entities_already_in_the_scene() {
        let mut scene = scene();
        let fog = scene.add_entity(FogVolume::from_dimensions("fog", 4.0, 4.0, 1.0, 0.0));
        let quad = scene.add_entity(SurfaceQuad::flat("ground", 4.0, 4.0, Vec3::ONE));

        scene.set_light(Vec3::new(-3.0, 7.0, 2.0));
        scene.set_time(4.25);
        scene.set_camera_position(Vec3::new(1.0, 6.0, -1.0));
        scene.set_reveal_point(Vec3::new(0.5, 0.0, -0.5));

        match scene.entity(quad).unwrap().uniforms(Mat4::IDENTITY) {
            EntityUniforms::Quad(u) => assert_eq!(u.light, [-3.0, 7.0, 2.0, 0.0]),
            other => panic!("expected quad uniforms, got {other:?}"),
        }
        match scene.entity(fog).unwrap().uniforms(Mat4::IDENTITY) {
            EntityUniforms::Fog(u) => {
                assert_eq!(u.light, [-3.0, 7.0, 2.0, 0.0]);
                assert_eq!(u.camera_time, [1.0, 6.0, -1.0, 4.25]);
                assert_eq!(u.reveal[..3], [0.5, 0.0, -0.5]);
            }
            other => panic!("expected fog uniforms, got {other:?}"),
        }
    }

    #[test]
    fn light_and_time_follow_capabilities() {
        let mut scene = scene();
        scene.set_light(Vec3::new(1.0, 2.0, 3.0));
        scene.set_time(2.0);

        let lit = scene.add_entity(Tracker::new(Capabilities::LIGHT_DEPENDENT));
        let animated = scene.add_entity(Tracker::new(Capabilities::ANIMATED));
        let neither = scene.add_raw(Tracker::new(Capabilities::empty()));
        assert_eq!(tracked(&scene, lit), ([1.0, 2.0, 3.0, 0.0], -1.0));
        assert_eq!(tracked(&scene, animated), ([0.0; 4], 2.0));

        scene.set_light(Vec3::new(4.0, 5.0, 6.0));
        scene.set_time(9.0);
        assert_eq!(tracked(&scene, lit), ([4.0, 5.0, 6.0, 0.0], -1.0));
        assert_eq!(tracked(&scene, animated), ([0.0; 4], 9.0));
        assert_eq!(tracked(&scene, neither), ([0.0; 4], -1.0));
    }

    #[test]
    fn entities_receive_the_current_light_on_insert() {
        let mut scene = scene();
        scene.set_light(Vec3::new(5.0, 10.0, 0.0));
        let id = scene.add_entity(SurfaceQuad::flat("ground", 4.0, 4.0, Vec3::ONE));

        let quad = scene.entity(id).unwrap();
        match quad.uniforms(Mat4::IDENTITY) {
            EntityUniforms::Quad(u) => assert_eq!(u.light, [5.0, 10.0, 0.0, 0.0]),
            other => panic!("expected quad uniforms, got {other:?}"),
        }
    }

    #[test]
    fn light_camera_follows_the_light() {
        let mut scene = scene();
        scene.set_light(Vec3::new(0.0, 30.0, 5.0));
        assert_eq!(scene.light_camera().position, Vec3::new(0.0, 30.0, 5.0));
    }

    #[test]
    fn unknown_ids_are_reported() {
        let mut scene = scene();
        let missing = EntityId(42);
        assert!(matches!(scene.entity(missing), Err(RenderError::UnknownEntity(id)) if id == missing));
        assert!(scene.entity_mut(missing).is_err());
    }

    #[test]
    fn time_reaches_animated_entities() {
        let mut scene = scene();
        let id = scene.add_entity(FogVolume::from_dimensions("fog", 2.0, 2.0, 1.0, 0.0));
        scene.set_time(12.5);
        match scene.entity(id).unwrap().uniforms(Mat4::IDENTITY) {
            EntityUniforms::Fog(u) => assert_eq!(u.camera_time[3], 12.5),
            other => panic!("expected fog uniforms, got {other:?}"),
        }
    }

    #[test]
    fn frames_advance_and_return_to_idle() {
        let mut scene = scene();
        scene.add_entity(SurfaceQuad::flat("ground", 4.0, 4.0, Vec3::ONE));
        scene.render_frame().unwrap();
        scene.render_frame().unwrap();
        assert_eq!(scene.frame(), 2);
        assert_eq!(scene.phase(), FramePhase::Idle);
    }

    #[test]
    fn center_of_the_screen_picks_the_origin() {
        let scene = scene();
        let hit = scene.intersect_ground_plane(540.0, 360.0).unwrap();
        assert!(hit.length() < 1e-3);
    }

    #[test]
    fn resize_updates_the_aspect() {
        let mut scene = scene();
        scene.set_size(800, 800);
        assert_eq!(scene.view_camera().aspect, 1.0);
        assert_eq!(scene.size(), (800, 800));
    }
}
