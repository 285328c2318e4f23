use glam::{Mat4, Vec3};

use wfog::backend::SHADOW_CLEAR;
use wfog::entity::{RawMesh, shadow_coord, shadow_visibility};
use wfog::{
    DrawCall, EntityId, FogVolume, FramePhase, Geometry, PassDescriptor, PassKind, Ray,
    RenderError, RenderResult, RenderTarget, RendererConfig, Scene, ShadingBackend, ShadingMode, SurfaceQuad,
};

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Begin(PassKind, u64),
    Draw {
        entity: EntityId,
        mode: ShadingMode,
    },
    End(PassKind),
}

/// Stands in for the GPU: the shadow map only takes a frame's value once that
/// frame's shadow pass has ended.
#[derive(Default)]
struct RecordingBackend {
    events: Vec<Event>,
    open: Option<(PassKind, u64)>,
    written_in_open_pass: Option<u64>,
    shadow_map: Option<u64>,
    reads: Vec<(u64, u64)>,
    shadow_clears: Vec<[f64; 4]>,
}

impl ShadingBackend for RecordingBackend {
    fn shadow_target(&self) -> RenderTarget {
        RenderTarget::shadow_map(32)
    }

    fn begin_pass(&mut self, pass: &PassDescriptor) -> RenderResult<()> {
        if self.open.is_some() {
            return Err(RenderError::backend("nested pass"));
        }
        if pass.kind == PassKind::Shadow {
            self.shadow_clears.push(pass.clear);
        }
        self.open = Some((pass.kind, pass.frame));
        self.events.push(Event::Begin(pass.kind, pass.frame));
        Ok(())
    }

    fn draw(&mut self, call: DrawCall<'_>) -> RenderResult<()> {
        let (kind, frame) = self.open.ok_or_else(|| RenderError::backend("draw outside pass"))?;
        match kind {
            PassKind::Shadow => self.written_in_open_pass = Some(frame),
            PassKind::Main => {
                if let Some(input) = call.mode.shadow_input() {
                    let stored = self
                        .shadow_map
                        .ok_or_else(|| RenderError::backend("read before any shadow pass"))?;
                    self.reads.push((input.shadow_map.frame, stored));
                }
            }
        }
        self.events.push(Event::Draw {
            entity: call.entity,
            mode: call.mode,
        });
        Ok(())
    }

    fn end_pass(&mut self) -> RenderResult<()> {
        let (kind, _) = self.open.take().ok_or_else(|| RenderError::backend("no open pass"))?;
        if kind == PassKind::Shadow {
            if let Some(frame) = self.written_in_open_pass.take() {
                self.shadow_map = Some(frame);
            }
        }
        self.events.push(Event::End(kind));
        Ok(())
    }
}

fn demo_scene() -> (Scene<RecordingBackend>, EntityId, EntityId, EntityId) {
    let mut scene = Scene::new(RecordingBackend::default(), RendererConfig::default());
    let fog = scene.add_entity(FogVolume::from_dimensions("fog", 10.0, 10.0, 2.0, 0.05));
    let ground = scene.add_entity(SurfaceQuad::flat("ground", 20.0, 20.0, Vec3::ONE));
    let mut platform = SurfaceQuad::flat("platform", 2.0, 2.0, Vec3::X);
    platform.set_position(Vec3::new(0.0, 3.0, 0.0));
    let platform = scene.add_entity(platform);
    (scene, fog, ground, platform)
}

#[test]
fn shadow_pass_completes_before_the_main_pass_begins() {
    let (mut scene, ..) = demo_scene();
    scene.render_frame().unwrap();

    let events = &scene.backend().events;
    let shadow_end = events
        .iter()
        .position(|e| *e == Event::End(PassKind::Shadow))
        .unwrap();
    let main_begin = events
        .iter()
        .position(|e| *e == Event::Begin(PassKind::Main, 1))
        .unwrap();
    assert!(shadow_end < main_begin);
    assert_eq!(scene.backend().shadow_clears, vec![SHADOW_CLEAR]);
}

#[test]
fn main_pass_reads_the_same_frames_shadow_map() {
    let (mut scene, ..) = demo_scene();
    for _ in 0..3 {
        scene.render_frame().unwrap();
    }

    let reads = &scene.backend().reads;
    assert_eq!(reads.len(), 6);
    for (requested, stored) in reads {
        assert_eq!(requested, stored);
    }
    let frames: Vec<u64> = reads.iter().map(|(frame, _)| *frame).collect();
    assert_eq!(frames, vec![1, 1, 2, 2, 3, 3]);
}

#[test]
fn every_draw_matches_the_active_pass() {
    let (mut scene, fog, ..) = demo_scene();
    scene.render_frame().unwrap();

    let mut pass = None;
    for event in &scene.backend().events {
        match event {
            Event::Begin(kind, _) => pass = Some(*kind),
            Event::End(_) => pass = None,
            Event::Draw { entity, mode } => match pass {
                Some(PassKind::Shadow) => {
                    assert!(mode.is_shadow());
                    assert_ne!(*entity, fog, "fog never casts");
                }
                Some(PassKind::Main) => assert!(!mode.is_shadow()),
                None => panic!("draw outside a pass"),
            },
        }
    }
}

#[test]
fn receivers_end_the_frame_lit_with_the_current_map() {
    let (mut scene, fog, ground, _) = demo_scene();
    scene.render_frame().unwrap();
    scene.render_frame().unwrap();

    match scene.entity(ground).unwrap().mode() {
        ShadingMode::Lit(Some(input)) => {
            assert_eq!(input.shadow_map.frame, 2);
            assert_eq!(input.depth_bias, scene.light_camera().depth_bias_matrix());
        }
        other => panic!("ground should sample the shadow map, got {other:?}"),
    }
    assert_eq!(scene.entity(fog).unwrap().mode(), ShadingMode::Lit(None));
}

#[test]
fn out_of_order_main_pass_is_rejected_without_drawing() {
    let (mut scene, ..) = demo_scene();
    let err = scene.render_main_pass().unwrap_err();
    assert!(matches!(err, RenderError::PassOrder { expected: FramePhase::ShadowReady, .. }));
    assert!(scene.backend().events.is_empty());
}

#[test]
fn raw_meshes_are_drawn_once_per_frame_and_never_switched() {
    let (mut scene, ..) = demo_scene();
    let raw = scene.add_raw(RawMesh::new(
        "marker",
        Geometry::cuboid(Vec3::splat(-0.1), Vec3::splat(0.1)),
        Vec3::Y,
    ));
    scene.render_frame().unwrap();

    let draws: Vec<&Event> = scene
        .backend()
        .events
        .iter()
        .filter(|e| matches!(e, Event::Draw { entity, .. } if *entity == raw))
        .collect();
    assert_eq!(
        draws,
        vec![&Event::Draw {
            entity: raw,
            mode: ShadingMode::Lit(None)
        }]
    );
}

#[test]
fn ground_under_the_platform_is_in_shadow() {
    let (scene, ..) = demo_scene();
    let light = scene.light_camera();
    let bias = light.depth_bias_matrix();
    let toward_light = (light.position - light.target).normalize();

    // A ground point whose path to the light crosses the platform at y = 3
    let platform_point = Vec3::new(0.3, 3.0, -0.2);
    let ground_point = platform_point - toward_light * (3.0 / toward_light.y);
    assert!(ground_point.y.abs() < 1e-4);

    let occluder = shadow_coord(bias, platform_point);
    let receiver = shadow_coord(bias, ground_point);
    assert!((occluder.x - receiver.x).abs() < 1e-4);
    assert!((occluder.y - receiver.y).abs() < 1e-4);
    assert_eq!(shadow_visibility(receiver, occluder.z), 0.0);

    // Nothing written there: the cleared map never occludes
    assert_eq!(shadow_visibility(receiver, SHADOW_CLEAR[0] as f32), 1.0);
    // A receiver never shadows itself
    assert_eq!(shadow_visibility(receiver, receiver.z), 1.0);
}

#[test]
fn picking_through_the_scene_handles_degenerate_rays() {
    let (mut scene, ..) = demo_scene();
    scene.set_camera_position(Vec3::new(0.0, 2.0, 10.0));
    scene.set_camera_target(Vec3::new(0.0, 2.0, 0.0));

    // Upper half of the screen points at the sky
    assert_eq!(scene.intersect_ground_plane(540.0, 10.0), None);

    let hit = scene.intersect_ground_plane(540.0, 715.0).unwrap();
    assert!(hit.y.abs() < 1e-3);
    assert!(hit.z < 10.0);

    // A ray skimming the ground never meets it
    let skimming = Ray {
        origin: Vec3::new(0.0, 2.0, 10.0),
        direction: Vec3::NEG_Z,
    };
    assert_eq!(skimming.intersect_plane(Vec3::ZERO, Vec3::Y), None);

    // No viewport, no ray
    scene.set_size(0, 0);
    assert_eq!(scene.intersect_ground_plane(0.0, 0.0), None);
}

#[test]
fn view_projection_is_used_for_main_pass_uniforms() {
    let (scene, _, ground, _) = demo_scene();
    let view_proj = scene.view_camera().view_projection();
    assert_ne!(view_proj, Mat4::IDENTITY);
    match scene.entity(ground).unwrap().uniforms(view_proj) {
        wfog::entity::EntityUniforms::Quad(u) => {
            assert_eq!(u.view_proj, view_proj.to_cols_array_2d())
        }
        other => panic!("expected quad uniforms, got {other:?}"),
    }
}
