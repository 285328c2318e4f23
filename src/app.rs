// ======================================
// === DEMO APPLICATION ===
// ======================================
// Window, timing and input plumbing around a `Scene<GpuBackend>`: a textured
// ground, a floating platform that shadows it, and a fog bank the cursor
// clears a hole through.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

use bitflags::bitflags;
use glam::Vec3;
use log::{error, info, warn};
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::ActiveEventLoop,
    window::{Window, WindowId},
};

use crate::backend::ShadingBackend;
use crate::config::{DIMX, DIMY, FPS_WINDOW, RendererConfig, STATS_UPDATE_INTERVAL};
use crate::entity::{EntityId, FogVolume, ImageRgba8, SurfaceQuad};
use crate::error::{RenderError, RenderResult};
use crate::gpu::GpuBackend;
use crate::scene::Scene;

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct StateFlags: u8 {
        const RUNNING = 1 << 0;
        const SHOULD_EXIT = 1 << 1;
    }
}

pub struct TimingSystem {
    #[cfg(not(target_arch = "wasm32"))]
    start: Instant,
    #[cfg(target_arch = "wasm32")]
    start_time_ms: f64,
    last_frame_time: f32,
    pub delta_time: f32,
    pub frame_count: u64,
}

impl Default for TimingSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl TimingSystem {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_arch = "wasm32"))]
            start: Instant::now(),
            #[cfg(target_arch = "wasm32")]
            start_time_ms: Self::now_ms(),
            last_frame_time: 0.0,
            delta_time: 0.0,
            frame_count: 0,
        }
    }

    pub fn elapsed_seconds(&self) -> f32 {
        #[cfg(not(target_arch = "wasm32"))]
        {
            self.start.elapsed().as_secs_f32()
        }

        #[cfg(target_arch = "wasm32")]
        {
            ((Self::now_ms() - self.start_time_ms) / 1000.0) as f32
        }
    }

    /// Advances to a new frame and returns the elapsed time.
    pub fn tick(&mut self) -> f32 {
        let now = self.elapsed_seconds();
        self.delta_time = now - self.last_frame_time;
        self.last_frame_time = now;
        self.frame_count += 1;
        now
    }

    #[cfg(target_arch = "wasm32")]
    fn now_ms() -> f64 {
        web_sys::window()
            .and_then(|w| w.performance())
            .map(|p| p.now())
            .unwrap_or_else(js_sys::Date::now)
    }
}

/// Rolling frame-time window, summarised every `STATS_UPDATE_INTERVAL` seconds.
pub struct FrameStats {
    frame_times: [f32; FPS_WINDOW],
    frame_index: usize,
    update_timer: f32,
}

impl Default for FrameStats {
    fn default() -> Self {
        Self {
            frame_times: [0.0; FPS_WINDOW],
            frame_index: 0,
            update_timer: 0.0,
        }
    }
}

impl FrameStats {
    /// Returns `(fps, average frame ms)` when a summary is due.
    pub fn record(&mut self, delta_time: f32) -> Option<(f32, f32)> {
        self.frame_times[self.frame_index] = delta_time;
        self.frame_index = (self.frame_index + 1) % FPS_WINDOW;
        self.update_timer += delta_time;

        if self.update_timer < STATS_UPDATE_INTERVAL {
            return None;
        }
        self.update_timer = 0.0;

        let avg = self.frame_times.iter().sum::<f32>() / FPS_WINDOW as f32;
        if avg <= 0.0 {
            return None;
        }
        Some((1.0 / avg, avg * 1000.0))
    }
}

/// `size` x `size` RGBA checkerboard with `cells` squares per side.
pub fn checkerboard(size: u32, cells: u32) -> RenderResult<ImageRgba8> {
    let cell = (size / cells.max(1)).max(1);
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let light = ((x / cell) + (y / cell)) % 2 == 0;
            let v = if light { 220 } else { 60 };
            pixels.extend_from_slice(&[v, v, v, 255]);
        }
    }
    ImageRgba8::new(size, size, pixels)
}

// Fog bank footprint and thickness; its floor sits just above the ground so
// the box's bottom face doesn't z-fight with it
const FOG_WIDTH: f32 = 18.0;
const FOG_DEPTH: f32 = 12.0;
const FOG_THICKNESS: f32 = 3.0;
const FOG_FLOOR: f32 = 0.05;
// Clear of the fog top, otherwise it would punch a hole through the bank
const PLATFORM_HEIGHT: f32 = 4.0;

/// Ids of the entities `populate_demo_scene` adds.
#[derive(Debug, Clone, Copy)]
pub struct DemoEntities {
    pub ground: EntityId,
    pub platform: EntityId,
    pub fog: EntityId,
}

/// Textured ground, a platform that shadows it from above the fog, and the fog bank.
pub fn populate_demo_scene<B: ShadingBackend>(scene: &mut Scene<B>) -> RenderResult<DemoEntities> {
    let ground = scene.add_entity(SurfaceQuad::image("ground", checkerboard(256, 16)?, 24.0));

    let mut platform = SurfaceQuad::flat("platform", 4.0, 4.0, Vec3::new(0.8, 0.45, 0.2));
    platform.set_position(Vec3::new(3.0, PLATFORM_HEIGHT, -2.0));
    let platform = scene.add_entity(platform);

    let fog = scene.add_entity(FogVolume::from_dimensions(
        "fog",
        FOG_WIDTH,
        FOG_DEPTH,
        FOG_THICKNESS,
        FOG_FLOOR,
    ));

    Ok(DemoEntities {
        ground,
        platform,
        fog,
    })
}

fn build_demo_scene(backend: GpuBackend, config: RendererConfig) -> RenderResult<Scene<GpuBackend>> {
    let mut scene = Scene::new(backend, config);
    populate_demo_scene(&mut scene)?;
    Ok(scene)
}

type SharedScene = Rc<RefCell<Option<Scene<GpuBackend>>>>;

pub struct FogApp {
    config: RendererConfig,
    window: Option<Arc<Window>>,
    scene: SharedScene,
    timing: TimingSystem,
    stats: FrameStats,
    cursor: Option<(f32, f32)>,
    state_flags: StateFlags,
}

impl FogApp {
    pub fn new(config: RendererConfig) -> Self {
        Self {
            config,
            window: None,
            scene: Rc::new(RefCell::new(None)),
            timing: TimingSystem::new(),
            stats: FrameStats::default(),
            cursor: None,
            state_flags: StateFlags::empty(),
        }
    }

    fn update(&mut self, event_loop: &ActiveEventLoop) {
        let time = self.timing.tick();

        {
            let mut slot = self.scene.borrow_mut();
            if let Some(scene) = slot.as_mut() {
                scene.set_time(time);
                if let Some(point) = self
                    .cursor
                    .and_then(|(x, y)| scene.intersect_ground_plane(x, y))
                {
                    scene.set_reveal_point(point);
                }

                match scene.render_frame() {
                    Ok(()) => {}
                    Err(RenderError::Surface(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                        warn!("Surface lost, reconfiguring");
                        scene.backend_mut().reconfigure();
                    }
                    Err(e) if !e.is_fatal() => warn!("Frame skipped: {e}"),
                    Err(e) => {
                        error!("Render error: {e}");
                        self.state_flags.insert(StateFlags::SHOULD_EXIT);
                    }
                }
            }
        }

        if let Some((fps, frame_ms)) = self.stats.record(self.timing.delta_time) {
            info!("FPS: {fps:.1}, Frame: {frame_ms:.2}ms");
        }

        if self.state_flags.contains(StateFlags::SHOULD_EXIT) {
            event_loop.exit();
            return;
        }

        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    #[cfg(target_arch = "wasm32")]
    fn attach_canvas(window: &Window) {
        use winit::platform::web::WindowExtWebSys;

        let Some(canvas) = window.canvas() else {
            return;
        };
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };

        canvas.set_width(DIMX);
        canvas.set_height(DIMY);
        let style = canvas.style();
        let _ = style.set_property("width", &format!("{DIMX}px"));
        let _ = style.set_property("height", &format!("{DIMY}px"));

        let container: Option<web_sys::Element> = document
            .get_element_by_id("app")
            .or_else(|| document.body().map(Into::into));
        if let Some(container) = container {
            if container.append_child(&web_sys::Element::from(canvas)).is_err() {
                error!("Couldn't append canvas to document");
            }
        }
    }
}

impl ApplicationHandler for FogApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attributes = Window::default_attributes()
            .with_title("wfog")
            .with_inner_size(winit::dpi::PhysicalSize::new(DIMX, DIMY));
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                error!("Failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };
        self.window = Some(window.clone());

        #[cfg(target_arch = "wasm32")]
        {
            Self::attach_canvas(&window);

            let scene = self.scene.clone();
            let config = self.config.clone();
            let redraw = window.clone();
            wasm_bindgen_futures::spawn_local(async move {
                match GpuBackend::new(redraw.clone(), &config).await {
                    Ok(backend) => match build_demo_scene(backend, config) {
                        Ok(built) => {
                            *scene.borrow_mut() = Some(built);
                            redraw.request_redraw();
                        }
                        Err(e) => error!("Failed to build scene: {e}"),
                    },
                    Err(e) => error!("Failed to initialise GPU: {e}"),
                }
            });
            self.state_flags.insert(StateFlags::RUNNING);
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            let mut config = self.config.clone();
            let size = window.inner_size();
            config.width = size.width.max(1);
            config.height = size.height.max(1);

            let built = pollster::block_on(GpuBackend::new(window.clone(), &config))
                .and_then(|backend| build_demo_scene(backend, config));
            match built {
                Ok(scene) => {
                    *self.scene.borrow_mut() = Some(scene);
                    self.state_flags.insert(StateFlags::RUNNING);
                }
                Err(e) => {
                    error!("Failed to initialise renderer: {e}");
                    event_loop.exit();
                    return;
                }
            }
        }

        window.request_redraw();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        let Some(window) = &self.window else {
            return;
        };
        if window.id() != id {
            return;
        }

        match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = Some((position.x as f32, position.y as f32));
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
            }
            WindowEvent::Resized(size) => {
                if let Some(scene) = self.scene.borrow_mut().as_mut() {
                    scene.set_size(size.width.max(1), size.height.max(1));
                }
            }
            WindowEvent::CloseRequested => {
                self.state_flags.insert(StateFlags::SHOULD_EXIT);
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => {
                self.update(event_loop);
            }
            _ => {}
        }
    }
}
