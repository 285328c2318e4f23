use glam::Vec3;

// === CONSTANTS ===
pub const DIMX: u32 = 1080;
pub const DIMY: u32 = 720;
pub const SHADOW_MAP_SIZE: u32 = 2048;
pub const DEFAULT_LIGHT: [f32; 3] = [-20.0, 20.0, 0.0];

// View camera
pub const CAMERA_FOV_DEGREES: f32 = 45.0;
pub const CAMERA_NEAR: f32 = 0.01;
pub const CAMERA_FAR: f32 = 500.0;
pub const CAMERA_POSITION: [f32; 3] = [0.0, 10.0, 0.0];

// Light camera (orthographic box)
pub const LIGHT_HALF_EXTENT: f32 = 20.0;
pub const LIGHT_NEAR: f32 = -1.0;
pub const LIGHT_FAR: f32 = 500.0;

// Fog raymarch
pub const FOG_STEP_SIZE: f32 = 0.10;
pub const FOG_STEP_COUNT: u32 = 20;
pub const FOG_EXTINCTION_SCALE: f32 = 40.0;
pub const FOG_NOISE_SCALE: f32 = 0.1;
pub const FOG_DRIFT: [f32; 3] = [0.031, 0.007, 0.019]; // Per-axis scroll rates, world units / second
pub const ALPHA_CUTOFF: f32 = 0.003;
pub const REVEAL_RADIUS: f32 = 1.0;

// Surface shading
pub const SHADOW_TOLERANCE: f32 = 0.005;
pub const AMBIENT: f32 = 0.3;

// Stats
pub const FPS_WINDOW: usize = 60;
pub const STATS_UPDATE_INTERVAL: f32 = 0.75;

/// Everything the renderer needs to build its cameras and targets.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    pub width: u32,
    pub height: u32,
    pub shadow_map_size: u32,
    pub light: Vec3,
    pub camera_position: Vec3,
    pub camera_target: Vec3,
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub light_half_extent: f32,
    pub light_near: f32,
    pub light_far: f32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            width: DIMX,
            height: DIMY,
            shadow_map_size: SHADOW_MAP_SIZE,
            light: Vec3::from_array(DEFAULT_LIGHT),
            camera_position: Vec3::from_array(CAMERA_POSITION),
            camera_target: Vec3::ZERO,
            fov_degrees: CAMERA_FOV_DEGREES,
            near: CAMERA_NEAR,
            far: CAMERA_FAR,
            light_half_extent: LIGHT_HALF_EXTENT,
            light_near: LIGHT_NEAR,
            light_far: LIGHT_FAR,
        }
    }
}

impl RendererConfig {
    pub fn aspect(&self) -> f32 {
        self.width.max(1) as f32 / self.height.max(1) as f32
    }
}

/// Raymarch parameters for one fog volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FogSettings {
    /// World-space distance advanced per step.
    pub step_size: f32,
    pub step_count: u32,
    pub extinction_scale: f32,
    pub noise_scale: f32,
    pub drift: Vec3,
    pub alpha_cutoff: f32,
    /// Stop marching once the running alpha drops under `alpha_cutoff`.
    pub early_exit: bool,
}

impl Default for FogSettings {
    fn default() -> Self {
        Self {
            step_size: FOG_STEP_SIZE,
            step_count: FOG_STEP_COUNT,
            extinction_scale: FOG_EXTINCTION_SCALE,
            noise_scale: FOG_NOISE_SCALE,
            drift: Vec3::from_array(FOG_DRIFT),
            alpha_cutoff: ALPHA_CUTOFF,
            early_exit: true,
        }
    }
}

impl FogSettings {
    pub fn with_steps(mut self, step_size: f32, step_count: u32) -> Self {
        self.step_size = step_size;
        self.step_count = step_count;
        self
    }

    pub fn with_early_exit(mut self, early_exit: bool) -> Self {
        self.early_exit = early_exit;
        self
    }
}
