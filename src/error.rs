//! Central error handling for the renderer.

use crate::coordinator::FramePhase;
use crate::entity::EntityId;

#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("Initialization error: {0}")]
    Initialization(String),

    #[error("Surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    #[error("Pass order violated: expected {expected:?}, found {found:?}")]
    PassOrder {
        expected: FramePhase,
        found: FramePhase,
    },

    #[error("Unknown entity {0:?}")]
    UnknownEntity(EntityId),

    #[error("Invalid image: {width}x{height} needs {expected} bytes, got {actual}")]
    InvalidImage {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("Backend error: {0}")]
    Backend(String),
}

impl RenderError {
    pub fn initialization<T: ToString>(msg: T) -> Self {
        RenderError::Initialization(msg.to_string())
    }

    pub fn backend<T: ToString>(msg: T) -> Self {
        RenderError::Backend(msg.to_string())
    }

    /// Whether the session can keep rendering after this error.
    pub fn is_fatal(&self) -> bool {
        match self {
            RenderError::Surface(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => false,
            RenderError::Surface(wgpu::SurfaceError::Timeout) => false,
            RenderError::UnknownEntity(_) | RenderError::InvalidImage { .. } => false,
            _ => true,
        }
    }
}

pub type RenderResult<T> = Result<T, RenderError>;
