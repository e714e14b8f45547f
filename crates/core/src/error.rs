//! Error type shared by the adapter and its collaborators.

use crate::types::Rect;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VdpError {
    #[error("VDP not initialized; setup must complete first")]
    NotInitialized,
    #[error("VDP already initialized")]
    AlreadyInitialized,
    #[error("VDP has been shut down")]
    ShutDown,
    #[error("No VDP subsystem installed")]
    NotInstalled,
    #[error("Framebuffer too small: need {required} bytes, got {actual}")]
    BufferTooSmall { required: usize, actual: usize },
    #[error("Capture rectangle out of bounds: {0:?}")]
    InvalidRect(Rect),
    #[error("Controller reports {width}x{height}, larger than the capture limit")]
    GeometryTooLarge { width: u32, height: u32 },
    #[error("Unsupported screen mode: {0}")]
    UnsupportedMode(u32),
    #[error("Not supported by this subsystem: {0}")]
    Unsupported(&'static str),
    #[error("Subsystem setup failed: {0}")]
    SetupFailed(String),
}

pub type Result<T> = std::result::Result<T, VdpError>;

impl VdpError {
    /// Caller broke the lifecycle contract (called out of order, or with
    /// nothing installed). The C boundary treats these as fatal.
    pub fn is_precondition_violation(&self) -> bool {
        matches!(
            self,
            VdpError::NotInitialized
                | VdpError::AlreadyInitialized
                | VdpError::ShutDown
                | VdpError::NotInstalled
        )
    }

    /// Stable status code for the C ABI. Zero is reserved for success.
    pub fn status_code(&self) -> i32 {
        match self {
            VdpError::NotInitialized => -1,
            VdpError::AlreadyInitialized => -2,
            VdpError::ShutDown => -3,
            VdpError::NotInstalled => -4,
            VdpError::BufferTooSmall { .. } => -5,
            VdpError::InvalidRect(_) => -6,
            VdpError::UnsupportedMode(_) => -7,
            VdpError::Unsupported(_) => -8,
            VdpError::SetupFailed(_) => -9,
            VdpError::GeometryTooLarge { .. } => -10,
        }
    }
}
