//! Error types for the webview crate

use thiserror::Error;
use webtexture_frontend_core::FrontendError;

#[derive(Debug, Error)]
pub enum WebviewError {
    #[error("Invalid surface dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Failed to allocate {width}x{height} surface: {reason}")]
    Allocation {
        width: u32,
        height: u32,
        reason: String,
    },

    #[error("Surface not allocated")]
    NoSurface,

    #[error("Failed to spawn surface-owning thread: {0}")]
    OwnerSpawn(#[from] std::io::Error),

    #[error("Surface-owning thread channel closed")]
    ChannelClosed,

    #[error(transparent)]
    Frontend(#[from] FrontendError),
}
