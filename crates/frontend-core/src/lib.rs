//! Frontend core abstractions for webtexture
//!
//! Defines the `BrowserEngine` trait that abstracts over the browser that
//! renders into the bridge's surface, plus the types shared between the
//! bridge and every engine backend.

pub mod pixels;

use std::sync::Arc;

use webtexture_ipc::{KeyboardEvent, PointerEvent};

/// One captured frame: tightly packed RGBA8, straight alpha, row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    /// Whether the frame was produced for a `width` x `height` viewport
    pub fn matches(&self, width: u32, height: u32) -> bool {
        self.width == width && self.height == height
    }

    /// Copy into an image for encoding or inspection
    pub fn to_image(&self) -> Option<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
    }
}

/// Lifecycle of a bridge instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    /// `initialize` has not been called, or setup failed
    #[default]
    Uninitialized,
    /// Setup is running on the surface-owning thread
    Initializing,
    /// Surface allocated and engine created
    Ready,
    /// Torn down; terminal
    Destroyed,
}

impl Lifecycle {
    /// Only a ready bridge forwards control and input calls
    pub fn is_ready(self) -> bool {
        self == Self::Ready
    }
}

/// Errors that can occur in frontend operations
#[derive(Debug, thiserror::Error)]
pub enum FrontendError {
    /// Rendering into the surface failed
    #[error("Capture failed: {0}")]
    CaptureFailed(String),

    /// Invalid dimensions
    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// Script evaluation failed or returned nothing usable
    #[error("Script failed: {0}")]
    ScriptFailed(String),

    /// Backend-specific error
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Receives the result of an asynchronous script evaluation
pub type ScriptCallback = Box<dyn FnOnce(Result<String, FrontendError>) + Send>;

/// Navigation notifications raised by an engine.
///
/// Engines call these from the surface-owning thread, usually from inside
/// `BrowserEngine::poll` or a navigation call.
pub trait NavigationObserver: Send + Sync {
    fn page_started(&self, url: &str);

    fn page_finished(&self, url: &str, can_go_back: bool, can_go_forward: bool);

    fn progress_changed(&self, percent: u8);

    fn title_changed(&self, title: &str);

    fn load_failed(&self, url: &str, description: &str);

    /// Something repainted without a navigation event (animation, media)
    fn content_changed(&self) {}
}

pub type SharedObserver = Arc<dyn NavigationObserver>;

/// Everything an engine needs at construction
#[derive(Clone)]
pub struct EngineInit {
    pub width: u32,
    pub height: u32,
    pub user_agent: Option<String>,
    pub observer: SharedObserver,
}

/// Creates an engine on the surface-owning thread.
///
/// The engine itself need not be `Send`: it never leaves the thread that
/// built it.
pub type EngineFactory =
    Arc<dyn Fn(EngineInit) -> Result<Box<dyn BrowserEngine>, FrontendError> + Send + Sync>;

/// Capabilities the bridge needs from a browser engine
pub trait BrowserEngine {
    fn load_url(&mut self, url: &str);

    fn go_back(&mut self);

    fn go_forward(&mut self);

    fn can_go_back(&self) -> bool;

    fn can_go_forward(&self) -> bool;

    fn reload(&mut self);

    fn stop_loading(&mut self);

    /// Match the engine's layout viewport to the surface
    fn resize(&mut self, width: u32, height: u32);

    /// Draw the current page over `target`, which already holds the background
    fn render(&mut self, target: &mut image::RgbaImage) -> Result<(), FrontendError>;

    fn dispatch_pointer(&mut self, event: PointerEvent);

    fn dispatch_key(&mut self, event: &KeyboardEvent);

    /// Run `script` in the page; `on_result` receives its JSON-encoded value
    fn evaluate_script(&mut self, script: &str, on_result: Option<ScriptCallback>);

    /// Pump the engine's own event loop
    ///
    /// Default implementation does nothing. Override in engines that need
    /// their loop driven from the surface-owning thread.
    fn poll(&mut self) {}

    /// Release engine resources; called once before the engine is dropped
    fn shutdown(&mut self) {}
}
