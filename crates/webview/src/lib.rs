//! Offscreen browser surface bridge for webtexture
//!
//! [`WebSurfaceBridge`] owns a browser engine on a dedicated surface-owning
//! thread and hands captured frames to a foreign render loop:
//! - Polls go through a frame pacer, so idle polling never touches the owner
//! - Authorized captures block the poller for at most the capture timeout
//! - Input, navigation and resize calls are fire-and-forget tasks
//! - Navigation notifications are queued as [`BridgeEvent`]s

mod capture;
mod error;
mod events;
mod input;
mod owner;
mod pacer;
mod state;
mod surface;

pub use error::WebviewError;
pub use input::{Dispatch, GestureState, InputTranslator};
pub use pacer::{CaptureReason, CaptureState, FramePacer};
pub use state::{NavigationCache, Viewport};
pub use surface::{SurfaceBufferManager, SurfacePair};

pub use webtexture_config::BridgeConfig;
pub use webtexture_frontend_core::{EngineFactory, Frame, Lifecycle};
pub use webtexture_ipc::{BridgeEvent, KeyboardEvent, ScrollMetrics, SignalArg, TouchInput};

use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Instant;

use crossbeam_channel::Sender;

use capture::CaptureBridge;
use events::{event_queue, EventReceiver};
use owner::{OwnerSetup, Task};
use state::{lock, SharedState};

struct OwnerHandle {
    tasks: Sender<Task>,
    thread: Option<JoinHandle<()>>,
}

/// A browser surface rendered offscreen and polled as a texture
pub struct WebSurfaceBridge {
    config: BridgeConfig,
    factory: EngineFactory,
    shared: Arc<SharedState>,
    capture: CaptureBridge,
    owner: Mutex<Option<OwnerHandle>>,
    events: EventReceiver,
}

impl WebSurfaceBridge {
    /// Create an uninitialized bridge; `factory` builds the engine on the
    /// surface-owning thread once [`initialize`](Self::initialize) runs.
    pub fn new(config: BridgeConfig, factory: EngineFactory) -> Self {
        let (sender, events) = event_queue(config.event_queue_capacity());
        Self {
            capture: CaptureBridge::new(&config),
            config,
            factory,
            shared: Arc::new(SharedState::new(sender)),
            owner: Mutex::new(None),
            events,
        }
    }

    /// Start asynchronous setup of a `width` x `height` surface showing
    /// `initial_url`.
    ///
    /// Returns true once setup is running or done; repeated calls are
    /// no-ops. Returns false for zero dimensions, after `destroy`, or when
    /// the surface-owning thread cannot be started.
    pub fn initialize(&self, width: u32, height: u32, initial_url: &str) -> bool {
        let mut lifecycle = lock(&self.shared.lifecycle);
        match *lifecycle {
            Lifecycle::Initializing | Lifecycle::Ready => return true,
            Lifecycle::Destroyed => {
                tracing::debug!("initialize after destroy ignored");
                return false;
            }
            Lifecycle::Uninitialized => {}
        }

        let Some(viewport) = Viewport::new(width, height) else {
            tracing::warn!("Refusing to initialize a {}x{} surface", width, height);
            return false;
        };

        // A previous setup that failed has already left its thread
        if let Some(previous) = lock(&self.owner).take() {
            join_owner(previous);
        }

        *lock(&self.shared.viewport) = Some(viewport);
        *lock(&self.shared.navigation) = NavigationCache::default();
        *lock(&self.shared.capture) =
            CaptureState::held_until(Instant::now() + self.config.first_frame_grace());

        let (tasks, task_rx) = crossbeam_channel::unbounded();
        let (reply_tx, replies) = crossbeam_channel::bounded(1);
        let spawned = owner::spawn(OwnerSetup {
            shared: self.shared.clone(),
            config: self.config.clone(),
            factory: self.factory.clone(),
            viewport,
            initial_url: initial_url.to_string(),
            tasks: task_rx,
            replies: reply_tx,
        });

        let thread = match spawned {
            Ok(thread) => thread,
            Err(e) => {
                tracing::error!("Failed to start surface: {}", e);
                *lock(&self.shared.viewport) = None;
                return false;
            }
        };

        self.capture.connect(replies);
        *lock(&self.owner) = Some(OwnerHandle {
            tasks,
            thread: Some(thread),
        });

        tracing::info!(
            "Bridge lifecycle {:?} -> {:?} ({}x{}, {})",
            *lifecycle,
            Lifecycle::Initializing,
            width,
            height,
            initial_url
        );
        *lifecycle = Lifecycle::Initializing;
        true
    }

    /// Request a new viewport; the surface is reallocated on the owner
    /// thread and later polls only return frames of the new size.
    pub fn resize(&self, width: u32, height: u32) {
        if !self.is_initialized() {
            tracing::trace!("resize before ready ignored");
            return;
        }
        let Some(viewport) = Viewport::new(width, height) else {
            tracing::warn!("Ignoring resize to {}x{}", width, height);
            return;
        };

        {
            let mut current = lock(&self.shared.viewport);
            if *current == Some(viewport) {
                return;
            }
            *current = Some(viewport);
        }
        self.submit(Task::Resize { width, height });
    }

    /// Poll for a new frame. `None` means "no new frame, reuse the previous
    /// texture": not ready, nothing to capture yet, or the capture missed
    /// its deadline.
    pub fn capture_frame(&self) -> Option<Frame> {
        let tasks = lock(&self.owner).as_ref()?.tasks.clone();
        self.capture.capture(&self.shared, &tasks)
    }

    /// Poll for new pixels as tightly packed RGBA8; empty when there is no
    /// new frame
    pub fn get_pixel_data(&self) -> Vec<u8> {
        self.capture_frame()
            .map(|frame| frame.pixels)
            .unwrap_or_default()
    }

    // === Navigation ===

    pub fn load_url(&self, url: &str) {
        self.submit_when_ready(Task::LoadUrl(url.to_string()));
    }

    pub fn go_back(&self) {
        self.submit_when_ready(Task::GoBack);
    }

    pub fn go_forward(&self) {
        self.submit_when_ready(Task::GoForward);
    }

    pub fn reload(&self) {
        self.submit_when_ready(Task::Reload);
    }

    pub fn stop_loading(&self) {
        self.submit_when_ready(Task::StopLoading);
    }

    /// Run a script in the page; its result is discarded
    pub fn execute_javascript(&self, script: &str) {
        self.submit_when_ready(Task::Script(script.to_string()));
    }

    // === Input ===

    pub fn touch_down(&self, x: f32, y: f32) {
        self.send_touch(TouchInput::Down { x, y });
    }

    pub fn touch_move(&self, x: f32, y: f32) {
        self.send_touch(TouchInput::Move { x, y });
    }

    pub fn touch_up(&self, x: f32, y: f32) {
        self.send_touch(TouchInput::Up { x, y });
    }

    pub fn touch_cancel(&self) {
        self.send_touch(TouchInput::Cancel);
    }

    /// Press and release at one point, with the release delayed so click
    /// detection in the page sees a real click
    pub fn tap(&self, x: f32, y: f32) {
        self.send_touch(TouchInput::Tap { x, y });
    }

    pub fn send_touch(&self, input: TouchInput) {
        self.submit_when_ready(Task::Touch(input));
    }

    pub fn key_event(&self, event: KeyboardEvent) {
        self.submit_when_ready(Task::Key(event));
    }

    /// Append `text` to the focused element
    pub fn input_text(&self, text: &str) {
        let literal = serde_json::Value::from(text).to_string();
        let script = format!(
            "(function(t){{var el=document.activeElement;if(el&&('value' in el)){{el.value+=t;\
             el.dispatchEvent(new Event('input',{{bubbles:true}}));}}}})({literal});"
        );
        self.submit_when_ready(Task::Script(script));
    }

    // === Scrolling ===

    pub fn scroll_to_position(&self, y: i32) {
        self.submit_when_ready(Task::Script(format!("window.scrollTo(0, {y});")));
    }

    pub fn scroll_by_amount(&self, dy: i32) {
        self.submit_when_ready(Task::Script(format!("window.scrollBy(0, {dy});")));
    }

    /// Ask for the page's scroll metrics; the answer arrives as a
    /// [`BridgeEvent::ScrollInfoReceived`]. Before the surface is ready the
    /// answer is immediate and all zeroes.
    pub fn get_scroll_info(&self) {
        match self.lifecycle() {
            Lifecycle::Ready => self.submit(Task::QueryScroll),
            Lifecycle::Destroyed => {}
            Lifecycle::Uninitialized | Lifecycle::Initializing => {
                self.shared
                    .emit(BridgeEvent::ScrollInfoReceived(ScrollMetrics::default()));
            }
        }
    }

    // === Cached state ===

    pub fn width(&self) -> u32 {
        self.shared.viewport().map_or(0, |v| v.width)
    }

    pub fn height(&self) -> u32 {
        self.shared.viewport().map_or(0, |v| v.height)
    }

    pub fn url(&self) -> String {
        lock(&self.shared.navigation).url.clone()
    }

    pub fn title(&self) -> String {
        lock(&self.shared.navigation).title.clone()
    }

    pub fn progress(&self) -> u8 {
        lock(&self.shared.navigation).progress
    }

    pub fn can_go_back(&self) -> bool {
        lock(&self.shared.navigation).can_go_back
    }

    pub fn can_go_forward(&self) -> bool {
        lock(&self.shared.navigation).can_go_forward
    }

    pub fn navigation(&self) -> NavigationCache {
        lock(&self.shared.navigation).clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.lifecycle().is_ready()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.shared.lifecycle()
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    // === Events ===

    /// Next queued event without waiting
    pub fn poll_event(&self) -> Option<BridgeEvent> {
        self.events.try_recv()
    }

    /// All queued events, oldest first
    pub fn drain_events(&self) -> Vec<BridgeEvent> {
        self.events.drain()
    }

    /// Wait for the next event; `None` once the bridge is destroyed and
    /// every event raised before that has been taken
    pub async fn next_event(&self) -> Option<BridgeEvent> {
        self.events.recv().await
    }

    /// Tear down the surface. Terminal: every later call is a no-op.
    pub fn destroy(&self) {
        {
            let mut lifecycle = lock(&self.shared.lifecycle);
            if *lifecycle == Lifecycle::Destroyed {
                return;
            }
            tracing::info!("Bridge lifecycle {:?} -> {:?}", *lifecycle, Lifecycle::Destroyed);
            *lifecycle = Lifecycle::Destroyed;
        }
        *lock(&self.shared.viewport) = None;
        self.shared.close_events();
        self.submit(Task::Destroy);
    }

    fn submit_when_ready(&self, task: Task) {
        if !self.is_initialized() {
            tracing::trace!("Dropping {:?}, surface not ready", task);
            return;
        }
        self.submit(task);
    }

    fn submit(&self, task: Task) {
        if let Err(e) = self.try_submit(task) {
            tracing::debug!("Task dropped: {}", e);
        }
    }

    fn try_submit(&self, task: Task) -> Result<(), WebviewError> {
        let owner = lock(&self.owner);
        let handle = owner.as_ref().ok_or(WebviewError::NoSurface)?;
        handle.tasks.send(task).map_err(|e| {
            tracing::trace!("Unsent task: {:?}", e.into_inner());
            WebviewError::ChannelClosed
        })
    }
}

impl Drop for WebSurfaceBridge {
    fn drop(&mut self) {
        self.destroy();
        if let Some(handle) = lock(&self.owner).take() {
            join_owner(handle);
        }
    }
}

fn join_owner(handle: OwnerHandle) {
    let OwnerHandle { tasks, thread } = handle;
    // Disconnecting the queue stops an owner that never saw a destroy task
    drop(tasks);
    if let Some(thread) = thread {
        if thread.join().is_err() {
            tracing::error!("Surface-owning thread panicked");
        }
    }
}
