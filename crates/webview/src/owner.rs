//! The surface-owning thread
//!
//! Exactly one thread creates the engine, owns the surface pair, dispatches
//! input and renders captures. Callers reach it only through the task queue
//! (fire-and-forget) and the capture reply slot.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use webtexture_config::BridgeConfig;
use webtexture_frontend_core::{
    BrowserEngine, EngineFactory, EngineInit, Frame, Lifecycle, SharedObserver,
};
use webtexture_ipc::{
    BridgeEvent, KeyboardEvent, PointerAction, PointerEvent, ScrollMetrics, TouchInput,
};

use crate::error::WebviewError;
use crate::events::BridgeObserver;
use crate::input::InputTranslator;
use crate::state::{lock, SharedState, Viewport};
use crate::surface::SurfaceBufferManager;

/// Injected after each page load; scrolling is driven through script instead
const HIDE_SCROLLBARS_SCRIPT: &str = r#"(function() {
    var style = document.createElement('style');
    style.textContent = '::-webkit-scrollbar { display: none !important; } ' +
        'html, body { scrollbar-width: none !important; -ms-overflow-style: none !important; }';
    document.head.appendChild(style);
})();"#;

/// Work submitted to the surface-owning thread, executed in FIFO order
#[derive(Debug)]
pub(crate) enum Task {
    Capture,
    Resize { width: u32, height: u32 },
    Touch(TouchInput),
    Key(KeyboardEvent),
    LoadUrl(String),
    GoBack,
    GoForward,
    Reload,
    StopLoading,
    Script(String),
    QueryScroll,
    Destroy,
}

/// Outcome of one capture task
#[derive(Debug)]
pub(crate) enum CaptureReply {
    Frame(Frame),
    Failed,
}

pub(crate) struct OwnerSetup {
    pub shared: Arc<SharedState>,
    pub config: BridgeConfig,
    pub factory: EngineFactory,
    pub viewport: Viewport,
    pub initial_url: String,
    pub tasks: Receiver<Task>,
    pub replies: Sender<CaptureReply>,
}

pub(crate) fn spawn(setup: OwnerSetup) -> Result<JoinHandle<()>, WebviewError> {
    let handle = std::thread::Builder::new()
        .name("webtexture-surface".to_string())
        .spawn(move || run(setup))?;
    Ok(handle)
}

fn run(setup: OwnerSetup) {
    let OwnerSetup {
        shared,
        config,
        factory,
        viewport,
        initial_url,
        tasks,
        replies,
    } = setup;

    let owner = Owner::start(shared.clone(), config, &factory, viewport, &initial_url, replies);
    match owner {
        Ok(mut owner) => owner.run(&tasks),
        Err(e) => {
            tracing::error!("Surface setup failed: {}", e);
            shared.transition(Lifecycle::Initializing, Lifecycle::Uninitialized);
            shared.emit(BridgeEvent::LoadError {
                url: initial_url,
                description: e.to_string(),
            });
        }
    }
}

#[derive(Debug)]
enum TimerAction {
    Pointer(PointerEvent),
    FirstFrame,
}

#[derive(Debug)]
struct Scheduled {
    at: Instant,
    seq: u64,
    action: TimerAction,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        (self.at, self.seq) == (other.at, other.seq)
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    // Reversed so the max-heap yields the earliest deadline first
    fn cmp(&self, other: &Self) -> Ordering {
        (other.at, other.seq).cmp(&(self.at, self.seq))
    }
}

struct Owner {
    engine: Box<dyn BrowserEngine>,
    surfaces: SurfaceBufferManager,
    translator: InputTranslator,
    timers: BinaryHeap<Scheduled>,
    next_seq: u64,
    shared: Arc<SharedState>,
    config: BridgeConfig,
    replies: Sender<CaptureReply>,
}

impl Owner {
    fn start(
        shared: Arc<SharedState>,
        config: BridgeConfig,
        factory: &EngineFactory,
        viewport: Viewport,
        initial_url: &str,
        replies: Sender<CaptureReply>,
    ) -> Result<Self, WebviewError> {
        let mut surfaces = SurfaceBufferManager::new();
        surfaces.resize(viewport.width, viewport.height)?;

        let observer: SharedObserver = Arc::new(BridgeObserver::new(shared.clone()));
        let mut engine = (factory.as_ref())(EngineInit {
            width: viewport.width,
            height: viewport.height,
            user_agent: config.user_agent.clone(),
            observer,
        })?;

        if !initial_url.is_empty() {
            engine.load_url(initial_url);
        }

        let mut owner = Self {
            engine,
            surfaces,
            translator: InputTranslator::new(config.tap_release_delay()),
            timers: BinaryHeap::new(),
            next_seq: 0,
            shared,
            config,
            replies,
        };

        // Guarantees a first frame even if no navigation event ever fires
        owner.schedule(owner.config.first_frame_grace(), TimerAction::FirstFrame);

        owner
            .shared
            .transition(Lifecycle::Initializing, Lifecycle::Ready);
        Ok(owner)
    }

    fn run(&mut self, tasks: &Receiver<Task>) {
        let tick = self.config.owner_idle_tick();
        let mut last_pump = Instant::now();

        loop {
            let wait = self
                .timers
                .peek()
                .map_or(tick, |next| next.at.saturating_duration_since(Instant::now()).min(tick));

            match tasks.recv_timeout(wait) {
                Ok(Task::Destroy) => break,
                Ok(task) => self.handle(task),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::debug!("Bridge dropped, stopping surface-owning thread");
                    break;
                }
            }

            self.fire_due_timers(Instant::now());

            if last_pump.elapsed() >= tick {
                self.engine.poll();
                last_pump = Instant::now();
            }

            if self.shared.take_page_style_request() && self.config.hide_scrollbars {
                self.engine.evaluate_script(HIDE_SCROLLBARS_SCRIPT, None);
            }
        }

        self.teardown();
    }

    fn handle(&mut self, task: Task) {
        match task {
            Task::Capture => self.capture(),
            Task::Resize { width, height } => self.resize(width, height),
            Task::Touch(input) => {
                for dispatch in self.translator.translate(input, Instant::now()) {
                    if dispatch.delay.is_zero() {
                        self.dispatch_pointer(dispatch.event);
                    } else {
                        self.schedule(dispatch.delay, TimerAction::Pointer(dispatch.event));
                    }
                }
            }
            Task::Key(event) => {
                self.engine.dispatch_key(&event);
                self.shared.mark_dirty();
            }
            Task::LoadUrl(url) => self.engine.load_url(&url),
            Task::GoBack => {
                if self.engine.can_go_back() {
                    self.engine.go_back();
                }
            }
            Task::GoForward => {
                if self.engine.can_go_forward() {
                    self.engine.go_forward();
                }
            }
            Task::Reload => self.engine.reload(),
            Task::StopLoading => self.engine.stop_loading(),
            Task::Script(script) => {
                self.engine.evaluate_script(&script, None);
                self.shared.mark_dirty();
            }
            Task::QueryScroll => self.query_scroll(),
            // Handled by the run loop
            Task::Destroy => {}
        }
    }

    fn capture(&mut self) {
        let reply = match self
            .surfaces
            .render_frame(self.config.background, self.engine.as_mut())
        {
            Ok(frame) => {
                tracing::debug!("Captured {}x{} frame", frame.width, frame.height);
                CaptureReply::Frame(frame)
            }
            Err(e) => {
                tracing::error!("Error rendering surface: {}", e);
                CaptureReply::Failed
            }
        };

        if self.replies.try_send(reply).is_err() {
            tracing::warn!("Capture reply slot occupied, dropping frame");
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        let previous = self.surfaces.dimensions();
        match self.surfaces.resize(width, height) {
            Ok(()) => {
                tracing::info!("Surface resize: {:?} -> ({}, {})", previous, width, height);
                self.engine.resize(width, height);
                self.shared.mark_dirty();
            }
            Err(e) => {
                tracing::warn!("Surface resize to {}x{} dropped: {}", width, height, e);
                // The surviving pair stays authoritative unless a newer
                // request has already replaced this one
                let mut viewport = lock(&self.shared.viewport);
                if *viewport == Viewport::new(width, height) {
                    *viewport = previous.and_then(|(w, h)| Viewport::new(w, h));
                }
            }
        }
    }

    fn dispatch_pointer(&mut self, event: PointerEvent) {
        self.engine.dispatch_pointer(event);
        if event.action != PointerAction::Cancel {
            self.shared.mark_dirty();
        }
    }

    fn query_scroll(&mut self) {
        let shared = self.shared.clone();
        self.engine.evaluate_script(
            ScrollMetrics::QUERY_SCRIPT,
            Some(Box::new(move |result| {
                let metrics = result
                    .map_err(|e| e.to_string())
                    .and_then(|raw| {
                        ScrollMetrics::from_script_result(&raw).map_err(|e| e.to_string())
                    })
                    .unwrap_or_else(|e| {
                        tracing::warn!("Scroll query failed: {}", e);
                        ScrollMetrics::default()
                    });
                shared.emit(BridgeEvent::ScrollInfoReceived(metrics));
            })),
        );
    }

    fn schedule(&mut self, delay: Duration, action: TimerAction) {
        self.timers.push(Scheduled {
            at: Instant::now() + delay,
            seq: self.next_seq,
            action,
        });
        self.next_seq += 1;
    }

    fn fire_due_timers(&mut self, now: Instant) {
        while self.timers.peek().is_some_and(|next| next.at <= now) {
            let Some(due) = self.timers.pop() else { break };
            match due.action {
                TimerAction::Pointer(event) => self.dispatch_pointer(event),
                TimerAction::FirstFrame => {
                    tracing::debug!("First-frame grace elapsed, requesting capture");
                    self.shared.mark_dirty();
                }
            }
        }
    }

    fn teardown(&mut self) {
        tracing::info!("Tearing down surface");
        self.engine.stop_loading();
        self.engine.shutdown();
        self.surfaces.release();
        self.translator.reset();
        self.timers.clear();
    }
}
