//! Headless software backend for webtexture
//!
//! `HeadlessEngine` implements [`BrowserEngine`] without a display: pages are
//! painted deterministically from their URL, navigation notifications are
//! raised one per poll, and the scroll scripts the bridge sends are
//! interpreted directly. Used by tests and by the demo binary.

mod navigation;
mod paint;

pub use navigation::{History, LoadStep};
pub use paint::{accent_color, paint, PageView, STRIPE_HEIGHT};

use std::sync::Arc;

use webtexture_frontend_core::{
    BrowserEngine, EngineFactory, EngineInit, FrontendError, ScriptCallback, SharedObserver,
};
use webtexture_ipc::{KeyboardEvent, PointerAction, PointerEvent, ScrollMetrics};

/// Pages other than `about:blank` are this many viewports tall
pub const CONTENT_VIEWPORTS: u32 = 4;

/// Factory that builds a [`HeadlessEngine`] on the surface-owning thread
pub fn factory() -> EngineFactory {
    Arc::new(|init: EngineInit| Ok(Box::new(HeadlessEngine::new(init)) as Box<dyn BrowserEngine>))
}

pub struct HeadlessEngine {
    observer: SharedObserver,
    width: u32,
    height: u32,
    history: History,
    scroll_y: f64,
    pointer: Option<(f32, f32)>,
}

impl HeadlessEngine {
    pub fn new(init: EngineInit) -> Self {
        tracing::info!("Headless engine created at {}x{}", init.width, init.height);
        Self {
            observer: init.observer,
            width: init.width,
            height: init.height,
            history: History::new(),
            scroll_y: 0.0,
            pointer: None,
        }
    }

    pub fn scroll_metrics(&self) -> ScrollMetrics {
        ScrollMetrics {
            offset: self.scroll_y,
            content_extent: f64::from(self.content_height()),
            viewport_extent: f64::from(self.height),
        }
    }

    fn content_height(&self) -> u32 {
        match self.history.current() {
            None | Some("about:blank") => self.height,
            Some(_) => self.height.saturating_mul(CONTENT_VIEWPORTS),
        }
    }

    /// Returns true if the offset moved
    fn scroll_to(&mut self, y: f64) -> bool {
        let max = self.scroll_metrics().max_offset();
        let previous = self.scroll_y;
        self.scroll_y = y.clamp(0.0, max);
        self.scroll_y != previous
    }

    /// Handle the scroll scripts the bridge generates; false for anything else.
    /// A scroll that moves the page repaints it, which observers hear about.
    fn run_scroll_script(&mut self, script: &str) -> bool {
        let target = if let Some(y) = parse_scroll_call(script, "window.scrollTo(0, ") {
            y
        } else if let Some(dy) = parse_scroll_call(script, "window.scrollBy(0, ") {
            self.scroll_y + dy
        } else {
            return false;
        };
        if self.scroll_to(target) {
            self.observer.content_changed();
        }
        true
    }

    fn raise(&mut self, step: LoadStep) {
        match step {
            LoadStep::Started(url) => {
                self.scroll_y = 0.0;
                self.observer.page_started(&url);
            }
            LoadStep::Progress(percent) => self.observer.progress_changed(percent),
            LoadStep::Title(title) => self.observer.title_changed(&title),
            LoadStep::Finished(url) => self.observer.page_finished(
                &url,
                self.history.can_go_back(),
                self.history.can_go_forward(),
            ),
            LoadStep::Failed { url, description } => {
                self.observer.load_failed(&url, &description);
            }
        }
    }
}

fn parse_scroll_call(script: &str, prefix: &str) -> Option<f64> {
    script
        .trim()
        .strip_prefix(prefix)?
        .strip_suffix(");")?
        .trim()
        .parse()
        .ok()
}

impl BrowserEngine for HeadlessEngine {
    fn load_url(&mut self, url: &str) {
        tracing::debug!("Headless load: {}", url);
        self.history.navigate(url);
    }

    fn go_back(&mut self) {
        self.history.back();
    }

    fn go_forward(&mut self) {
        self.history.forward();
    }

    fn can_go_back(&self) -> bool {
        self.history.can_go_back()
    }

    fn can_go_forward(&self) -> bool {
        self.history.can_go_forward()
    }

    fn reload(&mut self) {
        self.history.reload();
    }

    fn stop_loading(&mut self) {
        self.history.stop();
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.scroll_to(self.scroll_y);
    }

    fn render(&mut self, target: &mut image::RgbaImage) -> Result<(), FrontendError> {
        if target.dimensions() != (self.width, self.height) {
            return Err(FrontendError::InvalidDimensions {
                width: target.width(),
                height: target.height(),
            });
        }
        let Some(url) = self.history.current() else {
            return Ok(());
        };
        paint(
            target,
            &PageView {
                url,
                scroll_y: self.scroll_y,
                pointer: self.pointer,
            },
        );
        Ok(())
    }

    fn dispatch_pointer(&mut self, event: PointerEvent) {
        self.pointer = match event.action {
            PointerAction::Down | PointerAction::Move => Some((event.x, event.y)),
            PointerAction::Up | PointerAction::Cancel => None,
        };
    }

    fn dispatch_key(&mut self, event: &KeyboardEvent) {
        tracing::trace!("Headless key {:?} pressed={}", event.key, event.pressed);
    }

    fn evaluate_script(&mut self, script: &str, on_result: Option<ScriptCallback>) {
        let result = if script == ScrollMetrics::QUERY_SCRIPT {
            // The query script returns a string, so its value arrives JSON-encoded
            serde_json::to_string(&self.scroll_metrics().to_json())
                .map_err(|e| FrontendError::ScriptFailed(e.to_string()))
        } else {
            if !self.run_scroll_script(script) {
                tracing::trace!("Headless engine ignores script: {}", script);
            }
            Ok("null".to_string())
        };

        if let Some(callback) = on_result {
            callback(result);
        }
    }

    fn poll(&mut self) {
        if let Some(step) = self.history.next_step() {
            self.raise(step);
        }
    }

    fn shutdown(&mut self) {
        tracing::debug!("Headless engine shut down");
        self.history.stop();
    }
}
