//! WebKitGTK browser engine for webtexture
//!
//! Hosts a wry/WebKitGTK webview inside a GTK offscreen window and renders
//! it into the bridge's surface through Cairo snapshots. All GTK objects
//! live on the surface-owning thread, which drives the GTK main loop
//! through [`BrowserEngine::poll`].

use gio::Cancellable;
use gtk::prelude::*;
use webkit2gtk::{WebView as WebKitWebView, WebViewExt};
use webtexture_frontend_core::{
    BrowserEngine, EngineFactory, EngineInit, FrontendError, ScriptCallback,
};
use webtexture_ipc::{KeyboardEvent, PointerEvent};

pub mod capture;
pub mod initialization;
pub mod input_keyboard;
pub mod input_pointer;
pub mod resize;
pub mod utils;

/// GTK iterations per engine poll
/// Must be sufficient for WebKit to process layout/paint operations
pub const POLL_GTK_ITERATIONS: u32 = 30;

/// Factory that builds a [`WebKitEngine`] on the surface-owning thread
pub fn factory() -> EngineFactory {
    std::sync::Arc::new(|init: EngineInit| {
        Ok(Box::new(WebKitEngine::new(init)?) as Box<dyn BrowserEngine>)
    })
}

/// WebKit engine rendering offscreen
///
/// Uses an offscreen GTK window with WebKitGTK to render pages, capturing
/// snapshots into the bridge's surface.
pub struct WebKitEngine {
    webview: wry::WebView,
    webkit_webview: WebKitWebView,
    container: gtk::Fixed,
    /// Offscreen window to host the container (needed for widget realization)
    offscreen_window: gtk::OffscreenWindow,
    size: (u32, u32),
}

impl BrowserEngine for WebKitEngine {
    fn load_url(&mut self, url: &str) {
        tracing::debug!("WebKit load: {}", url);
        self.webkit_webview.load_uri(url);
    }

    fn go_back(&mut self) {
        self.webkit_webview.go_back();
    }

    fn go_forward(&mut self) {
        self.webkit_webview.go_forward();
    }

    fn can_go_back(&self) -> bool {
        self.webkit_webview.can_go_back()
    }

    fn can_go_forward(&self) -> bool {
        self.webkit_webview.can_go_forward()
    }

    fn reload(&mut self) {
        self.webkit_webview.reload();
    }

    fn stop_loading(&mut self) {
        self.webkit_webview.stop_loading();
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.resize_webview(width, height);
    }

    fn render(&mut self, target: &mut image::RgbaImage) -> Result<(), FrontendError> {
        let snapshot = self.snapshot()?;
        image::imageops::overlay(target, &snapshot, 0, 0);
        Ok(())
    }

    fn dispatch_pointer(&mut self, event: PointerEvent) {
        self.inject_pointer(event);
    }

    fn dispatch_key(&mut self, event: &KeyboardEvent) {
        self.inject_keyboard(event);
    }

    fn evaluate_script(&mut self, script: &str, on_result: Option<ScriptCallback>) {
        let Some(on_result) = on_result else {
            self.webkit_webview
                .run_javascript(script, Cancellable::NONE, |_| {});
            return;
        };

        self.webkit_webview
            .run_javascript(script, Cancellable::NONE, move |result| {
                let value = match result {
                    Ok(js_result) => js_result
                        .js_value()
                        .map(|value| value.to_string())
                        .ok_or_else(|| FrontendError::ScriptFailed("no value".into())),
                    Err(e) => Err(FrontendError::ScriptFailed(e.to_string())),
                };
                on_result(value);
            });
    }

    fn poll(&mut self) {
        self.pump_gtk(POLL_GTK_ITERATIONS);
    }

    fn shutdown(&mut self) {
        tracing::info!("Shutting down WebKit engine");
        self.webkit_webview.stop_loading();
        self.offscreen_window.hide();
        self.offscreen_window.close();
    }
}
