//! WebKit resize handling

use gio::Cancellable;
use gtk::prelude::*;
use webkit2gtk::WebViewExt;

use crate::WebKitEngine;

/// GTK iterations run so a resize propagates before the next snapshot
const RESIZE_GTK_ITERATIONS: u32 = 30;

impl WebKitEngine {
    /// Resize the webview to new dimensions
    pub fn resize_webview(&mut self, width: u32, height: u32) {
        tracing::info!("Webview resize: {:?} -> ({}, {})", self.size, width, height);
        self.size = (width, height);

        self.offscreen_window
            .set_default_size(width as i32, height as i32);
        self.offscreen_window.resize(width as i32, height as i32);
        self.container.set_size_request(width as i32, height as i32);
        self.webkit_webview
            .set_size_request(width as i32, height as i32);

        // Without this the webview renders fuzzy inside gtk::Fixed
        if let Err(e) = self.webview.set_bounds(wry::Rect {
            position: wry::dpi::PhysicalPosition::new(0, 0).into(),
            size: wry::dpi::PhysicalSize::new(width, height).into(),
        }) {
            tracing::warn!("Failed to update webview bounds: {}", e);
        }

        // Pages that size themselves from window dimensions need the event
        self.webkit_webview.run_javascript(
            "window.dispatchEvent(new Event('resize'));",
            Cancellable::NONE,
            |_| {},
        );

        self.pump_gtk(RESIZE_GTK_ITERATIONS);
    }
}
