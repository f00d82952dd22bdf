//! WebKit engine initialization

use gtk::prelude::*;
use webkit2gtk::{LoadEvent, WebResourceExt, WebView as WebKitWebView, WebViewExt};
use webtexture_frontend_core::{EngineInit, FrontendError, SharedObserver};
use wry::WebViewBuilderExtUnix;

use crate::WebKitEngine;

/// GTK iterations run after showing the offscreen window
const REALIZE_GTK_ITERATIONS: u32 = 50;

impl WebKitEngine {
    /// Create the engine; must run on the thread that will own it
    pub fn new(init: EngineInit) -> Result<Self, FrontendError> {
        let EngineInit {
            width,
            height,
            user_agent,
            observer,
        } = init;

        // Initialize GTK if not already done
        if !gtk::is_initialized() {
            gtk::init()
                .map_err(|e| FrontendError::Backend(format!("Failed to initialize GTK: {}", e)))?;
        }

        // Create an offscreen window to host the webview container
        // This is required for the widgets to be properly realized
        let offscreen_window = gtk::OffscreenWindow::new();
        offscreen_window.set_default_size(width as i32, height as i32);

        let container = gtk::Fixed::new();
        container.set_size_request(width as i32, height as i32);
        offscreen_window.add(&container);

        // CRITICAL: Set explicit bounds - without this, wry defaults to a small size
        let mut builder = wry::WebViewBuilder::new()
            .with_url("about:blank")
            .with_bounds(wry::Rect {
                position: wry::dpi::PhysicalPosition::new(0, 0).into(),
                size: wry::dpi::PhysicalSize::new(width, height).into(),
            });
        if let Some(user_agent) = user_agent.as_deref() {
            builder = builder.with_user_agent(user_agent);
        }
        let webview = builder
            .build_gtk(&container)
            .map_err(|e| FrontendError::Backend(format!("Failed to create webview: {}", e)))?;

        // wry places the WebView as a child of the container
        let webkit_webview = Self::find_webkit_webview(&container).ok_or_else(|| {
            FrontendError::Backend("Failed to find WebKitWebView in container".into())
        })?;

        // Without this, the viewport defaults to 200x200 and coordinate mapping breaks
        webkit_webview.set_size_request(width as i32, height as i32);
        offscreen_window.resize(width as i32, height as i32);

        connect_observer(&webkit_webview, observer);

        offscreen_window.show_all();

        let mut engine = Self {
            webview,
            webkit_webview,
            container,
            offscreen_window,
            size: (width, height),
        };
        engine.pump_gtk(REALIZE_GTK_ITERATIONS);

        if !engine.container.is_realized() {
            tracing::warn!("Container widget not realized - snapshots may be empty");
        } else {
            tracing::debug!("Container widget realized successfully");
        }

        Ok(engine)
    }

    /// Find the WebKitWebView widget within a GTK container
    pub(crate) fn find_webkit_webview(container: &gtk::Fixed) -> Option<WebKitWebView> {
        for child in container.children() {
            if let Ok(wv) = child.clone().downcast::<WebKitWebView>() {
                return Some(wv);
            }
            // Also check if it's wrapped in another container
            if let Ok(bin) = child.downcast::<gtk::Bin>() {
                if let Some(inner) = bin.child() {
                    if let Ok(wv) = inner.downcast::<WebKitWebView>() {
                        return Some(wv);
                    }
                }
            }
        }
        None
    }
}

/// Forward WebKit's navigation signals to the bridge
fn connect_observer(webkit_webview: &WebKitWebView, observer: SharedObserver) {
    let on_load = observer.clone();
    webkit_webview.connect_load_changed(move |webview, load_event| {
        let uri = webview.uri().map(|u| u.to_string()).unwrap_or_default();
        match load_event {
            LoadEvent::Started => on_load.page_started(&uri),
            LoadEvent::Finished => {
                tracing::info!("WebKitGTK load finished: {}", uri);
                on_load.page_finished(&uri, webview.can_go_back(), webview.can_go_forward());
            }
            _ => {}
        }
    });

    let on_progress = observer.clone();
    webkit_webview.connect_estimated_load_progress_notify(move |webview| {
        let percent = (webview.estimated_load_progress() * 100.0).round().clamp(0.0, 100.0);
        on_progress.progress_changed(percent as u8);
    });

    let on_title = observer.clone();
    webkit_webview.connect_title_notify(move |webview| {
        let title = webview.title().map(|t| t.to_string()).unwrap_or_default();
        on_title.title_changed(&title);
    });

    // Images and styles that land after the load event repaint the page
    let on_resource = observer.clone();
    webkit_webview.connect_resource_load_started(move |_webview, resource, _request| {
        let on_finished = on_resource.clone();
        resource.connect_finished(move |_resource| on_finished.content_changed());
    });

    webkit_webview.connect_load_failed(move |_webview, _load_event, uri, error| {
        observer.load_failed(uri, &error.to_string());
        // Let WebKit show its own error page
        false
    });
}
