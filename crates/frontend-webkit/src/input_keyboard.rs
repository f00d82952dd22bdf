//! Keyboard input injection for the WebKit engine

use gio::Cancellable;
use webkit2gtk::WebViewExt;
use webtexture_ipc::KeyboardEvent;

use crate::utils::js_string;
use crate::WebKitEngine;

impl WebKitEngine {
    /// Inject a keyboard event into the focused element
    pub fn inject_keyboard(&mut self, event: &KeyboardEvent) {
        self.webkit_webview
            .run_javascript(&keyboard_js(event), Cancellable::NONE, |_| {});
    }
}

fn keyboard_js(event: &KeyboardEvent) -> String {
    let event_type = if event.pressed { "keydown" } else { "keyup" };
    format!(
        r#"(function() {{
                const target = document.activeElement || document.body;
                target.dispatchEvent(new KeyboardEvent('{event_type}', {{
                    bubbles: true,
                    cancelable: true,
                    key: {key},
                    shiftKey: {shift},
                    ctrlKey: {ctrl},
                    altKey: {alt},
                    metaKey: {meta},
                    view: window
                }}));
            }})()"#,
        key = js_string(&event.key),
        shift = event.modifiers.shift,
        ctrl = event.modifiers.ctrl,
        alt = event.modifiers.alt,
        meta = event.modifiers.meta
    )
}
