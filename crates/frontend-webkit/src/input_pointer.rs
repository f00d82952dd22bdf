//! Pointer input injection for the WebKit engine
//!
//! Native pointer events become DOM touch and mouse events dispatched at the
//! element under the point, so pages built for either input model react.

use gio::Cancellable;
use webkit2gtk::WebViewExt;
use webtexture_ipc::{PointerAction, PointerEvent};

use crate::WebKitEngine;

impl WebKitEngine {
    /// Inject a pointer event into the webview
    pub fn inject_pointer(&mut self, event: PointerEvent) {
        if event.action == PointerAction::Down {
            tracing::debug!(
                "inject_pointer Down at ({:.1}, {:.1}), webview size: {:?}",
                event.x,
                event.y,
                self.size
            );
        }

        self.webkit_webview
            .run_javascript(&pointer_js(&event), Cancellable::NONE, |_| {});
    }
}

fn pointer_js(event: &PointerEvent) -> String {
    let (touch_type, mouse_type, click) = match event.action {
        PointerAction::Down => ("touchstart", "mousedown", false),
        PointerAction::Move => ("touchmove", "mousemove", false),
        PointerAction::Up => ("touchend", "mouseup", true),
        PointerAction::Cancel => ("touchcancel", "", false),
    };

    format!(
        r#"(function() {{
                const cx = {x};
                const cy = {y};
                const target = document.elementFromPoint(cx, cy) || document.body;
                if ('{touch_type}' === 'touchstart' && target.focus) {{
                    target.focus({{ preventScroll: true }});
                }}
                if (typeof Touch !== 'undefined') {{
                    const touch = new Touch({{
                        identifier: {id},
                        target: target,
                        clientX: cx,
                        clientY: cy
                    }});
                    const active = '{touch_type}' === 'touchend' || '{touch_type}' === 'touchcancel' ? [] : [touch];
                    target.dispatchEvent(new TouchEvent('{touch_type}', {{
                        bubbles: true,
                        cancelable: true,
                        touches: active,
                        targetTouches: active,
                        changedTouches: [touch]
                    }}));
                }}
                if ('{mouse_type}') {{
                    target.dispatchEvent(new MouseEvent('{mouse_type}', {{
                        bubbles: true,
                        cancelable: true,
                        clientX: cx,
                        clientY: cy,
                        button: 0,
                        view: window
                    }}));
                }}
                if ({click}) {{
                    target.dispatchEvent(new MouseEvent('click', {{
                        bubbles: true,
                        cancelable: true,
                        clientX: cx,
                        clientY: cy,
                        button: 0,
                        view: window
                    }}));
                }}
            }})()"#,
        x = event.x,
        y = event.y,
        id = event.gesture_id,
    )
}
