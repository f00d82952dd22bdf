//! Utility functions for the WebKit engine

use crate::WebKitEngine;

impl WebKitEngine {
    /// Run up to `iterations` pending GTK events without blocking
    pub(crate) fn pump_gtk(&self, iterations: u32) {
        for _ in 0..iterations {
            if !gtk::events_pending() {
                break;
            }
            gtk::main_iteration_do(false);
        }
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }
}

/// Quote `text` as a JavaScript string literal
pub(crate) fn js_string(text: &str) -> String {
    serde_json::Value::from(text).to_string()
}
