//! Events emitted by the bridge toward the embedding engine.

use serde::{Deserialize, Serialize};

use crate::IpcError;

/// Lifecycle and capture notifications, delivered in the order they were raised
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum BridgeEvent {
    /// Navigation to `url` began
    PageStarted { url: String },

    /// Navigation to `url` finished
    PageLoaded { url: String },

    /// Load progress, 0..=100
    ProgressChanged { percent: u8 },

    /// Document title changed
    TitleChanged { title: String },

    /// A capture completed and its pixels were handed to a poller
    TextureUpdated,

    /// Answer to a scroll metrics query
    ScrollInfoReceived(ScrollMetrics),

    /// Navigation failed; informational only
    LoadError { url: String, description: String },
}

/// Typed argument of an emitted signal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalArg {
    Str(String),
    Int(i64),
}

impl BridgeEvent {
    /// Signal name the embedding engine registers for this event
    pub fn signal_name(&self) -> &'static str {
        match self {
            Self::PageStarted { .. } => "page_started",
            Self::PageLoaded { .. } => "page_loaded",
            Self::ProgressChanged { .. } => "progress_changed",
            Self::TitleChanged { .. } => "title_changed",
            Self::TextureUpdated => "texture_updated",
            Self::ScrollInfoReceived(_) => "scroll_info_received",
            Self::LoadError { .. } => "load_error",
        }
    }

    /// Signal arguments in declaration order
    pub fn signal_args(&self) -> Vec<SignalArg> {
        match self {
            Self::PageStarted { url } | Self::PageLoaded { url } => {
                vec![SignalArg::Str(url.clone())]
            }
            Self::ProgressChanged { percent } => vec![SignalArg::Int(i64::from(*percent))],
            Self::TitleChanged { title } => vec![SignalArg::Str(title.clone())],
            Self::TextureUpdated => Vec::new(),
            Self::ScrollInfoReceived(metrics) => vec![SignalArg::Str(metrics.to_json())],
            Self::LoadError { url, description } => vec![
                SignalArg::Str(url.clone()),
                SignalArg::Str(description.clone()),
            ],
        }
    }
}

/// Scroll position of the page's root scroller, in CSS pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollMetrics {
    /// Distance scrolled from the top
    pub offset: f64,
    /// Full scrollable height of the document
    pub content_extent: f64,
    /// Height of the visible viewport
    pub viewport_extent: f64,
}

impl ScrollMetrics {
    /// Script that evaluates to a JSON string with these fields
    pub const QUERY_SCRIPT: &'static str = r#"(function() {
        return JSON.stringify({
            offset: window.scrollY || document.documentElement.scrollTop || 0,
            contentExtent: document.documentElement.scrollHeight || document.body.scrollHeight || 0,
            viewportExtent: window.innerHeight || document.documentElement.clientHeight || 0
        });
    })()"#;

    /// Largest offset the page can scroll to
    pub fn max_offset(&self) -> f64 {
        (self.content_extent - self.viewport_extent).max(0.0)
    }

    pub fn to_json(&self) -> String {
        // Only non-finite floats could fail, and serde_json writes those as null
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Parse the value returned by `QUERY_SCRIPT`.
    ///
    /// Engines differ in whether they hand back the JSON text itself or the
    /// script's string value JSON-encoded a second time; both are accepted.
    pub fn from_script_result(raw: &str) -> Result<Self, IpcError> {
        let value: serde_json::Value = serde_json::from_str(raw.trim())?;
        let value = match value {
            serde_json::Value::String(inner) => serde_json::from_str(&inner)?,
            other => other,
        };
        if !value.is_object() {
            return Err(IpcError::InvalidFormat(format!(
                "expected scroll metrics object, got {value}"
            )));
        }
        Ok(serde_json::from_value(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scroll_metrics_accepts_plain_and_double_encoded_json() {
        let plain = r#"{"offset":120,"contentExtent":4000,"viewportExtent":600}"#;
        let quoted = serde_json::to_string(plain).unwrap();

        let a = ScrollMetrics::from_script_result(plain).unwrap();
        let b = ScrollMetrics::from_script_result(&quoted).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.offset, 120.0);
        assert_eq!(a.max_offset(), 3400.0);
    }

    #[test]
    fn test_scroll_metrics_rejects_non_objects() {
        assert!(ScrollMetrics::from_script_result("null").is_err());
        assert!(ScrollMetrics::from_script_result("not json").is_err());
    }

    #[test]
    fn test_signal_form_of_events() {
        let progress = BridgeEvent::ProgressChanged { percent: 40 };
        assert_eq!(progress.signal_name(), "progress_changed");
        assert_eq!(progress.signal_args(), vec![SignalArg::Int(40)]);

        assert!(BridgeEvent::TextureUpdated.signal_args().is_empty());

        let info = BridgeEvent::ScrollInfoReceived(ScrollMetrics::default());
        assert_eq!(
            info.signal_args(),
            vec![SignalArg::Str(
                r#"{"offset":0.0,"contentExtent":0.0,"viewportExtent":0.0}"#.to_string()
            )]
        );
    }
}
