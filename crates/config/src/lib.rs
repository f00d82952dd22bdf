//! Shared configuration for webtexture
//!
//! This crate provides the single source of truth for capture pacing,
//! handoff timeouts, and surface defaults used by the bridge and its
//! browser backends.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default surface width in pixels
pub const DEFAULT_WIDTH: u32 = 1280;

/// Default surface height in pixels
pub const DEFAULT_HEIGHT: u32 = 720;

/// Largest accepted surface side; matches common GPU texture limits
pub const MAX_SURFACE_DIMENSION: u32 = 16384;

/// Minimum spacing between two idle captures (~60 FPS)
pub const DEFAULT_MIN_CAPTURE_INTERVAL_MS: u64 = 16;

/// Ceiling after which a capture runs even if nothing reported a change
pub const DEFAULT_FORCE_CAPTURE_INTERVAL_MS: u64 = 100;

/// How long a polling thread waits for the surface-owning thread
pub const DEFAULT_CAPTURE_TIMEOUT_MS: u64 = 100;

/// Delay before the first frame is allowed after initialization
pub const DEFAULT_FIRST_FRAME_GRACE_MS: u64 = 500;

/// Gap between the synthesized down and up of a tap
pub const DEFAULT_TAP_RELEASE_DELAY_MS: u64 = 50;

/// Bound on undrained events; once full, newly raised events are dropped
pub const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 256;

/// Engine pump interval while the owner thread has no queued task
pub const DEFAULT_OWNER_IDLE_TICK_MS: u64 = 8;

/// Desktop user agent so pages serve their full layout
pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Prefix for environment overrides, e.g. `WEBTEXTURE_CAPTURE_TIMEOUT_MS`
pub const ENV_PREFIX: &str = "WEBTEXTURE_";

/// Bridge configuration for capture pacing and surface setup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Idle polls closer together than this return no frame
    pub min_capture_interval_ms: u64,
    /// A capture is authorized at least this often regardless of dirty state
    pub force_capture_interval_ms: u64,
    /// Upper bound on how long `capture` blocks the caller
    pub capture_timeout_ms: u64,
    /// No capture is authorized until this long after initialization
    pub first_frame_grace_ms: u64,
    /// Delay between the down and up halves of a tap
    pub tap_release_delay_ms: u64,
    /// Color painted into the surface before the page renders (RGBA)
    pub background: [u8; 4],
    /// Capacity of the lifecycle event queue
    pub event_queue_capacity: usize,
    /// Engine pump interval on the surface-owning thread
    pub owner_idle_tick_ms: u64,
    /// Inject CSS hiding scrollbars once a page finishes loading
    pub hide_scrollbars: bool,
    /// User agent handed to the engine, if it supports overriding it
    pub user_agent: Option<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            min_capture_interval_ms: DEFAULT_MIN_CAPTURE_INTERVAL_MS,
            force_capture_interval_ms: DEFAULT_FORCE_CAPTURE_INTERVAL_MS,
            capture_timeout_ms: DEFAULT_CAPTURE_TIMEOUT_MS,
            first_frame_grace_ms: DEFAULT_FIRST_FRAME_GRACE_MS,
            tap_release_delay_ms: DEFAULT_TAP_RELEASE_DELAY_MS,
            background: [255, 255, 255, 255],
            event_queue_capacity: DEFAULT_EVENT_QUEUE_CAPACITY,
            owner_idle_tick_ms: DEFAULT_OWNER_IDLE_TICK_MS,
            hide_scrollbars: true,
            user_agent: Some(DESKTOP_USER_AGENT.to_string()),
        }
    }
}

impl BridgeConfig {
    /// Defaults with any `WEBTEXTURE_*` environment overrides applied
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(format!("{ENV_PREFIX}{key}")).ok());
        config
    }

    /// Parse a JSON document; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Apply overrides from an arbitrary key lookup (keys without the prefix)
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        override_parsed(&lookup, "MIN_CAPTURE_INTERVAL_MS", &mut self.min_capture_interval_ms);
        override_parsed(&lookup, "FORCE_CAPTURE_INTERVAL_MS", &mut self.force_capture_interval_ms);
        override_parsed(&lookup, "CAPTURE_TIMEOUT_MS", &mut self.capture_timeout_ms);
        override_parsed(&lookup, "FIRST_FRAME_GRACE_MS", &mut self.first_frame_grace_ms);
        override_parsed(&lookup, "TAP_RELEASE_DELAY_MS", &mut self.tap_release_delay_ms);
        override_parsed(&lookup, "EVENT_QUEUE_CAPACITY", &mut self.event_queue_capacity);
        override_parsed(&lookup, "OWNER_IDLE_TICK_MS", &mut self.owner_idle_tick_ms);
        override_parsed(&lookup, "HIDE_SCROLLBARS", &mut self.hide_scrollbars);
        if let Some(agent) = lookup("USER_AGENT") {
            self.user_agent = if agent.is_empty() { None } else { Some(agent) };
        }
    }

    pub fn min_capture_interval(&self) -> Duration {
        Duration::from_millis(self.min_capture_interval_ms)
    }

    pub fn force_capture_interval(&self) -> Duration {
        Duration::from_millis(self.force_capture_interval_ms)
    }

    pub fn capture_timeout(&self) -> Duration {
        Duration::from_millis(self.capture_timeout_ms)
    }

    pub fn first_frame_grace(&self) -> Duration {
        Duration::from_millis(self.first_frame_grace_ms)
    }

    pub fn tap_release_delay(&self) -> Duration {
        Duration::from_millis(self.tap_release_delay_ms)
    }

    /// Never zero, so the owner loop cannot spin
    pub fn owner_idle_tick(&self) -> Duration {
        Duration::from_millis(self.owner_idle_tick_ms.max(1))
    }

    /// Never zero; a zero-capacity queue would drop every event
    pub fn event_queue_capacity(&self) -> usize {
        self.event_queue_capacity.max(1)
    }
}

fn override_parsed<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    slot: &mut T,
) {
    let Some(raw) = lookup(key) else { return };
    match raw.trim().parse() {
        Ok(value) => *slot = value,
        Err(_) => tracing::warn!("Ignoring unparsable {}{}={:?}", ENV_PREFIX, key, raw),
    }
}
