//! Input event types for touch and keyboard.

use serde::{Deserialize, Serialize};

/// Discrete touch calls as issued by the embedding engine.
///
/// Coordinates are in surface pixels, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TouchInput {
    Down { x: f32, y: f32 },
    Move { x: f32, y: f32 },
    Up { x: f32, y: f32 },
    Cancel,
    /// Self-contained down + up pair, independent of any open gesture
    Tap { x: f32, y: f32 },
}

/// Phase of a native pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerAction {
    Down,
    Move,
    Up,
    Cancel,
}

/// Native pointer event delivered to the browser engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub action: PointerAction,
    pub x: f32,
    pub y: f32,
    /// Identifies the down..up span this event belongs to
    pub gesture_id: u64,
    /// Milliseconds since the gesture's down event
    pub elapsed_ms: u64,
}

/// Keyboard input event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyboardEvent {
    pub key: String,
    pub pressed: bool,
    pub modifiers: Modifiers,
}

/// Keyboard modifier keys state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}
