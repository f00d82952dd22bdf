//! IPC message protocol for webtexture
//!
//! Defines the input and event types exchanged between the embedding engine
//! and the capture bridge.

mod error;
mod input;
mod messages;

pub use error::IpcError;
pub use input::{KeyboardEvent, Modifiers, PointerAction, PointerEvent, TouchInput};
pub use messages::{BridgeEvent, ScrollMetrics, SignalArg};
