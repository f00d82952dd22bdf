//! State shared between caller threads and the surface-owning thread

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use webtexture_frontend_core::Lifecycle;
use webtexture_ipc::BridgeEvent;

use crate::events::EventSender;
use crate::pacer::CaptureState;

/// Logical pixel dimensions; both sides are always non-zero
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Option<Self> {
        (width > 0 && height > 0).then_some(Self { width, height })
    }
}

/// Last-known navigation state, readable without touching the owner thread
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationCache {
    pub url: String,
    pub title: String,
    pub progress: u8,
    pub can_go_back: bool,
    pub can_go_forward: bool,
}

pub(crate) struct SharedState {
    pub lifecycle: Mutex<Lifecycle>,
    /// Most recently requested viewport; frames of any other size are stale
    pub viewport: Mutex<Option<Viewport>>,
    pub navigation: Mutex<NavigationCache>,
    pub capture: Mutex<CaptureState>,
    /// Taken on destroy so the event queue closes once drained
    events: Mutex<Option<EventSender>>,
    /// A page finished and per-page styling has not been applied yet
    page_style_pending: AtomicBool,
}

impl SharedState {
    pub fn new(events: EventSender) -> Self {
        Self {
            lifecycle: Mutex::new(Lifecycle::Uninitialized),
            viewport: Mutex::new(None),
            navigation: Mutex::new(NavigationCache::default()),
            capture: Mutex::new(CaptureState::default()),
            events: Mutex::new(Some(events)),
            page_style_pending: AtomicBool::new(false),
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        *lock(&self.lifecycle)
    }

    /// Move `from` -> `to`; returns false if the lifecycle had moved on
    pub fn transition(&self, from: Lifecycle, to: Lifecycle) -> bool {
        let mut lifecycle = lock(&self.lifecycle);
        if *lifecycle != from {
            return false;
        }
        tracing::info!("Bridge lifecycle {:?} -> {:?}", from, to);
        *lifecycle = to;
        true
    }

    pub fn viewport(&self) -> Option<Viewport> {
        *lock(&self.viewport)
    }

    pub fn emit(&self, event: BridgeEvent) {
        match lock(&self.events).as_ref() {
            Some(events) => events.emit(event),
            None => tracing::trace!("Bridge destroyed, dropping {}", event.signal_name()),
        }
    }

    /// Drop the only sender; waiters see the end of the queue after the
    /// events already raised
    pub fn close_events(&self) {
        lock(&self.events).take();
    }

    pub fn mark_dirty(&self) {
        lock(&self.capture).dirty = true;
    }

    pub fn request_page_style(&self) {
        self.page_style_pending.store(true, Ordering::SeqCst);
    }

    pub fn take_page_style_request(&self) -> bool {
        self.page_style_pending.swap(false, Ordering::SeqCst)
    }
}

/// Lock, recovering the data if another thread panicked while holding it
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::event_queue;

    #[test]
    fn test_viewport_rejects_zero() {
        assert!(Viewport::new(0, 1).is_none());
        assert!(Viewport::new(1, 0).is_none());
        assert_eq!(
            Viewport::new(800, 600),
            Some(Viewport {
                width: 800,
                height: 600
            })
        );
    }

    #[test]
    fn test_transition_only_from_expected_state() {
        let (events, _rx) = event_queue(4);
        let shared = SharedState::new(events);

        assert!(!shared.transition(Lifecycle::Initializing, Lifecycle::Ready));
        assert!(shared.transition(Lifecycle::Uninitialized, Lifecycle::Initializing));
        assert!(shared.transition(Lifecycle::Initializing, Lifecycle::Ready));
        assert_eq!(shared.lifecycle(), Lifecycle::Ready);
    }

    #[test]
    fn test_page_style_request_is_taken_once() {
        let (events, _rx) = event_queue(4);
        let shared = SharedState::new(events);
        shared.request_page_style();
        assert!(shared.take_page_style_request());
        assert!(!shared.take_page_style_request());
    }

    #[test]
    fn test_closed_events_end_after_queued_ones() {
        let (events, rx) = event_queue(4);
        let shared = SharedState::new(events);
        shared.emit(BridgeEvent::TextureUpdated);
        shared.close_events();
        shared.emit(BridgeEvent::TextureUpdated);

        assert_eq!(rx.drain(), vec![BridgeEvent::TextureUpdated]);
        assert!(rx.is_closed());
    }
}
