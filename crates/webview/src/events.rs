//! Event bridge: engine notifications -> bounded queue -> embedding engine
//!
//! Events are delivered in the order they were raised. The queue is drained
//! by the embedding engine's poll cycle; when it falls behind, new events are
//! dropped rather than blocking the surface-owning thread.

use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use webtexture_frontend_core::NavigationObserver;
use webtexture_ipc::BridgeEvent;

use crate::state::{lock, SharedState};

/// Create a bounded event queue
pub(crate) fn event_queue(capacity: usize) -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        EventSender { tx },
        EventReceiver {
            rx: tokio::sync::Mutex::new(rx),
        },
    )
}

pub(crate) struct EventSender {
    tx: mpsc::Sender<BridgeEvent>,
}

impl EventSender {
    /// Enqueue without blocking
    pub fn emit(&self, event: BridgeEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                tracing::warn!("Event queue full, dropping {}", event.signal_name());
            }
            Err(TrySendError::Closed(event)) => {
                tracing::trace!("Event queue closed, dropping {}", event.signal_name());
            }
        }
    }
}

pub(crate) struct EventReceiver {
    rx: tokio::sync::Mutex<mpsc::Receiver<BridgeEvent>>,
}

impl EventReceiver {
    /// Next queued event, if any. Returns `None` while an async waiter holds
    /// the receiver.
    pub fn try_recv(&self) -> Option<BridgeEvent> {
        let mut rx = self.rx.try_lock().ok()?;
        rx.try_recv().ok()
    }

    pub fn drain(&self) -> Vec<BridgeEvent> {
        let Ok(mut rx) = self.rx.try_lock() else {
            return Vec::new();
        };
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    pub async fn recv(&self) -> Option<BridgeEvent> {
        self.rx.lock().await.recv().await
    }

    /// True once every sender is gone and the queue is drained
    #[cfg(test)]
    pub fn is_closed(&self) -> bool {
        self.rx
            .try_lock()
            .map(|mut rx| matches!(rx.try_recv(), Err(mpsc::error::TryRecvError::Disconnected)))
            .unwrap_or(false)
    }
}

/// Observer handed to engines; keeps the navigation cache and dirty flag
/// current and forwards every notification to the event queue.
pub(crate) struct BridgeObserver {
    shared: Arc<SharedState>,
}

impl BridgeObserver {
    pub fn new(shared: Arc<SharedState>) -> Self {
        Self { shared }
    }
}

impl NavigationObserver for BridgeObserver {
    fn page_started(&self, url: &str) {
        lock(&self.shared.navigation).url = url.to_string();
        self.shared.mark_dirty();
        self.shared.emit(BridgeEvent::PageStarted {
            url: url.to_string(),
        });
    }

    fn page_finished(&self, url: &str, can_go_back: bool, can_go_forward: bool) {
        {
            let mut navigation = lock(&self.shared.navigation);
            navigation.url = url.to_string();
            navigation.can_go_back = can_go_back;
            navigation.can_go_forward = can_go_forward;
        }
        self.shared.request_page_style();
        self.shared.mark_dirty();
        self.shared.emit(BridgeEvent::PageLoaded {
            url: url.to_string(),
        });
    }

    fn progress_changed(&self, percent: u8) {
        let percent = percent.min(100);
        lock(&self.shared.navigation).progress = percent;
        if percent % 10 == 0 {
            self.shared.mark_dirty();
        }
        self.shared.emit(BridgeEvent::ProgressChanged { percent });
    }

    fn title_changed(&self, title: &str) {
        lock(&self.shared.navigation).title = title.to_string();
        self.shared.emit(BridgeEvent::TitleChanged {
            title: title.to_string(),
        });
    }

    fn load_failed(&self, url: &str, description: &str) {
        tracing::warn!("Load of {} failed: {}", url, description);
        self.shared.mark_dirty();
        self.shared.emit(BridgeEvent::LoadError {
            url: url.to_string(),
            description: description.to_string(),
        });
    }

    fn content_changed(&self) {
        self.shared.mark_dirty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observer() -> (BridgeObserver, Arc<SharedState>, EventReceiver) {
        let (tx, rx) = event_queue(8);
        let shared = Arc::new(SharedState::new(tx));
        (BridgeObserver::new(shared.clone()), shared, rx)
    }

    #[test]
    fn test_events_are_delivered_in_order() {
        let (observer, _shared, rx) = observer();
        observer.page_started("https://example.com/");
        observer.progress_changed(50);
        observer.title_changed("Example");
        observer.page_finished("https://example.com/", true, false);

        let names: Vec<_> = rx.drain().iter().map(|e| e.signal_name()).collect();
        assert_eq!(
            names,
            vec!["page_started", "progress_changed", "title_changed", "page_loaded"]
        );
        assert!(rx.try_recv().is_none());
    }

    #[test]
    fn test_navigation_cache_tracks_notifications() {
        let (observer, shared, _rx) = observer();
        observer.page_finished("https://example.com/a", true, true);
        observer.progress_changed(250);

        let navigation = lock(&shared.navigation).clone();
        assert_eq!(navigation.url, "https://example.com/a");
        assert!(navigation.can_go_back && navigation.can_go_forward);
        assert_eq!(navigation.progress, 100);
        assert!(shared.take_page_style_request());
    }

    #[test]
    fn test_only_round_progress_marks_dirty() {
        let (observer, shared, _rx) = observer();
        observer.progress_changed(37);
        assert!(!lock(&shared.capture).dirty);
        observer.progress_changed(40);
        assert!(lock(&shared.capture).dirty);
    }

    #[test]
    fn test_content_change_marks_dirty_silently() {
        let (observer, shared, rx) = observer();
        observer.content_changed();
        assert!(lock(&shared.capture).dirty);
        assert!(rx.drain().is_empty());
    }

    #[test]
    fn test_full_queue_drops_newest() {
        let (tx, rx) = event_queue(2);
        tx.emit(BridgeEvent::TextureUpdated);
        tx.emit(BridgeEvent::ProgressChanged { percent: 1 });
        tx.emit(BridgeEvent::ProgressChanged { percent: 2 });

        assert_eq!(
            rx.drain(),
            vec![
                BridgeEvent::TextureUpdated,
                BridgeEvent::ProgressChanged { percent: 1 }
            ]
        );
    }
}
