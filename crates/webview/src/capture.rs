//! Capture handoff between a polling thread and the surface-owning thread
//!
//! A poll consults the pacer, submits one capture task, and waits on a
//! single-slot reply channel for at most the configured timeout. At most one
//! capture is outstanding: while it is, polls coalesce into "no new frame",
//! and a reply that arrives after its poller gave up is handed to the next
//! poll instead.

use std::sync::{Mutex, TryLockError};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use webtexture_config::BridgeConfig;
use webtexture_frontend_core::Frame;
use webtexture_ipc::BridgeEvent;

use crate::owner::{CaptureReply, Task};
use crate::pacer::FramePacer;
use crate::state::{lock, SharedState};

struct CaptureLink {
    replies: Receiver<CaptureReply>,
    in_flight: bool,
}

pub(crate) struct CaptureBridge {
    pacer: FramePacer,
    timeout: Duration,
    link: Mutex<Option<CaptureLink>>,
}

impl CaptureBridge {
    pub fn new(config: &BridgeConfig) -> Self {
        Self {
            pacer: FramePacer::new(config.min_capture_interval(), config.force_capture_interval()),
            timeout: config.capture_timeout(),
            link: Mutex::new(None),
        }
    }

    /// Attach to a new surface-owning thread's reply slot
    pub fn connect(&self, replies: Receiver<CaptureReply>) {
        *lock(&self.link) = Some(CaptureLink {
            replies,
            in_flight: false,
        });
    }

    /// Poll for a fresh frame; `None` means "reuse the previous texture"
    pub fn capture(&self, shared: &SharedState, tasks: &Sender<Task>) -> Option<Frame> {
        if !shared.lifecycle().is_ready() {
            return None;
        }

        let mut guard = match self.link.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                tracing::trace!("Another poll is waiting on a capture, coalescing");
                return None;
            }
        };
        let link = guard.as_mut()?;

        if link.in_flight {
            return match link.replies.try_recv() {
                Ok(reply) => {
                    link.in_flight = false;
                    tracing::trace!("Collected late capture reply");
                    accept(reply, shared)
                }
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => {
                    link.in_flight = false;
                    None
                }
            };
        }

        let reason = self.pacer.decide(Instant::now(), &mut lock(&shared.capture));
        let Some(reason) = reason else {
            tracing::trace!("Capture skipped by pacer");
            return None;
        };

        if tasks.send(Task::Capture).is_err() {
            tracing::debug!("Surface-owning thread gone, capture skipped");
            return None;
        }
        link.in_flight = true;
        tracing::trace!("Capture requested ({:?})", reason);

        match link.replies.recv_timeout(self.timeout) {
            Ok(reply) => {
                link.in_flight = false;
                accept(reply, shared)
            }
            Err(RecvTimeoutError::Timeout) => {
                tracing::debug!("Capture not ready after {:?}, frame missed", self.timeout);
                None
            }
            Err(RecvTimeoutError::Disconnected) => {
                link.in_flight = false;
                None
            }
        }
    }
}

/// Turn a reply into a frame for the caller, dropping frames of a size the
/// viewport has since moved away from
fn accept(reply: CaptureReply, shared: &SharedState) -> Option<Frame> {
    let CaptureReply::Frame(frame) = reply else {
        return None;
    };

    let current = shared.viewport();
    if !current.is_some_and(|v| frame.matches(v.width, v.height)) {
        tracing::debug!(
            "Discarding stale {}x{} frame, viewport is {:?}",
            frame.width,
            frame.height,
            current
        );
        shared.mark_dirty();
        return None;
    }

    shared.emit(BridgeEvent::TextureUpdated);
    Some(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::event_queue;
    use crate::pacer::CaptureState;
    use crate::state::Viewport;
    use webtexture_frontend_core::Lifecycle;

    fn ready_state(width: u32, height: u32) -> (SharedState, crate::events::EventReceiver) {
        let (tx, rx) = event_queue(8);
        let shared = SharedState::new(tx);
        *lock(&shared.lifecycle) = Lifecycle::Ready;
        *lock(&shared.viewport) = Viewport::new(width, height);
        (shared, rx)
    }

    fn frame(width: u32, height: u32) -> Frame {
        Frame {
            pixels: vec![0; (width * height * 4) as usize],
            width,
            height,
        }
    }

    #[test]
    fn test_not_ready_returns_none_without_scheduling() {
        let (shared, _rx) = ready_state(2, 2);
        *lock(&shared.lifecycle) = Lifecycle::Initializing;

        let bridge = CaptureBridge::new(&BridgeConfig::default());
        let (_reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        bridge.connect(reply_rx);
        let (task_tx, task_rx) = crossbeam_channel::unbounded();

        assert!(bridge.capture(&shared, &task_tx).is_none());
        assert!(task_rx.try_recv().is_err());
    }

    #[test]
    fn test_skipped_poll_does_not_touch_owner() {
        let (shared, _rx) = ready_state(2, 2);
        let now = Instant::now();
        *lock(&shared.capture) = CaptureState {
            last_capture: Some(now),
            last_forced: Some(now),
            ..Default::default()
        };

        let bridge = CaptureBridge::new(&BridgeConfig {
            min_capture_interval_ms: 60_000,
            force_capture_interval_ms: 60_000,
            ..Default::default()
        });
        let (_reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        bridge.connect(reply_rx);
        let (task_tx, task_rx) = crossbeam_channel::unbounded();

        assert!(bridge.capture(&shared, &task_tx).is_none());
        assert!(task_rx.try_recv().is_err());
    }

    #[test]
    fn test_reply_within_timeout_is_returned_and_announced() {
        let (shared, rx) = ready_state(2, 2);
        let bridge = CaptureBridge::new(&BridgeConfig::default());
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        bridge.connect(reply_rx);
        let (task_tx, task_rx) = crossbeam_channel::unbounded();

        let owner = std::thread::spawn(move || {
            if let Ok(Task::Capture) = task_rx.recv() {
                reply_tx.send(CaptureReply::Frame(frame(2, 2))).unwrap();
            }
        });

        let captured = bridge.capture(&shared, &task_tx).expect("frame");
        assert_eq!(captured.pixels.len(), 2 * 2 * 4);
        assert_eq!(rx.drain(), vec![BridgeEvent::TextureUpdated]);
        owner.join().unwrap();
    }

    #[test]
    fn test_timeout_then_late_reply_goes_to_next_poll() {
        let (shared, _rx) = ready_state(2, 2);
        let bridge = CaptureBridge::new(&BridgeConfig {
            capture_timeout_ms: 10,
            ..Default::default()
        });
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        bridge.connect(reply_rx);
        let (task_tx, task_rx) = crossbeam_channel::unbounded();

        assert!(bridge.capture(&shared, &task_tx).is_none());
        assert!(matches!(task_rx.try_recv(), Ok(Task::Capture)));

        // Still outstanding: no second task is submitted
        lock(&shared.capture).dirty = true;
        assert!(bridge.capture(&shared, &task_tx).is_none());
        assert!(task_rx.try_recv().is_err());

        reply_tx.send(CaptureReply::Frame(frame(2, 2))).unwrap();
        assert!(bridge.capture(&shared, &task_tx).is_some());
    }

    #[test]
    fn test_stale_size_and_failures_yield_none() {
        let (shared, rx) = ready_state(4, 4);
        assert!(accept(CaptureReply::Frame(frame(2, 2)), &shared).is_none());
        assert!(lock(&shared.capture).dirty);
        assert!(accept(CaptureReply::Failed, &shared).is_none());
        assert!(rx.drain().is_empty());
    }
}
