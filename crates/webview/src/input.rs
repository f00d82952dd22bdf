//! Touch input translation into native pointer events

use std::time::{Duration, Instant};

use webtexture_ipc::{PointerAction, PointerEvent, TouchInput};

/// Whether a down..up span is open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GestureState {
    #[default]
    Idle,
    Active { gesture_id: u64, down_at: Instant },
}

/// A native event to deliver, now or after `delay`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dispatch {
    pub event: PointerEvent,
    pub delay: Duration,
}

impl Dispatch {
    fn now(event: PointerEvent) -> Self {
        Self {
            event,
            delay: Duration::ZERO,
        }
    }
}

/// Tracks the open gesture and turns touch calls into pointer events.
/// Lives on the surface-owning thread.
#[derive(Debug)]
pub struct InputTranslator {
    state: GestureState,
    next_gesture_id: u64,
    tap_release_delay: Duration,
}

impl InputTranslator {
    pub fn new(tap_release_delay: Duration) -> Self {
        Self {
            state: GestureState::Idle,
            next_gesture_id: 1,
            tap_release_delay,
        }
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, GestureState::Active { .. })
    }

    /// Forget any open gesture without dispatching anything
    pub fn reset(&mut self) {
        self.state = GestureState::Idle;
    }

    /// Events to dispatch for `input`; empty when the call is ignored
    pub fn translate(&mut self, input: TouchInput, now: Instant) -> Vec<Dispatch> {
        match input {
            TouchInput::Down { x, y } => {
                // A down during an open gesture starts a new one
                let gesture_id = self.open_gesture();
                self.state = GestureState::Active {
                    gesture_id,
                    down_at: now,
                };
                vec![Dispatch::now(PointerEvent {
                    action: PointerAction::Down,
                    x,
                    y,
                    gesture_id,
                    elapsed_ms: 0,
                })]
            }
            TouchInput::Move { x, y } => self
                .active_event(PointerAction::Move, x, y, now)
                .map(Dispatch::now)
                .into_iter()
                .collect(),
            TouchInput::Up { x, y } => {
                let event = self.active_event(PointerAction::Up, x, y, now);
                self.state = GestureState::Idle;
                event.map(Dispatch::now).into_iter().collect()
            }
            TouchInput::Cancel => {
                let event = self.active_event(PointerAction::Cancel, 0.0, 0.0, now);
                self.state = GestureState::Idle;
                event.map(Dispatch::now).into_iter().collect()
            }
            TouchInput::Tap { x, y } => {
                let gesture_id = self.open_gesture();
                let down = PointerEvent {
                    action: PointerAction::Down,
                    x,
                    y,
                    gesture_id,
                    elapsed_ms: 0,
                };
                let up = PointerEvent {
                    action: PointerAction::Up,
                    elapsed_ms: duration_ms(self.tap_release_delay),
                    ..down
                };
                vec![
                    Dispatch::now(down),
                    Dispatch {
                        event: up,
                        delay: self.tap_release_delay,
                    },
                ]
            }
        }
    }

    fn open_gesture(&mut self) -> u64 {
        let id = self.next_gesture_id;
        self.next_gesture_id = self.next_gesture_id.wrapping_add(1);
        id
    }

    fn active_event(
        &self,
        action: PointerAction,
        x: f32,
        y: f32,
        now: Instant,
    ) -> Option<PointerEvent> {
        let GestureState::Active {
            gesture_id,
            down_at,
        } = self.state
        else {
            tracing::trace!("Ignoring {:?} outside a gesture", action);
            return None;
        };
        Some(PointerEvent {
            action,
            x,
            y,
            gesture_id,
            elapsed_ms: duration_ms(now.saturating_duration_since(down_at)),
        })
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actions(dispatches: &[Dispatch]) -> Vec<PointerAction> {
        dispatches.iter().map(|d| d.event.action).collect()
    }

    #[test]
    fn test_move_and_up_without_down_are_ignored() {
        let mut translator = InputTranslator::new(Duration::from_millis(50));
        let now = Instant::now();
        assert!(translator.translate(TouchInput::Move { x: 1.0, y: 1.0 }, now).is_empty());
        assert!(translator.translate(TouchInput::Up { x: 1.0, y: 1.0 }, now).is_empty());
        assert!(translator.translate(TouchInput::Cancel, now).is_empty());
        assert_eq!(translator.state(), GestureState::Idle);
    }

    #[test]
    fn test_full_gesture() {
        let mut translator = InputTranslator::new(Duration::from_millis(50));
        let t0 = Instant::now();

        let down = translator.translate(TouchInput::Down { x: 10.0, y: 10.0 }, t0);
        let moved = translator.translate(
            TouchInput::Move { x: 10.0, y: 40.0 },
            t0 + Duration::from_millis(30),
        );
        let up = translator.translate(
            TouchInput::Up { x: 10.0, y: 40.0 },
            t0 + Duration::from_millis(60),
        );

        assert_eq!(actions(&down), vec![PointerAction::Down]);
        assert_eq!(actions(&moved), vec![PointerAction::Move]);
        assert_eq!(actions(&up), vec![PointerAction::Up]);
        assert_eq!(moved[0].event.elapsed_ms, 30);
        assert_eq!(up[0].event.elapsed_ms, 60);
        assert_eq!(down[0].event.gesture_id, up[0].event.gesture_id);
        assert!(!translator.is_active());
    }

    #[test]
    fn test_cancel_closes_gesture_and_later_moves_are_ignored() {
        let mut translator = InputTranslator::new(Duration::from_millis(50));
        let now = Instant::now();
        translator.translate(TouchInput::Down { x: 0.0, y: 0.0 }, now);

        let cancel = translator.translate(TouchInput::Cancel, now);
        assert_eq!(actions(&cancel), vec![PointerAction::Cancel]);
        assert!(translator.translate(TouchInput::Move { x: 5.0, y: 5.0 }, now).is_empty());
    }

    #[test]
    fn test_tap_is_self_contained() {
        let mut translator = InputTranslator::new(Duration::from_millis(50));
        let now = Instant::now();

        let tap = translator.translate(TouchInput::Tap { x: 3.0, y: 4.0 }, now);
        assert_eq!(actions(&tap), vec![PointerAction::Down, PointerAction::Up]);
        assert_eq!(tap[0].delay, Duration::ZERO);
        assert_eq!(tap[1].delay, Duration::from_millis(50));
        assert_eq!(tap[0].event.gesture_id, tap[1].event.gesture_id);
        assert_eq!(translator.state(), GestureState::Idle);

        // A tap in the middle of a gesture leaves it open
        translator.translate(TouchInput::Down { x: 0.0, y: 0.0 }, now);
        translator.translate(TouchInput::Tap { x: 3.0, y: 4.0 }, now);
        assert!(translator.is_active());
    }

    #[test]
    fn test_second_down_starts_new_gesture() {
        let mut translator = InputTranslator::new(Duration::from_millis(50));
        let now = Instant::now();
        let first = translator.translate(TouchInput::Down { x: 0.0, y: 0.0 }, now);
        let second = translator.translate(TouchInput::Down { x: 1.0, y: 1.0 }, now);
        assert_ne!(first[0].event.gesture_id, second[0].event.gesture_id);
        assert!(translator.is_active());
    }
}
