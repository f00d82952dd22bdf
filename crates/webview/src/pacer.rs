//! Frame pacing: decides per poll whether a capture should run

use std::time::{Duration, Instant};

/// Capture bookkeeping consulted and updated by [`FramePacer`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureState {
    pub last_capture: Option<Instant>,
    pub last_forced: Option<Instant>,
    /// Something may have changed the pixels since the last capture
    pub dirty: bool,
    /// No capture is authorized before this instant, dirty or not
    pub hold_until: Option<Instant>,
}

impl CaptureState {
    /// Fresh state that withholds captures until `until`
    pub fn held_until(until: Instant) -> Self {
        Self {
            hold_until: Some(until),
            ..Default::default()
        }
    }
}

/// Why a capture was authorized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureReason {
    Dirty,
    Forced,
    Interval,
}

#[derive(Debug, Clone, Copy)]
pub struct FramePacer {
    min_interval: Duration,
    force_interval: Duration,
}

impl FramePacer {
    pub fn new(min_interval: Duration, force_interval: Duration) -> Self {
        Self {
            min_interval,
            force_interval,
        }
    }

    pub fn should_capture(&self, now: Instant, state: &mut CaptureState) -> bool {
        self.decide(now, state).is_some()
    }

    /// Decide and, when authorizing, consume the state: dirty is cleared,
    /// `last_capture` moves to `now`, and `last_forced` moves to `now` when
    /// the forced ceiling was reached.
    pub fn decide(&self, now: Instant, state: &mut CaptureState) -> Option<CaptureReason> {
        if let Some(until) = state.hold_until {
            if now < until {
                return None;
            }
            state.hold_until = None;
        }

        let forced_due = elapsed_at_least(now, state.last_forced, self.force_interval);
        let interval_due = elapsed_at_least(now, state.last_capture, self.min_interval);

        let reason = if state.dirty {
            CaptureReason::Dirty
        } else if forced_due {
            CaptureReason::Forced
        } else if interval_due {
            CaptureReason::Interval
        } else {
            return None;
        };

        if forced_due {
            state.last_forced = Some(now);
        }
        state.last_capture = Some(now);
        state.dirty = false;
        Some(reason)
    }
}

fn elapsed_at_least(now: Instant, since: Option<Instant>, interval: Duration) -> bool {
    since.is_none_or(|t| now.saturating_duration_since(t) >= interval)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn pacer() -> FramePacer {
        FramePacer::new(ms(16), ms(100))
    }

    /// State as if a forced capture just ran at `t`
    fn captured_at(t: Instant) -> CaptureState {
        CaptureState {
            last_capture: Some(t),
            last_forced: Some(t),
            ..Default::default()
        }
    }

    #[test]
    fn test_dirty_captures_inside_min_interval_and_resets() {
        let t0 = Instant::now();
        let mut state = captured_at(t0);
        state.dirty = true;

        assert_eq!(pacer().decide(t0 + ms(1), &mut state), Some(CaptureReason::Dirty));
        assert!(!state.dirty);
        assert_eq!(state.last_capture, Some(t0 + ms(1)));
        assert_eq!(state.last_forced, Some(t0));
    }

    #[test]
    fn test_idle_polls_inside_min_interval_skip() {
        let t0 = Instant::now();
        let mut state = captured_at(t0);
        for offset in [0, 5, 15] {
            assert_eq!(pacer().decide(t0 + ms(offset), &mut state), None);
        }
        assert_eq!(state, captured_at(t0));
    }

    #[test]
    fn test_min_interval_alone_authorizes() {
        let t0 = Instant::now();
        let mut state = captured_at(t0);
        assert_eq!(pacer().decide(t0 + ms(16), &mut state), Some(CaptureReason::Interval));
        assert_eq!(state.last_forced, Some(t0));
    }

    #[test]
    fn test_force_ceiling_resets_last_forced() {
        let t0 = Instant::now();
        let mut state = CaptureState {
            last_capture: Some(t0 + ms(95)),
            last_forced: Some(t0),
            ..Default::default()
        };
        assert_eq!(pacer().decide(t0 + ms(100), &mut state), Some(CaptureReason::Forced));
        assert_eq!(state.last_forced, Some(t0 + ms(100)));
    }

    #[test]
    fn test_polls_a_force_interval_apart_are_not_both_skipped() {
        // A large min interval isolates the forced ceiling
        let pacer = FramePacer::new(ms(1_000), ms(100));
        let t0 = Instant::now();
        let mut state = captured_at(t0);

        let first = pacer.should_capture(t0 + ms(50), &mut state);
        let second = pacer.should_capture(t0 + ms(150), &mut state);
        assert!(first || second);
    }

    #[test]
    fn test_hold_blocks_even_dirty_then_releases() {
        let t0 = Instant::now();
        let mut state = CaptureState::held_until(t0 + ms(500));
        state.dirty = true;

        assert!(!pacer().should_capture(t0, &mut state));
        assert!(!pacer().should_capture(t0 + ms(499), &mut state));
        assert!(state.dirty);

        assert!(pacer().should_capture(t0 + ms(500), &mut state));
        assert_eq!(state.hold_until, None);
    }

    #[test]
    fn test_first_decision_without_history_captures() {
        let mut state = CaptureState::default();
        assert_eq!(
            pacer().decide(Instant::now(), &mut state),
            Some(CaptureReason::Forced)
        );
    }
}
