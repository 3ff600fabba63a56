//! Time-driven scalar animation advanced explicitly once per rendered frame.

use std::time::{Duration, Instant};

use crate::processing::math::accelerate_decelerate;

/// Interpolates a float from a start value to an end value over a fixed
/// duration with accelerate/decelerate easing.
///
/// The animator never reads the clock itself; every call that can move time
/// forward takes `now`. When a run completes, its end action becomes
/// available exactly once through [`TickingAnimator::take_ended`].
#[derive(Debug)]
pub struct TickingAnimator<E = ()> {
    duration: Duration,
    start_value: f32,
    end_value: f32,
    current_value: f32,
    started_at: Option<Instant>,
    running: bool,
    on_end: Option<E>,
    ended: Option<E>,
}

impl<E> TickingAnimator<E> {
    #[must_use]
    pub fn new(duration: Duration, initial_value: f32) -> Self {
        Self {
            duration,
            start_value: initial_value,
            end_value: initial_value,
            current_value: initial_value,
            started_at: None,
            running: false,
            on_end: None,
            ended: None,
        }
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    #[must_use]
    pub fn current_value(&self) -> f32 {
        self.current_value
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Begin animating from `start_value` to `end_value`.
    ///
    /// A run already in progress is superseded and its end action dropped.
    /// The first tick happens immediately at `now`.
    pub fn start(&mut self, start_value: f32, end_value: f32, on_end: E, now: Instant) {
        self.start_value = start_value;
        self.end_value = end_value;
        self.started_at = Some(now);
        self.running = true;
        self.on_end = Some(on_end);
        self.ended = None;
        self.tick(now);
    }

    /// Begin animating toward `end_value` from the integer part of the
    /// current value.
    pub fn start_from_current(&mut self, end_value: f32, on_end: E, now: Instant) {
        let from = self.current_value.trunc();
        self.start(from, end_value, on_end, now);
    }

    /// Advance to `now`. Returns whether the animation is still running.
    pub fn tick(&mut self, now: Instant) -> bool {
        if !self.running {
            return false;
        }
        let elapsed = self
            .started_at
            .map(|start| now.saturating_duration_since(start))
            .unwrap_or_default();
        let t = if self.duration.is_zero() {
            1.0
        } else {
            (elapsed.as_secs_f32() / self.duration.as_secs_f32()).min(1.0)
        };

        self.running = t < 1.0;
        if self.running {
            self.current_value = self.start_value
                + accelerate_decelerate(t) * (self.end_value - self.start_value);
        } else {
            self.current_value = self.end_value;
            self.ended = self.on_end.take();
        }
        self.running
    }

    /// The end action of the run that just completed, if not yet taken.
    pub fn take_ended(&mut self) -> Option<E> {
        self.ended.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn start_ticks_immediately() {
        let t0 = Instant::now();
        let mut anim: TickingAnimator = TickingAnimator::new(750 * MS, 0.0);
        anim.start(0.0, 1.0, (), t0);
        assert!(anim.is_running());
        assert_eq!(anim.current_value(), 0.0);
    }

    #[test]
    fn value_is_eased_and_bounded() {
        let t0 = Instant::now();
        let mut anim: TickingAnimator = TickingAnimator::new(1000 * MS, 0.0);
        anim.start(0.0, 2.0, (), t0);
        assert!(anim.tick(t0 + 100 * MS));
        let early = anim.current_value();
        assert!(early > 0.0 && early < 0.2, "eased start: {early}");
        assert!(anim.tick(t0 + 500 * MS));
        assert!((anim.current_value() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn end_fires_exactly_once() {
        let t0 = Instant::now();
        let mut anim = TickingAnimator::new(750 * MS, 0.0);
        anim.start(0.0, 1.0, "done", t0);
        assert!(anim.take_ended().is_none());
        assert!(!anim.tick(t0 + 750 * MS));
        assert_eq!(anim.current_value(), 1.0);
        assert_eq!(anim.take_ended(), Some("done"));
        assert!(!anim.tick(t0 + 900 * MS));
        assert!(anim.take_ended().is_none());
    }

    #[test]
    fn restart_supersedes_previous_end_action() {
        let t0 = Instant::now();
        let mut anim = TickingAnimator::new(750 * MS, 2.0);
        anim.start_from_current(0.0, 1, t0);
        anim.tick(t0 + 300 * MS);
        let mid = anim.current_value();
        anim.start_from_current(2.0, 2, t0 + 300 * MS);
        assert_eq!(anim.current_value(), mid.trunc());
        anim.tick(t0 + 2000 * MS);
        assert_eq!(anim.take_ended(), Some(2));
        assert!(anim.take_ended().is_none());
    }

    #[test]
    fn zero_duration_completes_on_start() {
        let t0 = Instant::now();
        let mut anim = TickingAnimator::new(Duration::ZERO, 0.0);
        anim.start(0.0, 5.0, (), t0);
        assert!(!anim.is_running());
        assert_eq!(anim.current_value(), 5.0);
        assert_eq!(anim.take_ended(), Some(()));
    }
}
