//! The adaptive suppression/retransmit timer per endpoint (§4.3).

use std::time::Duration;

use crate::config::TrickleConfig;
use crate::types::TimeMs;

/// One endpoint's trickle timer state: `(I, T, c)` plus the absolute times
/// derived from them so the engine can compare against `now` without
/// re-deriving anything.
#[derive(Clone, Debug)]
pub struct TrickleTimer {
    config: TrickleConfig,
    /// Current interval length.
    interval: Duration,
    /// Absolute time the interval started.
    interval_start: TimeMs,
    /// Absolute time we chose to (maybe) send at, in `[start + I/2, start + I)`.
    send_at: TimeMs,
    /// Consistent-transmission counter.
    consistent_count: u32,
    sent_this_interval: bool,
}

impl TrickleTimer {
    pub fn new(config: TrickleConfig, now: TimeMs) -> Self {
        let mut timer = Self {
            config,
            interval: Duration::ZERO,
            interval_start: now,
            send_at: now,
            consistent_count: 0,
            sent_this_interval: false,
        };
        timer.restart(now, timer.config.i_min);
        timer
    }

    fn restart(&mut self, now: TimeMs, interval: Duration) {
        self.interval = interval;
        self.interval_start = now;
        self.consistent_count = 0;
        self.sent_this_interval = false;
        let half = interval.as_millis() as u64 / 2;
        let span = interval.as_millis() as u64 - half;
        let offset = if span == 0 { 0 } else { fastrand::u64(0..span) };
        self.send_at = now + half + offset;
    }

    /// A consistent (hash-matching) NET_STATE arrived from a peer on this
    /// endpoint.
    pub fn on_consistent(&mut self) {
        self.consistent_count += 1;
    }

    /// An inconsistent (hash-mismatching) NET_STATE arrived. Resets to
    /// `I_min` only if we were already running slower, per §4.3.
    pub fn on_inconsistent(&mut self, now: TimeMs) {
        if self.interval > self.config.i_min {
            self.restart(now, self.config.i_min);
        }
    }

    /// Forces an immediate-flood reset: the next send happens outside the
    /// normal interval and trickle restarts at `I_min` (§4.4 "Immediate-flood").
    pub fn force_reset(&mut self, now: TimeMs) {
        self.restart(now, self.config.i_min);
    }

    /// Advances the timer past `now`, returning `true` exactly once if this
    /// call crossed the chosen send time `T` and we should actually transmit
    /// (`c < k`). Also handles rolling over to a new (doubled) interval when
    /// `now` has passed the interval's end; safe to call as often as the
    /// scheduler ticks.
    pub fn poll(&mut self, now: TimeMs) -> bool {
        let mut should_send = false;
        if !self.sent_this_interval && now >= self.send_at {
            self.sent_this_interval = true;
            should_send = self.consistent_count < self.config.k;
        }
        let interval_end = self.interval_start + self.interval.as_millis() as u64;
        if now >= interval_end {
            let doubled = (self.interval * 2).min(self.config.i_max);
            self.restart(now, doubled);
        }
        should_send
    }

    /// Earliest time the engine needs to re-poll this timer: either the
    /// pending send time or the interval end, whichever is sooner.
    pub fn next_wakeup(&self) -> TimeMs {
        let interval_end = self.interval_start + self.interval.as_millis() as u64;
        if self.sent_this_interval {
            interval_end
        } else {
            self.send_at.min(interval_end)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> TrickleConfig {
        TrickleConfig {
            i_min: Duration::from_millis(100),
            i_max: Duration::from_millis(800),
            k: 1,
        }
    }

    #[test]
    fn sends_once_per_interval_when_inconsistent() {
        let mut t = TrickleTimer::new(cfg(), 0);
        let wake = t.next_wakeup();
        let sent = t.poll(wake);
        assert!(sent);
        // second poll within the same interval must not re-send.
        assert!(!t.poll(wake + 1));
    }

    #[test]
    fn suppressed_once_k_consistent_messages_seen() {
        let mut t = TrickleTimer::new(cfg(), 0);
        t.on_consistent();
        let wake = t.next_wakeup();
        assert!(!t.poll(wake));
    }

    #[test]
    fn inconsistent_resets_to_i_min_only_when_slower() {
        let mut t = TrickleTimer::new(cfg(), 0);
        // force interval to double past I_min
        t.poll(1000);
        assert!(t.interval > cfg().i_min);
        t.on_inconsistent(1000);
        assert_eq!(t.interval, cfg().i_min);
    }

    #[test]
    fn interval_doubles_up_to_i_max() {
        let mut t = TrickleTimer::new(cfg(), 0);
        let mut now = 0u64;
        for _ in 0..10 {
            now += 2000;
            t.poll(now);
        }
        assert_eq!(t.interval, cfg().i_max);
    }
}
