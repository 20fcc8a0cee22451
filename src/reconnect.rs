//! Exponential reconnect backoff.
//!
//! After a failed or ended attempt the delay doubles, up to a cap, so a
//! keyboard that is switched off or out of range doesn't keep the radio
//! busy. Reaching `Connected` snaps the delay back to the floor.

use crate::config::{RECONNECT_CAP_MS, RECONNECT_FLOOR_MS};

#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Backoff {
    delay_ms: u64,
    last_attempt_ms: u64,
}

impl Backoff {
    pub const fn new() -> Self {
        Self {
            delay_ms: RECONNECT_FLOOR_MS,
            last_attempt_ms: 0,
        }
    }

    /// Whether the current delay has elapsed since the window was armed.
    pub fn due(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_attempt_ms) >= self.delay_ms
    }

    /// Restart the wait window without touching the delay. Called when
    /// an attempt starts and at the moment of link loss.
    pub fn arm(&mut self, now_ms: u64) {
        self.last_attempt_ms = now_ms;
    }

    /// Double the delay after a failed attempt, clamped to the cap.
    pub fn on_failure(&mut self) {
        self.delay_ms = (self.delay_ms.saturating_mul(2)).min(RECONNECT_CAP_MS);
    }

    /// Reset to the floor on a successful connection.
    pub fn on_success(&mut self) {
        self.delay_ms = RECONNECT_FLOOR_MS;
    }

    pub fn delay_ms(&self) -> u64 {
        self.delay_ms
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_sequence_doubles_to_cap() {
        let mut backoff = Backoff::new();
        let mut expected = RECONNECT_FLOOR_MS;
        for _ in 0..8 {
            assert_eq!(backoff.delay_ms(), expected);
            backoff.on_failure();
            expected = (expected * 2).min(RECONNECT_CAP_MS);
        }
        assert_eq!(backoff.delay_ms(), RECONNECT_CAP_MS);

        // Further failures stay pinned at the cap.
        backoff.on_failure();
        assert_eq!(backoff.delay_ms(), RECONNECT_CAP_MS);
    }

    #[test]
    fn success_resets_to_floor() {
        let mut backoff = Backoff::new();
        for _ in 0..5 {
            backoff.on_failure();
        }
        backoff.on_success();
        assert_eq!(backoff.delay_ms(), RECONNECT_FLOOR_MS);
    }

    #[test]
    fn due_tracks_armed_window() {
        let mut backoff = Backoff::new();
        backoff.arm(1_000);
        assert!(!backoff.due(1_000));
        assert!(!backoff.due(1_000 + RECONNECT_FLOOR_MS - 1));
        assert!(backoff.due(1_000 + RECONNECT_FLOOR_MS));
    }

    #[test]
    fn arm_does_not_change_delay() {
        let mut backoff = Backoff::new();
        backoff.on_failure();
        let doubled = backoff.delay_ms();
        backoff.arm(42);
        assert_eq!(backoff.delay_ms(), doubled);
    }
}
