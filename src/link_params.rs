//! Connection-parameter profiles and the adaptive switch policy.
//!
//! While typing, the link runs a short connection interval with zero
//! peripheral latency so keystrokes reach the editor with minimal lag.
//! Once the keyboard goes quiet the controller requests a relaxed
//! profile that lets both radios sleep through most connection events.

use crate::config::{
    ACTIVE_INTERVAL_MAX, ACTIVE_INTERVAL_MIN, ACTIVE_LATENCY, IDLE_INTERVAL_MAX,
    IDLE_INTERVAL_MIN, IDLE_LATENCY, KEY_IDLE_THRESHOLD_MS, SUPERVISION_TIMEOUT,
};

/// GAP connection parameters. Interval in 1.25 ms units, supervision
/// timeout in 10 ms units.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConnParams {
    pub interval_min: u16,
    pub interval_max: u16,
    pub latency: u16,
    pub timeout: u16,
}

/// The two named parameter profiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkProfile {
    /// Short interval, zero latency - minimal input-to-event delay.
    Active,
    /// Long interval, nonzero latency - minimal radio duty cycle.
    Idle,
}

impl LinkProfile {
    pub const fn params(self) -> ConnParams {
        match self {
            LinkProfile::Active => ConnParams {
                interval_min: ACTIVE_INTERVAL_MIN,
                interval_max: ACTIVE_INTERVAL_MAX,
                latency: ACTIVE_LATENCY,
                timeout: SUPERVISION_TIMEOUT,
            },
            LinkProfile::Idle => ConnParams {
                interval_min: IDLE_INTERVAL_MIN,
                interval_max: IDLE_INTERVAL_MAX,
                latency: IDLE_LATENCY,
                timeout: SUPERVISION_TIMEOUT,
            },
        }
    }
}

/// Tracks key activity and decides when the link profile should flip.
/// Returned `Some(profile)` values are requests the caller forwards to
/// the radio; `None` means no change.
pub struct AdaptiveController {
    profile: LinkProfile,
    last_key_ms: u64,
}

impl AdaptiveController {
    pub const fn new() -> Self {
        Self {
            profile: LinkProfile::Active,
            last_key_ms: 0,
        }
    }

    /// A key event was consumed. Switches back to the active profile
    /// immediately when the link had gone idle.
    pub fn note_key_activity(&mut self, now_ms: u64) -> Option<LinkProfile> {
        self.last_key_ms = now_ms;
        if self.profile != LinkProfile::Active {
            self.profile = LinkProfile::Active;
            return Some(LinkProfile::Active);
        }
        None
    }

    /// Periodic poll while connected. Requests the idle profile after
    /// the inactivity threshold.
    pub fn poll(&mut self, now_ms: u64) -> Option<LinkProfile> {
        if self.profile == LinkProfile::Active
            && now_ms.saturating_sub(self.last_key_ms) >= KEY_IDLE_THRESHOLD_MS
        {
            self.profile = LinkProfile::Idle;
            return Some(LinkProfile::Idle);
        }
        None
    }

    /// New session: connections start out in the active profile.
    pub fn reset(&mut self, now_ms: u64) {
        self.profile = LinkProfile::Active;
        self.last_key_ms = now_ms;
    }

    pub fn profile(&self) -> LinkProfile {
        self.profile
    }
}

impl Default for AdaptiveController {
    fn default() -> Self {
        Self::new()
    }
}

/// Arbitrate a peripheral-initiated parameter update request. The
/// accepted range is clamped so it never gets looser than what the
/// current profile allows; within that bound the peripheral's wishes
/// are honored.
pub fn clamp_peer_request(requested: ConnParams, profile: LinkProfile) -> ConnParams {
    let own = profile.params();
    let interval_max = requested.interval_max.min(own.interval_max);
    let interval_min = requested.interval_min.min(interval_max);
    ConnParams {
        interval_min,
        interval_max,
        latency: requested.latency.min(own.latency),
        timeout: own.timeout,
    }
}
