//! Application-wide constants and compile-time configuration.
//!
//! All timing parameters, link profiles, and protocol constants live
//! here so they can be tuned in one place.

// BLE discovery

/// Duration of a one-shot BLE scan window (seconds).
pub const SCAN_WINDOW_SECS: u64 = 5;

/// Maximum number of BLE peripherals tracked in one discovery session.
pub const MAX_DISCOVERED_DEVICES: usize = 8;

/// A discovered device unseen for this long is dropped from the list
/// (only relevant to continuous scan modes; a one-shot window is
/// discarded wholesale when the session ends).
pub const DEVICE_STALE_MS: u64 = 8_000;

// Connection flow

/// Upper bound on link establishment per attempt (seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// How long the worker waits for the security negotiation to produce an
/// encrypted link before proceeding unauthenticated (milliseconds).
pub const SECURITY_WAIT_MS: u64 = 5_000;

/// Poll step while waiting for encryption to come up (milliseconds).
pub const SECURITY_POLL_MS: u64 = 200;

// Reconnection backoff

/// Initial (and post-success) reconnect delay (milliseconds).
pub const RECONNECT_FLOOR_MS: u64 = 10_000;

/// Reconnect delay ceiling (milliseconds).
pub const RECONNECT_CAP_MS: u64 = 120_000;

// Adaptive link parameters

/// No key events for this long switches the link to the idle profile
/// (milliseconds).
pub const KEY_IDLE_THRESHOLD_MS: u64 = 3_000;

/// Connection interval range while typing (1.25 ms units).
/// 6 = 7.5 ms, the lowest latency HID allows.
pub const ACTIVE_INTERVAL_MIN: u16 = 6;
pub const ACTIVE_INTERVAL_MAX: u16 = 12;

/// Peripheral latency while typing (skippable connection events).
pub const ACTIVE_LATENCY: u16 = 0;

/// Connection interval range while idle (1.25 ms units). 24 = 30 ms.
pub const IDLE_INTERVAL_MIN: u16 = 24;
pub const IDLE_INTERVAL_MAX: u16 = 40;

/// Peripheral latency while idle - lets the keyboard sleep through
/// connection events and saves power on both ends.
pub const IDLE_LATENCY: u16 = 4;

/// Supervision timeout (10 ms units). 400 = 4 s.
pub const SUPERVISION_TIMEOUT: u16 = 400;

// Pairing / security

/// Security negotiation policy, selected at startup (not per-connection).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PairingPolicy {
    /// No user interaction; weakest assurance, lowest friction.
    JustWorks,
    /// The tablet shows a 6-digit code the user types on the keyboard.
    DisplayPasskey,
}

pub const PAIRING_POLICY: PairingPolicy = PairingPolicy::DisplayPasskey;

// Queues

/// Depth of the decoded key-event channel between the notification
/// context and the control loop.
pub const KEY_EVENT_QUEUE_DEPTH: usize = 16;

/// Control loop tick cadence (milliseconds).
pub const CONTROL_TICK_MS: u64 = 50;

// Pairing-record storage

/// Flash page index where the pairing record lives (4 KB pages on
/// nRF52840).
pub const STORAGE_FLASH_PAGE_START: u32 = 240;

/// Number of flash pages reserved for the pairing record.
pub const STORAGE_FLASH_PAGE_COUNT: u32 = 2;
