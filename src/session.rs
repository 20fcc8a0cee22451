//! Connection session bookkeeping.
//!
//! One process-wide `Session` owns the connection state, the stored
//! pairing record, and the reconnect backoff. The control loop is its
//! only writer; the worker reports back through events. Auto-reconnect
//! is strictly limited to the stored record and is suppressed while the
//! user is on the pairing screen, so it can never race a manual pairing
//! attempt.

use crate::ble::scan_list::PeerAddress;
use crate::pairing_record::PairingRecord;
use crate::reconnect::Backoff;

/// Link state as shown to the rest of the device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

pub struct Session {
    state: ConnectionState,
    stored: Option<PairingRecord>,
    current: Option<PeerAddress>,
    auto_reconnect: bool,
    scanning: bool,
    worker_active: bool,
    backoff: Backoff,
}

impl Session {
    pub const fn new() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            stored: None,
            current: None,
            auto_reconnect: true,
            scanning: false,
            worker_active: false,
            backoff: Backoff::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Address of the peripheral we are connecting/connected to.
    pub fn current_address(&self) -> Option<PeerAddress> {
        self.current
    }

    pub fn stored_record(&self) -> Option<&PairingRecord> {
        self.stored.as_ref()
    }

    pub fn store_record(&mut self, record: PairingRecord) {
        self.stored = Some(record);
    }

    /// Forget the bonded keyboard. The caller also wipes the persisted
    /// copy and the radio-level bond keys.
    pub fn clear_record(&mut self) {
        self.stored = None;
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning
    }

    /// Entering/leaving the explicit pairing context. Scanning pauses
    /// auto-reconnect entirely.
    pub fn set_scanning(&mut self, scanning: bool) {
        self.scanning = scanning;
    }

    pub fn auto_reconnect(&self) -> bool {
        self.auto_reconnect
    }

    pub fn set_auto_reconnect(&mut self, enabled: bool) {
        self.auto_reconnect = enabled;
    }

    pub fn worker_active(&self) -> bool {
        self.worker_active
    }

    /// Begin a connect attempt toward `target`. Refused (returns
    /// `false`) while a worker is already mid-flight - a second request
    /// is a no-op, not a queue entry.
    pub fn request_connect(&mut self, now_ms: u64, target: PeerAddress) -> bool {
        if self.worker_active {
            return false;
        }
        self.worker_active = true;
        self.current = Some(target);
        self.state = ConnectionState::Connecting;
        self.backoff.arm(now_ms);
        true
    }

    /// Fire the auto-reconnect timer: at most once per armed, elapsed
    /// backoff window, and only toward the stored record.
    pub fn poll_auto_reconnect(&mut self, now_ms: u64) -> bool {
        if self.worker_active
            || self.state != ConnectionState::Disconnected
            || !self.auto_reconnect
            || self.scanning
            || !self.backoff.due(now_ms)
        {
            return false;
        }
        let Some(target) = self.stored.as_ref().map(|r| r.address) else {
            return false;
        };
        self.request_connect(now_ms, target)
    }

    /// The worker completed its protocol flow and the link is live.
    pub fn worker_connected(&mut self) {
        self.state = ConnectionState::Connected;
        self.backoff.on_success();
    }

    /// The worker returned: either the attempt failed or an established
    /// link was lost. Backoff doubles only for failed attempts; link
    /// loss after a successful connection restarts the window at the
    /// floor, armed from the moment of disconnection.
    pub fn worker_ended(&mut self, now_ms: u64) {
        let was_connected = self.state == ConnectionState::Connected;
        self.worker_active = false;
        self.current = None;
        self.state = ConnectionState::Disconnected;
        if !was_connected {
            self.backoff.on_failure();
        }
        self.backoff.arm(now_ms);
    }

    pub fn backoff_delay_ms(&self) -> u64 {
        self.backoff.delay_ms()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
