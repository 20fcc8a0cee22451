//! Discovered-peripheral list with staleness tracking.
//!
//! Maintains a live, deduplicated view of nearby advertisers during an
//! explicit scan session. The list never initiates connections - auto
//! connect is strictly limited to the previously bonded address, so an
//! unknown keyboard can never be paired by accident.

use core::fmt::Write;

use heapless::{String, Vec};

use crate::config::MAX_DISCOVERED_DEVICES;

/// BLE address kind as exposed by the radio stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AddressKind {
    Public,
    RandomStatic,
}

impl AddressKind {
    /// Storage encoding (small integer in the persisted record).
    pub fn to_raw(self) -> u8 {
        match self {
            AddressKind::Public => 0,
            AddressKind::RandomStatic => 1,
        }
    }

    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => AddressKind::Public,
            _ => AddressKind::RandomStatic,
        }
    }
}

/// Owned, bounded peer address (unique id of a peripheral).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PeerAddress {
    pub kind: AddressKind,
    pub bytes: [u8; 6],
}

impl PeerAddress {
    pub const fn new(kind: AddressKind, bytes: [u8; 6]) -> Self {
        Self { kind, bytes }
    }

    /// Colon-separated hex form, most significant byte first.
    pub fn text(&self) -> String<17> {
        let mut s = String::new();
        for (i, b) in self.bytes.iter().rev().enumerate() {
            if i > 0 {
                let _ = s.push(':');
            }
            let _ = write!(&mut s, "{:02X}", b);
        }
        s
    }
}

/// One advertisement sighting, upserted on every observation.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DiscoveredDevice {
    pub address: PeerAddress,
    /// Advertised name, or the address text when none was advertised.
    pub name: String<32>,
    /// Received signal strength (dBm).
    pub rssi: i8,
    /// Timestamp of the latest sighting (controller millis).
    pub last_seen_ms: u64,
}

impl DiscoveredDevice {
    pub fn new(address: PeerAddress, name: Option<&str>, rssi: i8, now_ms: u64) -> Self {
        let name = match name {
            Some(n) => {
                let mut s = String::new();
                for c in n.chars().take(32) {
                    let _ = s.push(c);
                }
                s
            }
            None => {
                let mut s = String::new();
                let _ = s.push_str(address.text().as_str());
                s
            }
        };
        Self {
            address,
            name,
            rssi,
            last_seen_ms: now_ms,
        }
    }
}

/// Deduplicated scan results for one discovery session.
///
/// Written by the control loop only; the worker and the notification
/// context never touch it.
pub struct ScanList {
    devices: Vec<DiscoveredDevice, MAX_DISCOVERED_DEVICES>,
}

impl ScanList {
    pub const fn new() -> Self {
        Self {
            devices: Vec::new(),
        }
    }

    /// Record a sighting. Replaces the entry with the same address or
    /// appends a new one (the list holds at most one entry per address).
    ///
    /// Returns `true` when the visible content changed - the caller's
    /// redraw signal. A refreshed `last_seen_ms` alone is not visible.
    pub fn upsert(&mut self, sighting: DiscoveredDevice) -> bool {
        if let Some(existing) = self
            .devices
            .iter_mut()
            .find(|d| d.address == sighting.address)
        {
            let visible_change =
                existing.name != sighting.name || existing.rssi != sighting.rssi;
            *existing = sighting;
            return visible_change;
        }

        self.devices.push(sighting).is_ok()
    }

    /// Drop entries unseen for longer than `threshold_ms`. An entry
    /// exactly at the threshold is retained. Returns `true` when
    /// anything was removed.
    pub fn prune_stale(&mut self, now_ms: u64, threshold_ms: u64) -> bool {
        let before = self.devices.len();
        self.devices
            .retain(|d| now_ms.saturating_sub(d.last_seen_ms) <= threshold_ms);
        self.devices.len() != before
    }

    /// Discard the whole session's results.
    pub fn clear(&mut self) {
        self.devices.clear();
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&DiscoveredDevice> {
        self.devices.get(index)
    }

    pub fn devices(&self) -> &[DiscoveredDevice] {
        &self.devices
    }
}
