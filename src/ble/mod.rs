//! Bluetooth Low Energy subsystem.
//!
//! Drives the Nordic SoftDevice S140 in **Central** role against a
//! single HID keyboard peripheral:
//!
//! 1. **Scanner** - one-shot discovery of peripherals advertising the
//!    HID-over-GATT profile.
//! 2. **Connection worker** - link establishment, security negotiation,
//!    service/characteristic resolution, notification subscription.
//! 3. **HID client** - decodes input-report notifications into key
//!    events for the editor.
//!
//! Communication between the control loop and the radio tasks is done
//! via the Embassy channels defined here. The key-event channel is the
//! only structure with true producer/consumer concurrency: the
//! notification context produces with `try_send` (never blocks, drops
//! on overflow) and the control loop consumes.

pub mod adv_parser;
pub mod central;
pub mod hid_client;
pub mod resolver;
pub mod scan_list;
pub mod scanner;
pub mod security;

use defmt::Format;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use nrf_softdevice::ble::{Address, AddressType};

use crate::ble::scan_list::{AddressKind, DiscoveredDevice, PeerAddress};
use crate::config::KEY_EVENT_QUEUE_DEPTH;
use crate::error::Error;
use crate::hid::KeyEvent;
use crate::link_params::LinkProfile;
use crate::pairing_record::PairingRecord;

/// Control surface the UI/main loop drives this subsystem with.
#[derive(Clone, Format)]
pub enum ControlRequest {
    /// One-shot discovery session (clears the previous list).
    StartScan,
    /// End the discovery session early.
    StopScan,
    /// Connect to the scan-list entry at this index.
    ConnectToIndex(usize),
    /// Drop the current link.
    Disconnect,
    /// Clear a connect request that has not reached the worker yet.
    CancelPendingConnect,
    SetAutoReconnect(bool),
    /// Forget the bonded keyboard: persisted record and bond keys.
    ClearStoredDevice,
}

/// Commands for the connection worker. At most one is in flight.
#[derive(Clone, Format)]
pub enum WorkerCommand {
    Connect(PairingRecord),
    Disconnect,
}

#[derive(Clone, Copy, Format)]
pub enum ScanCommand {
    Start,
    Stop,
}

/// Events the radio tasks publish for the control loop.
#[derive(Clone, Format)]
pub enum BleEvent {
    ScanStarted,
    /// An advertisement sighting; the control loop owns the upsert.
    DeviceSighted(DiscoveredDevice),
    ScanComplete,
    /// Protocol flow finished; input reports are flowing.
    Connected(PairingRecord),
    /// The worker returned. `None` means a clean disconnect or link
    /// loss after a successful connection.
    ConnectionEnded(Option<Error>),
}

pub static CONTROL_REQUESTS: Channel<CriticalSectionRawMutex, ControlRequest, 4> = Channel::new();
pub static WORKER_COMMANDS: Channel<CriticalSectionRawMutex, WorkerCommand, 2> = Channel::new();
pub static SCAN_COMMANDS: Channel<CriticalSectionRawMutex, ScanCommand, 2> = Channel::new();
pub static BLE_EVENTS: Channel<CriticalSectionRawMutex, BleEvent, 8> = Channel::new();
pub static KEY_EVENTS: Channel<CriticalSectionRawMutex, KeyEvent, KEY_EVENT_QUEUE_DEPTH> =
    Channel::new();
pub static PROFILE_REQUESTS: Channel<CriticalSectionRawMutex, LinkProfile, 2> = Channel::new();

/// SoftDevice address → owned peer address. Anything that is not public
/// is treated as random static; resolvable-private keyboards re-pair.
pub fn peer_from_sd(address: &Address) -> PeerAddress {
    let kind = match address.address_type() {
        AddressType::Public => AddressKind::Public,
        _ => AddressKind::RandomStatic,
    };
    PeerAddress::new(kind, address.bytes())
}

pub fn sd_from_peer(address: &PeerAddress) -> Address {
    let kind = match address.kind {
        AddressKind::Public => AddressType::Public,
        AddressKind::RandomStatic => AddressType::RandomStatic,
    };
    Address::new(kind, address.bytes)
}
