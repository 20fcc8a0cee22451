//! slate-ble - BLE keyboard core for an e-ink writing tablet
//! (nRF52840 + SoftDevice S140, central role).
//!
//! Task layout:
//! - `softdevice_task`: runs the SoftDevice event loop.
//! - `scanner_task`: one-shot HID discovery windows.
//! - `connection_task`: link establishment, security, HID subscription
//!   and the notification loop.
//! - the main control loop below: owns all mutable state (session,
//!   scan list, pairing store, adaptive link policy) and multiplexes
//!   UI requests, radio events, key events and a periodic tick.
//!
//! Decoded key events leave through `INPUT_EVENTS`; display state
//! leaves through the `UI_STATE` signal. Everything beyond those two
//! boundaries (editor, e-ink rendering) lives elsewhere.

#![no_std]
#![no_main]

mod ble;
mod config;
mod error;
mod hid;
mod link_params;
mod pairing_record;
mod reconnect;
mod session;
mod storage;

use core::mem;

use defmt::{info, unwrap, warn};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_futures::select::{select4, Either4};
use embassy_nrf::interrupt::Priority;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant, Ticker};
use heapless::Vec;
use nrf_softdevice::{Flash, Softdevice};
use panic_probe as _;

use crate::ble::scan_list::{DiscoveredDevice, ScanList};
use crate::ble::security;
use crate::ble::{
    central, scanner, BleEvent, ControlRequest, ScanCommand, WorkerCommand, BLE_EVENTS,
    CONTROL_REQUESTS, KEY_EVENTS, SCAN_COMMANDS, WORKER_COMMANDS,
};
use crate::config::{
    CONTROL_TICK_MS, DEVICE_STALE_MS, KEY_EVENT_QUEUE_DEPTH, MAX_DISCOVERED_DEVICES,
};
use crate::hid::KeyEvent;
use crate::link_params::AdaptiveController;
use crate::pairing_record::PairingRecord;
use crate::session::{ConnectionState, Session};
use crate::storage::PairingStore;

/// Key events for the text-input layer (the editor task consumes this).
pub static INPUT_EVENTS: Channel<CriticalSectionRawMutex, KeyEvent, KEY_EVENT_QUEUE_DEPTH> =
    Channel::new();

/// Latest display state for the e-ink layer. Signal semantics: only the
/// newest snapshot matters, redraws are expensive.
pub static UI_STATE: Signal<CriticalSectionRawMutex, UiSnapshot> = Signal::new();

/// Everything the pairing/status screens render.
#[derive(Clone, defmt::Format)]
pub struct UiSnapshot {
    pub state: ConnectionState,
    pub scanning: bool,
    /// 6-digit code to show while numeric pairing is in progress.
    pub passkey: Option<u32>,
    /// Address of the peripheral being connected to / connected.
    pub current_address: Option<crate::ble::scan_list::PeerAddress>,
    pub paired_name: Option<heapless::String<32>>,
    pub devices: Vec<DiscoveredDevice, MAX_DISCOVERED_DEVICES>,
}

#[embassy_executor::task]
async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
}

fn softdevice_config() -> nrf_softdevice::Config {
    nrf_softdevice::Config {
        clock: Some(nrf_softdevice::raw::nrf_clock_lf_cfg_t {
            source: nrf_softdevice::raw::NRF_CLOCK_LF_SRC_XTAL as u8,
            rc_ctiv: 0,
            rc_temp_ctiv: 0,
            accuracy: nrf_softdevice::raw::NRF_CLOCK_LF_ACCURACY_20_PPM as u8,
        }),
        conn_gap: Some(nrf_softdevice::raw::ble_gap_conn_cfg_t {
            // One keyboard, one link.
            conn_count: 1,
            event_length: 24,
        }),
        conn_gatt: Some(nrf_softdevice::raw::ble_gatt_conn_cfg_t { att_mtu: 128 }),
        gap_role_count: Some(nrf_softdevice::raw::ble_gap_cfg_role_count_t {
            adv_set_count: 1,
            periph_role_count: 0,
            central_role_count: 1,
            central_sec_count: 1,
            _bitfield_1: nrf_softdevice::raw::ble_gap_cfg_role_count_t::new_bitfield_1(0),
        }),
        gap_device_name: Some(nrf_softdevice::raw::ble_gap_cfg_device_name_t {
            p_value: b"Slate" as *const u8 as _,
            current_len: 5,
            max_len: 5,
            write_perm: unsafe { mem::zeroed() },
            _bitfield_1: nrf_softdevice::raw::ble_gap_cfg_device_name_t::new_bitfield_1(
                nrf_softdevice::raw::BLE_GATTS_VLOC_STACK as u8,
            ),
        }),
        ..Default::default()
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("slate-ble starting");

    // The SoftDevice owns the highest interrupt priorities; keep
    // embassy's off them.
    let mut hw_config = embassy_nrf::config::Config::default();
    hw_config.gpiote_interrupt_priority = Priority::P2;
    hw_config.time_interrupt_priority = Priority::P2;
    let _p = embassy_nrf::init(hw_config);

    let sd = Softdevice::enable(&softdevice_config());
    let bonder = security::init_bonder();

    unwrap!(spawner.spawn(softdevice_task(sd)));
    unwrap!(spawner.spawn(scanner::scanner_task(sd)));
    unwrap!(spawner.spawn(central::connection_task(sd, bonder)));

    let mut flash = Flash::take(sd);
    let mut store = PairingStore::new();
    if store.load_from_flash(&mut flash).await.is_err() {
        warn!("pairing record unavailable - continuing unpaired");
    }

    let mut session = Session::new();
    if let Some(record) = store.record() {
        info!("stored keyboard: {}", record.name.as_str());
        session.store_record(record.clone());
    }

    let mut scan_list = ScanList::new();
    let mut controller = AdaptiveController::new();
    // Connect target parked while the scanner winds down.
    let mut deferred_connect: Option<PairingRecord> = None;

    let mut ticker = Ticker::every(Duration::from_millis(CONTROL_TICK_MS));
    let mut last_passkey: Option<u32> = None;

    publish_ui(&session, &scan_list, None);

    loop {
        let mut redraw = false;

        match select4(
            CONTROL_REQUESTS.receive(),
            BLE_EVENTS.receive(),
            KEY_EVENTS.receive(),
            ticker.next(),
        )
        .await
        {
            Either4::First(request) => match request {
                ControlRequest::StartScan => {
                    if !session.is_scanning() && !session.worker_active() {
                        scan_list.clear();
                        deferred_connect = None;
                        SCAN_COMMANDS.send(ScanCommand::Start).await;
                        redraw = true;
                    }
                }
                ControlRequest::StopScan => {
                    if session.is_scanning() {
                        SCAN_COMMANDS.send(ScanCommand::Stop).await;
                    }
                }
                ControlRequest::ConnectToIndex(index) => {
                    let Some(device) = scan_list.get(index) else {
                        warn!("connect request for missing scan entry {}", index);
                        continue;
                    };
                    let record = PairingRecord::new(device.address, device.name.as_str());
                    if session.is_scanning() {
                        // The observer and the initiator share the
                        // radio; connect once the scan window closes.
                        deferred_connect = Some(record);
                        SCAN_COMMANDS.send(ScanCommand::Stop).await;
                    } else {
                        start_connect(&mut session, record).await;
                        redraw = true;
                    }
                }
                ControlRequest::Disconnect => {
                    WORKER_COMMANDS.send(WorkerCommand::Disconnect).await;
                }
                ControlRequest::CancelPendingConnect => {
                    deferred_connect = None;
                }
                ControlRequest::SetAutoReconnect(enabled) => {
                    session.set_auto_reconnect(enabled);
                }
                ControlRequest::ClearStoredDevice => {
                    session.clear_record();
                    store.clear();
                    if store.save_to_flash(&mut flash).await.is_err() {
                        warn!("stale pairing record may survive next boot");
                    }
                    bonder.clear();
                    redraw = true;
                }
            },

            Either4::Second(event) => match event {
                BleEvent::ScanStarted => {
                    session.set_scanning(true);
                    redraw = true;
                }
                BleEvent::DeviceSighted(sighting) => {
                    redraw = scan_list.upsert(sighting);
                }
                BleEvent::ScanComplete => {
                    session.set_scanning(false);
                    if let Some(record) = deferred_connect.take() {
                        start_connect(&mut session, record).await;
                    }
                    redraw = true;
                }
                BleEvent::Connected(record) => {
                    info!("connected: {}", record.name.as_str());
                    session.worker_connected();
                    session.store_record(record.clone());
                    store.set(record);
                    if store.save_to_flash(&mut flash).await.is_err() {
                        warn!("pairing record not persisted - will retry on next save");
                    }
                    controller.reset(Instant::now().as_millis());
                    redraw = true;
                }
                BleEvent::ConnectionEnded(outcome) => {
                    if let Some(e) = outcome {
                        warn!("connect attempt failed: {}", e);
                    } else {
                        info!("link closed");
                    }
                    session.worker_ended(Instant::now().as_millis());
                    redraw = true;
                }
            },

            Either4::Third(key_event) => {
                if let Some(profile) =
                    controller.note_key_activity(Instant::now().as_millis())
                {
                    let _ = ble::PROFILE_REQUESTS.try_send(profile);
                }
                if INPUT_EVENTS.try_send(key_event).is_err() {
                    warn!("editor input queue full - dropping key event");
                }
            }

            Either4::Fourth(()) => {
                let now = Instant::now().as_millis();

                if session.is_connected() {
                    if let Some(profile) = controller.poll(now) {
                        let _ = ble::PROFILE_REQUESTS.try_send(profile);
                    }
                }

                if session.is_scanning() && scan_list.prune_stale(now, DEVICE_STALE_MS) {
                    redraw = true;
                }

                if session.poll_auto_reconnect(now) {
                    // poll_auto_reconnect only fires with a record set.
                    if let Some(record) = session.stored_record() {
                        info!("auto-reconnect: {}", record.name.as_str());
                        WORKER_COMMANDS
                            .send(WorkerCommand::Connect(record.clone()))
                            .await;
                        redraw = true;
                    }
                }

                let passkey = security::current_passkey();
                if passkey != last_passkey {
                    last_passkey = passkey;
                    redraw = true;
                }
            }
        }

        if redraw {
            publish_ui(&session, &scan_list, last_passkey);
        }
    }
}

/// Mark the session connecting and hand the target to the worker.
async fn start_connect(session: &mut Session, record: PairingRecord) {
    let now = Instant::now().as_millis();
    if session.request_connect(now, record.address) {
        WORKER_COMMANDS.send(WorkerCommand::Connect(record)).await;
    } else {
        warn!("connect refused - attempt already in flight");
    }
}

fn publish_ui(session: &Session, scan_list: &ScanList, passkey: Option<u32>) {
    let mut devices = Vec::new();
    for device in scan_list.devices() {
        let _ = devices.push(device.clone());
    }
    UI_STATE.signal(UiSnapshot {
        state: session.state(),
        scanning: session.is_scanning(),
        passkey,
        current_address: session.current_address(),
        paired_name: session.stored_record().map(|r| r.name.clone()),
        devices,
    });
}
