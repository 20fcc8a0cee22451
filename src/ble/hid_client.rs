//! GATT client for the HID-over-GATT service (0x1812).
//!
//! After the link is up (and ideally encrypted), this module:
//! 1. discovers the HID service and records whichever of its
//!    characteristics actually exist (real keyboards omit plenty);
//! 2. reads the Report Reference descriptors and resolves which
//!    characteristic carries keystrokes (see [`crate::ble::resolver`]);
//! 3. writes the CCCD(s) to enable notifications;
//! 4. requests Report protocol mode when the characteristic exists
//!    (best effort);
//! 5. runs the notification loop, diffing reports into key events.
//!
//! Discovery is implemented directly against the [`gatt_client::Client`]
//! trait rather than the derive macro: the macro treats every declared
//! characteristic as mandatory, but here only the service itself is -
//! a report-protocol-only keyboard has no Boot Keyboard Input and often
//! no Protocol Mode, and must still connect.

use defmt::{info, warn};
use heapless::Vec;
use nrf_softdevice::ble::gatt_client::{self, Characteristic, Descriptor, DiscoverError, HvxType};
use nrf_softdevice::ble::{Connection, Uuid};
use nrf_softdevice::raw;

use crate::ble::resolver::{self, InputSource, ReportReference, SourceKind, MAX_SOURCES};
use crate::ble::{KEY_EVENTS, PROFILE_REQUESTS};
use crate::error::Error;
use crate::hid::decoder::ReportDecoder;

const UUID_HID_SERVICE: Uuid = Uuid::new_16(0x1812);
const UUID_REPORT: Uuid = Uuid::new_16(0x2a4d);
const UUID_BOOT_KEYBOARD_INPUT: Uuid = Uuid::new_16(0x2a22);
const UUID_PROTOCOL_MODE: Uuid = Uuid::new_16(0x2a4e);
const UUID_CCCD: Uuid = Uuid::new_16(0x2902);
const UUID_REPORT_REFERENCE: Uuid = Uuid::new_16(0x2908);

/// CCCD value enabling notifications.
const CCCD_NOTIFY: [u8; 2] = [0x01, 0x00];

/// Protocol Mode value selecting Report protocol.
const PROTOCOL_MODE_REPORT: [u8; 1] = [0x01];

/// Longest notification payload retained. Keyboard reports are 7 or 8
/// bytes (possibly report-ID prefixed); anything beyond this is not a
/// keyboard report.
pub const MAX_NOTIFICATION_LEN: usize = 20;

/// One discovered input-report characteristic.
struct SourceChar {
    kind: SourceKind,
    value_handle: u16,
    cccd_handle: Option<u16>,
    reference_handle: Option<u16>,
    notify: bool,
}

/// Handle table for the keyboard's HID service, populated during
/// discovery with whatever the peripheral actually exposes.
pub struct KeyboardServiceClient {
    sources: Vec<SourceChar, MAX_SOURCES>,
    protocol_mode_handle: Option<u16>,
}

/// An input-report notification, as received (no padding, no
/// truncation below [`MAX_NOTIFICATION_LEN`]).
pub struct InputNotification {
    payload: Vec<u8, MAX_NOTIFICATION_LEN>,
}

impl gatt_client::Client for KeyboardServiceClient {
    type Event = InputNotification;

    fn on_hvx(
        &self,
        _conn: &Connection,
        type_: HvxType,
        handle: u16,
        data: &[u8],
    ) -> Option<Self::Event> {
        if !matches!(type_, HvxType::Notification) {
            return None;
        }
        if !self.sources.iter().any(|s| s.value_handle == handle) {
            return None;
        }
        let mut payload = Vec::new();
        let len = data.len().min(MAX_NOTIFICATION_LEN);
        let _ = payload.extend_from_slice(&data[..len]);
        Some(InputNotification { payload })
    }

    fn uuid() -> Uuid {
        UUID_HID_SERVICE
    }

    fn new_undiscovered(_conn: Connection) -> Self {
        Self {
            sources: Vec::new(),
            protocol_mode_handle: None,
        }
    }

    fn discovered_characteristic(
        &mut self,
        characteristic: &Characteristic,
        descriptors: &[Descriptor],
    ) {
        if characteristic.uuid == Some(UUID_PROTOCOL_MODE) {
            self.protocol_mode_handle = Some(characteristic.handle_value);
            return;
        }

        let kind = if characteristic.uuid == Some(UUID_REPORT) {
            SourceKind::Report
        } else if characteristic.uuid == Some(UUID_BOOT_KEYBOARD_INPUT) {
            SourceKind::BootKeyboardInput
        } else {
            return;
        };

        let mut cccd_handle = None;
        let mut reference_handle = None;
        for descriptor in descriptors {
            if descriptor.uuid == Some(UUID_CCCD) {
                cccd_handle = Some(descriptor.handle);
            } else if descriptor.uuid == Some(UUID_REPORT_REFERENCE) {
                reference_handle = Some(descriptor.handle);
            }
        }

        let _ = self.sources.push(SourceChar {
            kind,
            value_handle: characteristic.handle_value,
            cccd_handle,
            reference_handle,
            notify: characteristic.props.notify() != 0,
        });
    }

    fn discovery_complete(&mut self) -> Result<(), DiscoverError> {
        // Whether the discovered set is usable is the resolver's call;
        // an empty service is a resolution failure, not a discovery one.
        Ok(())
    }
}

/// Discover the HID service, resolve the input source and subscribe.
pub async fn resolve_and_subscribe(conn: &Connection) -> Result<KeyboardServiceClient, Error> {
    let client: KeyboardServiceClient = gatt_client::discover(conn)
        .await
        .map_err(|_| Error::ServiceNotFound)?;

    info!(
        "HID service discovered: {} input-source candidates",
        client.sources.len()
    );

    // Read each Report Reference descriptor so declared input reports
    // resolve on the first tier. An absent or unreadable descriptor
    // leaves the candidate reference-less and resolution falls through
    // to the notify tier.
    let mut candidates: Vec<InputSource, MAX_SOURCES> = Vec::new();
    for source in client.sources.iter() {
        let mut reference = None;
        if let Some(handle) = source.reference_handle {
            let mut buf = [0u8; 2];
            match gatt_client::read(conn, handle, &mut buf).await {
                Ok(len) => reference = ReportReference::parse(&buf[..len]),
                Err(_) => warn!("Report Reference read failed, treating as undeclared"),
            }
        }
        let _ = candidates.push(InputSource {
            kind: source.kind,
            notify: source.notify,
            reference,
        });
    }

    let picked = resolver::select_input_sources(&candidates)?;

    let mut subscribed = false;
    for &index in picked.iter() {
        let source = &client.sources[index];
        let Some(cccd) = source.cccd_handle else {
            warn!("candidate {} has no CCCD", index);
            continue;
        };
        match gatt_client::write(conn, cccd, &CCCD_NOTIFY).await {
            Ok(()) => subscribed = true,
            Err(_) => warn!("CCCD write refused on candidate {}", index),
        }
    }

    // Boot fallback when every selected subscription was refused (seen
    // on keyboards that require encryption for 0x2A4D but not for the
    // boot characteristic).
    if !subscribed {
        for source in client.sources.iter() {
            if source.kind != SourceKind::BootKeyboardInput {
                continue;
            }
            if let Some(cccd) = source.cccd_handle {
                if gatt_client::write(conn, cccd, &CCCD_NOTIFY).await.is_ok() {
                    subscribed = true;
                    break;
                }
            }
        }
    }

    if !subscribed {
        return Err(Error::SubscriptionFailed);
    }

    // Report protocol carries full 6-key rollover; boot mode is only
    // the fallback wire format. Absence or refusal is fine - the
    // decoder accepts both layouts.
    match client.protocol_mode_handle {
        Some(handle) => {
            if gatt_client::write(conn, handle, &PROTOCOL_MODE_REPORT)
                .await
                .is_err()
            {
                warn!("keyboard refused Report protocol mode request");
            }
        }
        None => info!("no Protocol Mode characteristic, staying as-is"),
    }

    info!("subscribed to keyboard input reports");
    Ok(client)
}

/// Pump notifications until the link drops.
///
/// Decoded key events go to the input-event channel with `try_send`:
/// the GATT callback context must never block, so when the editor falls
/// behind, events are dropped (with a log line) rather than queued
/// unboundedly.
///
/// Concurrently, link-profile requests from the control loop are
/// applied to the connection.
pub async fn run_input_loop(conn: &Connection, client: &KeyboardServiceClient) {
    let mut decoder = ReportDecoder::new();

    let notifications = gatt_client::run(conn, client, |event| {
        // The payload goes to the decoder at its received length: 7 and
        // 8 byte reports decode, anything else is silently dropped.
        for key_event in decoder.decode(event.payload.as_slice()) {
            if KEY_EVENTS.try_send(key_event).is_err() {
                warn!("key-event queue full - dropping event");
            }
        }
    });

    let reparametrize = async {
        loop {
            let profile = PROFILE_REQUESTS.receive().await;
            let params = profile.params();
            let result = conn.set_conn_params(raw::ble_gap_conn_params_t {
                min_conn_interval: params.interval_min,
                max_conn_interval: params.interval_max,
                slave_latency: params.latency,
                conn_sup_timeout: params.timeout,
            });
            match result {
                Ok(()) => info!("link profile -> {}", profile),
                Err(_) => warn!("connection parameter update refused"),
            }
        }
    };

    embassy_futures::select::select(notifications, reparametrize).await;
    info!("input loop ended (link closed)");
}
