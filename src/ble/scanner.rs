//! One-shot GAP discovery.
//!
//! Runs the SoftDevice observer for a fixed window, filters
//! advertisements for the HID service UUID and streams sightings to the
//! control loop as they arrive (the scan-list upsert and the redraw
//! decision live there, not here). A `Stop` command ends the window
//! early.

use defmt::info;
use embassy_futures::select::{select, Either};
use embassy_time::{with_timeout, Duration, Instant};
use nrf_softdevice::ble::{central, Address};
use nrf_softdevice::Softdevice;

use crate::ble::adv_parser::{contains_hid_service_uuid, extract_device_name};
use crate::ble::scan_list::DiscoveredDevice;
use crate::ble::{peer_from_sd, BleEvent, ScanCommand, BLE_EVENTS, SCAN_COMMANDS};
use crate::config::SCAN_WINDOW_SECS;
use crate::error::Error;

#[embassy_executor::task]
pub async fn scanner_task(sd: &'static Softdevice) -> ! {
    loop {
        match SCAN_COMMANDS.receive().await {
            ScanCommand::Stop => {}
            ScanCommand::Start => {
                // Dropping the scan future (window elapsed or Stop
                // received) ends the observer cleanly.
                let window = with_timeout(Duration::from_secs(SCAN_WINDOW_SECS), scan(sd));
                let stop = async {
                    loop {
                        if let ScanCommand::Stop = SCAN_COMMANDS.receive().await {
                            break;
                        }
                    }
                };
                if let Either::First(Ok(Err(_))) = select(window, stop).await {
                    info!("scan aborted by radio stack");
                }
                BLE_EVENTS.send(BleEvent::ScanComplete).await;
            }
        }
    }
}

/// Emit a `DeviceSighted` event per received HID advertisement until
/// the caller drops the future. Repeat sightings of the same keyboard
/// are emitted again on purpose - the upsert refreshes RSSI and the
/// staleness clock.
async fn scan(sd: &Softdevice) -> Result<(), Error> {
    info!("scan window open ({} s)", SCAN_WINDOW_SECS);
    BLE_EVENTS.send(BleEvent::ScanStarted).await;

    // Active scan so scan responses (which usually carry the name)
    // reach the callback too.
    let config = central::ScanConfig {
        active: true,
        ..Default::default()
    };

    central::scan(sd, &config, |params| {
        let data =
            unsafe { core::slice::from_raw_parts(params.data.p_data, params.data.len as usize) };

        if contains_hid_service_uuid(data) {
            let address = peer_from_sd(&Address::from_raw(params.peer_addr));
            let name = extract_device_name(data);
            let sighting = DiscoveredDevice::new(
                address,
                name.as_ref().map(|n| n.as_str()),
                params.rssi,
                Instant::now().as_millis(),
            );
            // The callback runs in SoftDevice event context: try_send
            // only, drop the sighting when the control loop is behind.
            // The keyboard will advertise again within the window.
            let _ = BLE_EVENTS.try_send(BleEvent::DeviceSighted(sighting));
        }

        Option::<()>::None
    })
    .await
    .map_err(|_| Error::ScanFailed)
}
