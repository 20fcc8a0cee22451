//! Connection worker.
//!
//! Owns link establishment end to end: GAP connect with a one-address
//! whitelist, security negotiation, HID service resolution, then the
//! notification loop until the link drops. Exactly one attempt runs at
//! a time; a `Disconnect` command races the in-flight attempt and wins.
//!
//! The worker never decides *whether* to connect - the control loop
//! sends `Connect` commands (user action or reconnect backoff) and
//! consumes the terminal `ConnectionEnded` event.

use defmt::{info, warn};
use embassy_futures::select::{select, Either};
use embassy_time::{with_timeout, Duration, Timer};
use nrf_softdevice::ble::{central, Connection, EncryptError, SecurityMode};
use nrf_softdevice::{raw, Softdevice};

use crate::ble::security::{self, Bonder};
use crate::ble::{hid_client, sd_from_peer, BleEvent, WorkerCommand, BLE_EVENTS, WORKER_COMMANDS};
use crate::config::{CONNECT_TIMEOUT_SECS, SECURITY_POLL_MS, SECURITY_WAIT_MS};
use crate::error::Error;
use crate::link_params::LinkProfile;
use crate::pairing_record::PairingRecord;

#[embassy_executor::task]
pub async fn connection_task(sd: &'static Softdevice, bonder: &'static Bonder) -> ! {
    let mut pending: Option<WorkerCommand> = None;

    loop {
        let command = match pending.take() {
            Some(command) => command,
            None => WORKER_COMMANDS.receive().await,
        };

        let WorkerCommand::Connect(target) = command else {
            // Disconnect with no link up is a no-op.
            continue;
        };

        let attempt = connect_and_run(sd, bonder, &target);
        let outcome = match select(WORKER_COMMANDS.receive(), attempt).await {
            Either::First(next) => {
                // Dropping the attempt future tears the link down.
                if let WorkerCommand::Connect(_) = &next {
                    pending = Some(next);
                }
                None
            }
            Either::Second(result) => result.err(),
        };

        security::clear_passkey();
        BLE_EVENTS.send(BleEvent::ConnectionEnded(outcome)).await;
    }
}

/// One connect attempt: link, security, resolution, input loop.
/// Returns `Ok(())` when an established link ended (loss or commanded
/// teardown), `Err` when the attempt never got that far.
async fn connect_and_run(
    sd: &'static Softdevice,
    bonder: &'static Bonder,
    target: &PairingRecord,
) -> Result<(), Error> {
    info!("connecting to {}", target.name.as_str());

    let address = sd_from_peer(&target.address);
    let whitelist = [&address];
    let active = LinkProfile::Active.params();
    let config = central::ConnectConfig {
        scan_config: central::ScanConfig {
            whitelist: Some(&whitelist),
            ..Default::default()
        },
        conn_params: raw::ble_gap_conn_params_t {
            min_conn_interval: active.interval_min,
            max_conn_interval: active.interval_max,
            slave_latency: active.latency,
            conn_sup_timeout: active.timeout,
        },
        ..Default::default()
    };

    let conn = with_timeout(
        Duration::from_secs(CONNECT_TIMEOUT_SECS),
        central::connect_with_security(sd, &config, bonder),
    )
    .await
    .map_err(|_| Error::LinkTimeout)?
    .map_err(|_| Error::LinkTimeout)?;

    // Security is negotiated but not required: some keyboards serve
    // reports over an open link, and refusing them would brick pairing
    // with real hardware.
    if let Err(e) = negotiate_security(&conn).await {
        warn!("proceeding without encryption: {}", e);
    }

    let client = hid_client::resolve_and_subscribe(&conn).await?;

    BLE_EVENTS.send(BleEvent::Connected(target.clone())).await;

    hid_client::run_input_loop(&conn, &client).await;

    Ok(())
}

/// Kick off encryption (reusing stored bond keys when the peer is
/// known, pairing afresh otherwise) and wait a bounded time for the
/// link to come up secure.
async fn negotiate_security(conn: &Connection) -> Result<(), Error> {
    match conn.encrypt() {
        Ok(()) => {}
        Err(EncryptError::PeerKeysNotFound) => {
            if conn.request_pairing().is_err() {
                return Err(Error::SecurityTimeout);
            }
        }
        Err(_) => return Err(Error::SecurityTimeout),
    }

    let mut waited = 0;
    while waited < SECURITY_WAIT_MS {
        match conn.security_mode() {
            SecurityMode::NoAccess | SecurityMode::Open => {
                Timer::after(Duration::from_millis(SECURITY_POLL_MS)).await;
                waited += SECURITY_POLL_MS;
            }
            mode => {
                info!("link encrypted: {}", mode);
                return Ok(());
            }
        }
    }

    Err(Error::SecurityTimeout)
}
