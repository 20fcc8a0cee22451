//! Pairing, bonding and passkey display.
//!
//! The SoftDevice drives the SMP exchange; this module supplies the
//! policy side: IO capabilities, bond-key storage for the single paired
//! keyboard, and the 6-digit passkey the UI renders during numeric
//! pairing.
//!
//! `display_passkey` runs in SoftDevice event context, so the passkey
//! is published through an atomic the control loop samples on its next
//! tick rather than through a channel.

use core::cell::RefCell;
use core::sync::atomic::{AtomicU32, Ordering};

use defmt::{info, warn};
use nrf_softdevice::ble::security::{IoCapabilities, SecurityHandler};
use nrf_softdevice::ble::{Connection, EncryptionInfo, IdentityKey, MasterId, SecurityMode};
use static_cell::StaticCell;

use crate::config::{PairingPolicy, PAIRING_POLICY};

/// Sentinel for "no passkey on display".
pub const NO_PASSKEY: u32 = u32::MAX;

static CURRENT_PASSKEY: AtomicU32 = AtomicU32::new(NO_PASSKEY);

struct SingleBond {
    master_id: MasterId,
    key: EncryptionInfo,
    peer_id: IdentityKey,
}

/// Bond storage for the one keyboard this device pairs with. A new bond
/// replaces the previous one.
pub struct Bonder {
    bond: RefCell<Option<SingleBond>>,
}

impl Bonder {
    fn new() -> Self {
        Self {
            bond: RefCell::new(None),
        }
    }

    /// Drop the stored bond keys ("forget device").
    pub fn clear(&self) {
        *self.bond.borrow_mut() = None;
    }
}

impl SecurityHandler for Bonder {
    fn io_capabilities(&self) -> IoCapabilities {
        match PAIRING_POLICY {
            PairingPolicy::JustWorks => IoCapabilities::None,
            // Display only: we can show a code but have no yes/no input,
            // so the keyboard's keypad does the entering.
            PairingPolicy::DisplayPasskey => IoCapabilities::DisplayOnly,
        }
    }

    fn can_bond(&self, _conn: &Connection) -> bool {
        true
    }

    fn display_passkey(&self, passkey: &[u8; 6]) {
        let mut value: u32 = 0;
        for &digit in passkey {
            value = value * 10 + u32::from(digit.wrapping_sub(b'0'));
        }
        CURRENT_PASSKEY.store(value, Ordering::Relaxed);
        info!("pairing passkey: {}", value);
    }

    fn on_bonded(
        &self,
        _conn: &Connection,
        master_id: MasterId,
        key: EncryptionInfo,
        peer_id: IdentityKey,
    ) {
        info!("bonded with keyboard");
        *self.bond.borrow_mut() = Some(SingleBond {
            master_id,
            key,
            peer_id,
        });
    }

    fn get_key(&self, _conn: &Connection, master_id: MasterId) -> Option<EncryptionInfo> {
        self.bond
            .borrow()
            .as_ref()
            .and_then(|b| (b.master_id == master_id).then_some(b.key))
    }

    fn get_peripheral_key(&self, conn: &Connection) -> Option<(MasterId, EncryptionInfo)> {
        self.bond.borrow().as_ref().and_then(|b| {
            b.peer_id
                .is_match(conn.peer_address())
                .then_some((b.master_id, b.key))
        })
    }

    fn on_security_update(&self, _conn: &Connection, mode: SecurityMode) {
        match mode {
            SecurityMode::NoAccess | SecurityMode::Open => {
                warn!("link security downgraded: {}", mode)
            }
            _ => info!("link security mode: {}", mode),
        }
    }
}

/// Allocate the process-wide bond store. Call once at startup; the
/// returned reference is shared by the connection worker and the
/// control loop.
pub fn init_bonder() -> &'static Bonder {
    static BONDER: StaticCell<Bonder> = StaticCell::new();
    BONDER.init(Bonder::new())
}

/// Passkey currently on display, if numeric pairing is in progress.
pub fn current_passkey() -> Option<u32> {
    match CURRENT_PASSKEY.load(Ordering::Relaxed) {
        NO_PASSKEY => None,
        value => Some(value),
    }
}

/// The pairing exchange ended (either way); take the code off screen.
pub fn clear_passkey() {
    CURRENT_PASSKEY.store(NO_PASSKEY, Ordering::Relaxed);
}
