//! BLE HID keyboard input report (canonical 8-byte layout).
//!
//! Layout:
//! ```text
//! Byte 0: Modifier keys (bitfield)
//!         Bit 0 = Left Ctrl,  Bit 1 = Left Shift,
//!         Bit 2 = Left Alt,   Bit 3 = Left GUI,
//!         Bit 4 = Right Ctrl, Bit 5 = Right Shift,
//!         Bit 6 = Right Alt,  Bit 7 = Right GUI
//! Byte 1: Reserved (0x00)
//! Byte 2-7: Up to 6 simultaneous key codes (HID usage codes)
//! ```
//!
//! Some keyboards drop the reserved byte and notify 7 bytes; those are
//! normalized into the canonical layout here.

/// Canonical keyboard report size in bytes.
pub const REPORT_LEN: usize = 8;

/// Length of the reserved-byte-less variant.
const SHORT_REPORT_LEN: usize = 7;

/// One normalized keyboard input report.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyboardReport {
    /// Modifier key bitfield.
    pub modifier: u8,
    /// Reserved byte (0x00 per HID spec).
    pub reserved: u8,
    /// Up to 6 simultaneously pressed key codes.
    pub keycodes: [u8; 6],
}

impl KeyboardReport {
    /// All keys released.
    pub const fn empty() -> Self {
        Self {
            modifier: 0,
            reserved: 0,
            keycodes: [0; 6],
        }
    }

    /// Parse a raw notification payload.
    ///
    /// Accepts the canonical 8-byte layout and the 7-byte variant with
    /// the reserved byte omitted. Any other length is malformed and
    /// yields `None` - the caller drops it silently.
    pub fn from_notification(data: &[u8]) -> Option<Self> {
        match data.len() {
            REPORT_LEN => Some(Self {
                modifier: data[0],
                reserved: data[1],
                keycodes: [data[2], data[3], data[4], data[5], data[6], data[7]],
            }),
            SHORT_REPORT_LEN => Some(Self {
                modifier: data[0],
                reserved: 0,
                keycodes: [data[1], data[2], data[3], data[4], data[5], data[6]],
            }),
            _ => None,
        }
    }

    /// Whether `keycode` appears in any key slot.
    pub fn contains(&self, keycode: u8) -> bool {
        self.keycodes.iter().any(|&k| k == keycode)
    }

    /// Reset to all-zero (used when the link drops).
    pub fn clear(&mut self) {
        *self = Self::empty();
    }

    /// `true` when no modifier and no key is active.
    pub fn is_empty(&self) -> bool {
        self.modifier == 0 && self.keycodes.iter().all(|&k| k == 0)
    }
}
