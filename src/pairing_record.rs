//! The single persisted pairing record.
//!
//! The tablet bonds with exactly one keyboard, so the store holds at
//! most one record: address, address kind, display name. Clearing it is
//! an explicit user action that also wipes the radio-level bond keys.

use heapless::String;

use crate::ble::scan_list::{AddressKind, PeerAddress};

/// Worst-case serialized size: `[6 addr][1 kind][1 name_len][name..]`.
pub const MAX_RECORD_LEN: usize = 6 + 1 + 1 + 32;

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PairingRecord {
    pub address: PeerAddress,
    pub name: String<32>,
}

impl PairingRecord {
    pub fn new(address: PeerAddress, name: &str) -> Self {
        let mut n: String<32> = String::new();
        for c in name.chars().take(32) {
            let _ = n.push(c);
        }
        Self { address, name: n }
    }

    /// Serialize for the flash store. Returns bytes written, 0 when the
    /// buffer is too small.
    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        let name_bytes = self.name.as_bytes();
        let total = 8 + name_bytes.len();
        if buf.len() < total {
            return 0;
        }

        buf[0..6].copy_from_slice(&self.address.bytes);
        buf[6] = self.address.kind.to_raw();
        buf[7] = name_bytes.len() as u8;
        buf[8..total].copy_from_slice(name_bytes);
        total
    }

    /// Deserialize from flash bytes. Truncated or empty input yields
    /// `None` - absence of a record means "no stored device".
    pub fn deserialize(data: &[u8]) -> Option<Self> {
        if data.len() < 8 {
            return None;
        }

        let mut addr_bytes = [0u8; 6];
        addr_bytes.copy_from_slice(&data[0..6]);
        let kind = AddressKind::from_raw(data[6]);
        let name_len = data[7] as usize;
        if data.len() < 8 + name_len {
            return None;
        }

        let mut name: String<32> = String::new();
        if let Ok(s) = core::str::from_utf8(&data[8..8 + name_len]) {
            for c in s.chars().take(32) {
                let _ = name.push(c);
            }
        }

        Some(Self {
            address: PeerAddress::new(kind, addr_bytes),
            name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> PairingRecord {
        PairingRecord::new(
            PeerAddress::new(AddressKind::RandomStatic, [1, 2, 3, 4, 5, 6]),
            "K380 Keyboard",
        )
    }

    #[test]
    fn roundtrip() {
        let original = record();
        let mut buf = [0u8; MAX_RECORD_LEN];
        let len = original.serialize(&mut buf);
        assert_eq!(len, 8 + "K380 Keyboard".len());

        let parsed = PairingRecord::deserialize(&buf[..len]).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn address_kind_survives_roundtrip() {
        let original = PairingRecord::new(
            PeerAddress::new(AddressKind::Public, [9, 8, 7, 6, 5, 4]),
            "Board",
        );
        let mut buf = [0u8; MAX_RECORD_LEN];
        let len = original.serialize(&mut buf);
        let parsed = PairingRecord::deserialize(&buf[..len]).unwrap();
        assert_eq!(parsed.address.kind, AddressKind::Public);
    }

    #[test]
    fn truncated_input_is_rejected() {
        let mut buf = [0u8; MAX_RECORD_LEN];
        let len = record().serialize(&mut buf);
        assert!(PairingRecord::deserialize(&buf[..len - 1]).is_none());
        assert!(PairingRecord::deserialize(&[]).is_none());
        assert!(PairingRecord::deserialize(&buf[..4]).is_none());
    }

    #[test]
    fn small_buffer_writes_nothing() {
        let mut buf = [0u8; 4];
        assert_eq!(record().serialize(&mut buf), 0);
    }

    #[test]
    fn name_truncated_to_capacity() {
        let long = "an unreasonably long keyboard product name string";
        let rec = PairingRecord::new(
            PeerAddress::new(AddressKind::Public, [0; 6]),
            long,
        );
        assert_eq!(rec.name.len(), 32);
    }
}
