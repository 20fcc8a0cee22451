//! Advertisement payload parsing.
//!
//! Scan results are filtered to peripherals advertising the HID service
//! so the pairing screen never fills up with phones and beacons.

use heapless::String;

const AD_TYPE_INCOMPLETE_UUID16: u8 = 0x02;
const AD_TYPE_COMPLETE_UUID16: u8 = 0x03;
const AD_TYPE_SHORTENED_NAME: u8 = 0x08;
const AD_TYPE_COMPLETE_NAME: u8 = 0x09;

/// HID service UUID 0x1812, little-endian as it appears on the air.
const HID_SERVICE_UUID_LE: [u8; 2] = [0x12, 0x18];

/// Iterator over the length-prefixed AD structures of an advertisement.
/// Stops at the first malformed length.
struct AdStructures<'a> {
    data: &'a [u8],
}

impl<'a> Iterator for AdStructures<'a> {
    type Item = (u8, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let len = *self.data.first()? as usize;
        if len == 0 || len >= self.data.len() {
            return None;
        }
        let ad_type = self.data[1];
        let payload = &self.data[2..len + 1];
        self.data = &self.data[len + 1..];
        Some((ad_type, payload))
    }
}

fn ad_structures(data: &[u8]) -> AdStructures<'_> {
    AdStructures { data }
}

/// Whether the advertisement lists the HID service UUID (0x1812).
pub fn contains_hid_service_uuid(data: &[u8]) -> bool {
    ad_structures(data).any(|(ad_type, payload)| {
        (ad_type == AD_TYPE_INCOMPLETE_UUID16 || ad_type == AD_TYPE_COMPLETE_UUID16)
            && payload.chunks_exact(2).any(|uuid| uuid == HID_SERVICE_UUID_LE)
    })
}

/// Extract the complete or shortened local name, truncated to 32 bytes.
/// Returns `None` when the advertisement carries no name; callers fall
/// back to the address text.
pub fn extract_device_name(data: &[u8]) -> Option<String<32>> {
    ad_structures(data)
        .find(|(ad_type, _)| {
            *ad_type == AD_TYPE_SHORTENED_NAME || *ad_type == AD_TYPE_COMPLETE_NAME
        })
        .map(|(_, bytes)| {
            let mut name = String::new();
            for &b in bytes {
                if name.push(b as char).is_err() {
                    break;
                }
            }
            name
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_hid_uuid_in_advertisement() {
        // len=3, type=0x03 (Complete 16-bit UUIDs), UUID=0x1812 LE
        let ad_data = [0x03, 0x03, 0x12, 0x18];
        assert!(contains_hid_service_uuid(&ad_data));
    }

    #[test]
    fn reject_non_hid_uuid() {
        // Battery Service (0x180F) only
        let ad_data = [0x03, 0x03, 0x0F, 0x18];
        assert!(!contains_hid_service_uuid(&ad_data));
    }

    #[test]
    fn hid_uuid_among_multiple_uuids() {
        let ad_data = [
            0x07, 0x03, // len=7, Complete 16-bit UUIDs
            0x0F, 0x18, // Battery
            0x12, 0x18, // HID
            0x01, 0x18, // GATT
        ];
        assert!(contains_hid_service_uuid(&ad_data));
    }

    #[test]
    fn incomplete_uuid_list_is_checked_too() {
        let ad_data = [0x03, 0x02, 0x12, 0x18];
        assert!(contains_hid_service_uuid(&ad_data));
    }

    #[test]
    fn malformed_lengths_do_not_panic() {
        assert!(!contains_hid_service_uuid(&[]));
        assert!(!contains_hid_service_uuid(&[0x00]));
        assert!(!contains_hid_service_uuid(&[0x05, 0x03, 0x12]));
    }

    #[test]
    fn extract_complete_local_name() {
        let ad_data = [
            0x09, 0x09, b'K', b'e', b'y', b'b', b'o', b'a', b'r', b'd',
        ];
        assert_eq!(
            extract_device_name(&ad_data).unwrap().as_str(),
            "Keyboard"
        );
    }

    #[test]
    fn extract_shortened_local_name() {
        let ad_data = [0x05, 0x08, b'K', b'2', b'G', b'O'];
        assert_eq!(extract_device_name(&ad_data).unwrap().as_str(), "K2GO");
    }

    #[test]
    fn name_follows_other_structures() {
        let ad_data = [
            0x02, 0x01, 0x06, // Flags
            0x03, 0x03, 0x12, 0x18, // HID UUID
            0x04, 0x09, b'M', b'S', b'K', // name
        ];
        assert_eq!(extract_device_name(&ad_data).unwrap().as_str(), "MSK");
    }

    #[test]
    fn no_name_yields_none() {
        let ad_data = [0x02, 0x01, 0x06];
        assert!(extract_device_name(&ad_data).is_none());
    }

    #[test]
    fn long_name_truncated_to_capacity() {
        let mut ad_data = [0u8; 40];
        ad_data[0] = 36;
        ad_data[1] = AD_TYPE_COMPLETE_NAME;
        for b in ad_data[2..37].iter_mut() {
            *b = b'X';
        }
        let name = extract_device_name(&ad_data).unwrap();
        assert_eq!(name.len(), 32);
    }
}
