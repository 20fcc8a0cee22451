//! Keyboard report differencing.
//!
//! The radio delivers whole-report snapshots, not events. The decoder
//! retains the previous normalized report and diffs each incoming one
//! against it: keycodes that vanished become release events, keycodes
//! that appeared become press events. The link has no sub-report
//! ordering, so simultaneous changes are emitted in byte-slot order.

use heapless::Vec;

use crate::hid::keyboard::KeyboardReport;

/// Upper bound on events one report transition can produce
/// (6 releases + 6 presses).
pub const MAX_EVENTS_PER_REPORT: usize = 12;

/// One decoded key transition, pushed to the input-injection boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyEvent {
    /// HID usage code.
    pub keycode: u8,
    /// Modifier bitfield of the report that produced the event.
    pub modifiers: u8,
    /// `true` for press, `false` for release.
    pub pressed: bool,
}

/// Stateful differ over consecutive input reports.
#[derive(Default)]
pub struct ReportDecoder {
    last: KeyboardReport,
}

impl ReportDecoder {
    pub const fn new() -> Self {
        Self {
            last: KeyboardReport::empty(),
        }
    }

    /// Diff a raw notification payload against the retained report.
    ///
    /// Releases come out before presses, each group in ascending slot
    /// order. Malformed payloads (anything other than 7 or 8 bytes)
    /// produce no events and leave the retained report untouched.
    pub fn decode(&mut self, payload: &[u8]) -> Vec<KeyEvent, MAX_EVENTS_PER_REPORT> {
        let mut events: Vec<KeyEvent, MAX_EVENTS_PER_REPORT> = Vec::new();

        let Some(report) = KeyboardReport::from_notification(payload) else {
            return events;
        };

        for &keycode in self.last.keycodes.iter() {
            if keycode != 0 && !report.contains(keycode) {
                let _ = events.push(KeyEvent {
                    keycode,
                    modifiers: report.modifier,
                    pressed: false,
                });
            }
        }

        for &keycode in report.keycodes.iter() {
            if keycode != 0 && !self.last.contains(keycode) {
                let _ = events.push(KeyEvent {
                    keycode,
                    modifiers: report.modifier,
                    pressed: true,
                });
            }
        }

        self.last = report;
        events
    }

    /// Forget the retained report. Called on link loss so a stale
    /// report cannot leak ghost releases into the next session.
    pub fn reset(&mut self) {
        self.last.clear();
    }

    #[cfg(test)]
    fn last(&self) -> &KeyboardReport {
        &self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(modifier: u8, keys: &[u8]) -> [u8; 8] {
        let mut data = [0u8; 8];
        data[0] = modifier;
        data[2..2 + keys.len()].copy_from_slice(keys);
        data
    }

    #[test]
    fn first_report_emits_presses_only() {
        let mut decoder = ReportDecoder::new();
        let events = decoder.decode(&report(0x02, &[0x04]));
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0],
            KeyEvent {
                keycode: 0x04,
                modifiers: 0x02,
                pressed: true
            }
        );
    }

    #[test]
    fn overlap_diff_release_then_press() {
        // Previous {A, B}, new {B, C}: exactly release(A) then press(C),
        // nothing for the held B.
        let mut decoder = ReportDecoder::new();
        decoder.decode(&report(0, &[0x04, 0x05]));
        let events = decoder.decode(&report(0, &[0x05, 0x06]));

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].keycode, 0x04);
        assert!(!events[0].pressed);
        assert_eq!(events[1].keycode, 0x06);
        assert!(events[1].pressed);
    }

    #[test]
    fn identical_reports_emit_nothing() {
        let mut decoder = ReportDecoder::new();
        decoder.decode(&report(0, &[0x04, 0x05]));
        let events = decoder.decode(&report(0, &[0x04, 0x05]));
        assert!(events.is_empty());
    }

    #[test]
    fn seven_byte_payload_decodes_like_eight() {
        let mut a = ReportDecoder::new();
        let mut b = ReportDecoder::new();

        let short = [0x02, 0x04, 0x05, 0x00, 0x00, 0x00, 0x00];
        let long = [0x02, 0x00, 0x04, 0x05, 0x00, 0x00, 0x00, 0x00];

        assert_eq!(a.decode(&short), b.decode(&long));
        // And the follow-up release stream matches too.
        let empty7 = [0x00u8; 7];
        let empty8 = [0x00u8; 8];
        assert_eq!(a.decode(&empty7), b.decode(&empty8));
    }

    #[test]
    fn malformed_payload_is_dropped_and_state_kept() {
        let mut decoder = ReportDecoder::new();
        decoder.decode(&report(0, &[0x04]));

        assert!(decoder.decode(&[0x00; 5]).is_empty());
        assert!(decoder.decode(&[0x00; 9]).is_empty());
        assert_eq!(decoder.last().keycodes[0], 0x04);

        // The held key is still considered pressed, so re-sending it
        // produces no duplicate press.
        assert!(decoder.decode(&report(0, &[0x04])).is_empty());
    }

    #[test]
    fn notification_stream_of_varying_lengths() {
        // Keyboards are free to notify 7-byte reports, and the radio
        // delivers whatever length arrived. Feed the decoder a stream
        // mixing both report layouts and oversized junk: every payload
        // is handled at its received length, junk is dropped, state
        // survives.
        let mut decoder = ReportDecoder::new();

        let press7 = [0x00, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00];
        let events = decoder.decode(&press7);
        assert_eq!(events.len(), 1);
        assert!(events[0].pressed);

        assert!(decoder.decode(&[0u8; 20]).is_empty());

        // Release arrives as a canonical 8-byte report.
        let events = decoder.decode(&[0u8; 8]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].keycode, 0x04);
        assert!(!events[0].pressed);
    }

    #[test]
    fn release_all_on_empty_report() {
        let mut decoder = ReportDecoder::new();
        decoder.decode(&report(0x02, &[0x04, 0x05, 0x06]));
        let events = decoder.decode(&[0u8; 8]);

        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| !e.pressed));
        // Ascending slot order.
        assert_eq!(events[0].keycode, 0x04);
        assert_eq!(events[1].keycode, 0x05);
        assert_eq!(events[2].keycode, 0x06);
        // Modifiers come from the new (empty) report.
        assert!(events.iter().all(|e| e.modifiers == 0));
    }

    #[test]
    fn modifier_change_alone_emits_nothing() {
        let mut decoder = ReportDecoder::new();
        decoder.decode(&report(0x00, &[0x04]));
        let events = decoder.decode(&report(0x02, &[0x04]));
        assert!(events.is_empty());
    }

    #[test]
    fn reset_releases_nothing_but_forgets_keys() {
        let mut decoder = ReportDecoder::new();
        decoder.decode(&report(0, &[0x04]));
        decoder.reset();

        // After reset the same key is a fresh press, not a hold.
        let events = decoder.decode(&report(0, &[0x04]));
        assert_eq!(events.len(), 1);
        assert!(events[0].pressed);
    }

    #[test]
    fn full_rollover_swap() {
        let mut decoder = ReportDecoder::new();
        decoder.decode(&report(0, &[0x04, 0x05, 0x06, 0x07, 0x08, 0x09]));
        let events = decoder.decode(&report(0, &[0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F]));

        assert_eq!(events.len(), 12);
        assert!(events[..6].iter().all(|e| !e.pressed));
        assert!(events[6..].iter().all(|e| e.pressed));
    }
}
