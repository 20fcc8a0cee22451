//! Host integration tests: whole-flow scenarios across the pure-logic
//! modules (scan bookkeeping, resolution, report decoding, session and
//! link-parameter policy). Radio-facing code is exercised on hardware.

use slate_ble::ble::resolver::{
    select_input_sources, InputSource, ReportReference, SourceKind,
};
use slate_ble::ble::scan_list::{AddressKind, DiscoveredDevice, PeerAddress, ScanList};
use slate_ble::config::{
    DEVICE_STALE_MS, KEY_IDLE_THRESHOLD_MS, RECONNECT_CAP_MS, RECONNECT_FLOOR_MS,
};
use slate_ble::hid::{KeyEvent, ReportDecoder};
use slate_ble::link_params::{AdaptiveController, LinkProfile};
use slate_ble::pairing_record::PairingRecord;
use slate_ble::session::{ConnectionState, Session};

fn addr(last: u8) -> PeerAddress {
    PeerAddress::new(AddressKind::RandomStatic, [last, 0x5E, 0x1A, 0x7E, 0x00, 0xC4])
}

fn report(modifier: u8, keys: &[u8]) -> [u8; 8] {
    let mut data = [0u8; 8];
    data[0] = modifier;
    data[2..2 + keys.len()].copy_from_slice(keys);
    data
}

/// Type "hi" with a shift-press in between, checking the exact event
/// stream the editor would receive.
#[test]
fn typing_session_event_stream() {
    const H: u8 = 0x0B;
    const I: u8 = 0x0C;
    const LSHIFT: u8 = 0x02;

    let mut decoder = ReportDecoder::new();
    let mut stream: Vec<KeyEvent> = Vec::new();

    for payload in [
        report(0, &[H]),          // h down
        report(0, &[]),           // h up
        report(LSHIFT, &[]),      // shift down (modifier only)
        report(LSHIFT, &[I]),     // I down
        report(LSHIFT, &[]),      // I up
        report(0, &[]),           // shift up
    ] {
        stream.extend(decoder.decode(&payload));
    }

    let expected = [
        (H, 0u8, true),
        (H, 0, false),
        (I, LSHIFT, true),
        (I, LSHIFT, false),
    ];
    assert_eq!(stream.len(), expected.len());
    for (event, (keycode, modifiers, pressed)) in stream.iter().zip(expected) {
        assert_eq!(event.keycode, keycode);
        assert_eq!(event.modifiers, modifiers);
        assert_eq!(event.pressed, pressed);
    }
}

/// A key held across a link loss must not ghost-release or ghost-repeat
/// into the next session.
#[test]
fn decoder_reset_between_sessions() {
    let mut decoder = ReportDecoder::new();
    decoder.decode(&report(0, &[0x04]));

    // Link drops while the key is held.
    decoder.reset();

    // New session: keyboard reports the key again - fresh press.
    let events = decoder.decode(&report(0, &[0x04]));
    assert_eq!(events.len(), 1);
    assert!(events[0].pressed);
    // And releasing it produces exactly one release.
    let events = decoder.decode(&report(0, &[]));
    assert_eq!(events.len(), 1);
    assert!(!events[0].pressed);
}

/// Simulated discovery session: three keyboards advertising at
/// different cadences, one goes quiet and is pruned.
#[test]
fn discovery_session_with_pruning() {
    fn observe(list: &mut ScanList, last: u8, rssi: i8, now: u64) -> bool {
        list.upsert(DiscoveredDevice::new(addr(last), Some("Keyboard"), rssi, now))
    }

    let mut list = ScanList::new();
    let mut redraws = 0;

    // All three seen in the first second.
    for (last, rssi, now) in [(1, -50, 100), (2, -60, 200), (3, -70, 300)] {
        if observe(&mut list, last, rssi, now) {
            redraws += 1;
        }
    }
    assert_eq!(list.len(), 3);
    assert_eq!(redraws, 3);

    // Keyboards 1 and 2 keep advertising with unchanged attributes:
    // timestamps refresh, nothing to redraw.
    for t in (1_000..=9_000).step_by(1_000) {
        assert!(!observe(&mut list, 1, -50, t));
        assert!(!observe(&mut list, 2, -60, t));
    }
    assert_eq!(redraws, 3);

    // Keyboard 3 unseen since t=300: pruned once its age passes the
    // threshold.
    assert!(list.prune_stale(300 + DEVICE_STALE_MS + 1, DEVICE_STALE_MS));
    assert_eq!(list.len(), 2);
    assert!(list.devices().iter().all(|d| d.address != addr(3)));
}

/// Resolution over a realistic characteristic table: a keyboard with
/// input + output report characteristics, properly referenced.
#[test]
fn resolution_conformant_keyboard() {
    let candidates = [
        InputSource {
            kind: SourceKind::Report,
            notify: false,
            reference: Some(ReportReference {
                report_id: 1,
                kind: 2, // output (LEDs)
            }),
        },
        InputSource {
            kind: SourceKind::Report,
            notify: true,
            reference: Some(ReportReference {
                report_id: 1,
                kind: 1, // input
            }),
        },
        InputSource {
            kind: SourceKind::BootKeyboardInput,
            notify: true,
            reference: None,
        },
    ];
    let picked = select_input_sources(&candidates).unwrap();
    assert_eq!(picked.as_slice(), &[1]);
}

/// The sloppy-keyboard case that motivated tiered resolution: no
/// Report Reference descriptors anywhere, reports split across two
/// characteristics. Both get subscribed.
#[test]
fn resolution_sloppy_keyboard() {
    let candidates = [
        InputSource {
            kind: SourceKind::Report,
            notify: true,
            reference: None,
        },
        InputSource {
            kind: SourceKind::Report,
            notify: true,
            reference: None,
        },
    ];
    let picked = select_input_sources(&candidates).unwrap();
    assert_eq!(picked.as_slice(), &[0, 1]);
}

/// Full reconnect lifecycle: repeated failures walk the backoff up to
/// the cap, a success resets it to the floor.
#[test]
fn reconnect_backoff_lifecycle() {
    let mut session = Session::new();
    session.store_record(PairingRecord::new(addr(9), "K380"));

    let mut now = 0u64;
    let mut delays: Vec<u64> = Vec::new();

    // Eight failed attempts, each failing instantly.
    for _ in 0..8 {
        // Advance to when the attempt fires.
        while !session.poll_auto_reconnect(now) {
            now += 50;
        }
        session.worker_ended(now);
        delays.push(session.backoff_delay_ms());
    }

    // 20s, 40s, 80s, then pinned at the 120s cap.
    assert_eq!(
        delays,
        vec![
            RECONNECT_FLOOR_MS * 2,
            RECONNECT_FLOOR_MS * 4,
            RECONNECT_FLOOR_MS * 8,
            RECONNECT_CAP_MS,
            RECONNECT_CAP_MS,
            RECONNECT_CAP_MS,
            RECONNECT_CAP_MS,
            RECONNECT_CAP_MS,
        ]
    );

    // Ninth attempt succeeds.
    while !session.poll_auto_reconnect(now) {
        now += 50;
    }
    session.worker_connected();
    assert_eq!(session.state(), ConnectionState::Connected);

    // Later link loss starts over at the floor.
    session.worker_ended(now + 300_000);
    assert_eq!(session.backoff_delay_ms(), RECONNECT_FLOOR_MS);
}

/// Link-profile policy across a typing burst: active while keys flow,
/// idle after the threshold, active again on the next key.
#[test]
fn adaptive_profile_over_typing_burst() {
    let mut controller = AdaptiveController::new();
    controller.reset(0);

    // Steady typing for two seconds: stays active, no requests.
    for t in (100..=2_000).step_by(100) {
        assert_eq!(controller.note_key_activity(t), None);
        assert_eq!(controller.poll(t), None);
    }

    // Quiet period crosses the threshold.
    assert_eq!(
        controller.poll(2_000 + KEY_IDLE_THRESHOLD_MS),
        Some(LinkProfile::Idle)
    );

    // Next keystroke snaps back to active.
    assert_eq!(
        controller.note_key_activity(2_000 + KEY_IDLE_THRESHOLD_MS + 700),
        Some(LinkProfile::Active)
    );
}

/// Scanning pauses reconnect attempts; ending the scan resumes them
/// without restarting the window.
#[test]
fn scan_pauses_auto_reconnect() {
    let mut session = Session::new();
    session.store_record(PairingRecord::new(addr(7), "Board"));

    session.set_scanning(true);
    for now in (0..RECONNECT_CAP_MS).step_by(5_000) {
        assert!(!session.poll_auto_reconnect(now));
    }
    session.set_scanning(false);
    assert!(session.poll_auto_reconnect(RECONNECT_CAP_MS));
}
