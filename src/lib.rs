//! Host-testable library interface for slate-ble.
//!
//! Re-exports the pure logic modules so they can be built and tested on
//! the host (no radio, no embedded toolchain): report differencing,
//! scan-list maintenance, characteristic resolution, backoff and the
//! adaptive link-parameter policy.
//!
//! Usage: `cargo test`
//!
//! The embedded binary uses main.rs with #![no_std] and #![no_main];
//! this lib.rs is a separate entry point that shares the same source
//! files via `#[path]`.

#![cfg_attr(not(test), no_std)]

#[path = "config.rs"]
mod config_impl;
#[path = "error.rs"]
mod error_impl;
#[path = "link_params.rs"]
mod link_params_impl;
#[path = "pairing_record.rs"]
mod pairing_record_impl;
#[path = "reconnect.rs"]
mod reconnect_impl;
#[path = "session.rs"]
mod session_impl;

#[path = "hid/decoder.rs"]
mod hid_decoder_impl;
#[path = "hid/keyboard.rs"]
mod hid_keyboard_impl;

#[path = "ble/adv_parser.rs"]
mod ble_adv_parser_impl;
#[path = "ble/resolver.rs"]
mod ble_resolver_impl;
#[path = "ble/scan_list.rs"]
mod ble_scan_list_impl;

pub mod config {
    pub use crate::config_impl::*;
}

pub mod error {
    pub use crate::error_impl::*;
}

pub mod reconnect {
    pub use crate::reconnect_impl::*;
}

pub mod link_params {
    pub use crate::link_params_impl::*;
}

pub mod pairing_record {
    pub use crate::pairing_record_impl::*;
}

pub mod session {
    pub use crate::session_impl::*;
}

pub mod hid {
    pub mod decoder {
        pub use crate::hid_decoder_impl::*;
    }
    pub mod keyboard {
        pub use crate::hid_keyboard_impl::*;
    }

    pub use decoder::{KeyEvent, ReportDecoder};
    pub use keyboard::KeyboardReport;
}

pub mod ble {
    pub mod adv_parser {
        pub use crate::ble_adv_parser_impl::*;
    }
    pub mod resolver {
        pub use crate::ble_resolver_impl::*;
    }
    pub mod scan_list {
        pub use crate::ble_scan_list_impl::*;
    }
}
