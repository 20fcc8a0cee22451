//! HID keyboard report handling: normalization and report-to-event
//! differencing. Pure logic, host-testable.

pub mod decoder;
pub mod keyboard;

pub use decoder::{KeyEvent, ReportDecoder};
pub use keyboard::KeyboardReport;
