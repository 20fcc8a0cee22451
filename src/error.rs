//! Unified error type for the connection flow.
//!
//! We avoid `alloc` - every variant is a bare tag. Implements
//! `defmt::Format` on target for efficient logging.
//!
//! Malformed input reports and full-queue drops are deliberately *not*
//! errors: they are silent drops that never surface past the decoder.

/// Connection-flow errors. Every one of these is recovered locally: the
/// worker drops the link, the session returns to `Disconnected`, and
/// the failure is absorbed into the reconnect backoff.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Link establishment did not complete within the connect timeout.
    LinkTimeout,

    /// Security negotiation never produced an encrypted link. Non-fatal:
    /// the attempt continues unauthenticated, because some keyboards
    /// expose their reports without encryption.
    SecurityTimeout,

    /// The peripheral does not expose the HID service (0x1812).
    ServiceNotFound,

    /// No usable input-report source in any resolution tier.
    CharacteristicResolutionFailed,

    /// CCCD write on the selected input source was refused.
    SubscriptionFailed,

    /// Scan could not start or was cancelled by the radio stack.
    ScanFailed,

    /// Flash read/write for the pairing record failed.
    Storage,
}

impl Error {
    /// Whether this error ends the connect attempt. Security failures
    /// degrade to an unauthenticated attempt instead of aborting.
    pub fn aborts_attempt(self) -> bool {
        !matches!(self, Error::SecurityTimeout)
    }
}
