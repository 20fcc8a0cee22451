//! Tiered input-report source resolution.
//!
//! Real keyboards are sloppy about the HID table. Conformant ones mark
//! their input report with a Report Reference descriptor; plenty omit
//! the descriptor, split the report across several characteristics, or
//! expose only the boot-protocol characteristic. Resolution walks three
//! tiers and takes the first that yields anything:
//!
//! 1. the report characteristic whose Report Reference declares Input;
//! 2. every notify-capable report characteristic;
//! 3. the legacy Boot Keyboard Input characteristic.
//!
//! All three empty is a fatal resolution error for the attempt.

use heapless::Vec;

use crate::error::Error;

/// Bound on candidate characteristics per service.
pub const MAX_SOURCES: usize = 8;

/// Contents of a Report Reference descriptor (0x2908).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReportReference {
    pub report_id: u8,
    /// 1 = Input, 2 = Output, 3 = Feature.
    pub kind: u8,
}

impl ReportReference {
    pub const INPUT: u8 = 1;

    pub fn is_input(&self) -> bool {
        self.kind == Self::INPUT
    }

    /// Parse a raw descriptor value (at least `[report_id, kind]`).
    pub fn parse(value: &[u8]) -> Option<Self> {
        if value.len() < 2 {
            return None;
        }
        Some(Self {
            report_id: value[0],
            kind: value[1],
        })
    }
}

/// Which characteristic a candidate came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SourceKind {
    /// HID Report (0x2A4D).
    Report,
    /// Boot Keyboard Input (0x2A22).
    BootKeyboardInput,
}

/// Metadata gathered for one characteristic during GATT discovery.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InputSource {
    pub kind: SourceKind,
    /// Notify bit in the characteristic properties.
    pub notify: bool,
    /// Report Reference descriptor value, when one exists and was
    /// readable.
    pub reference: Option<ReportReference>,
}

/// Pick the characteristics to subscribe to, as indices into
/// `candidates`. First tier with a match wins.
pub fn select_input_sources(
    candidates: &[InputSource],
) -> Result<Vec<usize, MAX_SOURCES>, Error> {
    let mut picked: Vec<usize, MAX_SOURCES> = Vec::new();

    // Tier 1: a report characteristic that declares itself Input.
    if let Some(index) = candidates.iter().position(|c| {
        c.kind == SourceKind::Report && c.reference.is_some_and(|r| r.is_input())
    }) {
        let _ = picked.push(index);
        return Ok(picked);
    }

    // Tier 2: nothing declared a usable reference - subscribe to every
    // notify-capable report characteristic and treat them all as
    // candidate input sources.
    for (index, candidate) in candidates.iter().enumerate() {
        if candidate.kind == SourceKind::Report && candidate.notify {
            let _ = picked.push(index);
        }
    }
    if !picked.is_empty() {
        return Ok(picked);
    }

    // Tier 3: boot keyboard input.
    if let Some(index) = candidates
        .iter()
        .position(|c| c.kind == SourceKind::BootKeyboardInput)
    {
        let _ = picked.push(index);
        return Ok(picked);
    }

    Err(Error::CharacteristicResolutionFailed)
}
