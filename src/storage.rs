//! Persistence for the pairing record.
//!
//! The device remembers exactly one keyboard across power cycles. The
//! record lives in two reserved internal-flash pages behind
//! `sequential-storage`, which handles wear levelling over the region.
//! Serialization is [`PairingRecord`]'s own wire format; absence of the
//! key means "never paired".

use defmt::{debug, error, info};
use sequential_storage::cache::NoCache;

use crate::config::{STORAGE_FLASH_PAGE_COUNT, STORAGE_FLASH_PAGE_START};
use crate::error::Error;
use crate::pairing_record::{PairingRecord, MAX_RECORD_LEN};

/// Flash page size for nRF52840 (4 KB).
const FLASH_PAGE_SIZE: u32 = 4096;

const STORAGE_START: u32 = STORAGE_FLASH_PAGE_START * FLASH_PAGE_SIZE;
const STORAGE_END: u32 = (STORAGE_FLASH_PAGE_START + STORAGE_FLASH_PAGE_COUNT) * FLASH_PAGE_SIZE;

/// Map key for the single record.
const KEY_PAIRED_KEYBOARD: u8 = 0x01;

/// Working buffer size. Record plus sequential-storage item overhead.
const BUF_SIZE: usize = MAX_RECORD_LEN + 16;

/// In-memory cache of the pairing record, synced with flash. Owned by
/// the control loop; flash writes happen on its schedule, never in the
/// radio path.
pub struct PairingStore {
    record: Option<PairingRecord>,
    dirty: bool,
}

impl PairingStore {
    pub const fn new() -> Self {
        Self {
            record: None,
            dirty: false,
        }
    }

    pub fn record(&self) -> Option<&PairingRecord> {
        self.record.as_ref()
    }

    /// Replace the stored record. A no-op when the record is unchanged,
    /// so routine reconnects never touch flash.
    pub fn set(&mut self, record: PairingRecord) {
        if self.record.as_ref() == Some(&record) {
            return;
        }
        self.record = Some(record);
        self.dirty = true;
    }

    /// Forget the paired keyboard.
    pub fn clear(&mut self) {
        if self.record.is_some() {
            self.record = None;
            self.dirty = true;
        }
    }

    /// Load the record from flash. A corrupt record deserializes to
    /// nothing and is not an error; a failed flash read is.
    pub async fn load_from_flash(
        &mut self,
        flash: &mut impl embedded_storage_async::nor_flash::NorFlash,
    ) -> Result<(), Error> {
        let mut buf = [0u8; BUF_SIZE];

        let result = sequential_storage::map::fetch_item::<u8, &[u8], _>(
            flash,
            STORAGE_START..STORAGE_END,
            &mut NoCache::new(),
            &mut buf,
            &KEY_PAIRED_KEYBOARD,
        )
        .await;
        self.dirty = false;

        match result {
            Ok(Some(data)) => {
                self.record = PairingRecord::deserialize(data);
                match &self.record {
                    Some(record) => info!("loaded pairing record: {}", record.name.as_str()),
                    None => error!("stored pairing record is corrupt - ignoring"),
                }
                Ok(())
            }
            Ok(None) => {
                info!("no pairing record in flash");
                self.record = None;
                Ok(())
            }
            Err(e) => {
                error!("flash read error: {:?}", defmt::Debug2Format(&e));
                self.record = None;
                Err(Error::Storage)
            }
        }
    }

    /// Persist pending changes. Clean stores skip the flash entirely.
    /// On failure the store stays dirty, so the next save retries.
    pub async fn save_to_flash(
        &mut self,
        flash: &mut impl embedded_storage_async::nor_flash::NorFlash,
    ) -> Result<(), Error> {
        if !self.dirty {
            debug!("pairing store clean - nothing to save");
            return Ok(());
        }

        let mut buf = [0u8; BUF_SIZE];
        let mut data_buf = [0u8; MAX_RECORD_LEN];
        let len = match &self.record {
            Some(record) => record.serialize(&mut data_buf),
            // Cleared record: store a zero-length item so the key
            // deserializes to nothing on the next boot.
            None => 0,
        };
        let item = &data_buf[..len];

        match sequential_storage::map::store_item::<u8, &[u8], _>(
            flash,
            STORAGE_START..STORAGE_END,
            &mut NoCache::new(),
            &mut buf,
            &KEY_PAIRED_KEYBOARD,
            &item,
        )
        .await
        {
            Ok(()) => {
                info!("pairing record saved");
                self.dirty = false;
                Ok(())
            }
            Err(e) => {
                error!("flash write error: {:?}", defmt::Debug2Format(&e));
                Err(Error::Storage)
            }
        }
    }
}
