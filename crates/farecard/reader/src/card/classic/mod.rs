//! MIFARE Classic
//!
//! Each sector is protected by its own pair of keys. The decoder loads every
//! candidate key into the reader, authenticates, and reads the sector's
//! blocks through PC/SC Part 3 pseudo-APDUs. Sectors that cannot be opened or
//! read are recorded as such; they never fail the dump.

mod keys;
mod sector;

use bytes::Bytes;
use farecard_apdu_core::{Command, StatusClass};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

pub use keys::{ClassicKey, ClassicKeys, DEFAULT_KEYS, KEY_LEN, KeyType};
pub use sector::{BLOCK_SIZE, SectorOutcome, SectorRecord};

use crate::constants::pcsc::*;
use crate::{
    CardFamily, ClassicVariant, DumpContext, DumpOutcome, Error, FamilyDecoder, Result,
    snapshot::FamilyPayload, transceiver::Transceiver,
};

/// Raw contents of a MIFARE Classic card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassicCard {
    /// Memory layout the card reported
    pub variant: ClassicVariant,
    /// Every sector of the variant, in index order
    pub sectors: Vec<SectorRecord>,
}

impl ClassicCard {
    /// Sector by index
    pub fn sector(&self, index: usize) -> Option<&SectorRecord> {
        self.sectors.iter().find(|s| s.index == index)
    }
}

/// Decoder for MIFARE Classic
#[derive(Debug, Clone, Default)]
pub struct ClassicDecoder {
    keys: ClassicKeys,
}

impl ClassicDecoder {
    /// Create a decoder trying `keys`
    pub const fn new(keys: ClassicKeys) -> Self {
        Self { keys }
    }
}

/// Outcome of one READ BINARY
enum BlockRead {
    Data(Bytes),
    Denied,
    Failed(String),
}

/// Reader side state of one Classic dump
struct SectorReader<'t> {
    transceiver: &'t mut dyn Transceiver,
    /// Key currently in the reader's key slot
    loaded: Option<[u8; KEY_LEN]>,
}

impl SectorReader<'_> {
    fn load_key(&mut self, key: &[u8; KEY_LEN]) -> Result<()> {
        if self.loaded.as_ref() == Some(key) {
            return Ok(());
        }

        let command =
            Command::pseudo(INS_LOAD_KEY, 0x00, KEY_SLOT).with_data(Bytes::copy_from_slice(key));
        let response = self
            .transceiver
            .transmit(&command)
            .map_err(|e| e.at_step("LOAD KEY"))?;
        if !response.is_success() {
            return Err(Error::protocol(
                "LOAD KEY",
                format!("reader refused key load: {}", response.status()),
            ));
        }
        self.loaded = Some(*key);
        Ok(())
    }

    /// Try one key on a block of the sector
    fn authenticate(&mut self, block: u8, key: &ClassicKey) -> Result<bool> {
        self.load_key(&key.key)?;

        let params = [0x01, 0x00, block, key.key_type.authenticate_code(), KEY_SLOT];
        let command = Command::pseudo(INS_GENERAL_AUTHENTICATE, 0x00, 0x00)
            .with_data(Bytes::copy_from_slice(&params));
        match self.transceiver.transmit(&command) {
            Ok(response) => match response.status().class() {
                StatusClass::Success => Ok(true),
                StatusClass::AuthenticationFailed => Ok(false),
                _ => {
                    debug!(block, status = %response.status(), "Unexpected authenticate status");
                    Ok(false)
                }
            },
            Err(Error::Protocol { message, .. }) => {
                debug!(block, reason = %message, "Malformed authenticate reply");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Read one block; failures local to the sector are not errors
    fn read_block(&mut self, block: u8) -> Result<BlockRead> {
        let command = Command::pseudo(INS_READ_BINARY, 0x00, block).with_le(BLOCK_SIZE as u8);
        let response = match self.transceiver.transmit(&command) {
            Ok(response) => response,
            Err(Error::Protocol { message, .. }) => return Ok(BlockRead::Failed(message)),
            Err(e) => return Err(e),
        };

        match response.status().class() {
            StatusClass::Success if response.data().len() == BLOCK_SIZE => {
                Ok(BlockRead::Data(Bytes::copy_from_slice(response.data())))
            }
            StatusClass::Success => Ok(BlockRead::Failed(format!(
                "block {block}: {} bytes instead of {BLOCK_SIZE}",
                response.data().len()
            ))),
            // Access bits keep this key from reading the block
            StatusClass::Denied => Ok(BlockRead::Denied),
            _ => Ok(BlockRead::Failed(format!("block {block}: {}", response.status()))),
        }
    }

    fn read_sector(
        &mut self,
        context: &DumpContext<'_>,
        index: usize,
        candidates: &[ClassicKey],
    ) -> Result<SectorRecord> {
        // Block numbers of the largest variant end at 255
        let first = ClassicVariant::first_block(index) as u8;
        let count = ClassicVariant::blocks_in_sector(index);

        let mut accepted = None;
        for key in candidates {
            context.checkpoint()?;
            if self.authenticate(first, key)? {
                accepted = Some(*key);
                break;
            }
        }
        let Some(key) = accepted else {
            debug!(sector = index, tried = candidates.len(), "No key accepted");
            return Ok(SectorRecord::unauthorized(index));
        };
        trace!(sector = index, key_type = %key.key_type, "Authenticated");

        let mut data = Vec::with_capacity(count * BLOCK_SIZE);
        for offset in 0..count {
            context.checkpoint()?;
            match self.read_block(first + offset as u8)? {
                BlockRead::Data(block) => data.extend_from_slice(&block),
                BlockRead::Denied => {
                    debug!(sector = index, key_type = %key.key_type, "Key may not read the sector");
                    return Ok(SectorRecord::unauthorized(index));
                }
                BlockRead::Failed(message) => {
                    debug!(sector = index, %message, "Sector read failed");
                    return Ok(SectorRecord::read_error(index, message));
                }
            }
        }

        // The card never returns key material; put back the key that worked
        let trailer = (count - 1) * BLOCK_SIZE;
        let range = key.key_type.trailer_range();
        data[trailer + range.start..trailer + range.end].copy_from_slice(&key.key);

        Ok(SectorRecord::authorized(index, data, key))
    }
}

impl FamilyDecoder for ClassicDecoder {
    fn name(&self) -> &'static str {
        "classic"
    }

    fn dump(
        &self,
        transceiver: &mut dyn Transceiver,
        context: &mut DumpContext<'_>,
    ) -> Result<DumpOutcome> {
        let CardFamily::MifareClassic(variant) = transceiver.detected_family()? else {
            return Ok(DumpOutcome::NotApplicable);
        };
        context.status(&format!("Reading MIFARE Classic {variant} card"));

        let total = variant.sector_count();
        let mut reader = SectorReader {
            transceiver,
            loaded: None,
        };
        let mut sectors = Vec::with_capacity(total);

        for index in 0..total {
            context.checkpoint()?;
            context.progress(index, total);
            let candidates = self.keys.candidates(index);
            sectors.push(reader.read_sector(context, index, &candidates)?);
        }
        context.progress(total, total);

        Ok(DumpOutcome::Dumped(FamilyPayload::Classic(ClassicCard {
            variant,
            sectors,
        })))
    }
}
