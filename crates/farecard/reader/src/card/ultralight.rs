//! MIFARE Ultralight and NTAG (NFC Forum Type 2)
//!
//! Memory is read four pages at a time with the PC/SC READ BINARY
//! pseudo-APDU until the card refuses, which marks the end of the readable
//! area.

use farecard_apdu_core::Command;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::pcsc::INS_READ_BINARY;
use crate::{
    DumpContext, DumpOutcome, FamilyDecoder, Result, serde_hex, snapshot::FamilyPayload,
    transceiver::Transceiver,
};

/// Bytes per page
pub const PAGE_SIZE: usize = 4;

/// Pages returned by one READ BINARY
const PAGES_PER_READ: usize = 4;

/// Highest page count any Type 2 tag addresses
const MAX_PAGES: usize = 256;

/// One 4-byte page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UltralightPage {
    /// Page number
    pub index: u8,
    /// Page contents
    #[serde(with = "serde_hex")]
    pub data: Vec<u8>,
}

/// Raw contents of an Ultralight card
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UltralightCard {
    /// Readable pages from page 0, without gaps
    pub pages: Vec<UltralightPage>,
}

impl UltralightCard {
    /// Page by index
    pub fn page(&self, index: u8) -> Option<&UltralightPage> {
        self.pages.get(usize::from(index))
    }

    /// Contents of pages `start..start + count` concatenated
    pub fn read_pages(&self, start: u8, count: usize) -> Option<Vec<u8>> {
        let start = usize::from(start);
        let pages = self.pages.get(start..start.checked_add(count)?)?;
        Some(pages.iter().flat_map(|p| p.data.iter().copied()).collect())
    }
}

/// Decoder for MIFARE Ultralight / NTAG
#[derive(Debug, Clone, Copy, Default)]
pub struct UltralightDecoder;

impl FamilyDecoder for UltralightDecoder {
    fn name(&self) -> &'static str {
        "ultralight"
    }

    fn dump(
        &self,
        transceiver: &mut dyn Transceiver,
        context: &mut DumpContext<'_>,
    ) -> Result<DumpOutcome> {
        let mut pages: Vec<UltralightPage> = Vec::new();
        let mut first_group: Option<Vec<u8>> = None;

        for start in (0..MAX_PAGES).step_by(PAGES_PER_READ) {
            context.checkpoint()?;
            context.progress(start, MAX_PAGES);

            // start < 256 always fits in P2
            let command = Command::pseudo(INS_READ_BINARY, 0x00, start as u8)
                .with_le((PAGE_SIZE * PAGES_PER_READ) as u8);
            let response = transceiver.transmit(&command)?;
            let data = response.data();

            if !response.is_success() || data.len() < PAGE_SIZE * PAGES_PER_READ {
                if start == 0 {
                    debug!(status = %response.status(), "Page 0 unreadable, not an Ultralight card");
                    return Ok(DumpOutcome::NotApplicable);
                }
                debug!(page = start, status = %response.status(), "End of readable memory");
                break;
            }

            match &first_group {
                None => {
                    first_group = Some(data.to_vec());
                    context.status("Reading MIFARE Ultralight card");
                }
                // Some tags wrap around instead of refusing past the end
                Some(first) if first.as_slice() == data => {
                    debug!(page = start, "Memory wrapped around to page 0");
                    break;
                }
                Some(_) => {}
            }

            for (offset, chunk) in data.chunks_exact(PAGE_SIZE).enumerate() {
                pages.push(UltralightPage {
                    index: (start + offset) as u8,
                    data: chunk.to_vec(),
                });
            }
        }
        context.progress(pages.len(), pages.len());

        Ok(DumpOutcome::Dumped(FamilyPayload::Ultralight(UltralightCard {
            pages,
        })))
    }
}
