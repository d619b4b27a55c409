//! Generic ISO 7816-4 applications
//!
//! Fallback for ISO 14443-4 cards that are not DESFire: each configured
//! application is selected by name, then every short file identifier is
//! walked with READ RECORD.

use bytes::Bytes;
use farecard_apdu_core::Command;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::constants::iso7816::*;
use crate::{
    DumpContext, DumpOutcome, Error, FamilyDecoder, Result, serde_hex, snapshot::FamilyPayload,
    transceiver::Transceiver,
};

/// Records read from one elementary file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Iso7816File {
    /// Short file identifier
    pub sfi: u8,
    /// Records in order, starting at record 1
    pub records: Vec<Iso7816Record>,
    /// Reading stopped on a malformed reply
    pub partial: bool,
}

/// One record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Iso7816Record {
    /// Record number, 1-based
    pub number: u8,
    /// Record contents
    #[serde(with = "serde_hex")]
    pub data: Vec<u8>,
}

/// A selected application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Iso7816Application {
    /// Application identifier
    #[serde(with = "serde_hex")]
    pub aid: Vec<u8>,
    /// File control information returned by SELECT
    #[serde(with = "serde_hex")]
    pub fci: Vec<u8>,
    /// Record files found by SFI
    pub files: Vec<Iso7816File>,
}

/// Raw contents of an ISO 7816 card
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Iso7816Card {
    /// Applications that answered SELECT, in configured order
    pub applications: Vec<Iso7816Application>,
}

impl Iso7816Card {
    /// Look up an application by AID
    pub fn application(&self, aid: &[u8]) -> Option<&Iso7816Application> {
        self.applications.iter().find(|a| a.aid == aid)
    }
}

/// Applications the ISO 7816 decoder tries to select
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Iso7816Config {
    /// AIDs in the order they are tried
    pub applications: Vec<Vec<u8>>,
}

impl Default for Iso7816Config {
    fn default() -> Self {
        Self {
            applications: vec![
                // Calypso, "1TIC.ICA"
                b"1TIC.ICA".to_vec(),
                // KS X 6924 (T-money)
                vec![0xD4, 0x10, 0x00, 0x00, 0x03, 0x00, 0x01],
                // EMV proximity payment environment, "2PAY.SYS.DDF01"
                b"2PAY.SYS.DDF01".to_vec(),
            ],
        }
    }
}

impl Iso7816Config {
    /// Add an application to try
    pub fn with_application(mut self, aid: impl Into<Vec<u8>>) -> Self {
        self.applications.push(aid.into());
        self
    }
}

/// Decoder for generic ISO 7816-4 applications
#[derive(Debug, Clone, Default)]
pub struct Iso7816Decoder {
    config: Iso7816Config,
}

impl Iso7816Decoder {
    /// Create a decoder trying the configured applications
    pub const fn new(config: Iso7816Config) -> Self {
        Self { config }
    }
}

/// Outcome of a single record read
enum RecordRead {
    Record(Bytes),
    End,
    Malformed,
}

fn read_record(transceiver: &mut dyn Transceiver, sfi: u8, number: u8) -> Result<RecordRead> {
    let command = Command::new(0x00, INS_READ_RECORD, number, (sfi << 3) | 0x04).with_le(0x00);
    let response = match transceiver.transmit(&command) {
        Ok(response) => response,
        Err(Error::Protocol { message, .. }) => {
            debug!(sfi, number, reason = %message, "Malformed record reply");
            return Ok(RecordRead::Malformed);
        }
        Err(e) => return Err(e),
    };

    if response.is_success() {
        Ok(RecordRead::Record(Bytes::copy_from_slice(response.data())))
    } else {
        trace!(sfi, number, status = %response.status(), "End of file");
        Ok(RecordRead::End)
    }
}

fn read_file(
    transceiver: &mut dyn Transceiver,
    context: &DumpContext<'_>,
    sfi: u8,
) -> Result<Option<Iso7816File>> {
    let mut records = Vec::new();
    let mut partial = false;

    for number in 1..=u8::MAX {
        context.checkpoint()?;
        match read_record(transceiver, sfi, number)? {
            RecordRead::Record(data) => records.push(Iso7816Record {
                number,
                data: data.to_vec(),
            }),
            RecordRead::End => break,
            RecordRead::Malformed => {
                partial = true;
                break;
            }
        }
    }

    Ok((!records.is_empty() || partial).then_some(Iso7816File {
        sfi,
        records,
        partial,
    }))
}

impl FamilyDecoder for Iso7816Decoder {
    fn name(&self) -> &'static str {
        "iso7816"
    }

    fn dump(
        &self,
        transceiver: &mut dyn Transceiver,
        context: &mut DumpContext<'_>,
    ) -> Result<DumpOutcome> {
        context.status("Reading ISO 7816 card");
        let total = self.config.applications.len();
        let mut applications = Vec::new();

        for (index, aid) in self.config.applications.iter().enumerate() {
            context.checkpoint()?;
            context.progress(index, total);

            let select = Command::new(0x00, INS_SELECT, SELECT_BY_NAME, 0x00)
                .with_data(Bytes::copy_from_slice(aid))
                .with_le(0x00);
            let step = format!("SELECT {}", hex::encode_upper(aid));
            let response = transceiver.transmit(&select).map_err(|e| e.at_step(&step))?;

            if !response.is_success() {
                let status = response.status();
                if status.is_not_found() {
                    debug!(%step, "Application not present");
                } else {
                    debug!(%step, %status, reason = status.description(), "Application not selected");
                }
                continue;
            }

            let mut files = Vec::new();
            for sfi in 1..=MAX_SFI {
                if let Some(file) = read_file(transceiver, context, sfi)? {
                    files.push(file);
                }
            }

            applications.push(Iso7816Application {
                aid: aid.clone(),
                fci: response.data().to_vec(),
                files,
            });
        }
        context.progress(total, total);

        Ok(DumpOutcome::Dumped(FamilyPayload::Iso7816(Iso7816Card {
            applications,
        })))
    }
}
