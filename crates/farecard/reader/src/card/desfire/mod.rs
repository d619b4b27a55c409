//! MIFARE DESFire
//!
//! DESFire cards present as ISO 14443-4 and are recognised by answering the
//! native GET VERSION command. Every application is selected and every file
//! read without authentication; files the card protects are recorded as
//! unauthorized rather than failing the dump.

mod commands;
mod file;
mod version;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub use file::{DesfireFile, FileContent, FileLayout, FileSettings, FileType};
pub use version::{ComponentInfo, ManufacturingData, Version};

use self::commands::{DesfireError, DesfireProtocol};
use crate::{
    DumpContext, DumpOutcome, Error, FamilyDecoder, Result, snapshot::FamilyPayload,
    transceiver::Transceiver,
};

/// One DESFire application and its files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesfireApplication {
    /// 24-bit application identifier
    pub id: u32,
    /// Files in the order the card lists them
    pub files: Vec<DesfireFile>,
}

impl DesfireApplication {
    /// Look up a file by number
    pub fn file(&self, id: u8) -> Option<&DesfireFile> {
        self.files.iter().find(|f| f.id == id)
    }
}

/// Raw contents of a DESFire card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesfireCard {
    /// GET VERSION reply
    pub manufacturing_data: ManufacturingData,
    /// Applications in the order the card lists them
    pub applications: Vec<DesfireApplication>,
}

impl DesfireCard {
    /// Look up an application by identifier
    pub fn application(&self, id: u32) -> Option<&DesfireApplication> {
        self.applications.iter().find(|a| a.id == id)
    }
}

/// Decoder for MIFARE DESFire
#[derive(Debug, Clone, Copy, Default)]
pub struct DesfireDecoder;

impl FamilyDecoder for DesfireDecoder {
    fn name(&self) -> &'static str {
        "desfire"
    }

    fn dump(
        &self,
        transceiver: &mut dyn Transceiver,
        context: &mut DumpContext<'_>,
    ) -> Result<DumpOutcome> {
        context.checkpoint()?;
        let mut protocol = DesfireProtocol::new(transceiver);

        let version = match protocol.get_version() {
            Ok(version) => version,
            Err(DesfireError::NotNative(status)) => {
                debug!(%status, "GET VERSION not understood, not a DESFire card");
                return Ok(DumpOutcome::NotApplicable);
            }
            Err(e) => return Err(e.fatal("GET VERSION")),
        };
        let manufacturing_data = ManufacturingData::parse(&version).ok_or_else(|| {
            Error::protocol(
                "GET VERSION",
                format!("expected 28 bytes, got {}", version.len()),
            )
        })?;

        context.status("Reading MIFARE DESFire card");
        context.checkpoint()?;

        let app_ids = protocol
            .application_ids()
            .map_err(|e| e.fatal("GET APPLICATION IDS"))?;
        let total = app_ids.len();
        let mut applications = Vec::with_capacity(total);

        for (index, aid) in app_ids.into_iter().enumerate() {
            context.checkpoint()?;
            context.progress(index, total);

            protocol
                .select_application(aid)
                .map_err(|e| e.fatal(format!("SELECT APPLICATION {aid:06X}")))?;

            let file_ids = match protocol.file_ids() {
                Ok(ids) => ids,
                Err(DesfireError::Unauthorized(reason)) => {
                    warn!(aid = format_args!("{aid:06X}"), reason, "File list is protected");
                    Vec::new()
                }
                Err(e) => return Err(e.fatal(format!("GET FILE IDS {aid:06X}"))),
            };

            let mut files = Vec::with_capacity(file_ids.len());
            for file_id in file_ids {
                context.checkpoint()?;
                files.push(read_file(&mut protocol, file_id)?);
            }

            applications.push(DesfireApplication { id: aid, files });
        }
        context.progress(total, total);

        Ok(DumpOutcome::Dumped(FamilyPayload::Desfire(DesfireCard {
            manufacturing_data,
            applications,
        })))
    }
}

/// Read settings and contents of one file
///
/// Only link failures escape; anything the card says about the file is
/// recorded in the file itself.
fn read_file(protocol: &mut DesfireProtocol<'_>, id: u8) -> Result<DesfireFile> {
    let settings = match protocol.file_settings(id) {
        Ok(raw) => match FileSettings::parse(&raw) {
            Some(settings) => settings,
            None => {
                return Ok(DesfireFile {
                    id,
                    settings: None,
                    content: FileContent::Invalid {
                        message: format!("malformed settings {}", hex::encode_upper(&raw)),
                    },
                });
            }
        },
        Err(e) => return unreadable(id, None, e),
    };

    let content = match settings.file_type {
        FileType::Standard | FileType::Backup => protocol
            .read_data(id)
            .map(|data| FileContent::Standard { data: data.to_vec() }),
        FileType::Value => protocol
            .get_value(id)
            .map(|value| FileContent::Value { value }),
        FileType::LinearRecord | FileType::CyclicRecord => protocol
            .read_records(id)
            .map(|data| FileContent::Record { data: data.to_vec() }),
    };

    match content {
        Ok(content) => Ok(DesfireFile {
            id,
            settings: Some(settings),
            content,
        }),
        Err(e) => unreadable(id, Some(settings), e),
    }
}

fn unreadable(id: u8, settings: Option<FileSettings>, error: DesfireError) -> Result<DesfireFile> {
    let content = match error {
        DesfireError::Link(error) => return Err(error),
        DesfireError::Unauthorized(reason) => FileContent::Unauthorized {
            message: reason.to_string(),
        },
        other => {
            debug!(file = id, error = %other, "File unreadable");
            FileContent::Invalid {
                message: other.to_string(),
            }
        }
    };

    Ok(DesfireFile {
        id,
        settings,
        content,
    })
}
