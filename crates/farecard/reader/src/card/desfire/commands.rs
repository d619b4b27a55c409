//! DESFire native commands in ISO 7816 wrapping

use bytes::{Bytes, BytesMut};
use farecard_apdu_core::{Command, StatusWord};
use tracing::trace;

use crate::constants::desfire::*;
use crate::{Error, transceiver::Transceiver};

/// Largest DESFire memory, EV1 8K
const MAX_MEMORY: usize = 8192;

/// Data bytes in a full native response frame
const FRAME_DATA: usize = 59;

/// Upper bound on frames for one command: a file filling the whole memory
const MAX_FRAMES: usize = MAX_MEMORY.div_ceil(FRAME_DATA) + 1;

/// Failure of one native command
#[derive(Debug, thiserror::Error)]
pub(crate) enum DesfireError {
    /// Link failure or cancellation; always fatal
    #[error(transparent)]
    Link(Error),

    /// Permission denied or authentication required
    #[error("{0}")]
    Unauthorized(&'static str),

    /// Native status other than OK / additional frame
    #[error("Native status {0:#04X}")]
    Status(u8),

    /// The reply did not come from the DESFire native layer
    #[error("Unexpected status {0}")]
    NotNative(StatusWord),

    /// Reply that could not be interpreted
    #[error("{0}")]
    Malformed(String),
}

impl From<Error> for DesfireError {
    fn from(error: Error) -> Self {
        match error {
            Error::Protocol { message, .. } => Self::Malformed(message),
            other => Self::Link(other),
        }
    }
}

impl DesfireError {
    /// Turn into a decoder-fatal error attributed to `step`
    pub(crate) fn fatal(self, step: impl Into<String>) -> Error {
        match self {
            Self::Link(error) => error,
            other => Error::protocol(step, other.to_string()),
        }
    }
}

type Result<T> = std::result::Result<T, DesfireError>;

/// Native command channel over a transceiver
#[derive(Debug)]
pub(crate) struct DesfireProtocol<'t> {
    transceiver: &'t mut dyn Transceiver,
}

impl<'t> DesfireProtocol<'t> {
    pub(crate) fn new(transceiver: &'t mut dyn Transceiver) -> Self {
        Self { transceiver }
    }

    fn wrap(ins: u8, data: &[u8]) -> Command {
        let command = Command::new(CLA, ins, 0x00, 0x00);
        if data.is_empty() {
            command.with_le(0x00)
        } else {
            command.with_data(Bytes::copy_from_slice(data)).with_le(0x00)
        }
    }

    /// Send a native command, following additional frames
    fn send(&mut self, ins: u8, data: &[u8]) -> Result<Bytes> {
        let mut out = BytesMut::new();
        let mut command = Self::wrap(ins, data);

        for _ in 0..MAX_FRAMES {
            let response = self.transceiver.transmit(&command)?;
            let status = response.status();
            if status.sw1 != SW1_NATIVE {
                return Err(DesfireError::NotNative(status));
            }
            out.extend_from_slice(response.data());

            match status.sw2 {
                OPERATION_OK => return Ok(out.freeze()),
                ADDITIONAL_FRAME => {
                    trace!(ins, received = out.len(), "Requesting additional frame");
                    command = Self::wrap(ADDITIONAL_FRAME, &[]);
                }
                PERMISSION_DENIED => return Err(DesfireError::Unauthorized("Permission denied")),
                AUTHENTICATION_ERROR => {
                    return Err(DesfireError::Unauthorized("Authentication error"));
                }
                other => return Err(DesfireError::Status(other)),
            }
        }

        Err(DesfireError::Malformed(format!(
            "more than {MAX_FRAMES} frames"
        )))
    }

    /// GET VERSION, all three frames concatenated
    pub(crate) fn get_version(&mut self) -> Result<Bytes> {
        self.send(GET_VERSION, &[])
    }

    /// GET APPLICATION IDS
    pub(crate) fn application_ids(&mut self) -> Result<Vec<u32>> {
        let data = self.send(GET_APPLICATION_IDS, &[])?;
        if data.len() % 3 != 0 {
            return Err(DesfireError::Malformed(format!(
                "application list of {} bytes",
                data.len()
            )));
        }
        Ok(data
            .chunks_exact(3)
            .map(|aid| u32::from_le_bytes([aid[0], aid[1], aid[2], 0]))
            .collect())
    }

    /// SELECT APPLICATION
    pub(crate) fn select_application(&mut self, aid: u32) -> Result<()> {
        let aid = aid.to_le_bytes();
        self.send(SELECT_APPLICATION, &aid[..3]).map(|_| ())
    }

    /// GET FILE IDS of the selected application
    pub(crate) fn file_ids(&mut self) -> Result<Vec<u8>> {
        self.send(GET_FILE_IDS, &[]).map(|ids| ids.to_vec())
    }

    /// GET FILE SETTINGS
    pub(crate) fn file_settings(&mut self, file_id: u8) -> Result<Bytes> {
        self.send(GET_FILE_SETTINGS, &[file_id])
    }

    /// READ DATA of a whole standard or backup file
    pub(crate) fn read_data(&mut self, file_id: u8) -> Result<Bytes> {
        self.send(READ_DATA, &[file_id, 0, 0, 0, 0, 0, 0])
    }

    /// GET VALUE of a value file
    pub(crate) fn get_value(&mut self, file_id: u8) -> Result<i32> {
        let data = self.send(GET_VALUE, &[file_id])?;
        let bytes: [u8; 4] = data.as_ref().try_into().map_err(|_| {
            DesfireError::Malformed(format!("value of {} bytes", data.len()))
        })?;
        Ok(i32::from_le_bytes(bytes))
    }

    /// READ RECORDS, all records of a record file
    pub(crate) fn read_records(&mut self, file_id: u8) -> Result<Bytes> {
        self.send(READ_RECORDS, &[file_id, 0, 0, 0, 0, 0, 0])
    }
}
