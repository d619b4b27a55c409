//! Error types for PC/SC transport

use farecard_apdu_core::TransportError;

/// PC/SC-specific errors
#[derive(Debug, thiserror::Error)]
pub enum PcscError {
    /// PC/SC error
    #[error("PC/SC error: {0}")]
    Pcsc(#[from] pcsc::Error),

    /// No readers available
    #[error("No readers available")]
    NoReadersAvailable,

    /// Reader not found
    #[error("Reader not found: {0}")]
    ReaderNotFound(String),

    /// No card present in reader
    #[error("No card present in reader: {0}")]
    NoCard(String),

    /// Automatic selection needs exactly one reader holding a card
    #[error("Expected 1 reader with a card, found {0}")]
    AmbiguousReader(usize),

    /// Card was removed
    #[error("Card was removed")]
    CardRemoved,
}

impl From<PcscError> for TransportError {
    fn from(error: PcscError) -> Self {
        match error {
            PcscError::Pcsc(e) => match e {
                pcsc::Error::NoSmartcard => Self::NoCard(String::new()),
                pcsc::Error::RemovedCard => Self::CardRemoved,
                pcsc::Error::Timeout => Self::Timeout,
                pcsc::Error::Cancelled => Self::Cancelled,
                pcsc::Error::NoReadersAvailable | pcsc::Error::UnknownReader => Self::Device,
                other => Self::Driver(other as i32),
            },
            PcscError::NoReadersAvailable
            | PcscError::ReaderNotFound(_)
            | PcscError::AmbiguousReader(_) => Self::Device,
            PcscError::NoCard(reader) => Self::NoCard(reader),
            PcscError::CardRemoved => Self::CardRemoved,
        }
    }
}
