//! Errors raised while framing APDUs
//!
//! Transport failures keep their own type ([`TransportError`]) so callers can
//! tell a lost link apart from a reply that could not be framed.

use crate::transport::TransportError;

/// Result alias using the core [`Error`]
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Encoding, decoding and transport failures
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    /// The underlying transport failed
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Reply shorter than a status word
    #[error("Incomplete response: {0} bytes")]
    IncompleteResponse(usize),

    /// Bytes that are not a short command APDU
    #[error("Invalid command length: {0}")]
    InvalidCommandLength(usize),

    /// Data field over 255 bytes
    #[error("Command data too long: {0} bytes")]
    CommandDataTooLong(usize),

    /// Too many `61 XX` continuations
    #[error("Chain limit exceeded")]
    ChainLimitExceeded,

    /// Another error, with what was being done
    #[error("{context}: {source}")]
    Context {
        /// What was being done
        context: String,
        /// The failure
        source: Box<Self>,
    },
}

impl Error {
    /// Wrap with what was being done
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The transport error under any context wrappers
    pub fn transport(&self) -> Option<&TransportError> {
        match self {
            Self::Transport(e) => Some(e),
            Self::Context { source, .. } => source.transport(),
            _ => None,
        }
    }
}

/// Adds [`Error::with_context`] to results
pub trait ResultExt<T> {
    /// Wrap the error with what was being done
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }
}
