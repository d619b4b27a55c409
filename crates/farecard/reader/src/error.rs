use farecard_apdu_core::TransportError;

/// Result type for card acquisition
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for card acquisition
///
/// Sector and file level failures never surface here; they are recorded in
/// the snapshot instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Link lost, timeout or no card in the field
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The card answered something the current decoder cannot continue from
    #[error("Protocol error during {step}: {message}")]
    Protocol {
        /// Step that was running
        step: String,
        /// What went wrong
        message: String,
    },

    /// No decoder handles this card
    #[error("Unsupported card: {0}")]
    UnsupportedCard(String),

    /// The caller cancelled the dump
    #[error("Operation cancelled")]
    Cancelled,
}

impl Error {
    /// Create a protocol error for `step`
    pub fn protocol(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Protocol {
            step: step.into(),
            message: message.into(),
        }
    }

    /// Rename the step of a protocol error, leaving other errors untouched
    pub(crate) fn at_step(self, step: impl Into<String>) -> Self {
        match self {
            Self::Protocol { message, .. } => Self::Protocol {
                step: step.into(),
                message,
            },
            other => other,
        }
    }

    /// Whether this is a transport failure
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<farecard_apdu_core::Error> for Error {
    fn from(error: farecard_apdu_core::Error) -> Self {
        match error.transport() {
            Some(TransportError::Cancelled) => Self::Cancelled,
            Some(transport) => Self::Transport(transport.clone()),
            None => Self::protocol("exchange", error.to_string()),
        }
    }
}
