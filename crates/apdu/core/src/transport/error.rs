//! Transport failures

/// Why bytes could not be exchanged with the card
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Nothing came back for a command
    #[error("Failed to transmit data")]
    Transmission,

    /// The reader itself is gone or unusable
    #[error("Device error")]
    Device,

    /// No card present in the named reader
    #[error("No card present in reader {0}")]
    NoCard(String),

    /// Card left the field mid-session
    #[error("Card removed")]
    CardRemoved,

    /// Driver status code not covered by another variant
    #[error("Driver error code: {0}")]
    Driver(i32),

    /// The reader did not answer in time
    #[error("Operation timed out")]
    Timeout,

    /// Cancelled by the caller or the driver
    #[error("Operation cancelled")]
    Cancelled,
}
