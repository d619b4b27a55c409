//! Status words as returned by contactless cards and PC/SC readers
//!
//! Besides the ISO 7816-4 interindustry values, two families show up on a
//! transit reader: PC/SC Part 3 readers answering pseudo-APDUs for storage
//! cards (`63 00` for a rejected key, `65 81` for a failed block read), and
//! DESFire cards reporting native status under SW1 `91`.

use std::fmt;

/// Status Word (SW1-SW2) from an APDU response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusWord {
    /// First status byte (SW1)
    pub sw1: u8,
    /// Second status byte (SW2)
    pub sw2: u8,
}

/// Coarse meaning of a status word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusClass {
    /// `90 00`
    Success,
    /// `61 XX`: XX more bytes wait for GET RESPONSE
    MoreData(u8),
    /// `6C XX`: re-send with Le = XX
    WrongLe(u8),
    /// `62 XX` / `63 XX` other than a rejected key
    Warning,
    /// Key rejected by the card (`63 00` from PC/SC GENERAL AUTHENTICATE)
    AuthenticationFailed,
    /// Access conditions not met (`69 82`, `69 85`)
    Denied,
    /// No such application, file or record (`6A 82`, `6A 83`)
    NotFound,
    /// Instruction, class or function not supported (`6D 00`, `6E 00`, `6A 81`)
    Unsupported,
    /// DESFire native status carried in SW2
    Native(u8),
    /// Anything else
    Error,
}

impl StatusWord {
    /// Create a new status word
    pub const fn new(sw1: u8, sw2: u8) -> Self {
        Self { sw1, sw2 }
    }

    /// Classify this status word
    pub const fn class(&self) -> StatusClass {
        match (self.sw1, self.sw2) {
            (0x90, 0x00) => StatusClass::Success,
            (0x61, n) => StatusClass::MoreData(n),
            (0x6C, n) => StatusClass::WrongLe(n),
            (0x63, 0x00) => StatusClass::AuthenticationFailed,
            (0x62 | 0x63, _) => StatusClass::Warning,
            (0x69, 0x82 | 0x85) => StatusClass::Denied,
            (0x6A, 0x82 | 0x83) => StatusClass::NotFound,
            (0x6D | 0x6E, 0x00) | (0x6A, 0x81) => StatusClass::Unsupported,
            (0x91, n) => StatusClass::Native(n),
            _ => StatusClass::Error,
        }
    }

    /// `90 00`
    pub const fn is_success(&self) -> bool {
        matches!(self.class(), StatusClass::Success)
    }

    /// Bytes left for GET RESPONSE, for `61 XX`
    pub const fn remaining_bytes(&self) -> Option<u8> {
        match self.class() {
            StatusClass::MoreData(n) => Some(n),
            _ => None,
        }
    }

    /// Le the card asked for, for `6C XX`
    pub const fn corrected_le(&self) -> Option<u8> {
        match self.class() {
            StatusClass::WrongLe(n) => Some(n),
            _ => None,
        }
    }

    /// No such application, file or record
    pub const fn is_not_found(&self) -> bool {
        matches!(self.class(), StatusClass::NotFound)
    }

    /// Human readable meaning
    pub const fn description(&self) -> &'static str {
        match (self.sw1, self.sw2) {
            (0x90, 0x00) => "Success",
            (0x61, _) => "More data available",
            (0x62, 0x82) => "End of file or record reached before Le bytes",
            (0x62, _) => "Warning, memory unchanged",
            (0x63, 0x00) => "Authentication failed",
            (0x63, _) => "Warning, memory changed",
            (0x65, 0x81) => "Memory failure",
            (0x67, 0x00) => "Wrong length",
            (0x69, 0x81) => "Command incompatible with file structure",
            (0x69, 0x82) => "Security status not satisfied",
            (0x69, 0x85) => "Conditions of use not satisfied",
            (0x69, 0x86) => "Command not allowed",
            (0x6A, 0x81) => "Function not supported",
            (0x6A, 0x82) => "File or application not found",
            (0x6A, 0x83) => "Record not found",
            (0x6A, 0x86) => "Incorrect parameters P1-P2",
            (0x6B, 0x00) => "Wrong parameters P1-P2",
            (0x6C, _) => "Wrong Le field",
            (0x6D, 0x00) => "Instruction not supported",
            (0x6E, 0x00) => "Class not supported",
            (0x91, 0x00) => "DESFire: operation ok",
            (0x91, 0xAF) => "DESFire: additional frame",
            (0x91, 0x9D) => "DESFire: permission denied",
            (0x91, 0xAE) => "DESFire: authentication error",
            (0x91, 0xA0) => "DESFire: application not found",
            (0x91, 0xF0) => "DESFire: file not found",
            (0x91, _) => "DESFire native status",
            _ => "Unknown status word",
        }
    }
}

impl From<(u8, u8)> for StatusWord {
    fn from((sw1, sw2): (u8, u8)) -> Self {
        Self::new(sw1, sw2)
    }
}

impl From<u16> for StatusWord {
    fn from(status: u16) -> Self {
        let [sw1, sw2] = status.to_be_bytes();
        Self::new(sw1, sw2)
    }
}

impl fmt::Display for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}{:02X}", self.sw1, self.sw2)
    }
}

/// Status words the decoders compare against
pub mod common {
    use super::StatusWord;

    /// `90 00`
    pub const SUCCESS: StatusWord = StatusWord::new(0x90, 0x00);

    /// PC/SC reader: key rejected
    pub const AUTHENTICATION_FAILED: StatusWord = StatusWord::new(0x63, 0x00);

    /// PC/SC reader: block could not be read
    pub const MEMORY_FAILURE: StatusWord = StatusWord::new(0x65, 0x81);

    /// `6A 82`
    pub const FILE_NOT_FOUND: StatusWord = StatusWord::new(0x6A, 0x82);

    /// `6A 83`
    pub const RECORD_NOT_FOUND: StatusWord = StatusWord::new(0x6A, 0x83);
}
