//! Command bytes used by the family decoders

/// PC/SC pseudo-APDU instructions (PC/SC Part 3, CLA `FF`)
pub mod pcsc {
    /// GET DATA, P1 `00` returns the UID
    pub const INS_GET_DATA: u8 = 0xCA;
    /// LOAD KEYS into reader key slot
    pub const INS_LOAD_KEY: u8 = 0x82;
    /// GENERAL AUTHENTICATE (MIFARE Classic)
    pub const INS_GENERAL_AUTHENTICATE: u8 = 0x86;
    /// READ BINARY
    pub const INS_READ_BINARY: u8 = 0xB0;
    /// Reader key slot used for Classic authentication
    pub const KEY_SLOT: u8 = 0x00;

    /// Transparent session commands (PC/SC Part 3 Supplement)
    pub const INS_TRANSPARENT: u8 = 0xC2;
    /// Transparent P2: manage session
    pub const TRANSPARENT_MANAGE: u8 = 0x00;
    /// Transparent P2: exchange with the card
    pub const TRANSPARENT_EXCHANGE: u8 = 0x01;

    /// Data objects of the transparent session
    pub mod tag {
        /// Start transparent session
        pub const START_SESSION: u8 = 0x81;
        /// End transparent session
        pub const END_SESSION: u8 = 0x82;
        /// Frame to send to the card
        pub const TRANSCEIVE: u8 = 0x95;
        /// Frame received from the card
        pub const CARD_RESPONSE: u8 = 0x97;
        /// Generic error status: failing object, SW1, SW2
        pub const ERROR_STATUS: u8 = 0xC0;
    }
}

/// ISO 7816-4 interindustry instructions
pub mod iso7816 {
    /// SELECT
    pub const INS_SELECT: u8 = 0xA4;
    /// READ RECORD(S)
    pub const INS_READ_RECORD: u8 = 0xB2;
    /// SELECT P1: by DF name
    pub const SELECT_BY_NAME: u8 = 0x04;
    /// Highest short file identifier
    pub const MAX_SFI: u8 = 31;
}

/// MIFARE DESFire native commands, wrapped in ISO 7816 with CLA `90`
pub mod desfire {
    /// Wrapping class byte
    pub const CLA: u8 = 0x90;
    /// SW1 of every wrapped native reply
    pub const SW1_NATIVE: u8 = 0x91;

    /// GET VERSION
    pub const GET_VERSION: u8 = 0x60;
    /// GET APPLICATION IDS
    pub const GET_APPLICATION_IDS: u8 = 0x6A;
    /// SELECT APPLICATION
    pub const SELECT_APPLICATION: u8 = 0x5A;
    /// GET FILE IDS
    pub const GET_FILE_IDS: u8 = 0x6F;
    /// GET FILE SETTINGS
    pub const GET_FILE_SETTINGS: u8 = 0xF5;
    /// READ DATA
    pub const READ_DATA: u8 = 0xBD;
    /// GET VALUE
    pub const GET_VALUE: u8 = 0x6C;
    /// READ RECORDS
    pub const READ_RECORDS: u8 = 0xBB;
    /// Continue a chained command, and the native status asking for it
    pub const ADDITIONAL_FRAME: u8 = 0xAF;

    /// Native status: operation ok
    pub const OPERATION_OK: u8 = 0x00;
    /// Native status: permission denied
    pub const PERMISSION_DENIED: u8 = 0x9D;
    /// Native status: authentication error
    pub const AUTHENTICATION_ERROR: u8 = 0xAE;
}

/// FeliCa command codes; a reply carries the command code plus one
pub mod felica {
    /// Polling
    pub const POLLING: u8 = 0x00;
    /// Request Service
    pub const REQUEST_SERVICE: u8 = 0x02;
    /// Read Without Encryption
    pub const READ_WITHOUT_ENCRYPTION: u8 = 0x06;
    /// Search Service Code
    pub const SEARCH_SERVICE_CODE: u8 = 0x0A;
    /// Request System Code
    pub const REQUEST_SYSTEM_CODE: u8 = 0x0C;

    /// Polling request code asking for the system code
    pub const REQUEST_CODE_SYSTEM: u8 = 0x01;
    /// System code matching every system
    pub const WILDCARD_SYSTEM: u16 = 0xFFFF;
    /// Key version reported for a service the card does not have
    pub const NO_SUCH_SERVICE: u16 = 0xFFFF;
}
