use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::serde_hex;

/// Length of a complete GET VERSION reply (three frames)
pub(crate) const VERSION_LEN: usize = 28;

/// Component version (major.minor)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[display("{}.{}", major, minor)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
}

/// Hardware or software part of the GET VERSION reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentInfo {
    pub vendor_id: u8,
    pub kind: u8,
    pub subtype: u8,
    pub version: Version,
    /// Encoded storage size, `2^(n >> 1)` bytes
    pub storage_size: u8,
    pub protocol: u8,
}

impl ComponentInfo {
    fn parse(frame: &[u8]) -> Self {
        Self {
            vendor_id: frame[0],
            kind: frame[1],
            subtype: frame[2],
            version: Version {
                major: frame[3],
                minor: frame[4],
            },
            storage_size: frame[5],
            protocol: frame[6],
        }
    }

    /// Storage size in bytes, rounded down when the card reports a range
    pub const fn storage_bytes(&self) -> u32 {
        1 << (self.storage_size >> 1)
    }
}

/// Manufacturing data returned by GET VERSION
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManufacturingData {
    pub hardware: ComponentInfo,
    pub software: ComponentInfo,
    #[serde(with = "serde_hex")]
    pub uid: Vec<u8>,
    #[serde(with = "serde_hex")]
    pub batch_number: Vec<u8>,
    /// Production week, BCD
    pub week: u8,
    /// Production year, BCD
    pub year: u8,
}

impl ManufacturingData {
    /// Parse the concatenated frames of GET VERSION
    pub(crate) fn parse(data: &[u8]) -> Option<Self> {
        if data.len() != VERSION_LEN {
            return None;
        }

        Some(Self {
            hardware: ComponentInfo::parse(&data[0..7]),
            software: ComponentInfo::parse(&data[7..14]),
            uid: data[14..21].to_vec(),
            batch_number: data[21..26].to_vec(),
            week: data[26],
            year: data[27],
        })
    }
}
