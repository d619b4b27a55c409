//! DESFire file settings and contents

use serde::{Deserialize, Serialize};

use crate::serde_hex;

/// File type byte of GET FILE SETTINGS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    Standard,
    Backup,
    Value,
    LinearRecord,
    CyclicRecord,
}

impl TryFrom<u8> for FileType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Self::Standard),
            0x01 => Ok(Self::Backup),
            0x02 => Ok(Self::Value),
            0x03 => Ok(Self::LinearRecord),
            0x04 => Ok(Self::CyclicRecord),
            other => Err(other),
        }
    }
}

/// Type specific part of the file settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FileLayout {
    /// Standard and backup data files
    Data { size: u32 },
    /// Value files
    Value {
        lower_limit: i32,
        upper_limit: i32,
        limited_credit_value: i32,
        limited_credit_enabled: bool,
    },
    /// Linear and cyclic record files
    Record {
        record_size: u32,
        max_records: u32,
        current_records: u32,
    },
}

/// Parsed GET FILE SETTINGS reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSettings {
    pub file_type: FileType,
    pub comm_settings: u8,
    /// Read, write, read&write and change-access key numbers, one nibble each
    pub access_rights: [u8; 2],
    pub layout: FileLayout,
}

fn u24(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], 0])
}

fn i32_le(bytes: &[u8]) -> i32 {
    i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

impl FileSettings {
    /// Parse a settings reply, `None` when it is malformed
    pub fn parse(data: &[u8]) -> Option<Self> {
        let (&type_byte, rest) = data.split_first()?;
        let file_type = FileType::try_from(type_byte).ok()?;
        let (&comm_settings, rest) = rest.split_first()?;
        let access_rights = [*rest.first()?, *rest.get(1)?];
        let body = &rest[2..];

        let layout = match file_type {
            FileType::Standard | FileType::Backup if body.len() >= 3 => FileLayout::Data {
                size: u24(body),
            },
            FileType::Value if body.len() >= 13 => FileLayout::Value {
                lower_limit: i32_le(&body[0..4]),
                upper_limit: i32_le(&body[4..8]),
                limited_credit_value: i32_le(&body[8..12]),
                limited_credit_enabled: body[12] & 0x01 != 0,
            },
            FileType::LinearRecord | FileType::CyclicRecord if body.len() >= 9 => {
                FileLayout::Record {
                    record_size: u24(&body[0..3]),
                    max_records: u24(&body[3..6]),
                    current_records: u24(&body[6..9]),
                }
            }
            _ => return None,
        };

        Some(Self {
            file_type,
            comm_settings,
            access_rights,
            layout,
        })
    }
}

/// What could be read from a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileContent {
    /// Contents of a standard or backup file
    Standard {
        #[serde(with = "serde_hex")]
        data: Vec<u8>,
    },
    /// Current value of a value file
    Value { value: i32 },
    /// Concatenated records of a record file
    Record {
        #[serde(with = "serde_hex")]
        data: Vec<u8>,
    },
    /// The card refused access
    Unauthorized { message: String },
    /// The card answered something unusable
    Invalid { message: String },
}

/// One file of a DESFire application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesfireFile {
    pub id: u8,
    /// Settings, when they could be read
    pub settings: Option<FileSettings>,
    pub content: FileContent,
}

impl DesfireFile {
    /// Whether the contents were read
    pub const fn is_readable(&self) -> bool {
        !matches!(
            self.content,
            FileContent::Unauthorized { .. } | FileContent::Invalid { .. }
        )
    }

    /// Raw bytes of a standard or record file
    pub fn data(&self) -> Option<&[u8]> {
        match &self.content {
            FileContent::Standard { data } | FileContent::Record { data } => Some(data.as_slice()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_standard_settings() {
        let settings = FileSettings::parse(&[0x00, 0x00, 0xE0, 0xEE, 0x20, 0x00, 0x00]).unwrap();
        assert_eq!(settings.file_type, FileType::Standard);
        assert_eq!(settings.access_rights, [0xE0, 0xEE]);
        assert_eq!(settings.layout, FileLayout::Data { size: 32 });
    }

    #[test]
    fn test_parse_value_settings() {
        let data = hex::decode("0203E0EE00000000E80300000000000001").unwrap();
        let settings = FileSettings::parse(&data).unwrap();
        assert_eq!(
            settings.layout,
            FileLayout::Value {
                lower_limit: 0,
                upper_limit: 1000,
                limited_credit_value: 0,
                limited_credit_enabled: true,
            }
        );
    }

    #[test]
    fn test_parse_record_settings() {
        let settings =
            FileSettings::parse(&[0x04, 0x00, 0x10, 0x00, 0x10, 0x00, 0x00, 0x0A, 0x00, 0x00, 0x03, 0x00, 0x00])
                .unwrap();
        assert_eq!(settings.file_type, FileType::CyclicRecord);
        assert_eq!(
            settings.layout,
            FileLayout::Record {
                record_size: 16,
                max_records: 10,
                current_records: 3,
            }
        );
    }

    #[test]
    fn test_malformed_settings() {
        assert!(FileSettings::parse(&[]).is_none());
        assert!(FileSettings::parse(&[0x07, 0x00, 0x00, 0x00, 0x20, 0x00, 0x00]).is_none());
        assert!(FileSettings::parse(&[0x02, 0x00, 0x00, 0x00, 0x00]).is_none());
    }
}
