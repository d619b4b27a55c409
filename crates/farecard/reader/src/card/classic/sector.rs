use serde::{Deserialize, Serialize};

use super::keys::ClassicKey;
use crate::serde_hex;

/// Bytes per block
pub const BLOCK_SIZE: usize = 16;

/// How reading a sector went
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SectorOutcome {
    /// Authenticated and read with `key`
    Authorized {
        /// Key that opened the sector
        key: ClassicKey,
    },
    /// No candidate key was accepted
    Unauthorized,
    /// Authenticated but a block read failed
    ReadError {
        /// Failing block and status
        message: String,
    },
}

/// One sector as read from the card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorRecord {
    /// Sector number on the card
    pub index: usize,
    /// All blocks of the sector, trailer included; empty unless authorized
    #[serde(with = "serde_hex")]
    pub data: Vec<u8>,
    /// How the read went
    pub outcome: SectorOutcome,
}

impl SectorRecord {
    /// A sector that could be read
    pub fn authorized(index: usize, data: Vec<u8>, key: ClassicKey) -> Self {
        Self {
            index,
            data,
            outcome: SectorOutcome::Authorized { key },
        }
    }

    /// A sector no key opened
    pub const fn unauthorized(index: usize) -> Self {
        Self {
            index,
            data: Vec::new(),
            outcome: SectorOutcome::Unauthorized,
        }
    }

    /// A sector whose read failed after authentication
    pub fn read_error(index: usize, message: impl Into<String>) -> Self {
        Self {
            index,
            data: Vec::new(),
            outcome: SectorOutcome::ReadError {
                message: message.into(),
            },
        }
    }

    /// Whether the sector data was read
    pub const fn is_authorized(&self) -> bool {
        matches!(self.outcome, SectorOutcome::Authorized { .. })
    }

    /// Block `n` relative to the start of the sector
    pub fn block(&self, n: usize) -> Option<&[u8]> {
        self.data.get(n * BLOCK_SIZE..(n + 1) * BLOCK_SIZE)
    }

    /// Number of blocks held
    pub fn block_count(&self) -> usize {
        self.data.len() / BLOCK_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::classic::keys::DEFAULT_KEYS;

    #[test]
    fn test_blocks() {
        let data: Vec<u8> = (0..64).collect();
        let record = SectorRecord::authorized(3, data, ClassicKey::a(DEFAULT_KEYS[0]));
        assert!(record.is_authorized());
        assert_eq!(record.block_count(), 4);
        assert_eq!(record.block(1).unwrap()[0], 16);
        assert!(record.block(4).is_none());

        let record = SectorRecord::unauthorized(3);
        assert!(!record.is_authorized());
        assert!(record.block(0).is_none());
    }
}
