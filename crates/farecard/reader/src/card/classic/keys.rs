//! Sector keys for MIFARE Classic
//!
//! Key material is opaque here: it is loaded from a JSON key file or built in
//! code, never derived.

use std::collections::BTreeMap;

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::serde_hex;

/// Key length in bytes
pub const KEY_LEN: usize = 6;

/// Keys found on factory fresh and commonly configured cards
pub const DEFAULT_KEYS: [[u8; KEY_LEN]; 5] = [
    [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF],
    [0xA0, 0xA1, 0xA2, 0xA3, 0xA4, 0xA5],
    [0xD3, 0xF7, 0xD3, 0xF7, 0xD3, 0xF7],
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
    [0xB0, 0xB1, 0xB2, 0xB3, 0xB4, 0xB5],
];

/// Which of the two sector keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum KeyType {
    #[display("A")]
    A,
    #[display("B")]
    B,
}

impl KeyType {
    /// Key type byte of GENERAL AUTHENTICATE
    pub const fn authenticate_code(self) -> u8 {
        match self {
            Self::A => 0x60,
            Self::B => 0x61,
        }
    }

    /// Byte range of this key inside a sector trailer
    pub const fn trailer_range(self) -> std::ops::Range<usize> {
        match self {
            Self::A => 0..KEY_LEN,
            Self::B => 10..10 + KEY_LEN,
        }
    }
}

/// One candidate key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassicKey {
    /// Slot the key authenticates as
    pub key_type: KeyType,
    /// Six key bytes
    #[serde(with = "serde_hex")]
    pub key: [u8; KEY_LEN],
}

impl ClassicKey {
    /// Key A with the given bytes
    pub const fn a(key: [u8; KEY_LEN]) -> Self {
        Self {
            key_type: KeyType::A,
            key,
        }
    }

    /// Key B with the given bytes
    pub const fn b(key: [u8; KEY_LEN]) -> Self {
        Self {
            key_type: KeyType::B,
            key,
        }
    }
}

const fn include_defaults() -> bool {
    true
}

/// Keys to try, per sector
///
/// ```json
/// { "sectors": { "8": [{ "key_type": "A", "key": "A0A1A2A3A4A5" }] } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassicKeys {
    /// Keys for specific sectors, tried first
    #[serde(default)]
    pub sectors: BTreeMap<usize, Vec<ClassicKey>>,
    /// Also try [`DEFAULT_KEYS`] on every sector, as A then as B
    #[serde(default = "include_defaults")]
    pub include_defaults: bool,
}

impl Default for ClassicKeys {
    fn default() -> Self {
        Self {
            sectors: BTreeMap::new(),
            include_defaults: true,
        }
    }
}

impl ClassicKeys {
    /// Only the keys given explicitly
    pub fn without_defaults() -> Self {
        Self {
            sectors: BTreeMap::new(),
            include_defaults: false,
        }
    }

    /// Add a key for `sector`
    pub fn with_key(mut self, sector: usize, key: ClassicKey) -> Self {
        self.sectors.entry(sector).or_default().push(key);
        self
    }

    /// Keys to try on `sector`, in order, without duplicates
    pub fn candidates(&self, sector: usize) -> Vec<ClassicKey> {
        let mut out: Vec<ClassicKey> = Vec::new();
        let specific = self.sectors.get(&sector).into_iter().flatten().copied();
        let defaults = DEFAULT_KEYS
            .iter()
            .filter(|_| self.include_defaults)
            .flat_map(|key| [ClassicKey::a(*key), ClassicKey::b(*key)]);

        for key in specific.chain(defaults) {
            if !out.contains(&key) {
                out.push(key);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_specific_keys_come_first() {
        let custom = [0x2A, 0x2A, 0x2A, 0x2A, 0x2A, 0x2A];
        let keys = ClassicKeys::default().with_key(8, ClassicKey::b(custom));

        let candidates = keys.candidates(8);
        assert_eq!(candidates[0], ClassicKey::b(custom));
        assert_eq!(candidates[1], ClassicKey::a(DEFAULT_KEYS[0]));
        assert_eq!(candidates[2], ClassicKey::b(DEFAULT_KEYS[0]));
        assert_eq!(candidates.len(), 1 + 2 * DEFAULT_KEYS.len());

        assert_eq!(keys.candidates(7).len(), 2 * DEFAULT_KEYS.len());
    }

    #[test]
    fn test_duplicates_removed() {
        let keys = ClassicKeys::default().with_key(1, ClassicKey::a(DEFAULT_KEYS[0]));
        assert_eq!(keys.candidates(1).len(), 2 * DEFAULT_KEYS.len());
    }

    #[test]
    fn test_key_file() {
        let keys: ClassicKeys = serde_json::from_str(
            r#"{ "sectors": { "4": [{ "key_type": "B", "key": "a0a1a2a3a4a5" }] }, "include_defaults": false }"#,
        )
        .unwrap();
        assert_eq!(
            keys.candidates(4),
            vec![ClassicKey::b([0xA0, 0xA1, 0xA2, 0xA3, 0xA4, 0xA5])]
        );
        assert!(keys.candidates(5).is_empty());

        let keys: ClassicKeys = serde_json::from_str("{}").unwrap();
        assert_eq!(keys, ClassicKeys::default());
    }

    #[test]
    fn test_trailer_ranges() {
        assert_eq!(KeyType::A.trailer_range(), 0..6);
        assert_eq!(KeyType::B.trailer_range(), 10..16);
        assert_eq!(KeyType::B.authenticate_code(), 0x61);
    }
}
