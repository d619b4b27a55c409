//! Chip family classification

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Registered application provider identifier of PC/SC Part 3 storage card ATRs
const PCSC_RID: [u8; 5] = [0xA0, 0x00, 0x00, 0x03, 0x06];

/// PC/SC Part 3 standard byte for FeliCa
const STANDARD_FELICA: u8 = 0x11;

/// MIFARE Classic memory variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum ClassicVariant {
    /// MIFARE Mini, 5 sectors
    #[display("Mini")]
    Mini,
    /// MIFARE Classic 1K, 16 sectors
    #[display("1K")]
    OneK,
    /// MIFARE Classic 4K, 40 sectors
    #[display("4K")]
    FourK,
}

impl ClassicVariant {
    /// Number of sectors
    pub const fn sector_count(self) -> usize {
        match self {
            Self::Mini => 5,
            Self::OneK => 16,
            Self::FourK => 40,
        }
    }

    /// Number of 16-byte blocks in `sector`
    ///
    /// The upper 8 sectors of a 4K card hold 16 blocks, all others hold 4.
    pub const fn blocks_in_sector(sector: usize) -> usize {
        if sector < 32 { 4 } else { 16 }
    }

    /// Absolute number of the first block of `sector`
    pub const fn first_block(sector: usize) -> usize {
        if sector < 32 {
            sector * 4
        } else {
            128 + (sector - 32) * 16
        }
    }
}

/// Chip family a card implements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum CardFamily {
    /// ISO 14443-4 / ISO 7816-4 application card (DESFire, Calypso, EMV...)
    #[display("ISO 7816")]
    Iso7816,
    /// MIFARE Classic sector-organized memory
    #[display("MIFARE Classic {_0}")]
    MifareClassic(ClassicVariant),
    /// MIFARE Ultralight / NTAG page-organized memory
    #[display("MIFARE Ultralight")]
    MifareUltralight,
    /// Sony FeliCa
    #[display("FeliCa")]
    Felica,
}

/// Family without variant detail, used as decoder registry key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
pub enum FamilyKind {
    /// See [`CardFamily::Iso7816`]
    Iso7816,
    /// See [`CardFamily::MifareClassic`]
    MifareClassic,
    /// See [`CardFamily::MifareUltralight`]
    MifareUltralight,
    /// See [`CardFamily::Felica`]
    Felica,
}

impl CardFamily {
    /// Registry key of this family
    pub const fn kind(&self) -> FamilyKind {
        match self {
            Self::Iso7816 => FamilyKind::Iso7816,
            Self::MifareClassic(_) => FamilyKind::MifareClassic,
            Self::MifareUltralight => FamilyKind::MifareUltralight,
            Self::Felica => FamilyKind::Felica,
        }
    }

    /// Classify a card from the ATR a PC/SC reader synthesized for it
    ///
    /// Storage cards carry the PC/SC Part 3 RID followed by a standard byte
    /// and a two byte card name. Anything else with a valid initial
    /// character is an ISO 14443-4 (or contact) card speaking ISO 7816-4.
    pub fn from_atr(atr: &[u8]) -> Option<Self> {
        if !matches!(atr.first(), Some(0x3B | 0x3F)) {
            return None;
        }

        let Some(rid_at) = atr.windows(PCSC_RID.len()).position(|w| w == PCSC_RID) else {
            return Some(Self::Iso7816);
        };

        let tail = &atr[rid_at + PCSC_RID.len()..];
        let (&standard, name) = tail.split_first()?;
        let name = u16::from_be_bytes([*name.first()?, *name.get(1)?]);

        if standard == STANDARD_FELICA {
            return Some(Self::Felica);
        }

        match name {
            0x0001 => Some(Self::MifareClassic(ClassicVariant::OneK)),
            0x0002 => Some(Self::MifareClassic(ClassicVariant::FourK)),
            0x0026 => Some(Self::MifareClassic(ClassicVariant::Mini)),
            0x0003 | 0x003A => Some(Self::MifareUltralight),
            0x003B => Some(Self::Felica),
            _ => None,
        }
    }
}

/// Apply per-family identifier quirks
///
/// Some ISO 14443-4 tags report a 10-byte identifier of which only the first
/// 7 bytes are the UID.
pub fn normalize_identifier(family: &CardFamily, identifier: &[u8]) -> Vec<u8> {
    match family {
        CardFamily::Iso7816 if identifier.len() == 10 => identifier[..7].to_vec(),
        _ => identifier.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage_atr(standard: u8, name: [u8; 2]) -> Vec<u8> {
        let mut atr = vec![0x3B, 0x8F, 0x80, 0x01, 0x80, 0x4F, 0x0C];
        atr.extend_from_slice(&PCSC_RID);
        atr.push(standard);
        atr.extend_from_slice(&name);
        atr.extend_from_slice(&[0x00, 0x00, 0x00, 0x00, 0x6A]);
        atr
    }

    #[test]
    fn test_storage_cards() {
        assert_eq!(
            CardFamily::from_atr(&storage_atr(0x03, [0x00, 0x01])),
            Some(CardFamily::MifareClassic(ClassicVariant::OneK))
        );
        assert_eq!(
            CardFamily::from_atr(&storage_atr(0x03, [0x00, 0x02])),
            Some(CardFamily::MifareClassic(ClassicVariant::FourK))
        );
        assert_eq!(
            CardFamily::from_atr(&storage_atr(0x03, [0x00, 0x26])),
            Some(CardFamily::MifareClassic(ClassicVariant::Mini))
        );
        assert_eq!(
            CardFamily::from_atr(&storage_atr(0x03, [0x00, 0x03])),
            Some(CardFamily::MifareUltralight)
        );
        assert_eq!(
            CardFamily::from_atr(&storage_atr(0x11, [0x00, 0x3B])),
            Some(CardFamily::Felica)
        );
        assert_eq!(CardFamily::from_atr(&storage_atr(0x03, [0xF0, 0x04])), None);
    }

    #[test]
    fn test_iso14443_4_card() {
        // DESFire EV1 through an ACR122U
        let atr = [0x3B, 0x81, 0x80, 0x01, 0x80, 0x80];
        assert_eq!(CardFamily::from_atr(&atr), Some(CardFamily::Iso7816));
        assert_eq!(CardFamily::from_atr(&[]), None);
        assert_eq!(CardFamily::from_atr(&[0x00, 0x01]), None);
    }

    #[test]
    fn test_truncated_storage_atr() {
        let mut atr = vec![0x3B, 0x8F, 0x80, 0x01, 0x80, 0x4F, 0x0C];
        atr.extend_from_slice(&PCSC_RID);
        atr.push(0x03);
        assert_eq!(CardFamily::from_atr(&atr), None);
    }

    #[test]
    fn test_classic_geometry() {
        assert_eq!(ClassicVariant::FourK.sector_count(), 40);
        assert_eq!(ClassicVariant::blocks_in_sector(31), 4);
        assert_eq!(ClassicVariant::blocks_in_sector(32), 16);
        assert_eq!(ClassicVariant::first_block(31), 124);
        assert_eq!(ClassicVariant::first_block(33), 144);
    }

    #[test]
    fn test_normalize_identifier() {
        let long = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10];
        assert_eq!(normalize_identifier(&CardFamily::Iso7816, &long), &long[..7]);
        assert_eq!(
            normalize_identifier(&CardFamily::MifareUltralight, &long),
            long.to_vec()
        );
        assert_eq!(normalize_identifier(&CardFamily::Iso7816, &long[..7]), &long[..7]);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            CardFamily::MifareClassic(ClassicVariant::OneK).to_string(),
            "MIFARE Classic 1K"
        );
        assert_eq!(FamilyKind::Felica.to_string(), "Felica");
    }
}
