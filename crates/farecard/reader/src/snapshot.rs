//! Card snapshot model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::card::{
    classic::ClassicCard, desfire::DesfireCard, felica::FelicaCard, iso7816::Iso7816Card,
    ultralight::UltralightCard,
};
use crate::family::FamilyKind;

/// Immutable result of one acquisition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardSnapshot {
    /// Card unique identifier, empty when the reader was told not to ask
    #[serde(with = "crate::serde_hex")]
    pub identifier: Vec<u8>,
    /// When the card was read
    pub scanned_at: DateTime<Utc>,
    /// Family specific raw data
    pub payload: FamilyPayload,
}

impl CardSnapshot {
    /// Create a snapshot stamped with the current time
    pub fn new(identifier: Vec<u8>, payload: FamilyPayload) -> Self {
        Self {
            identifier,
            scanned_at: Utc::now(),
            payload,
        }
    }

    /// Identifier as upper-case hex
    pub fn identifier_hex(&self) -> String {
        hex::encode_upper(&self.identifier)
    }
}

/// Raw data of exactly one chip family
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum FamilyPayload {
    /// Generic ISO 7816-4 applications
    Iso7816(Iso7816Card),
    /// MIFARE DESFire applications and files
    Desfire(DesfireCard),
    /// MIFARE Classic sectors
    Classic(ClassicCard),
    /// MIFARE Ultralight / NTAG pages
    Ultralight(UltralightCard),
    /// FeliCa systems and services
    Felica(FelicaCard),
}

impl FamilyPayload {
    /// Family this payload belongs to
    pub const fn family(&self) -> FamilyKind {
        match self {
            Self::Iso7816(_) | Self::Desfire(_) => FamilyKind::Iso7816,
            Self::Classic(_) => FamilyKind::MifareClassic,
            Self::Ultralight(_) => FamilyKind::MifareUltralight,
            Self::Felica(_) => FamilyKind::Felica,
        }
    }

    /// Short name of the payload kind
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Iso7816(_) => "iso7816",
            Self::Desfire(_) => "desfire",
            Self::Classic(_) => "classic",
            Self::Ultralight(_) => "ultralight",
            Self::Felica(_) => "felica",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::ultralight::{UltralightCard, UltralightPage};

    #[test]
    fn test_json_shape() {
        let snapshot = CardSnapshot::new(
            vec![0x04, 0xA2, 0x3F],
            FamilyPayload::Ultralight(UltralightCard {
                pages: vec![UltralightPage {
                    index: 0,
                    data: vec![0x04, 0xA2, 0x3F, 0x11],
                }],
            }),
        );

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["identifier"], "04A23F");
        assert_eq!(json["payload"]["family"], "ultralight");
        assert_eq!(json["payload"]["pages"][0]["data"], "04A23F11");

        let back: CardSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(back, snapshot);
        assert_eq!(back.payload.family(), FamilyKind::MifareUltralight);
    }
}
