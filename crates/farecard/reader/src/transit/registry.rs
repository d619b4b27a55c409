//! Scheme selection for sector-organized snapshots

use tracing::debug;

use super::{SectorScheme, TransitData, merge};
use crate::card::classic::ClassicCard;
use crate::{CardSnapshot, FamilyPayload};

/// Whether `card` carries `scheme`'s data
///
/// The anchor sector must have been read and pass the scheme's structural
/// check.
pub fn recognizes<S: SectorScheme + ?Sized>(scheme: &S, card: &ClassicCard) -> bool {
    let Some(sector) = scheme.anchor_sector().and_then(|index| card.sector(index)) else {
        return false;
    };
    sector.is_authorized() && scheme.check(&sector.data)
}

/// Sector schemes, tried in registration order
#[derive(Debug, Default)]
pub struct SchemeRegistry {
    schemes: Vec<Box<dyn SectorScheme>>,
}

impl SchemeRegistry {
    /// Registry without any scheme
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `scheme`
    pub fn register<S: SectorScheme + 'static>(&mut self, scheme: S) -> &mut Self {
        self.schemes.push(Box::new(scheme));
        self
    }

    /// Number of registered schemes
    pub fn len(&self) -> usize {
        self.schemes.len()
    }

    /// Whether no scheme is registered
    pub fn is_empty(&self) -> bool {
        self.schemes.is_empty()
    }

    /// First scheme recognising `card`
    pub fn identify(&self, card: &ClassicCard) -> Option<&dyn SectorScheme> {
        self.schemes
            .iter()
            .map(Box::as_ref)
            .find(|scheme| recognizes(*scheme, card))
    }

    /// Transit view of `snapshot`
    ///
    /// `None` for cards that are not sector-organized or that no scheme
    /// recognises.
    pub fn parse(&self, snapshot: &CardSnapshot) -> Option<TransitData> {
        let FamilyPayload::Classic(card) = &snapshot.payload else {
            return None;
        };
        let Some(scheme) = self.identify(card) else {
            debug!(schemes = self.schemes.len(), "No scheme recognised the card");
            return None;
        };
        debug!(scheme = scheme.name(), "Card recognised");
        Some(merge(scheme, card))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClassicVariant;
    use crate::card::classic::{ClassicKey, DEFAULT_KEYS, SectorRecord};
    use crate::card::ultralight::UltralightCard;
    use crate::transit::{Currency, DecodedBlock, ParseError, TransitBalance};

    /// Sectors whose first byte is `magic`, balance in the second byte
    #[derive(Debug)]
    struct MagicScheme {
        name: &'static str,
        magic: u8,
        order: [usize; 2],
    }

    impl SectorScheme for MagicScheme {
        fn name(&self) -> &str {
            self.name
        }

        fn sector_order(&self) -> &[usize] {
            &self.order
        }

        fn currency(&self) -> Currency {
            Currency::new("EUR", 2)
        }

        fn check(&self, data: &[u8]) -> bool {
            data.first() == Some(&self.magic)
        }

        fn parse(&self, data: &[u8]) -> Result<DecodedBlock, ParseError> {
            let amount = data.get(1).ok_or_else(|| ParseError::new("short sector"))?;
            Ok(DecodedBlock {
                balance: Some(TransitBalance::new(i64::from(*amount), self.currency())),
                ..Default::default()
            })
        }
    }

    fn sector(index: usize, magic: u8, amount: u8) -> SectorRecord {
        let mut data = vec![0u8; 64];
        data[0] = magic;
        data[1] = amount;
        SectorRecord::authorized(index, data, ClassicKey::a(DEFAULT_KEYS[0]))
    }

    fn snapshot(sectors: Vec<SectorRecord>) -> CardSnapshot {
        CardSnapshot::new(
            vec![0x01, 0x02, 0x03, 0x04],
            FamilyPayload::Classic(ClassicCard {
                variant: ClassicVariant::Mini,
                sectors,
            }),
        )
    }

    fn registry() -> SchemeRegistry {
        let mut registry = SchemeRegistry::new();
        registry
            .register(MagicScheme {
                name: "alpha",
                magic: 0xA1,
                order: [2, 1],
            })
            .register(MagicScheme {
                name: "beta",
                magic: 0xB2,
                order: [1, 2],
            });
        registry
    }

    #[test]
    fn test_first_recognising_scheme_is_used() {
        let registry = registry();
        assert_eq!(registry.len(), 2);

        // beta anchors on sector 1, alpha on sector 2
        let beta = snapshot(vec![sector(1, 0xB2, 40), sector(2, 0x00, 0)]);
        let FamilyPayload::Classic(card) = &beta.payload else {
            unreachable!()
        };
        assert_eq!(registry.identify(card).unwrap().name(), "beta");
        assert_eq!(registry.parse(&beta).unwrap().balance.amount, 40);

        let both = snapshot(vec![sector(1, 0xB2, 40), sector(2, 0xA1, 7)]);
        assert_eq!(registry.parse(&both).unwrap().balance.amount, 7);
    }

    #[test]
    fn test_anchor_must_be_authorized() {
        let scheme = MagicScheme {
            name: "alpha",
            magic: 0xA1,
            order: [2, 1],
        };
        let card = ClassicCard {
            variant: ClassicVariant::Mini,
            sectors: vec![SectorRecord::unauthorized(2), sector(1, 0xA1, 3)],
        };
        assert!(!recognizes(&scheme, &card));

        let card = ClassicCard {
            variant: ClassicVariant::Mini,
            sectors: vec![sector(1, 0xA1, 3)],
        };
        assert!(!recognizes(&scheme, &card));
    }

    #[test]
    fn test_unrecognised_or_other_family_is_none() {
        let registry = registry();
        assert!(registry.parse(&snapshot(vec![sector(1, 0x00, 0)])).is_none());
        assert!(SchemeRegistry::new().parse(&snapshot(vec![sector(1, 0xB2, 1)])).is_none());

        let ultralight = CardSnapshot::new(
            vec![0x04; 7],
            FamilyPayload::Ultralight(UltralightCard { pages: Vec::new() }),
        );
        assert!(registry.parse(&ultralight).is_none());
    }
}
