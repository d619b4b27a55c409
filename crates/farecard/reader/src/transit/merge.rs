//! Sector merge engine
//!
//! Sectors of a sector-organized card are decoded one by one in the order a
//! scheme declares. A sector that is locked, unreadable, fails the scheme's
//! structural check or breaks its parser is absent from the result; it never
//! fails the whole view.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{Currency, DecodedBlock, ListItem, TransitBalance, TransitData, TransitWarning};
use crate::card::classic::{ClassicCard, SectorOutcome};

/// Which block decides the balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalancePrecedence {
    /// First decoded block, in declared order, that has a balance
    #[default]
    FirstAvailable,
    /// Only the first decoded block is consulted
    LeadingBlock,
}

/// Failure reported by a sector parser
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ParseError(pub String);

impl ParseError {
    /// Parse failure described by `message`
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Operator specific decoding of sector payloads
///
/// Implementations only see raw bytes of one sector at a time and must not
/// assume any other sector was readable.
pub trait SectorScheme: fmt::Debug + Send + Sync {
    /// Scheme name, copied into the view
    fn name(&self) -> &str;

    /// Sectors to decode, in merge order
    fn sector_order(&self) -> &[usize];

    /// Sector whose structural check identifies a card of this scheme
    fn anchor_sector(&self) -> Option<usize> {
        self.sector_order().first().copied()
    }

    /// Currency used when no block provides a balance
    fn currency(&self) -> Currency;

    /// Which block decides the balance
    fn balance_precedence(&self) -> BalancePrecedence {
        BalancePrecedence::FirstAvailable
    }

    /// Cheap structural test on the sector payload
    fn check(&self, data: &[u8]) -> bool;

    /// Decode a payload that passed [`check`](Self::check)
    fn parse(&self, data: &[u8]) -> Result<DecodedBlock, ParseError>;
}

/// Why a sector contributed nothing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "message", rename_all = "snake_case")]
pub enum AbsentReason {
    /// The card has no such sector
    Missing,
    /// No key opened the sector
    Unauthorized,
    /// The sector could not be read after authentication
    ReadError(String),
    /// The payload failed the scheme's structural check
    FailedCheck,
    /// Parser returned an error or panicked
    ParseFailed(String),
}

/// Outcome of decoding one sector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectorDecode {
    /// The parser produced a block
    Decoded(DecodedBlock),
    /// The sector contributes nothing
    Absent(AbsentReason),
}

impl SectorDecode {
    /// The decoded block, if any
    pub fn into_block(self) -> Option<DecodedBlock> {
        match self {
            Self::Decoded(block) => Some(block),
            Self::Absent(_) => None,
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "parser panicked".to_string()
    }
}

/// Decode sector `index` of `card`
pub fn decode_sector<S: SectorScheme + ?Sized>(
    scheme: &S,
    card: &ClassicCard,
    index: usize,
) -> SectorDecode {
    let Some(sector) = card.sector(index) else {
        return SectorDecode::Absent(AbsentReason::Missing);
    };

    match &sector.outcome {
        SectorOutcome::Authorized { .. } => {}
        SectorOutcome::Unauthorized => return SectorDecode::Absent(AbsentReason::Unauthorized),
        SectorOutcome::ReadError { message } => {
            return SectorDecode::Absent(AbsentReason::ReadError(message.clone()));
        }
    }

    if !scheme.check(&sector.data) {
        debug!(scheme = scheme.name(), sector = index, "Sector failed structural check");
        return SectorDecode::Absent(AbsentReason::FailedCheck);
    }

    let parsed = catch_unwind(AssertUnwindSafe(|| scheme.parse(&sector.data)))
        .unwrap_or_else(|payload| Err(ParseError(panic_message(payload.as_ref()))));

    match parsed {
        Ok(block) => SectorDecode::Decoded(block),
        Err(error) => {
            warn!(scheme = scheme.name(), sector = index, %error, "Error decoding sector");
            SectorDecode::Absent(AbsentReason::ParseFailed(error.0))
        }
    }
}

/// Decode every sector the scheme declares, in declared order
pub fn decode_sectors<S: SectorScheme + ?Sized>(
    scheme: &S,
    card: &ClassicCard,
) -> Vec<(usize, SectorDecode)> {
    scheme
        .sector_order()
        .iter()
        .map(|&index| (index, decode_sector(scheme, card, index)))
        .collect()
}

/// Decode and merge `card` under `scheme`
pub fn merge<S: SectorScheme + ?Sized>(scheme: &S, card: &ClassicCard) -> TransitData {
    let blocks = decode_sectors(scheme, card)
        .into_iter()
        .filter_map(|(index, decode)| decode.into_block().map(|block| (index, block)))
        .collect();
    merge_blocks(scheme, blocks)
}

/// Fold decoded blocks, already in declared order, into one view
pub fn merge_blocks<S: SectorScheme + ?Sized>(
    scheme: &S,
    blocks: Vec<(usize, DecodedBlock)>,
) -> TransitData {
    let serial_number = blocks
        .iter()
        .find_map(|(_, block)| block.serial_number.clone());

    let balance = match scheme.balance_precedence() {
        BalancePrecedence::FirstAvailable => {
            blocks.iter().find_map(|(_, block)| block.balance.clone())
        }
        BalancePrecedence::LeadingBlock => blocks.first().and_then(|(_, block)| block.balance.clone()),
    };

    let mut trips = Vec::new();
    let mut subscriptions = Vec::new();
    let mut info = Vec::new();
    let mut debug = Vec::new();

    for (index, block) in blocks {
        trips.extend(block.trips);
        subscriptions.extend(block.subscription);
        info.extend(block.info);
        debug.push(ListItem::header(format!("Block {index}")));
        debug.extend(block.debug);
    }

    let warning = (balance.is_none() && subscriptions.is_empty()).then_some(TransitWarning::Unformatted);

    TransitData {
        scheme: scheme.name().to_string(),
        serial_number,
        balance: balance.unwrap_or_else(|| TransitBalance::zero(scheme.currency())),
        trips,
        subscriptions,
        info,
        debug,
        warning,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClassicVariant;
    use crate::card::classic::{ClassicKey, DEFAULT_KEYS, SectorRecord};

    /// Sector payload: first byte is the balance, 0xFF means none
    #[derive(Debug)]
    struct ByteScheme(BalancePrecedence);

    impl SectorScheme for ByteScheme {
        fn name(&self) -> &str {
            "byte"
        }

        fn sector_order(&self) -> &[usize] {
            &[2, 1]
        }

        fn currency(&self) -> Currency {
            Currency::new("EUR", 2)
        }

        fn balance_precedence(&self) -> BalancePrecedence {
            self.0
        }

        fn check(&self, data: &[u8]) -> bool {
            !data.is_empty()
        }

        fn parse(&self, data: &[u8]) -> Result<DecodedBlock, ParseError> {
            Ok(DecodedBlock {
                balance: (data[0] != 0xFF)
                    .then(|| TransitBalance::new(i64::from(data[0]), self.currency())),
                ..Default::default()
            })
        }
    }

    fn card(payloads: &[(usize, u8)]) -> ClassicCard {
        ClassicCard {
            variant: ClassicVariant::Mini,
            sectors: payloads
                .iter()
                .map(|&(index, first)| {
                    let mut data = vec![0u8; 64];
                    data[0] = first;
                    SectorRecord::authorized(index, data, ClassicKey::a(DEFAULT_KEYS[0]))
                })
                .collect(),
        }
    }

    #[test]
    fn test_balance_precedence() {
        let card = card(&[(1, 7), (2, 0xFF)]);

        let view = merge(&ByteScheme(BalancePrecedence::FirstAvailable), &card);
        assert_eq!(view.balance.amount, 7);
        assert_eq!(view.warning, None);

        let view = merge(&ByteScheme(BalancePrecedence::LeadingBlock), &card);
        assert_eq!(view.balance, TransitBalance::zero(Currency::new("EUR", 2)));
        assert_eq!(view.warning, Some(TransitWarning::Unformatted));
    }

    #[test]
    fn test_missing_sector() {
        let card = card(&[(1, 3)]);
        let scheme = ByteScheme(BalancePrecedence::FirstAvailable);
        assert_eq!(
            decode_sector(&scheme, &card, 2),
            SectorDecode::Absent(AbsentReason::Missing)
        );
        assert_eq!(merge(&scheme, &card).debug, vec![ListItem::header("Block 1")]);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("index out of bounds");
        assert_eq!(panic_message(payload.as_ref()), "index out of bounds");
        let payload: Box<dyn std::any::Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(payload.as_ref()), "parser panicked");
    }
}
