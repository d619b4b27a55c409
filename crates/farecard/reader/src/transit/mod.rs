//! Normalized transit data
//!
//! Operator specific parsers turn raw sector payloads into [`DecodedBlock`]s;
//! [`merge`] folds them into one [`TransitData`] view. A [`SchemeRegistry`]
//! picks the parser that recognises a snapshot.

mod merge;
mod registry;

use std::fmt;

use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};

pub use merge::{
    AbsentReason, BalancePrecedence, ParseError, SectorDecode, SectorScheme, decode_sector,
    decode_sectors, merge, merge_blocks,
};
pub use registry::{SchemeRegistry, recognizes};

/// Currency of a balance or fare
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Currency {
    /// ISO 4217 code
    pub code: String,
    /// Digits after the decimal separator
    pub minor_units: u8,
}

impl Currency {
    /// Currency with ISO 4217 `code` and `minor_units` decimals
    pub fn new(code: impl Into<String>, minor_units: u8) -> Self {
        Self {
            code: code.into(),
            minor_units,
        }
    }
}

/// An amount of money in minor units
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitBalance {
    /// Amount in minor units of `currency`
    pub amount: i64,
    /// Currency of the amount
    pub currency: Currency,
}

impl TransitBalance {
    /// `amount` minor units of `currency`
    pub const fn new(amount: i64, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Zero in `currency`
    pub const fn zero(currency: Currency) -> Self {
        Self::new(0, currency)
    }
}

impl fmt::Display for TransitBalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let units = u32::from(self.currency.minor_units);
        let sign = if self.amount < 0 { "-" } else { "" };
        let abs = self.amount.unsigned_abs();
        // No scale for zero decimals, nor for more than a u64 can hold
        let Some(scale) = 10u64.checked_pow(units).filter(|_| units > 0) else {
            return write!(f, "{sign}{abs} {}", self.currency.code);
        };
        write!(
            f,
            "{sign}{}.{:0width$} {}",
            abs / scale,
            abs % scale,
            self.currency.code,
            width = units as usize
        )
    }
}

/// One journey or purse event
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Trip {
    /// When the journey started
    pub start_time: Option<DateTime<Utc>>,
    /// Route or line name
    pub route: Option<String>,
    /// Boarding station or stop
    pub station: Option<String>,
    /// Amount charged
    pub fare: Option<TransitBalance>,
}

/// A pass or ticket stored on the card
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Subscription {
    /// Product name
    pub name: String,
    /// Start of validity
    pub valid_from: Option<DateTime<Utc>>,
    /// End of validity
    pub valid_to: Option<DateTime<Utc>>,
    /// Journeys left on a trip-counted product
    pub remaining_trips: Option<u32>,
}

/// Free form item shown next to the structured data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ListItem {
    /// Section title
    Header {
        /// Title text
        title: String,
    },
    /// Labelled value
    Text {
        /// What the value is
        label: String,
        /// The value, already formatted
        value: String,
    },
}

impl ListItem {
    /// Section title item
    pub fn header(title: impl Into<String>) -> Self {
        Self::Header {
            title: title.into(),
        }
    }

    /// Labelled value item
    pub fn text(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Text {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Condition worth telling the user about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitWarning {
    /// No balance and no subscriptions could be found
    #[display("Card appears to be unformatted")]
    Unformatted,
}

/// What one sector parser extracted
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DecodedBlock {
    /// Only set by sectors that carry the card number
    pub serial_number: Option<String>,
    /// Purse value stored in the sector
    pub balance: Option<TransitBalance>,
    /// Journeys logged in the sector
    pub trips: Vec<Trip>,
    /// Product stored in the sector
    pub subscription: Option<Subscription>,
    /// Items shown to the user
    pub info: Vec<ListItem>,
    /// Raw field values for troubleshooting
    pub debug: Vec<ListItem>,
}

/// Merged view of a transit card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitData {
    /// Name of the scheme that produced the view
    pub scheme: String,
    /// Card number, from the first block carrying one
    pub serial_number: Option<String>,
    /// Balance, zero when no block provides one
    pub balance: TransitBalance,
    /// Journeys of every block, in declared sector order
    pub trips: Vec<Trip>,
    /// Products of every block, in declared sector order
    pub subscriptions: Vec<Subscription>,
    /// Items shown to the user
    pub info: Vec<ListItem>,
    /// Per-block debug items, each block under a header
    pub debug: Vec<ListItem>,
    /// Set when the card looks unformatted
    pub warning: Option<TransitWarning>,
}
