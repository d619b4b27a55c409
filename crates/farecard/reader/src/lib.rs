//! Acquisition and decode pipeline for contactless transit cards
//!
//! A [`Transceiver`] talks to one physical card. The dispatcher
//! ([`read_card`] / [`acquire`]) classifies the card, runs the matching
//! [`FamilyDecoder`]s from a [`DecoderRegistry`] and returns an immutable
//! [`CardSnapshot`]. For sector-organized cards, [`transit::merge`] folds the
//! independently decoded sectors into a single [`transit::TransitData`] view.
//!
//! ```no_run
//! # #[cfg(feature = "pcsc")]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use farecard_apdu_transport_pcsc::PcscDeviceManager;
//! use farecard_reader::{
//!     DecoderRegistry, TracingFeedback, read_card,
//!     transceiver::{PcscTransceiver, PcscTransceiverConfig},
//! };
//!
//! let manager = PcscDeviceManager::new()?;
//! let transport = manager.open_reader("ACS ACR122U PICC Interface 00 00")?;
//! let mut transceiver = PcscTransceiver::new(transport, PcscTransceiverConfig::default());
//!
//! let snapshot = read_card(&mut transceiver, &DecoderRegistry::standard(), &mut TracingFeedback)?;
//! println!("{}", snapshot.payload.family());
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "pcsc"))]
//! # fn main() {}
//! ```
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]

pub mod card;
mod cancel;
pub mod constants;
mod decoder;
mod dispatcher;
mod error;
mod family;
mod feedback;
mod serde_hex;
mod snapshot;
pub mod transceiver;
pub mod transit;

pub use cancel::CancelToken;
pub use decoder::{DumpContext, DumpOutcome, FamilyDecoder};
pub use dispatcher::{DecoderRegistry, acquire, acquire_cancellable, read_card, read_card_cancellable};
pub use error::{Error, Result};
pub use family::{CardFamily, ClassicVariant, FamilyKind, normalize_identifier};
pub use feedback::{FeedbackSink, NoopFeedback, TracingFeedback};
pub use snapshot::{CardSnapshot, FamilyPayload};
pub use transceiver::{Session, Transceiver};
