//! PC/SC transport implementation for APDU operations
//!
//! This crate provides an implementation of the `CardTransport` trait from
//! `farecard-apdu-core` using the PC/SC API, which is how desktop contactless
//! readers (ACR122U and friends) are reached.
//!
//! # Examples
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use farecard_apdu_core::{CardExecutor, Command};
//! use farecard_apdu_transport_pcsc::{PcscConfig, PcscDeviceManager, ReaderSelection};
//!
//! let manager = PcscDeviceManager::new()?;
//! let mut transport = manager.open_selected(&ReaderSelection::default(), PcscConfig::default())?;
//! transport.connect()?;
//! println!("ATR: {:02X?}", transport.atr()?);
//!
//! let mut executor = CardExecutor::new(transport);
//! let uid = executor.transmit(&Command::pseudo(0xCA, 0x00, 0x00).with_le(0x00))?;
//! println!("UID: {:02X?}", uid.data());
//! # Ok(())
//! # }
//! ```
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![warn(missing_docs)]

mod config;
mod error;
mod manager;
mod reader;
mod transport;

pub use config::{PcscConfig, ReaderSelection, SECURITY_KEY_FRAGMENT, ShareMode};
pub use error::PcscError;
pub use manager::PcscDeviceManager;
pub use reader::PcscReader;
pub use transport::PcscTransport;

pub use pcsc::Protocols;
