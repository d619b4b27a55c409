//! Core types for APDU (Application Protocol Data Unit) exchanges
//!
//! This crate provides the foundational types used to talk to contactless cards
//! through a reader, following ISO/IEC 7816-4 framing.
//!
//! ## Overview
//!
//! - [`Command`]: building and parsing command APDUs, including reader pseudo-APDUs
//! - [`Response`] and [`StatusWord`]: splitting and interpreting card replies
//! - [`CardTransport`]: the raw byte pipe implemented by each physical transport
//! - [`CardExecutor`]: a transport wrapper that resolves `61 XX` / `6C XX`
//!   continuations so every transport exposes the same framing semantics
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

// Re-export bytes for convenience
pub use bytes::{Bytes, BytesMut};

// Main modules
pub mod command;
pub mod executor;
pub mod response;
pub mod transport;

// Core error types
mod error;
pub use error::{Error, Result, ResultExt};

// Re-exports for common types
pub use command::{CLA_PSEUDO, Command, ExpectedLength};
pub use executor::CardExecutor;
pub use response::status::StatusWord;
pub use response::Response;
pub use response::status::StatusClass;
pub use transport::{CardTransport, TransportError};

/// Prelude module containing commonly used traits and types
pub mod prelude {
    pub use crate::{
        Bytes, BytesMut, CardExecutor, Command, Error, Response, Result, ResultExt,
        response::status::{StatusWord, common as status},
        transport::{CardTransport, TransportError},
    };
}
