//! Transceiver over a PC/SC reader

use bytes::Bytes;
use farecard_apdu_core::{CardExecutor, Command, Response, TransportError};
use farecard_apdu_transport_pcsc::PcscTransport;
use tracing::{debug, warn};

use super::Transceiver;
use crate::constants::pcsc::INS_GET_DATA;
use crate::{CardFamily, Error, Result};

/// Options for [`PcscTransceiver`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcscTransceiverConfig {
    /// Ask the reader for the card UID with GET DATA on connect
    ///
    /// Contact readers do not implement the pseudo-APDU; the identifier is
    /// empty when this is off.
    pub read_uid: bool,
}

impl Default for PcscTransceiverConfig {
    fn default() -> Self {
        Self { read_uid: true }
    }
}

impl PcscTransceiverConfig {
    /// Set [`read_uid`](Self::read_uid)
    pub const fn with_read_uid(mut self, read_uid: bool) -> Self {
        self.read_uid = read_uid;
        self
    }
}

/// [`Transceiver`] for cards in a PC/SC reader
#[derive(Debug)]
pub struct PcscTransceiver {
    executor: CardExecutor<PcscTransport>,
    config: PcscTransceiverConfig,
    identifier: Option<Vec<u8>>,
    atr: Option<Vec<u8>>,
}

impl PcscTransceiver {
    /// Wrap an opened, not yet connected, transport
    pub const fn new(transport: PcscTransport, config: PcscTransceiverConfig) -> Self {
        Self {
            executor: CardExecutor::new(transport),
            config,
            identifier: None,
            atr: None,
        }
    }

    /// Name of the reader
    pub fn reader_name(&self) -> &str {
        self.executor.transport().reader_name()
    }

    /// ATR seen on connect
    pub fn atr(&self) -> Option<&[u8]> {
        self.atr.as_deref()
    }

    fn read_uid(&mut self) -> Result<Vec<u8>> {
        let command = Command::pseudo(INS_GET_DATA, 0x00, 0x00).with_le(0x00);
        let response = self.transmit(&command).map_err(|e| e.at_step("GET DATA"))?;
        Ok(uid_from_response(&response))
    }
}

/// UID carried by a GET DATA reply, empty when the reader refused
///
/// Some readers only answer GET DATA for certain card types; the card is
/// still usable without an identifier.
fn uid_from_response(response: &Response) -> Vec<u8> {
    if response.is_success() {
        return response.data().to_vec();
    }
    warn!(status = %response.status(), "Reader did not return a UID");
    Vec::new()
}

impl Transceiver for PcscTransceiver {
    fn connect(&mut self) -> Result<()> {
        let transport = self.executor.transport_mut();
        transport.connect().map_err(TransportError::from)?;
        let atr = transport.atr().map_err(TransportError::from)?;
        debug!(reader = %transport.reader_name(), atr = %hex::encode_upper(&atr), "Card connected");
        self.atr = Some(atr);

        if self.config.read_uid {
            let uid = self.read_uid()?;
            debug!(uid = %hex::encode_upper(&uid), "Card identifier");
            self.identifier = Some(uid);
        } else {
            self.identifier = Some(Vec::new());
        }
        Ok(())
    }

    fn exchange(&mut self, command: &[u8]) -> Result<Bytes> {
        Ok(self.executor.exchange(command)?)
    }

    fn identifier(&self) -> Option<&[u8]> {
        self.identifier.as_deref()
    }

    fn detected_family(&self) -> Result<CardFamily> {
        let atr = self
            .atr
            .as_deref()
            .ok_or_else(|| Error::UnsupportedCard("not connected".into()))?;
        CardFamily::from_atr(atr).ok_or_else(|| {
            warn!(atr = %hex::encode_upper(atr), "Unrecognized ATR");
            Error::UnsupportedCard(format!("unrecognized ATR {}", hex::encode_upper(atr)))
        })
    }

    fn close(&mut self) {
        self.executor.transport_mut().disconnect();
        self.identifier = None;
        self.atr = None;
    }
}
