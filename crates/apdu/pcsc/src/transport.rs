//! Card connection on one reader

use std::{ffi::CString, fmt};

use farecard_apdu_core::prelude::*;
use pcsc::{Attribute, Card, Context, Disposition, MAX_BUFFER_SIZE};
use tracing::{debug, trace};

use crate::{config::PcscConfig, error::PcscError};

/// [`CardTransport`] over a PC/SC card handle
///
/// Created unconnected by [`PcscDeviceManager`](crate::PcscDeviceManager);
/// [`connect`](Self::connect) powers the card and
/// [`disconnect`](Self::disconnect) releases it without resetting, so the
/// reader keeps the card selected for the next client.
pub struct PcscTransport {
    context: Context,
    card: Option<Card>,
    reader: CString,
    reader_name: String,
    config: PcscConfig,
}

impl fmt::Debug for PcscTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PcscTransport")
            .field("reader", &self.reader_name)
            .field("connected", &self.card.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl PcscTransport {
    pub(crate) fn new(
        context: Context,
        reader_name: &str,
        config: PcscConfig,
    ) -> Result<Self, PcscError> {
        let reader = CString::new(reader_name)
            .ok()
            .filter(|name| !name.as_bytes().is_empty())
            .ok_or_else(|| PcscError::ReaderNotFound(reader_name.to_string()))?;

        Ok(Self {
            context,
            card: None,
            reader,
            reader_name: reader_name.to_string(),
            config,
        })
    }

    /// Connect to the card on the reader, a no-op when already connected
    pub fn connect(&mut self) -> Result<(), PcscError> {
        if self.card.is_none() {
            self.card = Some(self.open_card()?);
            debug!(reader = %self.reader_name, "Connected to card");
        }
        Ok(())
    }

    /// Release the card, leaving it powered; safe to repeat
    pub fn disconnect(&mut self) {
        let Some(card) = self.card.take() else {
            return;
        };
        if let Err((_, e)) = card.disconnect(Disposition::LeaveCard) {
            debug!(error = ?e, "Card disconnect failed");
        }
    }

    /// ATR of the connected card
    pub fn atr(&self) -> Result<Vec<u8>, PcscError> {
        let card = self.card.as_ref().ok_or_else(|| self.no_card())?;
        Ok(card.get_attribute_owned(Attribute::AtrString)?)
    }

    /// Reader name
    pub fn reader_name(&self) -> &str {
        &self.reader_name
    }

    /// Whether a card handle is held
    pub const fn has_card(&self) -> bool {
        self.card.is_some()
    }

    fn no_card(&self) -> PcscError {
        PcscError::NoCard(self.reader_name.clone())
    }

    fn open_card(&self) -> Result<Card, PcscError> {
        self.context
            .connect(&self.reader, self.config.share_mode.into(), self.config.protocols)
            .map_err(|e| match e {
                pcsc::Error::NoSmartcard | pcsc::Error::RemovedCard => self.no_card(),
                pcsc::Error::UnknownReader => PcscError::ReaderNotFound(self.reader_name.clone()),
                other => other.into(),
            })
    }

    fn transmit_once(&self, command: &[u8]) -> Result<Bytes, pcsc::Error> {
        let mut buffer = [0u8; MAX_BUFFER_SIZE];
        let card = self.card.as_ref().ok_or(pcsc::Error::NoSmartcard)?;
        card.transmit(command, &mut buffer).map(Bytes::copy_from_slice)
    }

    fn transmit_command(&mut self, command: &[u8]) -> Result<Bytes, PcscError> {
        if self.card.is_none() {
            return Err(self.no_card());
        }

        match self.transmit_once(command) {
            Ok(reply) => Ok(reply),
            Err(pcsc::Error::ResetCard) if self.config.reconnect_on_reset => {
                trace!(reader = %self.reader_name, "Card was reset, reconnecting");
                self.card = Some(self.open_card()?);
                Ok(self.transmit_once(command)?)
            }
            Err(pcsc::Error::RemovedCard) => {
                self.card = None;
                Err(PcscError::CardRemoved)
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl CardTransport for PcscTransport {
    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
        self.transmit_command(command).map_err(TransportError::from)
    }

    fn is_connected(&self) -> bool {
        self.card.is_some()
    }
}

impl Drop for PcscTransport {
    fn drop(&mut self) {
        self.disconnect();
    }
}
