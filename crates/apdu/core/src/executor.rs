//! Executor for APDU command execution
//!
//! [`CardExecutor`] wraps a [`CardTransport`] and hides the ISO 7816-4
//! continuation mechanics from callers: `61 XX` is followed by GET RESPONSE
//! until the card has nothing left, and `6C XX` re-sends the command with the
//! length the card asked for. Both PC/SC and native readers therefore expose
//! the same framing.

use bytes::{Bytes, BytesMut};
use tracing::{debug, instrument, trace};

use crate::command::Command;
use crate::response::Response;
use crate::transport::CardTransport;
use crate::{Error, Result, ResultExt};

/// INS byte of GET RESPONSE
const INS_GET_RESPONSE: u8 = 0xC0;

/// Card executor combining a transport with continuation handling
#[derive(Debug)]
pub struct CardExecutor<T: CardTransport> {
    /// The transport used for communication
    transport: T,
    /// Maximum number of chained GET RESPONSE commands
    max_chain: usize,
    /// Class byte for GET RESPONSE
    get_response_cla: u8,
}

impl<T: CardTransport> CardExecutor<T> {
    /// Create a new card executor with the given transport
    pub const fn new(transport: T) -> Self {
        Self {
            transport,
            max_chain: 10,
            get_response_cla: 0x00,
        }
    }

    /// Set the maximum number of GET RESPONSE continuations
    pub const fn with_max_chain(mut self, max_chain: usize) -> Self {
        self.max_chain = max_chain;
        self
    }

    /// Get a reference to the underlying transport
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Get a mutable reference to the underlying transport
    pub const fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Exchange raw command bytes, resolving continuations
    ///
    /// The returned bytes always end in the final status word.
    #[instrument(level = "trace", skip_all, fields(len = command.len()))]
    pub fn exchange(&mut self, command: &[u8]) -> Result<Bytes> {
        let mut response = self.send(command)?;

        if let Some(le) = response.status().corrected_le() {
            debug!(le, "Card requested a different Le, re-sending");
            let mut corrected = Command::from_bytes(command).context("Re-sending with Le")?;
            corrected.le = Some(le);
            response = self.send(&corrected.to_bytes()?)?;
        }

        let mut chain_count = 0;
        while let Some(le) = response.status().remaining_bytes() {
            if chain_count >= self.max_chain {
                return Err(Error::ChainLimitExceeded);
            }

            let get_response =
                Command::new(self.get_response_cla, INS_GET_RESPONSE, 0x00, 0x00).with_le(le);
            let next = self
                .send(&get_response.to_bytes()?)
                .context("GET RESPONSE")?;

            let mut buffer = BytesMut::with_capacity(response.data().len() + next.data().len());
            buffer.extend_from_slice(response.data());
            buffer.extend_from_slice(next.data());
            response = Response::new(Some(buffer.freeze()), next.status());

            chain_count += 1;
        }

        let bytes: Bytes = response.into();
        trace!(response = %hex::encode(&bytes), "Exchange complete");
        Ok(bytes)
    }

    /// Transmit a typed command and parse the resolved response
    pub fn transmit(&mut self, command: &Command) -> Result<Response> {
        let bytes = self.exchange(&command.to_bytes()?)?;
        Response::from_bytes(&bytes)
    }

    fn send(&mut self, command: &[u8]) -> Result<Response> {
        let raw = self.transport.transmit_raw(command)?;
        Response::from_bytes(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StatusWord;
    use crate::transport::{MockTransport, TransportError};

    #[test]
    fn test_executor_basic_transmit() {
        let transport = MockTransport::new([[0x90u8, 0x00]]);
        let mut executor = CardExecutor::new(transport);

        let response = executor.exchange(&[0x00, 0xA4, 0x04, 0x00]).unwrap();
        assert_eq!(response.as_ref(), &[0x90, 0x00]);
        assert_eq!(executor.transport().commands.len(), 1);
    }

    #[test]
    fn test_get_response_chaining() {
        let transport = MockTransport::new([
            &[0x01u8, 0x02, 0x61, 0x02][..],
            &[0x03, 0x04, 0x90, 0x00][..],
        ]);
        let mut executor = CardExecutor::new(transport);

        let response = executor
            .transmit(&Command::new(0x00, 0xB2, 0x01, 0x0C).with_le(0x00))
            .unwrap();
        assert_eq!(response.data(), &[0x01, 0x02, 0x03, 0x04]);
        assert!(response.is_success());

        let sent = &executor.transport().commands;
        assert_eq!(sent[1].as_ref(), &[0x00, 0xC0, 0x00, 0x00, 0x02]);
    }

    #[test]
    fn test_wrong_le_is_corrected() {
        let transport = MockTransport::new([&[0x6Cu8, 0x1D][..], &[0xAA, 0x90, 0x00][..]]);
        let mut executor = CardExecutor::new(transport);

        let response = executor.exchange(&[0x00, 0xB2, 0x01, 0x0C, 0x00]).unwrap();
        assert_eq!(response.as_ref(), &[0xAA, 0x90, 0x00]);
        assert_eq!(
            executor.transport().commands[1].as_ref(),
            &[0x00, 0xB2, 0x01, 0x0C, 0x1D]
        );
    }

    #[test]
    fn test_chain_limit() {
        let transport = MockTransport::new(vec![[0x61u8, 0x01]; 4]);
        let mut executor = CardExecutor::new(transport).with_max_chain(2);

        let err = executor.exchange(&[0x00, 0xB0, 0x00, 0x00, 0x00]).unwrap_err();
        assert_eq!(err, Error::ChainLimitExceeded);
    }

    #[test]
    fn test_error_status_is_passed_through() {
        let transport = MockTransport::new([[0x6Au8, 0x82]]);
        let mut executor = CardExecutor::new(transport);

        let response = executor
            .transmit(&Command::new(0x00, 0xA4, 0x04, 0x00))
            .unwrap();
        assert_eq!(response.status(), StatusWord::new(0x6A, 0x82));
    }

    #[test]
    fn test_transport_error_propagates() {
        let mut executor = CardExecutor::new(MockTransport::new(Vec::<[u8; 2]>::new()));
        let err = executor.exchange(&[0x00, 0xA4, 0x04, 0x00]).unwrap_err();
        assert_eq!(err.transport(), Some(&TransportError::Transmission));
    }
}
