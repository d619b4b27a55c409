//! Card transceivers
//!
//! A [`Transceiver`] is bound to one physical card presentation. It exchanges
//! raw command and response bytes, exposes the card identifier and reports the
//! chip family seen at connection time.

#[cfg(feature = "pcsc")]
mod pcsc;

#[cfg(feature = "pcsc")]
pub use self::pcsc::{PcscTransceiver, PcscTransceiverConfig};

use std::fmt;

use bytes::Bytes;
use farecard_apdu_core::{Command, Response};

use crate::{CardFamily, Error, Result};

/// Exchanges raw bytes with one physical card
pub trait Transceiver: fmt::Debug {
    /// Establish a session with the presented card
    fn connect(&mut self) -> Result<()>;

    /// Send one command and wait for the card's reply
    ///
    /// The reply always ends with a status word. Continuation status words
    /// (`61 XX`, `6C XX`) are already resolved.
    fn exchange(&mut self, command: &[u8]) -> Result<Bytes>;

    /// Card unique identifier, available after a successful [`connect`](Self::connect)
    fn identifier(&self) -> Option<&[u8]>;

    /// Chip family derived from connection-time artifacts
    fn detected_family(&self) -> Result<CardFamily>;

    /// Release the card; safe to call more than once
    fn close(&mut self);

    /// Send a typed command and split the reply into payload and status
    fn transmit(&mut self, command: &Command) -> Result<Response> {
        let bytes = command
            .to_bytes()
            .map_err(|e| Error::protocol("encode command", e.to_string()))?;
        let raw = self.exchange(&bytes)?;
        Ok(Response::from_bytes(&raw)?)
    }
}

impl<T: Transceiver + ?Sized> Transceiver for &mut T {
    fn connect(&mut self) -> Result<()> {
        (**self).connect()
    }

    fn exchange(&mut self, command: &[u8]) -> Result<Bytes> {
        (**self).exchange(command)
    }

    fn identifier(&self) -> Option<&[u8]> {
        (**self).identifier()
    }

    fn detected_family(&self) -> Result<CardFamily> {
        (**self).detected_family()
    }

    fn close(&mut self) {
        (**self).close();
    }
}

/// Scoped session over a transceiver
///
/// The transceiver is closed exactly once, when the session is closed or
/// dropped, on every exit path.
#[derive(Debug)]
pub struct Session<'a, T: Transceiver + ?Sized> {
    transceiver: &'a mut T,
    open: bool,
}

impl<'a, T: Transceiver + ?Sized> Session<'a, T> {
    /// Connect `transceiver` and guard it
    ///
    /// A failed connect still closes the transceiver before returning.
    pub fn open(transceiver: &'a mut T) -> Result<Self> {
        let mut session = Self {
            transceiver,
            open: true,
        };
        session.transceiver.connect()?;
        Ok(session)
    }

    /// The guarded transceiver
    pub fn transceiver(&mut self) -> &mut T {
        &mut *self.transceiver
    }

    /// Close now rather than on drop
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if std::mem::take(&mut self.open) {
            self.transceiver.close();
        }
    }
}

impl<T: Transceiver + ?Sized> Drop for Session<'_, T> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
pub(crate) use mock::ScriptedTransceiver;

#[cfg(test)]
mod mock {
    use std::collections::VecDeque;

    use farecard_apdu_core::TransportError;

    use super::*;

    /// Transceiver replaying scripted replies, one per exchange
    #[derive(Debug, Default)]
    pub(crate) struct ScriptedTransceiver {
        pub family: Option<CardFamily>,
        pub identifier: Vec<u8>,
        pub replies: VecDeque<Result<Bytes>>,
        pub commands: Vec<Bytes>,
        pub connect_error: Option<Error>,
        pub connected: bool,
        pub close_count: usize,
    }

    impl ScriptedTransceiver {
        pub(crate) fn new(family: CardFamily) -> Self {
            Self {
                family: Some(family),
                identifier: vec![0x04, 0x11, 0x22, 0x33],
                ..Default::default()
            }
        }

        /// Queue a reply given as hex, status word included
        pub(crate) fn reply(mut self, hex_reply: &str) -> Self {
            let bytes = hex::decode(hex_reply.replace(' ', "")).expect("valid hex in script");
            self.replies.push_back(Ok(Bytes::from(bytes)));
            self
        }

        pub(crate) fn fail(mut self, error: Error) -> Self {
            self.replies.push_back(Err(error));
            self
        }

        /// Commands sent so far, as upper-case hex
        pub(crate) fn sent(&self) -> Vec<String> {
            self.commands.iter().map(hex::encode_upper).collect()
        }
    }

    impl Transceiver for ScriptedTransceiver {
        fn connect(&mut self) -> Result<()> {
            if let Some(error) = self.connect_error.clone() {
                return Err(error);
            }
            self.connected = true;
            Ok(())
        }

        fn exchange(&mut self, command: &[u8]) -> Result<Bytes> {
            self.commands.push(Bytes::copy_from_slice(command));
            let reply = self
                .replies
                .pop_front()
                .unwrap_or(Err(Error::Transport(TransportError::Timeout)))?;
            if reply.len() < 2 {
                return Err(Error::protocol("exchange", "reply shorter than a status word"));
            }
            Ok(reply)
        }

        fn identifier(&self) -> Option<&[u8]> {
            self.connected.then_some(self.identifier.as_slice())
        }

        fn detected_family(&self) -> Result<CardFamily> {
            self.family
                .ok_or_else(|| Error::UnsupportedCard("unrecognized ATR".into()))
        }

        fn close(&mut self) {
            self.connected = false;
            self.close_count += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use farecard_apdu_core::TransportError;

    use super::*;

    #[test]
    fn test_session_closes_once() {
        let mut transceiver = ScriptedTransceiver::new(CardFamily::Iso7816);
        {
            let session = Session::open(&mut transceiver).unwrap();
            session.close();
        }
        assert_eq!(transceiver.close_count, 1);

        {
            let _session = Session::open(&mut transceiver).unwrap();
        }
        assert_eq!(transceiver.close_count, 2);
    }

    #[test]
    fn test_failed_connect_still_closes() {
        let mut transceiver = ScriptedTransceiver::new(CardFamily::Iso7816);
        transceiver.connect_error = Some(Error::Transport(TransportError::NoCard("r".into())));
        assert!(Session::open(&mut transceiver).is_err());
        assert_eq!(transceiver.close_count, 1);
        assert!(transceiver.identifier().is_none());
    }

    #[test]
    fn test_transmit_splits_status() {
        let mut transceiver = ScriptedTransceiver::new(CardFamily::Iso7816).reply("0102 9000");
        transceiver.connect().unwrap();
        let response = transceiver
            .transmit(&Command::pseudo(0xCA, 0x00, 0x00).with_le(0x00))
            .unwrap();
        assert_eq!(response.data(), &[0x01, 0x02]);
        assert!(response.is_success());
        assert_eq!(transceiver.sent(), vec!["FFCA000000"]);
    }

    #[test]
    fn test_short_reply_is_protocol_error() {
        let mut transceiver = ScriptedTransceiver::new(CardFamily::Iso7816).reply("90");
        let err = transceiver.exchange(&[0x00]).unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
    }
}
