//! Response APDUs
//!
//! A reply is the payload followed by the two status bytes.

pub mod status;

use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::Error;
use status::StatusWord;

/// A reply split into payload and status word
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    payload: Option<Bytes>,
    status: StatusWord,
}

impl Response {
    /// Assemble a reply; an empty payload is `None`
    pub fn new(payload: Option<Bytes>, status: impl Into<StatusWord>) -> Self {
        Self {
            payload: payload.filter(|p| !p.is_empty()),
            status: status.into(),
        }
    }

    /// Split raw reply bytes
    pub fn from_bytes(raw: &[u8]) -> Result<Self, Error> {
        let Some(split) = raw.len().checked_sub(2) else {
            return Err(Error::IncompleteResponse(raw.len()));
        };
        let (payload, sw) = raw.split_at(split);
        let status = StatusWord::new(sw[0], sw[1]);
        trace!(%status, payload_len = payload.len(), "Parsed APDU response");

        Ok(Self::new(Some(Bytes::copy_from_slice(payload)), status))
    }

    /// Payload, `None` when the card sent only a status word
    pub const fn payload(&self) -> Option<&Bytes> {
        self.payload.as_ref()
    }

    /// Payload, empty when absent
    pub fn data(&self) -> &[u8] {
        self.payload.as_deref().unwrap_or_default()
    }

    /// Status word
    pub const fn status(&self) -> StatusWord {
        self.status
    }

    /// `90 00`
    pub const fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

impl TryFrom<&[u8]> for Response {
    type Error = Error;

    fn try_from(raw: &[u8]) -> Result<Self, Error> {
        Self::from_bytes(raw)
    }
}

impl From<Response> for Bytes {
    fn from(response: Response) -> Self {
        let payload = response.payload.unwrap_or_default();
        let mut buf = BytesMut::with_capacity(payload.len() + 2);
        buf.put_slice(&payload);
        buf.put_slice(&[response.status.sw1, response.status.sw2]);
        buf.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_from_bytes() {
        let resp = Response::from_bytes(&[0x01, 0x02, 0x03, 0x90, 0x00]).unwrap();
        assert_eq!(resp.data(), &[0x01, 0x02, 0x03]);
        assert_eq!(resp.status(), StatusWord::new(0x90, 0x00));
        assert!(resp.is_success());

        let resp = Response::from_bytes(&[0x91, 0xAF]).unwrap();
        assert!(resp.payload().is_none());
        assert!(resp.data().is_empty());
        assert!(!resp.is_success());

        assert_eq!(Response::from_bytes(&[0x01]), Err(Error::IncompleteResponse(1)));
    }

    #[test]
    fn test_response_to_bytes() {
        let resp = Response::new(Some(Bytes::from_static(&[0xAB])), (0x91, 0xAF));
        let bytes: Bytes = resp.into();
        assert_eq!(bytes.as_ref(), &[0xAB, 0x91, 0xAF]);

        let bytes: Bytes = Response::new(None, 0x6A82).into();
        assert_eq!(bytes.as_ref(), &[0x6A, 0x82]);
    }
}
