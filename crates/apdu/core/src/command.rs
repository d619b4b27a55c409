//! Command APDUs
//!
//! Only short APDUs exist here: Lc and Le fit one byte each, which is all a
//! contactless reader accepts. A command is built from its header and then
//! given a data field and an Le as needed:
//!
//! ```
//! use farecard_apdu_core::Command;
//!
//! let read = Command::pseudo(0xB0, 0x00, 0x04).with_le(16);
//! assert_eq!(read.to_bytes().unwrap().as_ref(), &[0xFF, 0xB0, 0x00, 0x04, 0x10]);
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use crate::Error;

/// Le byte. `0x00` asks for as many bytes as the card has, up to 256.
pub type ExpectedLength = u8;

/// CLA of PC/SC Part 3 pseudo-APDUs, answered by the reader itself
pub const CLA_PSEUDO: u8 = 0xFF;

/// A command APDU
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Class byte
    pub cla: u8,
    /// Instruction byte
    pub ins: u8,
    /// First parameter
    pub p1: u8,
    /// Second parameter
    pub p2: u8,
    /// Data field, sent with its Lc
    pub data: Option<Bytes>,
    /// Expected reply length
    pub le: Option<ExpectedLength>,
}

impl Command {
    /// Header-only command
    pub const fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: None,
            le: None,
        }
    }

    /// Reader pseudo-APDU
    pub const fn pseudo(ins: u8, p1: u8, p2: u8) -> Self {
        Self::new(CLA_PSEUDO, ins, p1, p2)
    }

    /// Attach a data field
    pub fn with_data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Attach an Le
    pub const fn with_le(mut self, le: ExpectedLength) -> Self {
        self.le = Some(le);
        self
    }

    /// Whether the reader, not the card, answers this command
    pub const fn is_pseudo(&self) -> bool {
        self.cla == CLA_PSEUDO
    }

    /// Serialize, failing when the data field needs an extended Lc
    pub fn to_bytes(&self) -> Result<Bytes, Error> {
        let data = self.data.as_deref().unwrap_or_default();
        let mut buffer = BytesMut::with_capacity(4 + 1 + data.len() + 1);
        buffer.put_slice(&[self.cla, self.ins, self.p1, self.p2]);

        if self.data.is_some() {
            let lc = u8::try_from(data.len()).map_err(|_| Error::CommandDataTooLong(data.len()))?;
            buffer.put_u8(lc);
            buffer.put_slice(data);
        }
        if let Some(le) = self.le {
            buffer.put_u8(le);
        }

        Ok(buffer.freeze())
    }

    /// Parse a short APDU
    ///
    /// A lone byte after the header is Le. Otherwise it is Lc, and at most
    /// one byte may follow the data field.
    pub fn from_bytes(raw: &[u8]) -> Result<Self, Error> {
        let invalid = || Error::InvalidCommandLength(raw.len());
        let [cla, ins, p1, p2, body @ ..] = raw else {
            return Err(invalid());
        };
        let mut command = Self::new(*cla, *ins, *p1, *p2);

        match body {
            [] => {}
            [le] => command.le = Some(*le),
            [lc, rest @ ..] => {
                let lc = usize::from(*lc);
                if rest.len() < lc || rest.len() > lc + 1 {
                    return Err(invalid());
                }
                let (data, le) = rest.split_at(lc);
                if lc > 0 {
                    command.data = Some(Bytes::copy_from_slice(data));
                }
                command.le = le.first().copied();
            }
        }

        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_serialization() {
        let select = Command::new(0x00, 0xA4, 0x04, 0x00)
            .with_data(Bytes::from_static(b"1TIC.ICA"))
            .with_le(0x00);
        let mut expected = vec![0x00, 0xA4, 0x04, 0x00, 0x08];
        expected.extend_from_slice(b"1TIC.ICA");
        expected.push(0x00);
        assert_eq!(select.to_bytes().unwrap().as_ref(), expected.as_slice());
    }

    #[test]
    fn test_pseudo_commands() {
        let uid = Command::pseudo(0xCA, 0x00, 0x00).with_le(0x00);
        assert!(uid.is_pseudo());
        assert_eq!(uid.to_bytes().unwrap().as_ref(), &[0xFF, 0xCA, 0x00, 0x00, 0x00]);

        let auth = Command::pseudo(0x86, 0x00, 0x00).with_data(vec![0x01, 0x00, 0x04, 0x60, 0x00]);
        assert_eq!(
            auth.to_bytes().unwrap().as_ref(),
            &[0xFF, 0x86, 0x00, 0x00, 0x05, 0x01, 0x00, 0x04, 0x60, 0x00]
        );
    }

    #[test]
    fn test_oversized_data_is_rejected() {
        let cmd = Command::new(0x90, 0x3D, 0x00, 0x00).with_data(vec![0u8; 300]);
        assert_eq!(cmd.to_bytes(), Err(Error::CommandDataTooLong(300)));
    }

    #[test]
    fn test_command_from_bytes() {
        let cmd = Command::from_bytes(&[0x00, 0xA4, 0x04, 0x00]).unwrap();
        assert_eq!((cmd.cla, cmd.ins, cmd.p1, cmd.p2), (0x00, 0xA4, 0x04, 0x00));
        assert!(cmd.data.is_none());
        assert!(cmd.le.is_none());

        let cmd = Command::from_bytes(&[0x90, 0x6A, 0x00, 0x00, 0x00]).unwrap();
        assert!(cmd.data.is_none());
        assert_eq!(cmd.le, Some(0));

        let cmd = Command::from_bytes(&[0x00, 0xA4, 0x04, 0x00, 0x03, 0x01, 0x02, 0x03]).unwrap();
        assert_eq!(cmd.data.as_deref(), Some(&[0x01, 0x02, 0x03][..]));
        assert!(cmd.le.is_none());

        let cmd =
            Command::from_bytes(&[0x00, 0xA4, 0x04, 0x00, 0x03, 0x01, 0x02, 0x03, 0xFF]).unwrap();
        assert_eq!(cmd.le, Some(0xFF));

        assert!(Command::from_bytes(&[0x00, 0xA4, 0x04]).is_err());
        assert!(Command::from_bytes(&[0x00, 0xA4, 0x04, 0x00, 0x05, 0x01]).is_err());
        assert!(Command::from_bytes(&[0x00, 0xA4, 0x04, 0x00, 0x01, 0x01, 0x00, 0x00]).is_err());
    }
}
