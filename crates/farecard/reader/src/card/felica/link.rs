//! FeliCa frames through a PC/SC transparent session
//!
//! The reader activates a FeliCa card but does not speak its command set, so
//! every frame travels inside a transparent exchange (`FF C2 00 01`) as a
//! TRANSCEIVE data object and comes back as a card response object.

use bytes::{BufMut, BytesMut};
use farecard_apdu_core::Command;
use iso7816_tlv::simple::{Tag, Tlv};
use tracing::{debug, trace};

use super::BLOCK_SIZE;
use crate::constants::felica::*;
use crate::constants::pcsc::{INS_TRANSPARENT, TRANSPARENT_EXCHANGE, TRANSPARENT_MANAGE, tag};
use crate::{Error, Result, transceiver::Transceiver};

/// Manufacture ID, the card identifier within one system
pub(crate) type Idm = [u8; 8];

/// Answer to a Polling command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Polled {
    pub(crate) idm: Idm,
    /// Manufacture parameter
    pub(crate) pmm: [u8; 8],
    /// System code, when the card honoured the request code
    pub(crate) system_code: Option<u16>,
}

/// Upper bound on Search Service Code indices walked per system
const MAX_SEARCH_INDEX: u16 = 0x0400;

fn data_object(tag: u8, value: &[u8]) -> Result<Vec<u8>> {
    let encode = |e: iso7816_tlv::TlvError| Error::protocol("encode data object", e.to_string());
    let tlv = Tlv::new(Tag::try_from(tag).map_err(encode)?, value.to_vec()).map_err(encode)?;
    Ok(tlv.to_vec())
}

/// A FeliCa frame: length byte, command code, body
fn frame(code: u8, body: &[u8]) -> Result<Vec<u8>> {
    let len = u8::try_from(body.len() + 2)
        .map_err(|_| Error::protocol("encode frame", format!("{} byte body", body.len())))?;
    let mut out = BytesMut::with_capacity(body.len() + 2);
    out.put_u8(len);
    out.put_u8(code);
    out.put_slice(body);
    Ok(out.to_vec())
}

/// Command channel to a FeliCa card
#[derive(Debug)]
pub(crate) struct FelicaLink<'t> {
    transceiver: &'t mut dyn Transceiver,
}

impl<'t> FelicaLink<'t> {
    /// Start a transparent session, `None` when the reader has no such mode
    pub(crate) fn open(transceiver: &'t mut dyn Transceiver) -> Result<Option<Self>> {
        let mut link = Self { transceiver };
        if link.manage(tag::START_SESSION)? {
            Ok(Some(link))
        } else {
            Ok(None)
        }
    }

    /// End the session; the card stays in the field
    pub(crate) fn close(mut self) -> Result<()> {
        if !self.manage(tag::END_SESSION)? {
            debug!("Reader refused to end the transparent session");
        }
        Ok(())
    }

    fn manage(&mut self, object: u8) -> Result<bool> {
        let command = Command::pseudo(INS_TRANSPARENT, 0x00, TRANSPARENT_MANAGE)
            .with_data(data_object(object, &[])?)
            .with_le(0x00);
        let response = self.transceiver.transmit(&command)?;
        if !response.is_success() {
            debug!(object, status = %response.status(), "Transparent session command refused");
        }
        Ok(response.is_success())
    }

    /// Send one frame, returning the reply body after the response code
    ///
    /// `None` when the card did not answer.
    fn request(&mut self, code: u8, body: &[u8]) -> Result<Option<Vec<u8>>> {
        let step = format!("FeliCa command {code:02X}");
        let command = Command::pseudo(INS_TRANSPARENT, 0x00, TRANSPARENT_EXCHANGE)
            .with_data(data_object(tag::TRANSCEIVE, &frame(code, body)?)?)
            .with_le(0x00);
        let response = self.transceiver.transmit(&command).map_err(|e| e.at_step(&step))?;
        if !response.is_success() {
            debug!(code, status = %response.status(), "Transparent exchange refused");
            return Ok(None);
        }

        let mut reply = None;
        for object in Tlv::parse_all(response.data()) {
            match Into::<u8>::into(object.tag()) {
                tag::ERROR_STATUS => match object.value() {
                    [_, 0x90, 0x00] => {}
                    status => {
                        trace!(code, status = %hex::encode_upper(status), "Card did not answer");
                        return Ok(None);
                    }
                },
                tag::CARD_RESPONSE => reply = Some(object.value().to_vec()),
                _ => {}
            }
        }
        let Some(reply) = reply else {
            trace!(code, "No card response object");
            return Ok(None);
        };

        match reply.as_slice() {
            [len, answer, body @ ..]
                if usize::from(*len) == reply.len() && Some(*answer) == code.checked_add(1) =>
            {
                Ok(Some(body.to_vec()))
            }
            _ => Err(Error::protocol(
                step,
                format!("malformed frame {}", hex::encode_upper(&reply)),
            )),
        }
    }

    /// Reply body addressed to `idm`, with the IDm stripped
    fn addressed(&mut self, code: u8, idm: &Idm, body: &[u8]) -> Result<Option<Vec<u8>>> {
        let mut request = idm.to_vec();
        request.extend_from_slice(body);
        let Some(reply) = self.request(code, &request)? else {
            return Ok(None);
        };
        match reply.split_first_chunk::<8>() {
            Some((answered, rest)) if answered == idm => Ok(Some(rest.to_vec())),
            _ => Err(Error::protocol(
                format!("FeliCa command {code:02X}"),
                "reply from another card",
            )),
        }
    }

    /// Polling, asking for the system code
    pub(crate) fn poll(&mut self, system_code: u16) -> Result<Option<Polled>> {
        let [hi, lo] = system_code.to_be_bytes();
        let Some(reply) = self.request(POLLING, &[hi, lo, REQUEST_CODE_SYSTEM, 0x00])? else {
            return Ok(None);
        };
        let parsed = reply.split_first_chunk::<8>().and_then(|(idm, rest)| {
            rest.split_first_chunk::<8>()
                .map(|(pmm, request_data)| (idm, pmm, request_data))
        });
        let Some((idm, pmm, request_data)) = parsed else {
            return Err(Error::protocol("Polling", format!("{} byte reply", reply.len())));
        };
        let system_code = match request_data {
            [hi, lo] => Some(u16::from_be_bytes([*hi, *lo])),
            _ => None,
        };
        Ok(Some(Polled {
            idm: *idm,
            pmm: *pmm,
            system_code,
        }))
    }

    /// Request System Code, `None` when the card does not support it
    pub(crate) fn system_codes(&mut self, idm: &Idm) -> Result<Option<Vec<u16>>> {
        let Some(reply) = self.addressed(REQUEST_SYSTEM_CODE, idm, &[])? else {
            return Ok(None);
        };
        match reply.split_first() {
            Some((&count, codes)) if codes.len() == usize::from(count) * 2 => Ok(Some(
                codes
                    .chunks_exact(2)
                    .map(|c| u16::from_be_bytes([c[0], c[1]]))
                    .collect(),
            )),
            _ => Err(Error::protocol(
                "Request System Code",
                format!("{} byte reply", reply.len()),
            )),
        }
    }

    /// Search Service Code over every index, areas left out
    ///
    /// Stops at the end marker or when the card stops answering.
    pub(crate) fn search_services(&mut self, idm: &Idm) -> Result<Vec<u16>> {
        let mut services = Vec::new();
        for index in 0..MAX_SEARCH_INDEX {
            let reply = self.addressed(SEARCH_SERVICE_CODE, idm, &index.to_le_bytes())?;
            let Some(reply) = reply else {
                break;
            };
            match reply.as_slice() {
                [0xFF, 0xFF, ..] => break,
                // Area: code and end code
                [_, _, _, _] => {}
                [lo, hi] => services.push(u16::from_le_bytes([*lo, *hi])),
                _ => {
                    return Err(Error::protocol(
                        "Search Service Code",
                        format!("{} byte reply", reply.len()),
                    ));
                }
            }
        }
        Ok(services)
    }

    /// Request Service, keeping the codes the card knows
    pub(crate) fn existing_services(&mut self, idm: &Idm, codes: &[u16]) -> Result<Vec<u16>> {
        let count = u8::try_from(codes.len())
            .map_err(|_| Error::protocol("Request Service", format!("{} services", codes.len())))?;
        let mut body = Vec::with_capacity(1 + codes.len() * 2);
        body.push(count);
        for code in codes {
            body.extend_from_slice(&code.to_le_bytes());
        }

        let Some(reply) = self.addressed(REQUEST_SERVICE, idm, &body)? else {
            return Ok(Vec::new());
        };
        match reply.split_first() {
            Some((&count, versions))
                if usize::from(count) == codes.len() && versions.len() == codes.len() * 2 =>
            {
                Ok(codes
                    .iter()
                    .zip(versions.chunks_exact(2))
                    .filter(|(_, v)| u16::from_le_bytes([v[0], v[1]]) != NO_SUCH_SERVICE)
                    .map(|(code, _)| *code)
                    .collect())
            }
            _ => Err(Error::protocol("Request Service", format!("{} byte reply", reply.len()))),
        }
    }

    /// Read Without Encryption of one block
    ///
    /// `Ok(None)` when the card refuses the block, which ends the service.
    pub(crate) fn read_block(
        &mut self,
        idm: &Idm,
        service: u16,
        block: u8,
    ) -> Result<Option<Vec<u8>>> {
        let [lo, hi] = service.to_le_bytes();
        let body = [0x01, lo, hi, 0x01, 0x80, block];
        let Some(reply) = self.addressed(READ_WITHOUT_ENCRYPTION, idm, &body)? else {
            return Ok(None);
        };
        match reply.as_slice() {
            [0x00, 0x00, 0x01, data @ ..] if data.len() == BLOCK_SIZE => Ok(Some(data.to_vec())),
            [0x00, 0x00, ..] => Err(Error::protocol(
                "Read Without Encryption",
                format!("{} byte reply", reply.len()),
            )),
            [flag1, flag2, ..] => {
                trace!(service, block, flag1, flag2, "Block refused");
                Ok(None)
            }
            _ => Err(Error::protocol(
                "Read Without Encryption",
                format!("{} byte reply", reply.len()),
            )),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::script::*;
    use super::*;
    use crate::{CardFamily, transceiver::ScriptedTransceiver};

    const IDM: &str = "012E4CE46B1A2F01";

    fn opened(transceiver: &mut ScriptedTransceiver) -> FelicaLink<'_> {
        FelicaLink::open(transceiver).unwrap().expect("session started")
    }

    fn idm() -> Idm {
        hex::decode(IDM).unwrap().try_into().unwrap()
    }

    #[test]
    fn test_polling_frame() {
        let mut transceiver = ScriptedTransceiver::new(CardFamily::Felica)
            .reply(SESSION_OK)
            .reply(&card_frame(&format!("14 01 {IDM} 0118E6E6F3C6FF0A 0003")));
        let polled = opened(&mut transceiver).poll(WILDCARD_SYSTEM).unwrap().unwrap();

        assert_eq!(polled.idm, idm());
        assert_eq!(polled.system_code, Some(0x0003));
        assert_eq!(
            transceiver.sent(),
            vec!["FFC2000002810000", "FFC200010895060600FFFF010000"]
        );
    }

    #[test]
    fn test_silent_card_and_refused_session() {
        let mut transceiver = ScriptedTransceiver::new(CardFamily::Felica)
            .reply(SESSION_OK)
            .reply(NO_ANSWER);
        assert_eq!(opened(&mut transceiver).poll(WILDCARD_SYSTEM).unwrap(), None);

        let mut transceiver = ScriptedTransceiver::new(CardFamily::Felica).reply("6A81");
        assert!(FelicaLink::open(&mut transceiver).unwrap().is_none());
    }

    #[test]
    fn test_wrong_response_code_is_protocol_error() {
        let mut transceiver = ScriptedTransceiver::new(CardFamily::Felica)
            .reply(SESSION_OK)
            .reply(&card_frame(&format!("0C 0B {IDM} 0F09")));
        let err = opened(&mut transceiver).system_codes(&idm()).unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[test]
    fn test_search_skips_areas() {
        let mut transceiver = ScriptedTransceiver::new(CardFamily::Felica)
            .reply(SESSION_OK)
            .reply(&card_frame(&format!("0E 0B {IDM} 0000FEFF")))
            .reply(&card_frame(&format!("0C 0B {IDM} 0F09")))
            .reply(&card_frame(&format!("0C 0B {IDM} FFFF")));
        let services = opened(&mut transceiver).search_services(&idm()).unwrap();
        assert_eq!(services, vec![0x090F]);
    }

    #[test]
    fn test_request_service_filters_missing() {
        let mut transceiver = ScriptedTransceiver::new(CardFamily::Felica)
            .reply(SESSION_OK)
            .reply(&card_frame(&format!("0F 03 {IDM} 02 0000 FFFF")));
        let services = opened(&mut transceiver)
            .existing_services(&idm(), &[0x000B, 0x090F])
            .unwrap();
        assert_eq!(services, vec![0x000B]);
    }

    #[test]
    fn test_read_block() {
        let block = "00".repeat(15) + "2A";
        let mut transceiver = ScriptedTransceiver::new(CardFamily::Felica)
            .reply(SESSION_OK)
            .reply(&card_frame(&format!("1D 07 {IDM} 0000 01 {block}")))
            .reply(&card_frame(&format!("0C 07 {IDM} 01A8")));
        let mut link = opened(&mut transceiver);

        let data = link.read_block(&idm(), 0x090F, 0).unwrap().unwrap();
        assert_eq!(data[15], 0x2A);
        assert_eq!(link.read_block(&idm(), 0x090F, 1).unwrap(), None);
    }
}
