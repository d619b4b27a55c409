//! Sony FeliCa (NFC Forum Type 3)
//!
//! A card holds one or more systems, each with its own IDm and a set of
//! services. Every system is polled, its services enumerated, and the
//! services readable without a key are read block by block until the card
//! refuses. Services behind a key are listed without data.

mod link;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::constants::felica::WILDCARD_SYSTEM;
use crate::{
    DumpContext, DumpOutcome, FamilyDecoder, Result, serde_hex, snapshot::FamilyPayload,
    transceiver::Transceiver,
};
use link::{FelicaLink, Idm};

/// Bytes per block
pub const BLOCK_SIZE: usize = 16;

/// Services checked with Request Service when the card cannot be searched
///
/// FeliCa Lite read-only area, then the common transit history and
/// attribute services.
pub const KNOWN_SERVICES: [u16; 4] = [0x000B, 0x008B, 0x090F, 0x108F];

/// One 16-byte block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FelicaBlock {
    /// Block number within the service
    pub index: u8,
    /// Block contents
    #[serde(with = "serde_hex")]
    pub data: Vec<u8>,
}

/// A service of one system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FelicaService {
    /// Service code, attribute bits included
    pub code: u16,
    /// Blocks read from 0, empty when the service needs a key
    pub blocks: Vec<FelicaBlock>,
}

impl FelicaService {
    /// The attribute allows reading without a key
    pub const fn is_open(code: u16) -> bool {
        code & 0x0001 == 0x0001
    }
}

/// One system of the card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FelicaSystem {
    /// System code
    pub code: u16,
    /// IDm the card uses for this system
    #[serde(with = "serde_hex")]
    pub idm: Vec<u8>,
    /// Services found, in card order
    pub services: Vec<FelicaService>,
}

impl FelicaSystem {
    /// Service by code
    pub fn service(&self, code: u16) -> Option<&FelicaService> {
        self.services.iter().find(|s| s.code == code)
    }
}

/// Raw contents of a FeliCa card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FelicaCard {
    /// IDm answered to the wildcard poll
    #[serde(with = "serde_hex")]
    pub idm: Vec<u8>,
    /// Manufacture parameter
    #[serde(with = "serde_hex")]
    pub pmm: Vec<u8>,
    /// Systems in the order the card lists them
    pub systems: Vec<FelicaSystem>,
}

impl FelicaCard {
    /// System by code
    pub fn system(&self, code: u16) -> Option<&FelicaSystem> {
        self.systems.iter().find(|s| s.code == code)
    }
}

/// Decoder for FeliCa cards
#[derive(Debug, Clone, Copy, Default)]
pub struct FelicaDecoder;

impl FamilyDecoder for FelicaDecoder {
    fn name(&self) -> &'static str {
        "felica"
    }

    fn dump(
        &self,
        transceiver: &mut dyn Transceiver,
        context: &mut DumpContext<'_>,
    ) -> Result<DumpOutcome> {
        context.checkpoint()?;
        let Some(mut link) = FelicaLink::open(transceiver)? else {
            debug!("Reader has no transparent session, cannot talk FeliCa");
            return Ok(DumpOutcome::NotApplicable);
        };

        let outcome = read_card(&mut link, context);
        if outcome.is_ok() {
            link.close()?;
        }
        outcome
    }
}

fn read_card(link: &mut FelicaLink<'_>, context: &mut DumpContext<'_>) -> Result<DumpOutcome> {
    let Some(card) = link.poll(WILDCARD_SYSTEM)? else {
        debug!("No answer to Polling");
        return Ok(DumpOutcome::NotApplicable);
    };
    context.status("Reading FeliCa card");

    let codes = match link.system_codes(&card.idm)? {
        Some(codes) if !codes.is_empty() => codes,
        _ => vec![card.system_code.unwrap_or(WILDCARD_SYSTEM)],
    };
    info!(systems = codes.len(), "FeliCa systems");

    let mut systems = Vec::with_capacity(codes.len());
    for (i, &code) in codes.iter().enumerate() {
        context.checkpoint()?;
        context.progress(i, codes.len());

        let Some(polled) = link.poll(code)? else {
            debug!(system = code, "System did not answer Polling");
            continue;
        };
        systems.push(read_system(link, context, code, &polled.idm)?);
    }
    context.progress(codes.len(), codes.len());

    Ok(DumpOutcome::Dumped(FamilyPayload::Felica(FelicaCard {
        idm: card.idm.to_vec(),
        pmm: card.pmm.to_vec(),
        systems,
    })))
}

fn read_system(
    link: &mut FelicaLink<'_>,
    context: &DumpContext<'_>,
    code: u16,
    idm: &Idm,
) -> Result<FelicaSystem> {
    let mut codes = link.search_services(idm)?;
    if codes.is_empty() {
        debug!(system = code, "Service search unanswered, checking known services");
        codes = link.existing_services(idm, &KNOWN_SERVICES)?;
    }

    let mut services = Vec::with_capacity(codes.len());
    for service in codes {
        let mut blocks = Vec::new();
        if FelicaService::is_open(service) {
            for index in 0..=u8::MAX {
                context.checkpoint()?;
                let Some(data) = link.read_block(idm, service, index)? else {
                    break;
                };
                blocks.push(FelicaBlock { index, data });
            }
        }
        debug!(system = code, service, blocks = blocks.len(), "Service read");
        services.push(FelicaService {
            code: service,
            blocks,
        });
    }

    Ok(FelicaSystem {
        code,
        idm: idm.to_vec(),
        services,
    })
}
