//! Dump a card to the terminal and optionally to a JSON file

use std::error::Error;
use std::path::PathBuf;

use farecard_apdu_transport_pcsc::PcscDeviceManager;
use farecard_reader::{
    DecoderRegistry, FamilyPayload, read_card,
    card::{classic::ClassicKeys, iso7816::Iso7816Config},
    transceiver::{PcscTransceiver, PcscTransceiverConfig},
    transit::SchemeRegistry,
};
use tracing::{debug, info};

use crate::utils::{self, display, feedback::PrintFeedback, reader};

/// Options of the dump command
#[derive(Debug)]
pub struct DumpOptions {
    pub reader: Option<String>,
    pub no_uid: bool,
    pub no_parse: bool,
    pub output: Option<PathBuf>,
    pub keys: Option<PathBuf>,
    pub aids: Vec<String>,
}

/// Read the card on the selected reader
pub fn dump_command(manager: &PcscDeviceManager, options: DumpOptions) -> Result<(), Box<dyn Error>> {
    // Validate the output path before touching the card
    let output = options
        .output
        .as_deref()
        .map(utils::output::OutputTarget::parse)
        .transpose()?;

    let keys = match &options.keys {
        Some(path) => utils::load_keys(path)?,
        None => ClassicKeys::default(),
    };
    let mut iso7816 = Iso7816Config::default();
    for aid in &options.aids {
        iso7816 = iso7816.with_application(hex::decode(aid)?);
    }
    let registry = DecoderRegistry::standard_with(keys, iso7816);

    let reader = reader::select_reader(manager, options.reader.as_deref())?;
    println!("Reader: {}", reader.name());
    if !reader.has_card() {
        return Err(format!(
            "Card not present, insert into / move in range of {}",
            reader.name()
        )
        .into());
    }

    let transport = manager.open_reader(reader.name())?;
    let config = PcscTransceiverConfig::default().with_read_uid(!options.no_uid);
    let mut transceiver = PcscTransceiver::new(transport, config);

    let snapshot = read_card(&mut transceiver, &registry, &mut PrintFeedback)?;
    info!(
        identifier = %snapshot.identifier_hex(),
        payload = snapshot.payload.name(),
        "Card read"
    );

    if let Some(target) = output {
        let path = target.write(&snapshot)?;
        println!("Wrote card data to: {}", path.display());
    } else {
        debug!("No output file requested");
    }

    if !options.no_parse {
        display::print_snapshot(&snapshot);
        match SchemeRegistry::new().parse(&snapshot) {
            Some(view) => display::print_transit(&view),
            None if matches!(snapshot.payload, FamilyPayload::Classic(_)) => {
                println!("\nNo transit scheme recognised the card");
            }
            None => {}
        }
    }

    Ok(())
}
