use colored::Colorize;
use farecard_apdu_transport_pcsc::{
    PcscDeviceManager, PcscError, PcscReader, ReaderSelection, SECURITY_KEY_FRAGMENT,
};

/// List all available readers
pub fn list_readers(manager: &PcscDeviceManager) -> Result<(), Box<dyn std::error::Error>> {
    let readers = manager.list_readers()?;
    print_readers(&readers);
    Ok(())
}

fn print_readers(readers: &[PcscReader]) {
    let ignored = [SECURITY_KEY_FRAGMENT.to_string()];
    println!("Found {} card reader(s):", readers.len());
    for (i, reader) in readers.iter().enumerate() {
        let status = if reader.has_card() {
            "card present".green()
        } else {
            "card missing".normal()
        };
        let note = if reader.matches_any(&ignored) { " (ignored)" } else { "" };
        println!("#{i}: {} ({status}){note}", reader.name());
    }
}

/// Pick the reader to dump from
///
/// With a name, that reader. Otherwise the single reader holding a card that
/// is not a security key; anything else lists the readers and fails.
pub fn select_reader(
    manager: &PcscDeviceManager,
    name: Option<&str>,
) -> Result<PcscReader, Box<dyn std::error::Error>> {
    match manager.select_reader(&ReaderSelection::from_name(name)) {
        Ok(reader) => Ok(reader),
        Err(e @ (PcscError::ReaderNotFound(_) | PcscError::AmbiguousReader(_))) => {
            if let Ok(readers) = manager.list_readers() {
                print_readers(&readers);
            }
            match e {
                PcscError::AmbiguousReader(_) => Err(format!("{e}; pick one with --reader").into()),
                e => Err(e.into()),
            }
        }
        Err(e) => Err(e.into()),
    }
}
