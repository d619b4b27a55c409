//! Device manager for PC/SC operations

use pcsc::{Context, Scope};
use tracing::debug;

use crate::config::{PcscConfig, ReaderSelection};
use crate::error::PcscError;
use crate::reader::PcscReader;
use crate::transport::PcscTransport;

/// Manager for PC/SC device operations
#[allow(missing_debug_implementations)]
pub struct PcscDeviceManager {
    /// PC/SC context
    context: Context,
}

impl PcscDeviceManager {
    /// Create a new PC/SC device manager
    pub fn new() -> Result<Self, PcscError> {
        let context = Context::establish(Scope::User)?;
        Ok(Self { context })
    }

    /// List all available card readers
    pub fn list_readers(&self) -> Result<Vec<PcscReader>, PcscError> {
        let readers = match self.context.list_readers_owned() {
            Ok(readers) => readers,
            Err(pcsc::Error::NoReadersAvailable) => return Err(PcscError::NoReadersAvailable),
            Err(e) => return Err(e.into()),
        };
        if readers.is_empty() {
            return Err(PcscError::NoReadersAvailable);
        }

        let mut result = Vec::with_capacity(readers.len());

        for reader_name in readers {
            let mut reader_states = vec![pcsc::ReaderState::new(
                reader_name.as_c_str(),
                pcsc::State::UNAWARE,
            )];

            match self.context.get_status_change(None, &mut reader_states) {
                Ok(()) => result.push(PcscReader::from_reader_state(&reader_states[0])),
                Err(e) => {
                    // Unknown state counts as empty
                    debug!(error = ?e, "Could not query reader state");
                    result.push(PcscReader::new(reader_name.to_string_lossy().into_owned(), None));
                }
            }
        }

        Ok(result)
    }

    /// Open a transport on a specific reader
    ///
    /// The card is not connected until [`PcscTransport::connect`] is called.
    pub fn open_reader(&self, reader_name: &str) -> Result<PcscTransport, PcscError> {
        self.open_reader_with_config(reader_name, PcscConfig::default())
    }

    /// Open a transport on a specific reader with custom configuration
    pub fn open_reader_with_config(
        &self,
        reader_name: &str,
        config: PcscConfig,
    ) -> Result<PcscTransport, PcscError> {
        PcscTransport::new(self.context.clone(), reader_name, config)
    }

    /// Pick the reader described by `selection`
    pub fn select_reader(&self, selection: &ReaderSelection) -> Result<PcscReader, PcscError> {
        let readers = self.list_readers()?;
        select_from(readers, selection)
    }

    /// Open a transport on the reader picked by `selection`
    pub fn open_selected(
        &self,
        selection: &ReaderSelection,
        config: PcscConfig,
    ) -> Result<PcscTransport, PcscError> {
        let reader = self.select_reader(selection)?;
        self.open_reader_with_config(reader.name(), config)
    }
}

fn select_from(readers: Vec<PcscReader>, selection: &ReaderSelection) -> Result<PcscReader, PcscError> {
    match selection {
        ReaderSelection::Named(name) => readers
            .into_iter()
            .find(|r| r.name() == name)
            .ok_or_else(|| PcscError::ReaderNotFound(name.clone())),
        ReaderSelection::SoleCard { ignore } => {
            let mut usable: Vec<PcscReader> = readers
                .into_iter()
                .filter(|r| r.has_card() && !r.matches_any(ignore))
                .collect();
            match usable.len() {
                1 => Ok(usable.remove(0)),
                n => {
                    debug!(candidates = n, "No single reader to pick");
                    Err(PcscError::AmbiguousReader(n))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn readers() -> Vec<PcscReader> {
        vec![
            PcscReader::new("ACS ACR122U PICC Interface 00 00".into(), Some(vec![0x3B, 0x8F])),
            PcscReader::new("Yubico YubiKey CCID 00 00".into(), Some(vec![0x3B, 0xFD])),
            PcscReader::new("Generic Contact Reader 01 00".into(), None),
        ]
    }

    #[test]
    fn test_sole_card_skips_security_keys() {
        let reader = select_from(readers(), &ReaderSelection::default()).unwrap();
        assert_eq!(reader.name(), "ACS ACR122U PICC Interface 00 00");
    }

    #[test]
    fn test_sole_card_needs_exactly_one() {
        let none = ReaderSelection::SoleCard {
            ignore: vec!["acs".into(), "yubi".into()],
        };
        assert!(matches!(select_from(readers(), &none), Err(PcscError::AmbiguousReader(0))));

        let both = ReaderSelection::SoleCard { ignore: Vec::new() };
        assert!(matches!(select_from(readers(), &both), Err(PcscError::AmbiguousReader(2))));
    }

    #[test]
    fn test_named_reader() {
        let named = ReaderSelection::Named("Generic Contact Reader 01 00".into());
        let reader = select_from(readers(), &named).unwrap();
        assert!(!reader.has_card());

        let missing = ReaderSelection::Named("Nope".into());
        assert!(matches!(
            select_from(readers(), &missing),
            Err(PcscError::ReaderNotFound(name)) if name == "Nope"
        ));
    }
}
