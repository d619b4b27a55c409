//! Snapshot of a reader's state

use pcsc::{ReaderState, State};

/// A PC/SC reader as seen when the readers were listed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcscReader {
    name: String,
    /// ATR of the card on the reader, `None` when empty
    atr: Option<Vec<u8>>,
}

impl PcscReader {
    /// Describe a reader by hand
    pub const fn new(name: String, atr: Option<Vec<u8>>) -> Self {
        Self { name, atr }
    }

    /// Reader name as reported by PC/SC
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether a card was on the reader
    pub const fn has_card(&self) -> bool {
        self.atr.is_some()
    }

    /// ATR of the card
    pub fn atr(&self) -> Option<&[u8]> {
        self.atr.as_deref()
    }

    /// Whether the name contains any of `fragments`, ignoring case
    pub fn matches_any(&self, fragments: &[String]) -> bool {
        let name = self.name.to_lowercase();
        fragments
            .iter()
            .any(|fragment| name.contains(&fragment.to_lowercase()))
    }

    pub(crate) fn from_reader_state(state: &ReaderState) -> Self {
        let flags = state.event_state();
        let present = flags.contains(State::PRESENT) && !flags.contains(State::EMPTY);
        Self {
            name: state.name().to_string_lossy().into_owned(),
            atr: present.then(|| state.atr().to_vec()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_any_ignores_case() {
        let reader = PcscReader::new("Yubico YubiKey OTP+FIDO+CCID 00 00".into(), Some(vec![0x3B]));
        assert!(reader.matches_any(&["yubi".into()]));
        assert!(!reader.matches_any(&["acr122".into()]));
        assert!(!reader.matches_any(&[]));
    }

    #[test]
    fn test_card_presence_follows_atr() {
        assert!(!PcscReader::new("ACS ACR122U".into(), None).has_card());
        assert!(PcscReader::new("ACS ACR122U".into(), Some(vec![0x3B, 0x8F])).has_card());
    }
}
