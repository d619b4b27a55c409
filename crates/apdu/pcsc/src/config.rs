//! Connection settings and reader selection

use pcsc::{Protocols, ShareMode as PcscShareMode};

/// Name fragment of security keys that expose a CCID interface
///
/// They show up as readers holding a card and are never transit cards.
pub const SECURITY_KEY_FRAGMENT: &str = "yubi";

/// How the card is shared with other PC/SC clients
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ShareMode {
    /// Other applications may talk to the card between our commands
    #[default]
    Shared,
    /// Hold the card for the whole session
    Exclusive,
}

impl From<ShareMode> for PcscShareMode {
    fn from(mode: ShareMode) -> Self {
        match mode {
            ShareMode::Shared => Self::Shared,
            ShareMode::Exclusive => Self::Exclusive,
        }
    }
}

/// Which reader to dump from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderSelection {
    /// The reader with exactly this name
    Named(String),
    /// The only reader holding a card, once readers whose name contains one
    /// of `ignore` (case-insensitive) are left out
    SoleCard {
        /// Reader name fragments to leave out
        ignore: Vec<String>,
    },
}

impl ReaderSelection {
    /// `Named` when a name is given, `SoleCard` skipping security keys otherwise
    pub fn from_name(name: Option<&str>) -> Self {
        match name {
            Some(name) => Self::Named(name.to_string()),
            None => Self::default(),
        }
    }
}

impl Default for ReaderSelection {
    fn default() -> Self {
        Self::SoleCard {
            ignore: vec![SECURITY_KEY_FRAGMENT.to_string()],
        }
    }
}

/// Settings applied when connecting to the card
#[derive(Debug, Clone, Copy)]
pub struct PcscConfig {
    /// Sharing mode passed to `SCardConnect`
    pub share_mode: ShareMode,
    /// Acceptable transmission protocols
    pub protocols: Protocols,
    /// Reconnect and retry once when the reader reports the card was reset
    pub reconnect_on_reset: bool,
}

impl Default for PcscConfig {
    fn default() -> Self {
        Self {
            share_mode: ShareMode::Shared,
            protocols: Protocols::ANY,
            reconnect_on_reset: true,
        }
    }
}

impl PcscConfig {
    /// Set the sharing mode
    pub const fn with_share_mode(mut self, mode: ShareMode) -> Self {
        self.share_mode = mode;
        self
    }

    /// Set the acceptable protocols
    pub const fn with_protocols(mut self, protocols: Protocols) -> Self {
        self.protocols = protocols;
        self
    }

    /// Set whether a reset card is reconnected
    pub const fn with_reconnect_on_reset(mut self, reconnect: bool) -> Self {
        self.reconnect_on_reset = reconnect;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_from_name() {
        assert_eq!(
            ReaderSelection::from_name(Some("ACS ACR122U 00 00")),
            ReaderSelection::Named("ACS ACR122U 00 00".into())
        );
        assert_eq!(
            ReaderSelection::from_name(None),
            ReaderSelection::SoleCard {
                ignore: vec!["yubi".into()]
            }
        );
    }

    #[test]
    fn test_config_builder() {
        let config = PcscConfig::default()
            .with_share_mode(ShareMode::Exclusive)
            .with_protocols(Protocols::T1)
            .with_reconnect_on_reset(false);
        assert_eq!(config.share_mode, ShareMode::Exclusive);
        assert_eq!(config.protocols, Protocols::T1);
        assert!(!config.reconnect_on_reset);
    }
}
