//! Common test utilities for PC/SC hardware tests
//!
//! These tests need a reader with a card on it and skip otherwise.

use farecard_apdu_transport_pcsc::{PcscConfig, PcscDeviceManager, PcscTransport, ReaderSelection};

/// Get a connected transport for the only reader with a card
pub fn get_test_transport() -> Option<PcscTransport> {
    let manager = PcscDeviceManager::new().ok()?;
    let mut transport = manager
        .open_selected(&ReaderSelection::default(), PcscConfig::default())
        .ok()?;
    transport.connect().ok()?;
    Some(transport)
}
