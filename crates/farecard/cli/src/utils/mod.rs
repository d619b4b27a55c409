//! Utility functions and types for the farecard CLI

pub mod display;
pub mod feedback;
pub mod output;
pub mod reader;

use std::error::Error;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use farecard_reader::card::classic::ClassicKeys;
use tracing::debug;

/// Load MIFARE Classic keys from a JSON file
pub fn load_keys(path: &Path) -> Result<ClassicKeys, Box<dyn Error>> {
    let file = File::open(path).map_err(|e| format!("Cannot open key file {}: {e}", path.display()))?;
    let keys: ClassicKeys = serde_json::from_reader(BufReader::new(file))?;
    debug!(
        sectors = keys.sectors.len(),
        defaults = keys.include_defaults,
        "Loaded Classic keys"
    );
    Ok(keys)
}
