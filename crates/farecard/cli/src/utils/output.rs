//! Where a dump is written

use std::error::Error;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use farecard_reader::CardSnapshot;

/// Validated output location
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Create a file with a generated name in this directory
    Directory(PathBuf),
    /// Create exactly this file
    File(PathBuf),
}

impl OutputTarget {
    /// Accept an existing directory, or a file that does not exist yet in an
    /// existing directory
    pub fn parse(path: &Path) -> Result<Self, Box<dyn Error>> {
        if path.is_dir() {
            return Ok(Self::Directory(path.to_path_buf()));
        }
        if path.exists() {
            return Err(format!("File already exists: {}", path.display()).into());
        }

        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        if !parent.is_dir() {
            return Err(format!("Parent must be a directory that exists: {}", path.display()).into());
        }
        Ok(Self::File(path.to_path_buf()))
    }

    /// Path the snapshot will be written to
    pub fn resolve(&self, snapshot: &CardSnapshot) -> PathBuf {
        match self {
            Self::Directory(dir) => dir.join(file_name(snapshot)),
            Self::File(path) => path.clone(),
        }
    }

    /// Write `snapshot` as JSON, never overwriting an existing file
    pub fn write(&self, snapshot: &CardSnapshot) -> Result<PathBuf, Box<dyn Error>> {
        let path = self.resolve(snapshot);
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| format!("Cannot create {}: {e}", path.display()))?;

        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, snapshot)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(path)
    }
}

/// `farecard-<uid>-<timestamp>.json`
fn file_name(snapshot: &CardSnapshot) -> String {
    let uid = if snapshot.identifier.is_empty() {
        "unknown".to_string()
    } else {
        snapshot.identifier_hex()
    };
    format!(
        "farecard-{uid}-{}.json",
        snapshot.scanned_at.format("%Y%m%d-%H%M%S")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use farecard_reader::{FamilyPayload, card::ultralight::UltralightCard};

    #[test]
    fn test_targets() {
        let dir = std::env::temp_dir();
        assert_eq!(OutputTarget::parse(&dir).unwrap(), OutputTarget::Directory(dir.clone()));

        let fresh = dir.join("farecard-output-test-does-not-exist.json");
        assert_eq!(OutputTarget::parse(&fresh).unwrap(), OutputTarget::File(fresh));

        assert!(OutputTarget::parse(&dir.join("missing-parent").join("dump.json")).is_err());
    }

    #[test]
    fn test_generated_name() {
        let snapshot = CardSnapshot::new(
            vec![0x04, 0xA2],
            FamilyPayload::Ultralight(UltralightCard::default()),
        );
        let name = file_name(&snapshot);
        assert!(name.starts_with("farecard-04A2-"));
        assert!(name.ends_with(".json"));

        let anonymous = CardSnapshot::new(Vec::new(), FamilyPayload::Ultralight(UltralightCard::default()));
        assert!(file_name(&anonymous).starts_with("farecard-unknown-"));
    }
}
