use crate::error::FetchError;
use crate::utils::constants::{DEFAULT_EXPECTED_ENTRY, MAX_ENTRY_BYTES};
use std::io::{Cursor, Read};
use zip::ZipArchive;

/// Pulls the observation table out of the provider's zip body, in memory.
pub struct ArchiveExtractor {
    expected_entry: String,
    max_entry_bytes: u64,
}

impl ArchiveExtractor {
    pub fn new(expected_entry: impl Into<String>) -> Self {
        Self {
            expected_entry: expected_entry.into(),
            max_entry_bytes: MAX_ENTRY_BYTES,
        }
    }

    pub fn with_max_entry_bytes(mut self, max_entry_bytes: u64) -> Self {
        self.max_entry_bytes = max_entry_bytes;
        self
    }

    pub fn extract(&self, body: &[u8]) -> Result<Vec<u8>, FetchError> {
        let mut archive = ZipArchive::new(Cursor::new(body))?;

        let names: Vec<String> = archive.file_names().map(str::to_string).collect();
        let mut entry = match archive.by_name(&self.expected_entry) {
            Ok(entry) => entry,
            Err(zip::result::ZipError::FileNotFound) => {
                return Err(FetchError::MalformedArchive(format!(
                    "Entry '{}' not found (archive contains: [{}])",
                    self.expected_entry,
                    names.join(", ")
                )));
            }
            Err(e) => return Err(e.into()),
        };

        // Guard against entries that inflate far beyond any real snapshot
        let mut contents = Vec::with_capacity(entry.size().min(self.max_entry_bytes) as usize);
        (&mut entry)
            .take(self.max_entry_bytes + 1)
            .read_to_end(&mut contents)
            .map_err(|e| FetchError::MalformedArchive(format!("Cannot inflate entry: {}", e)))?;

        if contents.len() as u64 > self.max_entry_bytes {
            return Err(FetchError::MalformedArchive(format!(
                "Entry '{}' exceeds {} bytes",
                self.expected_entry, self.max_entry_bytes
            )));
        }

        Ok(contents)
    }
}

impl Default for ArchiveExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_EXPECTED_ENTRY)
    }
}
