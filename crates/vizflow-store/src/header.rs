//! Record header extraction.
//!
//! Reconciliation needs the identifier and timestamp of files it finds on
//! disk without an index row. Extractors read only the leading header fields
//! and stop, so a partially written record still yields an identity.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use chrono::{DateTime, FixedOffset};
use tracing::debug;
use uuid::Uuid;

use crate::Result;
use crate::clock::{now, parse_timestamp};

/// Lines scanned before giving up on a header.
const MAX_HEADER_LINES: usize = 32;

/// Identity of a stored record as read from its header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordHeader {
    pub id: String,
    pub timestamp: DateTime<FixedOffset>,
}

impl RecordHeader {
    /// Placeholder identity for a file whose header cannot be read:
    /// the all-zero identifier, stamped now.
    pub fn sentinel() -> Self {
        Self {
            id: sentinel_id(),
            timestamp: now(),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.id == sentinel_id()
    }
}

pub fn sentinel_id() -> String {
    Uuid::nil().to_string()
}

/// Reads a record's identity from its file.
///
/// Implementations should degrade a missing or garbled header to
/// [`RecordHeader::sentinel`]. An `Err` means the extractor itself failed;
/// the index logs it and falls back to the sentinel.
pub trait HeaderExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<RecordHeader>;
}

impl<F> HeaderExtractor for F
where
    F: Fn(&Path) -> Result<RecordHeader> + Send + Sync,
{
    fn extract(&self, path: &Path) -> Result<RecordHeader> {
        self(path)
    }
}

/// Line-oriented header reader for YAML documents whose identifier and
/// timestamp are top-level scalar keys near the start of the file.
#[derive(Debug, Clone, Copy)]
pub struct YamlHeaderReader {
    id_key: &'static str,
    timestamp_key: &'static str,
}

impl YamlHeaderReader {
    pub const fn new(id_key: &'static str, timestamp_key: &'static str) -> Self {
        Self {
            id_key,
            timestamp_key,
        }
    }

    fn scan(&self, path: &Path) -> std::io::Result<Option<RecordHeader>> {
        let reader = BufReader::new(File::open(path)?);
        let mut id = None;
        let mut timestamp = None;

        for line in reader.lines().take(MAX_HEADER_LINES) {
            let line = line?;
            // Nested keys are indented; only top-level ones count.
            if line.starts_with(char::is_whitespace) {
                continue;
            }
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = unquote(value);
            if key == self.id_key && !value.is_empty() {
                id = Some(value.to_string());
            } else if key == self.timestamp_key {
                timestamp = parse_timestamp(value);
                if timestamp.is_none() {
                    return Ok(None);
                }
            }
            if let (Some(id), Some(timestamp)) = (&id, timestamp) {
                return Ok(Some(RecordHeader {
                    id: id.clone(),
                    timestamp,
                }));
            }
        }
        Ok(None)
    }
}

impl HeaderExtractor for YamlHeaderReader {
    fn extract(&self, path: &Path) -> Result<RecordHeader> {
        match self.scan(path) {
            Ok(Some(header)) => Ok(header),
            Ok(None) => {
                debug!(path = %path.display(), "No usable header, using sentinel");
                Ok(RecordHeader::sentinel())
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Unreadable header, using sentinel");
                Ok(RecordHeader::sentinel())
            }
        }
    }
}

fn unquote(value: &str) -> &str {
    let value = value.trim();
    for quote in ['\'', '"'] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &tempfile::TempDir, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    const READER: YamlHeaderReader = YamlHeaderReader::new("id", "updated");

    #[test]
    fn test_reads_top_level_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "00.yaml",
            "id: abc-123\nname: demo\ncreated: 2025-01-01T00:00:00+00:00\nupdated: '2025-01-02T03:04:05+09:00'\nnodes:\n- index: 1\n  id: nested\n",
        );
        let header = READER.extract(&path).unwrap();
        assert_eq!(header.id, "abc-123");
        assert_eq!(header.timestamp.to_rfc3339(), "2025-01-02T03:04:05+09:00");
    }

    #[test]
    fn test_ignores_indented_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "00.yaml",
            "nodes:\n  id: nested\nupdated: 2025-01-02T03:04:05Z\n",
        );
        assert!(READER.extract(&path).unwrap().is_sentinel());
    }

    #[test]
    fn test_stops_after_header() {
        let dir = tempfile::tempdir().unwrap();
        // Garbage after the header does not matter.
        let path = write(
            &dir,
            "00.yaml",
            "id: x\nupdated: 2025-01-02T03:04:05Z\n\u{0}\u{0}: [unterminated\n",
        );
        assert_eq!(READER.extract(&path).unwrap().id, "x");
    }

    #[test]
    fn test_missing_file_degrades_to_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let header = READER.extract(&dir.path().join("nope.yaml")).unwrap();
        assert!(header.is_sentinel());
        assert_eq!(header.id, "00000000-0000-0000-0000-000000000000");
    }

    #[test]
    fn test_bad_timestamp_degrades_to_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "00.yaml", "id: x\nupdated: soon\n");
        assert!(READER.extract(&path).unwrap().is_sentinel());
    }

    #[test]
    fn test_closure_extractor() {
        let extractor = |_: &Path| -> Result<RecordHeader> {
            Ok(RecordHeader {
                id: "fixed".into(),
                timestamp: now(),
            })
        };
        assert_eq!(extractor.extract(Path::new("x")).unwrap().id, "fixed");
    }
}
