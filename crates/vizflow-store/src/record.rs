use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset};

use crate::Result;

/// An entity persisted as one file in a shard tree.
pub trait Record: Clone {
    /// Human-readable kind, used in logs.
    const KIND: &'static str;
    /// File extension of stored records, without the dot.
    const EXTENSION: &'static str;
    /// Top-level header key holding the identifier.
    const ID_KEY: &'static str = "id";
    /// Top-level header key holding the index timestamp.
    const TIMESTAMP_KEY: &'static str;

    fn id(&self) -> &str;

    /// Timestamp recorded in the index when the record is first stored.
    fn timestamp(&self) -> DateTime<FixedOffset>;

    fn encode(&self) -> Result<String>;

    fn decode(text: &str) -> Result<Self>;
}

/// Write through a sibling temp file and rename into place, so readers never
/// observe a half-written record.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = temp_path(path);
    {
        let mut file = File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}
