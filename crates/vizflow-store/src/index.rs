//! Sharded storage index.
//!
//! Records live in a two-level tree of hex-named folders and files:
//!
//! ```text
//! {root}/
//! ├── index.tsv          # relpath \t uuid \t timestamp
//! ├── 00/
//! │   ├── 00.yaml
//! │   └── 01.yaml
//! └── 01/
//!     └── 00.yaml
//! ```
//!
//! `index.tsv` maps each relative path to the identifier stored there. The
//! tree is the source of truth: every open reconciles the index against the
//! files actually present and rewrites it only if they disagree.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset};
use tracing::{debug, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::clock::{format_timestamp, now, parse_timestamp};
use crate::header::{HeaderExtractor, RecordHeader, sentinel_id};
use crate::record::write_atomic;
use crate::{Result, StoreError};

/// Folders per tree, and files per folder.
pub const SHARD_FANOUT: usize = 256;

/// Hard limit on records per store.
pub const CAPACITY: usize = SHARD_FANOUT * SHARD_FANOUT;

pub const INDEX_FILE: &str = "index.tsv";

const INDEX_HEADER: &str = "relpath\tuuid\ttimestamp";

/// One row of the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub relpath: String,
    pub id: String,
    pub timestamp: DateTime<FixedOffset>,
}

/// What reconciliation found on the last open.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Rows read from the index file.
    pub loaded: usize,
    /// Files found on disk without a row.
    pub added: usize,
    /// Rows whose file no longer exists.
    pub dropped: usize,
    /// Rows that could not be parsed or repeated a path.
    pub malformed: usize,
    /// Whether the index file was rewritten.
    pub rewritten: bool,
}

impl ReconcileReport {
    /// No drift between index and tree.
    pub fn is_clean(&self) -> bool {
        self.added == 0 && self.dropped == 0 && self.malformed == 0
    }
}

/// Index over one shard tree.
pub struct StorageIndex {
    root: PathBuf,
    extension: String,
    index_path: PathBuf,
    /// relpath -> (id, timestamp)
    entries: BTreeMap<String, (String, DateTime<FixedOffset>)>,
    /// id -> relpaths, newest first
    by_id: HashMap<String, Vec<String>>,
    extractor: Box<dyn HeaderExtractor>,
    report: ReconcileReport,
}

impl std::fmt::Debug for StorageIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageIndex")
            .field("root", &self.root)
            .field("extension", &self.extension)
            .field("entries", &self.entries.len())
            .field("report", &self.report)
            .finish_non_exhaustive()
    }
}

impl StorageIndex {
    /// Open (or create) the tree at `root` for files ending in `.{extension}`
    /// and reconcile its index.
    pub fn open(
        root: impl Into<PathBuf>,
        extension: &str,
        extractor: impl HeaderExtractor + 'static,
    ) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;

        let mut index = Self {
            index_path: root.join(INDEX_FILE),
            root,
            extension: extension.to_string(),
            entries: BTreeMap::new(),
            by_id: HashMap::new(),
            extractor: Box::new(extractor),
            report: ReconcileReport::default(),
        };
        index.reload()?;
        Ok(index)
    }

    /// Re-read the index file and reconcile it against the tree.
    pub fn reload(&mut self) -> Result<&ReconcileReport> {
        self.entries.clear();
        self.by_id.clear();

        let mut report = ReconcileReport::default();
        self.load_index_file(&mut report)?;

        let on_disk = self.scan_tree()?;
        for relpath in &on_disk {
            if self.entries.contains_key(relpath) {
                continue;
            }
            let header = self.header_of(&self.root.join(relpath));
            info!(relpath = %relpath, id = %header.id, "Indexing unlisted record");
            self.add_entry(relpath, &header.id, header.timestamp);
            report.added += 1;
        }

        let stale: Vec<String> = self
            .entries
            .keys()
            .filter(|relpath| !on_disk.contains(*relpath))
            .cloned()
            .collect();
        for relpath in stale {
            warn!(relpath = %relpath, "Dropping index row for missing record");
            self.remove_entry(&relpath);
            report.dropped += 1;
        }

        if !report.is_clean() {
            self.rewrite_index()?;
            report.rewritten = true;
            info!(
                root = %self.root.display(),
                added = report.added,
                dropped = report.dropped,
                malformed = report.malformed,
                "Index reconciled"
            );
        }

        self.report = report;
        Ok(&self.report)
    }

    /// Result of the most recent reconciliation.
    pub fn last_report(&self) -> &ReconcileReport {
        &self.report
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    /// Number of indexed files.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Relative paths holding `id`, newest first.
    pub fn paths_for(&self, id: &str) -> &[String] {
        self.by_id.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Absolute path of the newest file holding `id`.
    pub fn latest_path(&self, id: &str) -> Result<PathBuf> {
        self.paths_for(id)
            .first()
            .map(|relpath| self.root.join(relpath))
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Known identifiers in path order, each once. Files indexed under the
    /// sentinel identifier are not records and are left out.
    pub fn ids(&self) -> Vec<String> {
        let sentinel = sentinel_id();
        let mut seen = BTreeSet::new();
        self.entries
            .values()
            .filter(|(id, _)| *id != sentinel)
            .filter(|(id, _)| seen.insert(id.as_str()))
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// All rows in path order.
    pub fn entries(&self) -> impl Iterator<Item = IndexEntry> + '_ {
        self.entries
            .iter()
            .map(|(relpath, (id, timestamp))| IndexEntry {
                relpath: relpath.clone(),
                id: id.clone(),
                timestamp: *timestamp,
            })
    }

    /// Map `relpath` to `id`.
    ///
    /// Within the paths of one identifier, `relpath` goes before the first
    /// path whose timestamp is not newer, keeping the list newest-first with
    /// the latest insertion winning ties.
    pub fn add_entry(&mut self, relpath: &str, id: &str, timestamp: DateTime<FixedOffset>) {
        if self.entries.contains_key(relpath) {
            self.remove_entry(relpath);
        }
        let paths = self.by_id.entry(id.to_string()).or_default();
        let at = paths
            .iter()
            .position(|p| {
                self.entries
                    .get(p)
                    .is_some_and(|(_, existing)| *existing <= timestamp)
            })
            .unwrap_or(paths.len());
        paths.insert(at, relpath.to_string());
        self.entries
            .insert(relpath.to_string(), (id.to_string(), timestamp));
    }

    /// [`add_entry`](Self::add_entry) followed by appending its index row.
    pub fn register(
        &mut self,
        relpath: &str,
        id: &str,
        timestamp: DateTime<FixedOffset>,
    ) -> Result<()> {
        self.add_entry(relpath, id, timestamp);
        self.append_index_record(relpath, id, timestamp)
    }

    /// First free relative path in scan order (`00/00` .. `ff/ff`).
    ///
    /// A slot that is not indexed but already has a file was written by
    /// someone else: the file is absorbed into the index and the scan goes on.
    pub fn allocate_slot(&mut self) -> Result<String> {
        for folder in 0..SHARD_FANOUT {
            let folder = format!("{folder:02x}");
            for slot in 0..SHARD_FANOUT {
                let relpath = format!("{folder}/{slot:02x}.{}", self.extension);
                if self.entries.contains_key(&relpath) {
                    continue;
                }
                let path = self.root.join(&relpath);
                if path.exists() {
                    let header = self.header_of(&path);
                    info!(relpath = %relpath, id = %header.id, "Absorbing record written outside the index");
                    self.register(&relpath, &header.id, header.timestamp)?;
                    continue;
                }
                fs::create_dir_all(self.root.join(&folder))?;
                debug!(relpath = %relpath, "Allocated slot");
                return Ok(relpath);
            }
        }
        Err(StoreError::CapacityExceeded { capacity: CAPACITY })
    }

    /// A random identifier not used by any indexed record.
    pub fn generate_identifier(&self) -> String {
        loop {
            let id = Uuid::new_v4().to_string();
            if !self.by_id.contains_key(&id) {
                return id;
            }
        }
    }

    /// Append one row to the index file, or write the whole index if the
    /// file does not exist yet.
    pub fn append_index_record(
        &self,
        relpath: &str,
        id: &str,
        timestamp: DateTime<FixedOffset>,
    ) -> Result<()> {
        if !self.index_path.exists() {
            return self.rewrite_index();
        }
        let mut file = OpenOptions::new().append(true).open(&self.index_path)?;
        writeln!(file, "{}", row(relpath, id, &timestamp))?;
        file.sync_all()?;
        Ok(())
    }

    /// Replace the index file with the in-memory rows.
    pub fn rewrite_index(&self) -> Result<()> {
        let mut text = String::from(INDEX_HEADER);
        text.push('\n');
        for (relpath, (id, timestamp)) in &self.entries {
            text.push_str(&row(relpath, id, timestamp));
            text.push('\n');
        }
        write_atomic(&self.index_path, text.as_bytes())
    }

    fn remove_entry(&mut self, relpath: &str) {
        let Some((id, _)) = self.entries.remove(relpath) else {
            return;
        };
        if let Some(paths) = self.by_id.get_mut(&id) {
            paths.retain(|p| p != relpath);
            if paths.is_empty() {
                self.by_id.remove(&id);
            }
        }
    }

    fn header_of(&self, path: &Path) -> RecordHeader {
        match self.extractor.extract(path) {
            Ok(header) => header,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Header extraction failed, indexing as sentinel");
                RecordHeader::sentinel()
            }
        }
    }

    fn load_index_file(&mut self, report: &mut ReconcileReport) -> Result<()> {
        let bytes = match fs::read(&self.index_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        let text = String::from_utf8(bytes).map_err(|e| StoreError::CorruptIndex {
            path: self.index_path.display().to_string(),
            reason: e.to_string(),
        })?;

        for (n, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if n == 0 && line.to_lowercase().starts_with("relpath") {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            let &[relpath, id, timestamp] = fields.as_slice() else {
                warn!(line = n + 1, "Skipping malformed index row");
                report.malformed += 1;
                continue;
            };
            let timestamp = parse_timestamp(timestamp).unwrap_or_else(|| {
                warn!(line = n + 1, relpath = %relpath, "Unparsable timestamp in index row");
                report.malformed += 1;
                now()
            });
            if self.entries.contains_key(relpath) {
                warn!(line = n + 1, relpath = %relpath, "Duplicate index row, keeping the later one");
                report.malformed += 1;
            }
            self.add_entry(relpath, id, timestamp);
            report.loaded += 1;
        }
        Ok(())
    }

    /// Relative paths of every record file under the root.
    fn scan_tree(&self) -> Result<BTreeSet<String>> {
        let mut found = BTreeSet::new();
        for entry in WalkDir::new(&self.root).min_depth(2).max_depth(2) {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            if !is_record_name(name, &self.extension) {
                continue;
            }
            let Some(folder) = entry
                .path()
                .parent()
                .and_then(Path::file_name)
                .and_then(|f| f.to_str())
            else {
                continue;
            };
            found.insert(format!("{folder}/{name}"));
        }
        Ok(found)
    }
}

fn row(relpath: &str, id: &str, timestamp: &DateTime<FixedOffset>) -> String {
    format!("{relpath}\t{id}\t{}", format_timestamp(timestamp))
}

/// `<lowercase hex>.<extension>`
fn is_record_name(name: &str, extension: &str) -> bool {
    let Some((stem, ext)) = name.split_once('.') else {
        return false;
    };
    ext == extension
        && !stem.is_empty()
        && stem.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
