//! # Session Log
//!
//! Append-only record of successful calculations, scoped per session and
//! per day.
//!
//! ## File Format
//!
//! [`FileLogStore`] writes two files per [`LogKey`], each optional:
//!
//! - `{session_id}_{YYYYMMDD}.csv` - flat rows with a header line:
//!   `timestamp,label,material,length,width,height,slope,unit,area,quantity,price`
//! - `{session_id}_{YYYYMMDD}.jsonl` - one JSON object per line with the
//!   timestamp and every [`EstimateResult`] field
//!
//! History is read back from the JSON Lines file only.
//!
//! ## Safety
//!
//! - **Row atomicity**: every append holds an exclusive OS lock (fs2) on the
//!   target file while writing one complete row/line
//! - **Strict reads**: a line that does not parse fails the whole read with
//!   `CorruptLogEntry` instead of silently dropping history
//!
//! ## Example
//!
//! ```rust,no_run
//! use calc_core::calculations::estimate::{estimate, EstimateForm};
//! use calc_core::materials::MaterialCatalog;
//! use calc_core::session::{LogKey, SessionId};
//! use calc_core::session_log::{FileLogStore, LogRecord, LogStore};
//!
//! let form = EstimateForm {
//!     material: Some("hout".into()),
//!     length: Some("4".into()),
//!     width: Some("2".into()),
//!     ..Default::default()
//! };
//! let result = estimate(&form, &MaterialCatalog::default())?;
//!
//! let store = FileLogStore::new("logs");
//! let key = LogKey::new(SessionId::generate(), chrono::Utc::now().date_naive());
//! store.append(&key, &LogRecord::now(result))?;
//!
//! for record in store.history(&key)? {
//!     println!("{} {} m²", record.result.material, record.result.area);
//! }
//! # Ok::<(), calc_core::errors::CalcError>(())
//! ```

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::calculations::EstimateResult;
use crate::errors::{CalcError, CalcResult};
use crate::session::LogKey;

/// One logged calculation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub result: EstimateResult,
}

impl LogRecord {
    pub fn new(result: EstimateResult, timestamp: DateTime<Utc>) -> Self {
        LogRecord { timestamp, result }
    }

    /// Record stamped with the current time
    pub fn now(result: EstimateResult) -> Self {
        LogRecord::new(result, Utc::now())
    }
}

/// Append-only sink for calculation records.
///
/// Implementations must preserve append order per key: `history` returns
/// records in the order they were appended.
pub trait LogStore: Send + Sync {
    /// Append one record to the log identified by `key`.
    fn append(&self, key: &LogKey, record: &LogRecord) -> CalcResult<()>;

    /// All records for `key` in append order. Missing log yields an empty list.
    fn history(&self, key: &LogKey) -> CalcResult<Vec<LogRecord>>;
}

/// Which file formats [`FileLogStore`] writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogFormats {
    pub csv: bool,
    pub jsonl: bool,
}

impl Default for LogFormats {
    fn default() -> Self {
        LogFormats {
            csv: true,
            jsonl: true,
        }
    }
}

/// Flat CSV row layout
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    timestamp: String,
    label: &'a str,
    material: &'a str,
    length: f64,
    width: f64,
    height: Option<f64>,
    slope: Option<f64>,
    unit: &'a str,
    area: f64,
    quantity: f64,
    price: f64,
}

impl<'a> From<&'a LogRecord> for CsvRow<'a> {
    fn from(record: &'a LogRecord) -> Self {
        let r = &record.result;
        CsvRow {
            timestamp: record.timestamp.to_rfc3339(),
            label: r.label.as_deref().unwrap_or(""),
            material: &r.material,
            length: r.length,
            width: r.width,
            height: r.height,
            slope: r.slope,
            unit: &r.unit,
            area: r.area,
            quantity: r.quantity,
            price: r.price,
        }
    }
}

/// Disk-backed log store writing under one directory.
#[derive(Debug, Clone)]
pub struct FileLogStore {
    dir: PathBuf,
    formats: LogFormats,
}

impl FileLogStore {
    /// Store writing both formats under `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileLogStore {
            dir: dir.into(),
            formats: LogFormats::default(),
        }
    }

    pub fn with_formats(mut self, formats: LogFormats) -> Self {
        self.formats = formats;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn formats(&self) -> LogFormats {
        self.formats
    }

    pub fn csv_path(&self, key: &LogKey) -> PathBuf {
        self.dir.join(format!("{}.csv", key.file_stem()))
    }

    pub fn jsonl_path(&self, key: &LogKey) -> PathBuf {
        self.dir.join(format!("{}.jsonl", key.file_stem()))
    }

    fn ensure_dir(&self) -> CalcResult<()> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            CalcError::file_error("create log directory", self.dir.display().to_string(), e.to_string())
        })
    }
}

impl LogStore for FileLogStore {
    fn append(&self, key: &LogKey, record: &LogRecord) -> CalcResult<()> {
        if !self.formats.csv && !self.formats.jsonl {
            return Ok(());
        }
        self.ensure_dir()?;

        // History reads the JSONL log, so it is written first; a failed
        // JSONL append leaves no orphan CSV row. A CSV failure after a
        // successful JSONL append is reported but not rolled back.
        if self.formats.jsonl {
            append_jsonl_line(&self.jsonl_path(key), record)?;
        }
        if self.formats.csv {
            append_csv_row(&self.csv_path(key), record)?;
        }

        tracing::debug!(log = %key.file_stem(), material = %record.result.material, "appended estimate to session log");
        Ok(())
    }

    fn history(&self, key: &LogKey) -> CalcResult<Vec<LogRecord>> {
        read_jsonl(&self.jsonl_path(key))
    }
}

/// Open `path` for appending and hold an exclusive lock until dropped.
struct LockedAppend {
    file: File,
    path: PathBuf,
}

impl LockedAppend {
    fn open(path: &Path) -> CalcResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| CalcError::file_error("open for append", path.display().to_string(), e.to_string()))?;

        FileExt::lock_exclusive(&file)
            .map_err(|e| CalcError::file_error("lock", path.display().to_string(), e.to_string()))?;

        Ok(LockedAppend {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Current length, read while holding the lock
    fn is_empty(&self) -> CalcResult<bool> {
        let meta = self
            .file
            .metadata()
            .map_err(|e| CalcError::file_error("stat", self.path.display().to_string(), e.to_string()))?;
        Ok(meta.len() == 0)
    }

    /// Write the whole buffer in one call and flush
    fn write_all(&mut self, bytes: &[u8]) -> CalcResult<()> {
        self.file
            .write_all(bytes)
            .and_then(|_| self.file.flush())
            .map_err(|e| CalcError::file_error("append", self.path.display().to_string(), e.to_string()))
    }
}

impl Drop for LockedAppend {
    fn drop(&mut self) {
        // Closing the handle releases the lock as well
        let _ = FileExt::unlock(&self.file);
    }
}

fn append_csv_row(path: &Path, record: &LogRecord) -> CalcResult<()> {
    let mut target = LockedAppend::open(path)?;
    let write_header = target.is_empty()?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(write_header)
        .from_writer(Vec::new());
    writer.serialize(CsvRow::from(record))?;
    let bytes = writer.into_inner().map_err(|e| CalcError::SerializationError {
        reason: e.to_string(),
    })?;

    target.write_all(&bytes)
}

fn append_jsonl_line(path: &Path, record: &LogRecord) -> CalcResult<()> {
    let mut line = serde_json::to_string(record)?;
    line.push('\n');

    let mut target = LockedAppend::open(path)?;
    target.write_all(line.as_bytes())
}

/// Read a JSON Lines log. Missing file yields an empty list; blank lines are
/// ignored; any other unparseable line fails the read.
pub fn read_jsonl(path: &Path) -> CalcResult<Vec<LogRecord>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(CalcError::file_error("open", path.display().to_string(), e.to_string())),
    };

    FileExt::lock_shared(&file)
        .map_err(|e| CalcError::file_error("lock", path.display().to_string(), e.to_string()))?;

    let mut records = Vec::new();
    for (index, line) in BufReader::new(&file).lines().enumerate() {
        let line = line.map_err(|e| CalcError::file_error("read", path.display().to_string(), e.to_string()))?;
        if line.trim().is_empty() {
            continue;
        }
        let record: LogRecord = serde_json::from_str(&line)
            .map_err(|e| CalcError::corrupt_log_entry(path.display().to_string(), index + 1, e.to_string()))?;
        records.push(record);
    }

    let _ = FileExt::unlock(&file);
    Ok(records)
}

/// In-process log store. Useful for tests and for running without a disk.
#[derive(Debug, Default)]
pub struct MemoryLogStore {
    logs: Mutex<HashMap<String, Vec<LogRecord>>>,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        MemoryLogStore::default()
    }

    /// Total number of records across all keys
    pub fn total_records(&self) -> usize {
        self.logs
            .lock()
            .map(|logs| logs.values().map(Vec::len).sum())
            .unwrap_or(0)
    }
}

impl LogStore for MemoryLogStore {
    fn append(&self, key: &LogKey, record: &LogRecord) -> CalcResult<()> {
        let mut logs = self
            .logs
            .lock()
            .map_err(|_| CalcError::internal("memory log store poisoned"))?;
        logs.entry(key.file_stem()).or_default().push(record.clone());
        Ok(())
    }

    fn history(&self, key: &LogKey) -> CalcResult<Vec<LogRecord>> {
        let logs = self
            .logs
            .lock()
            .map_err(|_| CalcError::internal("memory log store poisoned"))?;
        Ok(logs.get(&key.file_stem()).cloned().unwrap_or_default())
    }
}
