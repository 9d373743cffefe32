use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, WriterBuilder};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::model::{AssetQuote, COLUMNS};

/// CSV-backed snapshot store.
///
/// `latest_path` always holds exactly the most recent batch and is what the
/// dashboard reads. `history_path`, when set, accumulates every batch ever
/// written. Both files are only ever replaced through a rename of a fully
/// written sibling file, so a concurrent reader sees either the old or the
/// new content.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    latest_path: PathBuf,
    history_path: Option<PathBuf>,
}

impl SnapshotStore {
    pub fn new(latest_path: impl Into<PathBuf>) -> Self {
        Self {
            latest_path: latest_path.into(),
            history_path: None,
        }
    }

    pub fn with_history(mut self, history_path: impl Into<PathBuf>) -> Self {
        self.history_path = Some(history_path.into());
        self
    }

    pub fn latest_path(&self) -> &Path {
        &self.latest_path
    }

    pub fn history_path(&self) -> Option<&Path> {
        self.history_path.as_deref()
    }

    /// Appends `rows` to the history file, if configured, then replaces the
    /// latest file with them.
    ///
    /// History is written first: if it fails the latest file still holds the
    /// previous batch, so the latest file never shows a batch history lacks.
    pub fn append(&self, rows: &[AssetQuote]) -> Result<(), StoreError> {
        if let Some(history) = &self.history_path {
            append_to_csv(rows, history)?;
        }
        save_to_csv(rows, &self.latest_path)?;
        info!(
            "stored {} rows in {}",
            rows.len(),
            self.latest_path.display()
        );
        Ok(())
    }

    pub fn load_all(&self) -> Result<Vec<AssetQuote>, StoreError> {
        load_csv(&self.latest_path)
    }

    pub fn load_history(&self) -> Result<Vec<AssetQuote>, StoreError> {
        match &self.history_path {
            Some(path) => load_csv(path),
            None => Err(StoreError::NotFound(PathBuf::new())),
        }
    }
}

pub fn save_to_csv(rows: &[AssetQuote], file_path: &Path) -> Result<(), StoreError> {
    let tmp = sibling_tmp(file_path);
    let result = File::create(&tmp)
        .and_then(|file| write_rows(file, rows, true))
        .and_then(|()| fs::rename(&tmp, file_path));
    finish(result, &tmp, file_path)
}

pub fn append_to_csv(rows: &[AssetQuote], file_path: &Path) -> Result<(), StoreError> {
    let file_exists = file_path.exists();
    let tmp = sibling_tmp(file_path);

    let result = (|| {
        if file_exists {
            fs::copy(file_path, &tmp)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&tmp)?;
        write_rows(file, rows, !file_exists)?;
        fs::rename(&tmp, file_path)
    })();
    finish(result, &tmp, file_path)
}

pub fn load_csv(file_path: &Path) -> Result<Vec<AssetQuote>, StoreError> {
    let file = File::open(file_path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => StoreError::NotFound(file_path.to_path_buf()),
        _ => StoreError::Read {
            path: file_path.to_path_buf(),
            source,
        },
    })?;

    let mut rdr = ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);
    let mut rows = Vec::new();

    for record in rdr.deserialize::<AssetQuote>() {
        let row = record.map_err(|source| StoreError::Parse {
            path: file_path.to_path_buf(),
            line: source.position().map(|p| p.line()).unwrap_or(0),
            source,
        })?;
        rows.push(row);
    }

    debug!("loaded {} rows from {}", rows.len(), file_path.display());
    Ok(rows)
}

fn write_rows<W: Write>(sink: W, rows: &[AssetQuote], with_header: bool) -> io::Result<()> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(sink);

    if with_header {
        wtr.write_record(COLUMNS)?;
    }

    for row in rows {
        wtr.serialize(row)?;
    }

    let mut sink = wtr.into_inner().map_err(|e| e.into_error())?;
    sink.flush()?;
    Ok(())
}

fn sibling_tmp(file_path: &Path) -> PathBuf {
    let mut name = file_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{}.tmp", std::process::id()));
    file_path.with_file_name(name)
}

fn finish(result: io::Result<()>, tmp: &Path, file_path: &Path) -> Result<(), StoreError> {
    result.map_err(|source| {
        let _ = fs::remove_file(tmp);
        StoreError::Write {
            path: file_path.to_path_buf(),
            source,
        }
    })
}
