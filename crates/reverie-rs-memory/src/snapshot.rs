//! JSONL snapshots of memory records.

use crate::error::MemoryError;
use crate::model::MemoryRecord;
use log::debug;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Read all records from a snapshot. A missing file yields no records.
pub(crate) fn read_records(path: &Path) -> Result<Vec<MemoryRecord>, MemoryError> {
    if !path.exists() {
        debug!("snapshot missing (path={})", path.display());
        return Ok(Vec::new());
    }
    let file = OpenOptions::new().read(true).open(path)?;
    let reader = BufReader::new(file);
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str(&line)?);
    }
    debug!(
        "read snapshot (path={}, records={})",
        path.display(),
        records.len()
    );
    Ok(records)
}

/// Write records to a temp file next to `path`, then rename over it.
pub(crate) fn write_records(path: &Path, records: &[MemoryRecord]) -> Result<(), MemoryError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let temp_path = temp_path(path);
    {
        let file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&temp_path)?;
        let mut writer = BufWriter::new(file);
        for record in records {
            let line = serde_json::to_string(record)?;
            writeln!(writer, "{line}")?;
        }
        writer.flush()?;
    }
    std::fs::rename(&temp_path, path)?;
    debug!(
        "wrote snapshot (path={}, records={})",
        path.display(),
        records.len()
    );
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}
