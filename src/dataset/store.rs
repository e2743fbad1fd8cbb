//! Atomic dataset writes.

use crate::dataset::record::SpotRecord;
use crate::error::AnalyticsResult;
use std::fs;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Replace the dataset at `path` with `records`.
///
/// Rows go to a temporary file in the same directory which is then renamed
/// over `path`, so a concurrent reader sees either the old file or the new
/// one, never a partial write.
pub fn write_dataset(path: &Path, records: &[SpotRecord]) -> AnalyticsResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut temp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = csv::Writer::from_writer(temp.as_file_mut());
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;
    }
    temp.as_file().sync_all()?;

    temp.persist(path).map_err(|e| e.error)?;
    debug!("Wrote {} rows to {}", records.len(), path.display());
    Ok(())
}
