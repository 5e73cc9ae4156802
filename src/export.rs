use crate::error::ExportError;
use crate::log_store::ExportRow;
use chrono::{DateTime, Utc};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

pub const EXPORT_HEADERS: [&str; 4] = ["#", "Question time", "Main time remaining", "Status"];

/// Writes the header then one record per row.
pub fn write_csv<W, I>(rows: I, writer: W) -> Result<usize, ExportError>
where
    W: Write,
    I: IntoIterator<Item = ExportRow>,
{
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(EXPORT_HEADERS)?;

    let mut written = 0;
    for row in rows {
        wtr.write_record([
            row.index.to_string(),
            row.time_spent,
            row.main_remaining,
            row.outcome_label,
        ])?;
        written += 1;
    }
    wtr.flush().map_err(|source| ExportError::Io {
        path: PathBuf::new(),
        source,
    })?;
    Ok(written)
}

/// `study_logs_2024-05-01-13-45-10.csv`
pub fn export_file_name(now: DateTime<Utc>) -> String {
    format!("study_logs_{}.csv", now.format("%Y-%m-%d-%H-%M-%S"))
}

pub fn export_to_dir<I>(dir: &Path, rows: I, now: DateTime<Utc>) -> Result<PathBuf, ExportError>
where
    I: IntoIterator<Item = ExportRow>,
{
    std::fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = dir.join(export_file_name(now));
    let file = std::fs::File::create(&path).map_err(|source| ExportError::Io {
        path: path.clone(),
        source,
    })?;
    let written = write_csv(rows, file)?;
    info!(path = %path.display(), rows = written, "logs exported");
    Ok(path)
}
