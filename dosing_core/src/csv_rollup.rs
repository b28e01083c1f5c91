//! CSV rollup of the override audit log.
//!
//! The whole rollup runs under the log's exclusive lock: events are appended
//! to a long-lived CSV archive and fsynced, the raw log is appended to the
//! `*.processed` archive, and only then is the live log truncated. Lines
//! that fail to parse survive in the archive across rollups. Appenders blocked on the lock resume
//! against the same (now empty) file, so no event is ever lost.

use crate::audit::{parse_overrides, OverrideEvent};
use crate::Result;
use fs2::FileExt;
use std::fs::OpenOptions;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::Path;

#[derive(Debug, serde::Serialize)]
struct CsvRow {
    id: String,
    recorded_at: String,
    medication_id: String,
    weight_kg: f64,
    patient_type: String,
    adjusted_dose: f64,
    dose_unit: String,
    blocking_alerts: String,
    reason: String,
    authorized_by: String,
}

impl From<&OverrideEvent> for CsvRow {
    fn from(event: &OverrideEvent) -> Self {
        CsvRow {
            id: event.id.to_string(),
            recorded_at: event.recorded_at.to_rfc3339(),
            medication_id: event.medication_id.clone(),
            weight_kg: event.weight_kg,
            patient_type: event.patient_type.to_string(),
            adjusted_dose: event.adjusted_dose,
            dose_unit: event.dose_unit.to_string(),
            blocking_alerts: event.blocking_alerts.join(" | "),
            reason: event.reason.clone(),
            authorized_by: event.authorized_by.clone(),
        }
    }
}

/// Roll the override log into CSV and archive the log
///
/// 1. Locks the log and reads every event from it
/// 2. Appends them to the CSV (headers only when the file is new)
/// 3. Syncs the CSV to disk
/// 4. Appends the raw log to `*.jsonl.processed` and truncates the live log
///
/// Returns the number of events written. A log with no readable events is
/// left untouched.
pub fn overrides_to_csv_and_archive(log_path: &Path, csv_path: &Path) -> Result<usize> {
    if !log_path.exists() {
        return Ok(0);
    }

    let log = OpenOptions::new().read(true).write(true).open(log_path)?;
    log.lock_exclusive()?;
    let result = rollup_locked(&log, log_path, csv_path);
    log.unlock()?;
    result
}

fn rollup_locked(mut log: &std::fs::File, log_path: &Path, csv_path: &Path) -> Result<usize> {
    let events = parse_overrides(BufReader::new(log))?;

    if events.is_empty() {
        tracing::info!("No overrides to roll up");
        return Ok(0);
    }

    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(csv_path)?;

    let needs_headers = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_headers)
        .from_writer(file);

    for event in &events {
        writer.serialize(CsvRow::from(event))?;
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    file.sync_all()?;

    tracing::info!("Wrote {} overrides to {:?}", events.len(), csv_path);

    let processed_path = log_path.with_extension("jsonl.processed");
    let mut archive = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&processed_path)?;
    log.seek(SeekFrom::Start(0))?;
    std::io::copy(&mut log, &mut archive)?;
    archive.sync_all()?;
    log.set_len(0)?;
    log.sync_all()?;

    tracing::info!("Archived override log to {:?}", processed_path);

    Ok(events.len())
}

/// Remove archived `*.processed` logs from a directory
pub fn cleanup_processed_logs(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut count = 0;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();

        if path.extension().is_some_and(|ext| ext == "processed") {
            std::fs::remove_file(&path)?;
            tracing::debug!("Removed processed log: {:?}", path);
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Cleaned up {} processed override logs", count);
    }

    Ok(count)
}
