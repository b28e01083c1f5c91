//! Override audit log.
//!
//! Every time a clinician overrides a blocked verdict an [`OverrideEvent`]
//! is appended to a JSONL (JSON Lines) file under an exclusive file lock, so
//! several processes may record overrides against the same log.

use crate::types::{DoseUnit, GuardrailVerdict, PatientType};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// One recorded override of a blocked verdict
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct OverrideEvent {
    pub id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub medication_id: String,
    pub weight_kg: f64,
    pub patient_type: PatientType,
    pub adjusted_dose: f64,
    pub dose_unit: DoseUnit,
    /// Messages of the alerts that blocked administration
    pub blocking_alerts: Vec<String>,
    pub reason: String,
    pub authorized_by: String,
}

impl OverrideEvent {
    /// Build an event for a blocked verdict
    ///
    /// Fails if the verdict was administrable (nothing to override) or if
    /// the reason or authorizer is blank.
    pub fn from_verdict(
        verdict: &GuardrailVerdict,
        weight_kg: f64,
        patient_type: PatientType,
        reason: &str,
        authorized_by: &str,
    ) -> Result<Self> {
        if verdict.can_administer {
            return Err(Error::Audit(format!(
                "{} is not blocked; nothing to override",
                verdict.medication_id
            )));
        }
        let reason = reason.trim();
        let authorized_by = authorized_by.trim();
        if reason.is_empty() {
            return Err(Error::Audit("override reason must not be empty".into()));
        }
        if authorized_by.is_empty() {
            return Err(Error::Audit("override must name who authorized it".into()));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            recorded_at: Utc::now(),
            medication_id: verdict.medication_id.clone(),
            weight_kg,
            patient_type,
            adjusted_dose: verdict.adjusted_dose,
            dose_unit: verdict.dose.dose_unit,
            blocking_alerts: verdict
                .blocking_alerts()
                .map(|a| a.message.clone())
                .collect(),
            reason: reason.to_string(),
            authorized_by: authorized_by.to_string(),
        })
    }
}

/// Destination for override events
pub trait OverrideSink {
    fn append(&mut self, event: &OverrideEvent) -> Result<()>;
}

/// JSONL-based override sink with file locking
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl OverrideSink for JsonlSink {
    fn append(&mut self, event: &OverrideEvent) -> Result<()> {
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;

        // One write per line so concurrent appenders never interleave
        let mut line = serde_json::to_string(event)?;
        line.push('\n');
        let mut writer = std::io::BufWriter::new(&file);
        writer.write_all(line.as_bytes())?;
        writer.flush()?;
        drop(writer);
        file.sync_data()?;

        file.unlock()?;

        tracing::info!(
            id = %event.id,
            medication = %event.medication_id,
            authorized_by = %event.authorized_by,
            "recorded override"
        );
        Ok(())
    }
}

/// Read all override events from a log file
///
/// Lines that fail to parse are skipped with a warning.
pub fn read_overrides(path: &Path) -> Result<Vec<OverrideEvent>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;
    let events = parse_overrides(BufReader::new(&file));
    file.unlock()?;

    let events = events?;
    tracing::debug!("Read {} overrides from {:?}", events.len(), path);
    Ok(events)
}

/// Parse JSON lines from an already-locked log
pub(crate) fn parse_overrides(reader: impl BufRead) -> Result<Vec<OverrideEvent>> {
    let mut events = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<OverrideEvent>(&line) {
            Ok(event) => events.push(event),
            Err(e) => {
                tracing::warn!("Skipping override at line {}: {}", line_num + 1, e);
            }
        }
    }

    Ok(events)
}
