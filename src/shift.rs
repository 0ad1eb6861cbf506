//! Shift telemetry management
//!
//! This module manages rolling 12-hour telemetry windows per patient. A
//! submission inside an open window updates it field by field instead of
//! opening a duplicate window.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::ComputeError;
use crate::types::{ShiftTelemetry, TelemetryUpdate};

/// Length of a shift window in hours
pub const SHIFT_WINDOW_HOURS: i64 = 12;

/// Windows kept per patient (one week of shifts); older windows are dropped
pub const RETAINED_WINDOWS: usize = 14;

/// Time span covered by one telemetry record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftWindow {
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
}

impl ShiftWindow {
    /// The window of `SHIFT_WINDOW_HOURS` ending at `reference`
    pub fn ending_at(reference: DateTime<Utc>) -> Self {
        Self {
            period_start: reference - Duration::hours(SHIFT_WINDOW_HOURS),
            period_end: reference,
        }
    }
}

impl ShiftTelemetry {
    /// Fresh telemetry from a submission; absent fields start at zero/false
    pub fn from_update(update: &TelemetryUpdate) -> Self {
        let mut telemetry = ShiftTelemetry::default();
        telemetry.apply(update);
        telemetry
    }

    /// Overwrite only the fields the submission actually carried
    pub fn apply(&mut self, update: &TelemetryUpdate) {
        if let Some(v) = update.traction_pulls_yellow {
            self.traction_pulls_yellow = v;
        }
        if let Some(v) = update.traction_pulls_red {
            self.traction_pulls_red = v;
        }
        if let Some(v) = update.dressing_changed {
            self.dressing_changed = v;
        }
        if let Some(v) = update.catheter_changed {
            self.catheter_changed = v;
        }
        if let Some(v) = update.flushing_done {
            self.flushing_done = v;
        }
        if let Some(v) = update.adaptive_traction_alert {
            self.adaptive_traction_alert = v;
        }
    }
}

/// Telemetry stored for one patient window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftRecord {
    pub patient_id: String,
    pub window: ShiftWindow,
    pub telemetry: ShiftTelemetry,
}

/// Per-patient store of shift windows
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShiftLedger {
    records: BTreeMap<String, Vec<ShiftRecord>>,
}

impl ShiftLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a submission into the patient's open window, or open a new one.
    ///
    /// The open window is the most recent one whose end falls within the last
    /// `SHIFT_WINDOW_HOURS` of `now`.
    pub fn upsert(
        &mut self,
        patient_id: &str,
        update: &TelemetryUpdate,
        now: DateTime<Utc>,
    ) -> Result<&ShiftRecord, ComputeError> {
        if patient_id.trim().is_empty() {
            return Err(ComputeError::MissingField("patient_id".to_string()));
        }

        let records = self.records.entry(patient_id.to_string()).or_default();
        let window = ShiftWindow::ending_at(now);

        match open_window_index(records, window.period_start) {
            Some(index) => {
                let record = &mut records[index];
                // Late-arriving submissions never shrink the window
                record.window.period_end = record.window.period_end.max(now);
                record.telemetry.apply(update);
                debug!(patient_id, telemetry = ?record.telemetry, "merged telemetry into open shift window");
                Ok(&records[index])
            }
            None => {
                records.push(ShiftRecord {
                    patient_id: patient_id.to_string(),
                    window,
                    telemetry: ShiftTelemetry::from_update(update),
                });
                // New windows only open after every existing one, so the front is oldest
                let excess = records.len().saturating_sub(RETAINED_WINDOWS);
                if excess > 0 {
                    records.drain(..excess);
                    debug!(patient_id, dropped = excess, "pruned closed shift windows");
                }
                debug!(patient_id, "opened new shift window");
                Ok(&records[records.len() - 1])
            }
        }
    }

    /// The patient's open window at `now`, if any
    pub fn current(&self, patient_id: &str, now: DateTime<Utc>) -> Option<&ShiftRecord> {
        let records = self.records.get(patient_id)?;
        let window = ShiftWindow::ending_at(now);
        open_window_index(records, window.period_start).map(|index| &records[index])
    }

    /// Every window recorded for a patient, oldest first
    pub fn records(&self, patient_id: &str) -> &[ShiftRecord] {
        self.records
            .get(patient_id)
            .map(|r| r.as_slice())
            .unwrap_or(&[])
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

fn open_window_index(records: &[ShiftRecord], cutoff: DateTime<Utc>) -> Option<usize> {
    records
        .iter()
        .enumerate()
        .filter(|(_, r)| r.window.period_end >= cutoff)
        .max_by_key(|(_, r)| r.window.period_end)
        .map(|(index, _)| index)
}
