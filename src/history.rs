//! Snapshot history
//!
//! Append-only log of risk snapshots per patient, kept in capture order so
//! trend displays stay continuous across the early/late phase boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{RiskBand, RiskPhase, RiskSnapshot};

/// Default number of points returned by a trend query
pub const DEFAULT_TREND_POINTS: usize = 10;

/// One point on a patient's risk trend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub timestamp: DateTime<Utc>,
    pub score: u32,
    pub band: RiskBand,
    pub phase: RiskPhase,
    pub early_score: u32,
    pub late_score: u32,
    pub traction_pulls_yellow: u32,
    pub traction_pulls_red: u32,
    pub adaptive_traction_alert: bool,
    pub dressing_changed: bool,
    pub catheter_changed: bool,
    pub flushing_done: bool,
}

impl From<&RiskSnapshot> for TrendPoint {
    fn from(snapshot: &RiskSnapshot) -> Self {
        Self {
            timestamp: snapshot.captured_at,
            score: snapshot.predictive_clabsi_score,
            band: snapshot.predictive_clabsi_band,
            phase: snapshot.risk_phase,
            early_score: snapshot.early_clabsi_score,
            late_score: snapshot.late_clabsi_score,
            traction_pulls_yellow: snapshot.traction_pulls_yellow,
            traction_pulls_red: snapshot.traction_pulls_red,
            adaptive_traction_alert: snapshot.adaptive_traction_alert,
            dressing_changed: snapshot.dressing_changed,
            catheter_changed: snapshot.catheter_changed,
            flushing_done: snapshot.flushing_done,
        }
    }
}

/// Per-patient snapshot log
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotHistory {
    snapshots: BTreeMap<String, Vec<RiskSnapshot>>,
}

impl SnapshotHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a snapshot, keeping the log ordered by capture time.
    ///
    /// Snapshots with equal capture times keep their arrival order.
    pub fn record(&mut self, patient_id: &str, snapshot: RiskSnapshot) {
        let log = self.snapshots.entry(patient_id.to_string()).or_default();
        let position = log.partition_point(|s| s.captured_at <= snapshot.captured_at);
        log.insert(position, snapshot);
    }

    pub fn latest(&self, patient_id: &str) -> Option<&RiskSnapshot> {
        self.snapshots.get(patient_id).and_then(|log| log.last())
    }

    pub fn snapshots(&self, patient_id: &str) -> &[RiskSnapshot] {
        self.snapshots
            .get(patient_id)
            .map(|log| log.as_slice())
            .unwrap_or(&[])
    }

    /// The most recent `limit` points, oldest first
    pub fn trend(&self, patient_id: &str, limit: usize) -> Vec<TrendPoint> {
        let log = self.snapshots(patient_id);
        let skip = log.len().saturating_sub(limit);
        log[skip..].iter().map(TrendPoint::from).collect()
    }
}
