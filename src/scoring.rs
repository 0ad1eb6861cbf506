//! Sub-score calculation
//!
//! Four independent, pure scorers:
//! - Site appearance (CLISA, 0-4)
//! - Traction/device stress (0-3)
//! - Patient risk factors (0-3)
//! - Dwell-time adjustment (0-1)

use chrono::{DateTime, Utc};

use crate::types::{ImageSignals, PatientFactorFlags, ShiftTelemetry, SubScores};

/// Ceiling of the bedside CLISA scale
pub const CLISA_MAX: u8 = 4;
/// Ceiling of the traction/device score
pub const TRACTION_MAX: f64 = 3.0;
/// Ceiling of the patient-factor score
pub const PATIENT_FACTOR_MAX: u8 = 3;
/// Dwell beyond this many whole days earns the adjustment
pub const DWELL_THRESHOLD_DAYS: i64 = 9;
/// Dressing lift above this percentage counts against the site
pub const CLISA_LIFT_THRESHOLD: f64 = 25.0;

/// Calculator for the independent sub-scores
pub struct SubScoreCalculator;

impl SubScoreCalculator {
    /// Compute every sub-score for one capture
    pub fn calculate(
        signals: &ImageSignals,
        dressing_intact: bool,
        telemetry: &ShiftTelemetry,
        factors: &PatientFactorFlags,
        insertion_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> SubScores {
        let elapsed_days = elapsed_days(insertion_date, now);

        SubScores {
            clisa: site_appearance_score(signals, dressing_intact),
            traction: traction_score(telemetry),
            patient_factors: patient_factor_score(factors),
            dwell_adjustment: dwell_adjustment(elapsed_days),
            elapsed_days,
        }
    }
}

/// Whole days between insertion and `now`, truncated toward zero
pub fn elapsed_days(insertion_date: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - insertion_date).num_days()
}

/// Sum of the ordinal severities plus one point per dressing/patch finding
pub fn site_appearance_score(signals: &ImageSignals, dressing_intact: bool) -> u8 {
    let mut score = u32::from(signals.erythema)
        + u32::from(signals.drainage)
        + u32::from(signals.ooze)
        + u32::from(signals.moisture);

    if !dressing_intact {
        score += 1;
    }
    if signals.dressing_lift > CLISA_LIFT_THRESHOLD {
        score += 1;
    }
    if signals.maceration {
        score += 1;
    }
    if !signals.chg_patch {
        score += 1;
    }

    score.min(u32::from(CLISA_MAX)) as u8
}

/// Device stress from pull counts and line events.
///
/// Dressing changes add half a point; the score is not rounded here.
pub fn traction_score(telemetry: &ShiftTelemetry) -> f64 {
    let mut score = 0.0;

    if telemetry.traction_pulls_yellow >= 1 {
        score += 1.0;
    }
    if telemetry.traction_pulls_yellow >= 3 {
        score += 1.0;
    }
    if telemetry.traction_pulls_red >= 1 {
        score += 2.0;
    }
    if telemetry.catheter_changed {
        score += 1.0;
    }
    if telemetry.dressing_changed {
        score += 0.5;
    }

    f64::clamp(score, 0.0, TRACTION_MAX)
}

/// Saturating count of patient risk flags
pub fn patient_factor_score(factors: &PatientFactorFlags) -> u8 {
    match factors.count() {
        0 => 0,
        1 => 1,
        2 => 2,
        _ => PATIENT_FACTOR_MAX,
    }
}

pub fn dwell_adjustment(elapsed_days: i64) -> u8 {
    u8::from(elapsed_days > DWELL_THRESHOLD_DAYS)
}
