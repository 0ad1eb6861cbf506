//! Band and action mapping
//!
//! Maps the predictive score to a CLABSI band through configurable thresholds,
//! derives the venous-resistance band from raw pull counts, and picks the
//! recommended care action.

use crate::config::RiskThresholds;
use crate::types::{RiskBand, ShiftTelemetry};

pub const ACTION_ROUTINE: &str = "Routine flush Q24h";
pub const ACTION_FLUSH_AND_INFORM: &str = "Flush Q12h + inform MO";
pub const ACTION_VENOUS_TRAUMA: &str = "Venous trauma protocol + urgent ultrasound";
pub const ACTION_SEPSIS: &str = "Stop infusions + emergency MO review / sepsis protocol";

/// Mapper from scores and counts to bands
#[derive(Debug, Clone, Copy, Default)]
pub struct BandMapper {
    thresholds: RiskThresholds,
}

impl BandMapper {
    pub fn new(thresholds: RiskThresholds) -> Self {
        let thresholds = if thresholds.is_valid() {
            thresholds
        } else {
            RiskThresholds::default()
        };
        Self { thresholds }
    }

    pub fn thresholds(&self) -> RiskThresholds {
        self.thresholds
    }

    /// CLABSI band for a predictive score
    pub fn clabsi_band(&self, score: u32) -> RiskBand {
        let score = i64::from(score);
        if score <= self.thresholds.green_max {
            RiskBand::Green
        } else if score <= self.thresholds.yellow_max {
            RiskBand::Yellow
        } else {
            RiskBand::Red
        }
    }
}

/// Venous-resistance band from pull counts, escalated by the adaptive-hardware alert
pub fn venous_resistance_band(telemetry: &ShiftTelemetry) -> RiskBand {
    let yellow = telemetry.traction_pulls_yellow;
    let red = telemetry.traction_pulls_red;

    let band = if red >= 2 || yellow >= 4 {
        RiskBand::Red
    } else if red >= 1 || yellow >= 2 {
        RiskBand::Yellow
    } else {
        RiskBand::Green
    };

    if telemetry.adaptive_traction_alert {
        band.escalate()
    } else {
        band
    }
}

/// Care instruction for a predictive score; finer-grained than the color band
pub fn recommended_action(score: u32) -> &'static str {
    match score {
        0..=3 => ACTION_ROUTINE,
        4..=6 => ACTION_FLUSH_AND_INFORM,
        7..=9 => ACTION_VENOUS_TRAUMA,
        _ => ACTION_SEPSIS,
    }
}
