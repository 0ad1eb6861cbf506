//! Ward analytics
//!
//! Ward-level CLABSI rates and supply deficits. The ward-metrics store itself is
//! external; these are the calculations applied to what it returns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AlertSeverity, AlertTrigger, AlertType, RiskBand};

/// Daily ward metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WardMetric {
    pub ward_id: String,
    pub date: DateTime<Utc>,
    pub clabsi_cases: u32,
    pub total_central_line_days: u32,
    pub dressing_change_count: u32,
    pub catheter_change_count: u32,
    /// CLABSI cases per 1000 central-line days
    pub derived_rate: f64,
}

impl WardMetric {
    pub fn new(
        ward_id: impl Into<String>,
        date: DateTime<Utc>,
        clabsi_cases: u32,
        total_central_line_days: u32,
    ) -> Self {
        Self {
            ward_id: ward_id.into(),
            date,
            clabsi_cases,
            total_central_line_days,
            dressing_change_count: 0,
            catheter_change_count: 0,
            derived_rate: clabsi_rate(clabsi_cases, total_central_line_days),
        }
    }
}

/// CLABSI cases per 1000 line-days; zero when no line-days were recorded
pub fn clabsi_rate(cases: u32, line_days: u32) -> f64 {
    if line_days == 0 {
        return 0.0;
    }
    f64::from(cases) * 1000.0 / f64::from(line_days)
}

/// Percentage change from the oldest to the newest metric.
///
/// `metrics` is ordered newest first. Fewer than two entries, or an oldest
/// rate of zero, yields 0.
pub fn rate_delta(metrics: &[WardMetric]) -> f64 {
    let (Some(latest), Some(oldest)) = (metrics.first(), metrics.last()) else {
        return 0.0;
    };
    if metrics.len() < 2 || oldest.derived_rate == 0.0 {
        return 0.0;
    }
    (latest.derived_rate - oldest.derived_rate) / oldest.derived_rate * 100.0
}

/// Supply position for a ward
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceMetric {
    pub ward_id: String,
    pub patients_needing: u32,
    pub available_dressings: u32,
    pub available_catheters: u32,
}

impl ResourceMetric {
    /// Percentage of patients without a dressing available
    pub fn dressings_deficit_rate(&self) -> f64 {
        deficit_rate(self.patients_needing, self.available_dressings)
    }

    /// Percentage of patients without a catheter available
    pub fn catheters_deficit_rate(&self) -> f64 {
        deficit_rate(self.patients_needing, self.available_catheters)
    }

    pub fn combined_rate(&self) -> f64 {
        (self.dressings_deficit_rate() + self.catheters_deficit_rate()) / 2.0
    }

    pub fn band(&self) -> RiskBand {
        resource_band_from_rate(self.combined_rate())
    }
}

fn deficit_rate(needing: u32, available: u32) -> f64 {
    if needing == 0 {
        return 0.0;
    }
    f64::from(needing.saturating_sub(available)) / f64::from(needing) * 100.0
}

/// Band for a combined deficit percentage
pub fn resource_band_from_rate(rate: f64) -> RiskBand {
    if rate <= 10.0 {
        RiskBand::Green
    } else if rate <= 60.0 {
        RiskBand::Yellow
    } else {
        RiskBand::Red
    }
}

/// Shortage alert for a ward, if its supply band is not green
pub fn resource_shortage_alert(resources: &ResourceMetric) -> Option<AlertTrigger> {
    let severity = match resources.band() {
        RiskBand::Green => return None,
        RiskBand::Yellow => AlertSeverity::Warning,
        RiskBand::Red => AlertSeverity::Critical,
    };

    Some(AlertTrigger {
        alert_type: AlertType::ResourceShortage,
        severity,
        reason: format!(
            "Ward {} supply deficit {:.1}% ({} dressings, {} catheters for {} patients)",
            resources.ward_id,
            resources.combined_rate(),
            resources.available_dressings,
            resources.available_catheters,
            resources.patients_needing
        ),
        recommended_action: "Escalate restock of dressings and catheters".to_string(),
    })
}
