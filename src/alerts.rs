//! Alert trigger evaluation
//!
//! Inspects a computed snapshot plus raw counters and decides which discrete
//! alert events fire. Triggers are emitted in a fixed order so that repeated
//! evaluation of the same input yields the same list.

use crate::types::{
    AlertSeverity, AlertTrigger, AlertType, PartialImageSignals, RiskBand, RiskSnapshot,
    SafetyChecklist,
};

/// Reported dressing lift above this percentage counts as a dressing failure
pub const DRESSING_FAILURE_LIFT: f64 = 30.0;

/// Dressing failure from the checklist and whatever vision actually reported.
///
/// Baseline defaults are never consulted here: absent lift is 0, absent maceration false.
pub fn dressing_failure(checklist: &SafetyChecklist, reported: Option<&PartialImageSignals>) -> bool {
    let lift = reported.and_then(|s| s.dressing_lift).unwrap_or(0.0);
    let maceration = reported.and_then(|s| s.maceration).unwrap_or(false);
    !checklist.dressing_intact || lift > DRESSING_FAILURE_LIFT || maceration
}

/// Evaluator for per-snapshot alert triggers
pub struct AlertEvaluator;

impl AlertEvaluator {
    pub fn evaluate(snapshot: &RiskSnapshot, dressing_failure: bool) -> Vec<AlertTrigger> {
        let mut alerts = Vec::new();

        if snapshot.predictive_clabsi_band == RiskBand::Red {
            alerts.push(AlertTrigger {
                alert_type: AlertType::HighClabsi,
                severity: AlertSeverity::Critical,
                reason: format!(
                    "Predictive CLABSI score {} is in the red band ({} phase)",
                    snapshot.predictive_clabsi_score,
                    snapshot.risk_phase.as_str()
                ),
                recommended_action: snapshot.recommended_action.clone(),
            });
        }

        if snapshot.predictive_venous_resistance_band == RiskBand::Red {
            let reason = if snapshot.adaptive_traction_alert {
                format!(
                    "Venous resistance red: {} red / {} yellow pulls with adaptive hardware alert",
                    snapshot.traction_pulls_red, snapshot.traction_pulls_yellow
                )
            } else {
                format!(
                    "Venous resistance red: {} red / {} yellow pulls this shift",
                    snapshot.traction_pulls_red, snapshot.traction_pulls_yellow
                )
            };
            alerts.push(AlertTrigger {
                alert_type: AlertType::HighVenousResistance,
                severity: AlertSeverity::Critical,
                reason,
                recommended_action: "Check line patency, arrange urgent ultrasound".to_string(),
            });
        }

        if let Some(alert) = traction_alert(snapshot) {
            alerts.push(alert);
        }

        if dressing_failure {
            alerts.push(AlertTrigger {
                alert_type: AlertType::DressingFailure,
                severity: AlertSeverity::Warning,
                reason: "Dressing not intact, lifting or macerated".to_string(),
                recommended_action: "Replace dressing aseptically and reassess site".to_string(),
            });
        }

        alerts
    }
}

fn traction_alert(snapshot: &RiskSnapshot) -> Option<AlertTrigger> {
    if snapshot.traction_pulls_red >= 1 {
        Some(AlertTrigger {
            alert_type: AlertType::Traction,
            severity: AlertSeverity::Warning,
            reason: format!(
                "{} red-tier traction pull(s) recorded",
                snapshot.traction_pulls_red
            ),
            recommended_action: "Secure catheter and inspect traction module".to_string(),
        })
    } else if snapshot.traction_pulls_yellow >= 3 {
        Some(AlertTrigger {
            alert_type: AlertType::Traction,
            severity: AlertSeverity::Info,
            reason: format!(
                "{} yellow-tier traction pulls recorded",
                snapshot.traction_pulls_yellow
            ),
            recommended_action: "Review line securement at next check".to_string(),
        })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RiskPhase;
    use chrono::{TimeZone, Utc};

    fn snapshot() -> RiskSnapshot {
        RiskSnapshot {
            captured_at: Utc.with_ymd_and_hms(2024, 5, 2, 9, 0, 0).unwrap(),
            clisa_score: 2,
            predictive_clabsi_score: 3,
            predictive_clabsi_band: RiskBand::Green,
            predictive_venous_resistance_band: RiskBand::Green,
            recommended_action: "Routine flush Q24h".to_string(),
            risk_phase: RiskPhase::Early,
            early_clabsi_score: 3,
            late_clabsi_score: 3,
            trend_penalty: 0,
            adaptive_traction_alert: false,
            traction_pulls_yellow: 0,
            traction_pulls_red: 0,
            dressing_changed: false,
            catheter_changed: false,
            flushing_done: false,
        }
    }

    #[test]
    fn test_quiet_snapshot_fires_nothing() {
        assert!(AlertEvaluator::evaluate(&snapshot(), false).is_empty());
    }

    #[test]
    fn test_high_clabsi() {
        let mut snap = snapshot();
        snap.predictive_clabsi_band = RiskBand::Red;
        snap.recommended_action = "Venous trauma protocol + urgent ultrasound".to_string();

        let alerts = AlertEvaluator::evaluate(&snap, false);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::HighClabsi);
        assert_eq!(alerts[0].severity, AlertSeverity::Critical);
        assert_eq!(alerts[0].recommended_action, snap.recommended_action);
    }

    #[test]
    fn test_multiple_triggers_in_order() {
        let mut snap = snapshot();
        snap.predictive_clabsi_band = RiskBand::Red;
        snap.predictive_venous_resistance_band = RiskBand::Red;
        snap.traction_pulls_red = 2;

        let types: Vec<AlertType> = AlertEvaluator::evaluate(&snap, true)
            .into_iter()
            .map(|a| a.alert_type)
            .collect();
        assert_eq!(
            types,
            vec![
                AlertType::HighClabsi,
                AlertType::HighVenousResistance,
                AlertType::Traction,
                AlertType::DressingFailure,
            ]
        );
    }

    #[test]
    fn test_traction_thresholds() {
        let mut snap = snapshot();
        snap.traction_pulls_yellow = 2;
        assert!(AlertEvaluator::evaluate(&snap, false).is_empty());

        snap.traction_pulls_yellow = 3;
        let alerts = AlertEvaluator::evaluate(&snap, false);
        assert_eq!(alerts[0].alert_type, AlertType::Traction);
        assert_eq!(alerts[0].severity, AlertSeverity::Info);

        snap.traction_pulls_red = 1;
        let alerts = AlertEvaluator::evaluate(&snap, false);
        assert_eq!(alerts[0].severity, AlertSeverity::Warning);
    }

    #[test]
    fn test_dressing_failure_flag() {
        let intact = SafetyChecklist::default();
        assert!(!dressing_failure(&intact, None));

        let broken = SafetyChecklist {
            dressing_intact: false,
            ..intact
        };
        assert!(dressing_failure(&broken, None));

        let lifted = PartialImageSignals {
            dressing_lift: Some(31.0),
            ..Default::default()
        };
        assert!(dressing_failure(&intact, Some(&lifted)));

        let edge = PartialImageSignals {
            dressing_lift: Some(30.0),
            ..Default::default()
        };
        assert!(!dressing_failure(&intact, Some(&edge)));

        let macerated = PartialImageSignals {
            maceration: Some(true),
            ..Default::default()
        };
        assert!(dressing_failure(&intact, Some(&macerated)));
    }
}
