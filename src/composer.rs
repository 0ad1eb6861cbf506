//! Phase-aware composition
//!
//! Combines sub-scores into early and late composites and selects the active one
//! from insertion age. Both composites are always reported.

use crate::types::{CompositeScores, RiskPhase, SubScores};

/// Lines this many days old or younger are in the early phase
pub const EARLY_PHASE_MAX_DAYS: i64 = 3;
/// Ceiling of the deterioration trend penalty
pub const TREND_PENALTY_MAX: f64 = 3.0;
/// Ceiling of the traction score once the adaptive-hardware bonus is added
pub const ADJUSTED_TRACTION_MAX: f64 = 4.0;

/// Optional modifiers supplied alongside the sub-scores
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CompositionInputs {
    pub night_mode_assist: bool,
    pub adaptive_traction_alert: bool,
    pub trend_deterioration: Option<f64>,
    pub risk_phase_override: Option<RiskPhase>,
}

/// Composer for the phase-aware predictive score
pub struct PhaseComposer;

impl PhaseComposer {
    pub fn compose(scores: &SubScores, inputs: &CompositionInputs) -> CompositeScores {
        let imaging_bonus = if inputs.night_mode_assist { -1.0 } else { 0.0 };
        let adaptive_bonus = if inputs.adaptive_traction_alert { 1.0 } else { 0.0 };
        let trend_penalty = trend_penalty(inputs.trend_deterioration);

        let adjusted_traction = (scores.traction + adaptive_bonus).clamp(0.0, ADJUSTED_TRACTION_MAX);

        let early = round_non_negative(
            f64::from(scores.clisa)
                + f64::from(scores.patient_factors)
                + f64::from(scores.dwell_adjustment)
                + imaging_bonus,
        );
        // Traction half-points are only rounded here
        let late = round_non_negative(f64::from(early) + adjusted_traction + trend_penalty);

        let phase = select_phase(scores.elapsed_days, inputs.risk_phase_override);
        let predictive = match phase {
            RiskPhase::Early => early,
            RiskPhase::Late => late,
        };

        CompositeScores {
            early,
            late,
            phase,
            predictive,
            adjusted_traction,
            trend_penalty,
        }
    }
}

/// Early phase covers the first three whole days; an override always wins
pub fn select_phase(elapsed_days: i64, override_phase: Option<RiskPhase>) -> RiskPhase {
    if let Some(phase) = override_phase {
        return phase;
    }
    if elapsed_days <= EARLY_PHASE_MAX_DAYS {
        RiskPhase::Early
    } else {
        RiskPhase::Late
    }
}

/// Deterioration signal clamped to 0-3; absent or non-finite means none
pub fn trend_penalty(deterioration: Option<f64>) -> f64 {
    deterioration
        .filter(|value| value.is_finite())
        .map(|value| value.clamp(0.0, TREND_PENALTY_MAX))
        .unwrap_or(0.0)
}

fn round_non_negative(value: f64) -> u32 {
    value.max(0.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(clisa: u8, traction: f64, factors: u8, dwell: u8, days: i64) -> SubScores {
        SubScores {
            clisa,
            traction,
            patient_factors: factors,
            dwell_adjustment: dwell,
            elapsed_days: days,
        }
    }

    #[test]
    fn test_phase_boundary() {
        assert_eq!(select_phase(0, None), RiskPhase::Early);
        assert_eq!(select_phase(3, None), RiskPhase::Early);
        assert_eq!(select_phase(4, None), RiskPhase::Late);
        assert_eq!(select_phase(30, Some(RiskPhase::Early)), RiskPhase::Early);
        assert_eq!(select_phase(1, Some(RiskPhase::Late)), RiskPhase::Late);
    }

    #[test]
    fn test_early_and_late_both_computed() {
        let composite = PhaseComposer::compose(&scores(2, 2.0, 1, 0, 2), &CompositionInputs::default());

        assert_eq!(composite.phase, RiskPhase::Early);
        assert_eq!(composite.early, 3);
        assert_eq!(composite.late, 5);
        assert_eq!(composite.predictive, 3);

        let composite = PhaseComposer::compose(&scores(2, 2.0, 1, 0, 5), &CompositionInputs::default());
        assert_eq!(composite.phase, RiskPhase::Late);
        assert_eq!(composite.early, 3);
        assert_eq!(composite.late, 5);
        assert_eq!(composite.predictive, 5);
    }

    #[test]
    fn test_half_point_rounds_up_at_assembly() {
        let composite = PhaseComposer::compose(&scores(2, 2.5, 2, 1, 10), &CompositionInputs::default());
        assert_eq!(composite.early, 5);
        // 5 + 2.5 = 7.5
        assert_eq!(composite.late, 8);
    }

    #[test]
    fn test_night_mode_bonus_never_goes_negative() {
        let inputs = CompositionInputs {
            night_mode_assist: true,
            ..Default::default()
        };
        let composite = PhaseComposer::compose(&scores(0, 0.0, 0, 0, 1), &inputs);
        assert_eq!(composite.early, 0);
        assert_eq!(composite.late, 0);

        let composite = PhaseComposer::compose(&scores(3, 0.0, 1, 0, 1), &inputs);
        assert_eq!(composite.early, 3);
    }

    #[test]
    fn test_adaptive_bonus_caps_at_four() {
        let inputs = CompositionInputs {
            adaptive_traction_alert: true,
            ..Default::default()
        };
        let composite = PhaseComposer::compose(&scores(0, 3.0, 0, 0, 6), &inputs);
        assert_eq!(composite.adjusted_traction, 4.0);
        assert_eq!(composite.late, 4);
    }

    #[test]
    fn test_trend_penalty_clamped() {
        assert_eq!(trend_penalty(None), 0.0);
        assert_eq!(trend_penalty(Some(-5.0)), 0.0);
        assert_eq!(trend_penalty(Some(1.5)), 1.5);
        assert_eq!(trend_penalty(Some(99.0)), 3.0);
        assert_eq!(trend_penalty(Some(f64::NAN)), 0.0);

        let inputs = CompositionInputs {
            trend_deterioration: Some(50.0),
            ..Default::default()
        };
        let composite = PhaseComposer::compose(&scores(1, 0.0, 0, 0, 8), &inputs);
        assert_eq!(composite.late, 4);
    }
}
