//! Property tests over the risk engine's range and ordering guarantees.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

use cvc_sentinel::bands::venous_resistance_band;
use cvc_sentinel::normalizer::{coerce_count, Normalizer};
use cvc_sentinel::scoring::{patient_factor_score, traction_score};
use cvc_sentinel::types::{
    ImageSignals, PartialImageSignals, PatientFactorFlags, SafetyChecklist, ShiftTelemetry,
};
use cvc_sentinel::{RiskEngine, RiskInput, RiskPhase};

fn reference_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
}

fn factors() -> impl Strategy<Value = PatientFactorFlags> {
    (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(|(a, b, c, d)| {
        PatientFactorFlags {
            agitation: a,
            extremes_age_weight_obesity: b,
            comorbidities: c,
            immune_nutrition: d,
        }
    })
}

fn telemetry() -> impl Strategy<Value = ShiftTelemetry> {
    (
        0u32..20,
        0u32..10,
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(yellow, red, dressing, catheter, flushing, adaptive)| ShiftTelemetry {
            traction_pulls_yellow: yellow,
            traction_pulls_red: red,
            dressing_changed: dressing,
            catheter_changed: catheter,
            flushing_done: flushing,
            adaptive_traction_alert: adaptive,
        })
}

fn partial_signals() -> impl Strategy<Value = Option<PartialImageSignals>> {
    proptest::option::of(
        (
            proptest::option::of(0u8..=3),
            proptest::option::of(0u8..=3),
            proptest::option::of(0u8..=3),
            proptest::option::of(0u8..=3),
            proptest::option::of(0.0f64..=100.0),
            proptest::option::of(any::<bool>()),
            proptest::option::of(any::<bool>()),
        )
            .prop_map(|(erythema, drainage, ooze, moisture, lift, chg, maceration)| {
                PartialImageSignals {
                    erythema,
                    drainage,
                    ooze,
                    moisture,
                    dressing_lift: lift,
                    chg_patch: chg,
                    maceration,
                }
            }),
    )
}

fn risk_input() -> impl Strategy<Value = RiskInput> {
    (
        0i64..60,
        factors(),
        any::<bool>(),
        telemetry(),
        partial_signals(),
        proptest::option::of(-10.0f64..10.0),
        any::<bool>(),
        proptest::option::of(prop_oneof![Just(RiskPhase::Early), Just(RiskPhase::Late)]),
    )
        .prop_map(
            |(days, factors, intact, telemetry, signals, trend, night, phase)| RiskInput {
                insertion_date: reference_now() - Duration::days(days),
                now: reference_now(),
                patient_factors: factors,
                safety_checklist: SafetyChecklist {
                    dressing_intact: intact,
                    ..Default::default()
                },
                telemetry,
                signals,
                trend_deterioration: trend,
                night_mode_assist: night,
                risk_phase_override: phase,
            },
        )
}

proptest! {
    #[test]
    fn snapshot_scores_stay_in_range(input in risk_input()) {
        let snapshot = RiskEngine::default().compute(&input).snapshot;

        prop_assert!(snapshot.clisa_score <= 4);
        prop_assert!(snapshot.trend_penalty <= 3);
        // 4 + 3 + 1 at most
        prop_assert!(snapshot.early_clabsi_score <= 8);
        prop_assert!(snapshot.late_clabsi_score <= 15);

        let expected = match snapshot.risk_phase {
            RiskPhase::Early => snapshot.early_clabsi_score,
            RiskPhase::Late => snapshot.late_clabsi_score,
        };
        prop_assert_eq!(snapshot.predictive_clabsi_score, expected);
    }

    #[test]
    fn compute_is_idempotent(input in risk_input()) {
        let engine = RiskEngine::default();
        prop_assert_eq!(engine.compute(&input), engine.compute(&input));
    }

    #[test]
    fn traction_score_is_clamped(telemetry in telemetry()) {
        let score = traction_score(&telemetry);
        prop_assert!((0.0..=3.0).contains(&score));
    }

    #[test]
    fn adding_a_patient_factor_never_lowers_the_score(input in risk_input()) {
        let engine = RiskEngine::default();
        let base = engine.compute(&input).snapshot;

        let mut flagged = input.clone();
        flagged.patient_factors.immune_nutrition = true;
        let raised = engine.compute(&flagged).snapshot;

        prop_assert!(patient_factor_score(&flagged.patient_factors) >= patient_factor_score(&input.patient_factors));
        prop_assert!(raised.early_clabsi_score >= base.early_clabsi_score);
        prop_assert!(raised.late_clabsi_score >= base.late_clabsi_score);
    }

    #[test]
    fn adaptive_alert_never_lowers_venous_band(telemetry in telemetry()) {
        let quiet = ShiftTelemetry { adaptive_traction_alert: false, ..telemetry };
        let alerted = ShiftTelemetry { adaptive_traction_alert: true, ..telemetry };
        prop_assert!(venous_resistance_band(&alerted) >= venous_resistance_band(&quiet));
    }

    #[test]
    fn counts_coerce_only_from_non_negative_numbers(n in -1000.0f64..1000.0) {
        let coerced = coerce_count(&serde_json::json!(n));
        if n >= 0.0 {
            prop_assert_eq!(coerced, Some(n.round() as u32));
        } else {
            prop_assert_eq!(coerced, None);
        }
    }
}

#[test]
fn absent_signals_normalize_to_baseline() {
    let normalized = Normalizer::normalize_image(None);
    assert_eq!(normalized.signals, ImageSignals::default());
    assert!(!normalized.vision_available);
}
