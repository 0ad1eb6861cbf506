//! Signal normalization
//!
//! This module turns loosely-typed inputs into canonical values.
//! - Telemetry counts and flags coerced from numbers, strings or booleans
//! - Partial vision output filled in with the conservative baseline
//! - Unusable input becomes "no value", never zero

use serde_json::Value;

use crate::types::{
    ImageField, ImageSignals, NormalizedImageSignals, PartialImageSignals, TelemetryUpdate,
};

/// Highest ordinal severity a vision feature can carry
pub const MAX_SEVERITY: u8 = 3;

/// Coerce a JSON number or numeric string to a finite float
pub fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok()?
        }
        _ => return None,
    };
    number.is_finite().then_some(number)
}

/// Coerce a telemetry count.
///
/// Finite non-negative numbers and numeric strings round to the nearest integer.
/// Negative, non-finite, empty or unparseable input yields `None`.
pub fn coerce_count(value: &Value) -> Option<u32> {
    let number = coerce_number(value)?;
    if number < 0.0 {
        return None;
    }

    // Float-to-int casts saturate, so oversized counts pin at u32::MAX
    Some(number.round() as u32)
}

/// Coerce a telemetry flag.
///
/// Booleans pass through, numbers map to `> 0`, and the strings "true"/"false"
/// match case-insensitively after trimming. Anything else yields `None`.
pub fn coerce_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|v| v > 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

impl From<Value> for TelemetryUpdate {
    fn from(value: Value) -> Self {
        let field = |snake: &str, camel: &str| {
            value
                .get(snake)
                .filter(|v| !v.is_null())
                .or_else(|| value.get(camel))
        };

        TelemetryUpdate {
            traction_pulls_yellow: field("traction_pulls_yellow", "tractionPullsYellow")
                .and_then(coerce_count),
            traction_pulls_red: field("traction_pulls_red", "tractionPullsRed")
                .and_then(coerce_count),
            dressing_changed: field("dressing_changed", "dressingChanged").and_then(coerce_flag),
            catheter_changed: field("catheter_changed", "catheterChanged").and_then(coerce_flag),
            flushing_done: field("flushing_done", "flushingDone").and_then(coerce_flag),
            adaptive_traction_alert: field("adaptive_traction_alert", "adaptiveTractionAlert")
                .and_then(coerce_flag),
        }
    }
}

impl From<Value> for PartialImageSignals {
    fn from(value: Value) -> Self {
        let field = |snake: &str, camel: &str| {
            value
                .get(snake)
                .filter(|v| !v.is_null())
                .or_else(|| value.get(camel))
        };
        let severity = |name: &str| {
            field(name, name)
                .and_then(coerce_number)
                .map(|v| v.round().clamp(0.0, f64::from(MAX_SEVERITY)) as u8)
        };
        let flag = |snake: &str, camel: &str| field(snake, camel).and_then(Value::as_bool);

        PartialImageSignals {
            erythema: severity("erythema"),
            drainage: severity("drainage"),
            ooze: severity("ooze"),
            moisture: severity("moisture"),
            dressing_lift: field("dressing_lift", "dressingLift")
                .and_then(coerce_number)
                .map(|v| v.clamp(0.0, 100.0)),
            chg_patch: flag("chg_patch", "chgPatch"),
            maceration: flag("maceration", "maceration"),
        }
    }
}

/// Normalizer for filling partial vision output
pub struct Normalizer;

impl Normalizer {
    /// Produce a complete signal vector, recording which fields were defaulted.
    ///
    /// Absent vision output yields exactly the conservative baseline.
    pub fn normalize_image(partial: Option<&PartialImageSignals>) -> NormalizedImageSignals {
        let baseline = ImageSignals::default();
        let Some(partial) = partial else {
            return NormalizedImageSignals {
                signals: baseline,
                vision_available: false,
                defaulted_fields: vec![
                    ImageField::Erythema,
                    ImageField::Drainage,
                    ImageField::Ooze,
                    ImageField::Moisture,
                    ImageField::DressingLift,
                    ImageField::ChgPatch,
                    ImageField::Maceration,
                ],
            };
        };

        let mut defaulted_fields = Vec::new();
        let mut take = |value: Option<u8>, fallback: u8, field: ImageField| {
            value.unwrap_or_else(|| {
                defaulted_fields.push(field);
                fallback
            })
        };

        let erythema = take(partial.erythema, baseline.erythema, ImageField::Erythema);
        let drainage = take(partial.drainage, baseline.drainage, ImageField::Drainage);
        let ooze = take(partial.ooze, baseline.ooze, ImageField::Ooze);
        let moisture = take(partial.moisture, baseline.moisture, ImageField::Moisture);

        let dressing_lift = partial.dressing_lift.unwrap_or_else(|| {
            defaulted_fields.push(ImageField::DressingLift);
            baseline.dressing_lift
        });
        let chg_patch = partial.chg_patch.unwrap_or_else(|| {
            defaulted_fields.push(ImageField::ChgPatch);
            baseline.chg_patch
        });
        let maceration = partial.maceration.unwrap_or_else(|| {
            defaulted_fields.push(ImageField::Maceration);
            baseline.maceration
        });

        NormalizedImageSignals {
            signals: ImageSignals {
                erythema: erythema.min(MAX_SEVERITY),
                drainage: drainage.min(MAX_SEVERITY),
                ooze: ooze.min(MAX_SEVERITY),
                moisture: moisture.min(MAX_SEVERITY),
                dressing_lift: dressing_lift.clamp(0.0, 100.0),
                chg_patch,
                maceration,
            },
            vision_available: true,
            defaulted_fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coerce_count() {
        assert_eq!(coerce_count(&json!(3)), Some(3));
        assert_eq!(coerce_count(&json!(2.6)), Some(3));
        assert_eq!(coerce_count(&json!("4")), Some(4));
        assert_eq!(coerce_count(&json!(" 1.4 ")), Some(1));
        assert_eq!(coerce_count(&json!(0)), Some(0));

        // "No value" is distinct from zero
        assert_eq!(coerce_count(&json!(-1)), None);
        assert_eq!(coerce_count(&json!("abc")), None);
        assert_eq!(coerce_count(&json!("")), None);
        assert_eq!(coerce_count(&json!("NaN")), None);
        assert_eq!(coerce_count(&json!(true)), None);
        assert_eq!(coerce_count(&Value::Null), None);
    }

    #[test]
    fn test_coerce_flag() {
        assert_eq!(coerce_flag(&json!(true)), Some(true));
        assert_eq!(coerce_flag(&json!(false)), Some(false));
        assert_eq!(coerce_flag(&json!(1)), Some(true));
        assert_eq!(coerce_flag(&json!(0)), Some(false));
        assert_eq!(coerce_flag(&json!(" TRUE ")), Some(true));
        assert_eq!(coerce_flag(&json!("False")), Some(false));
        assert_eq!(coerce_flag(&json!("yes")), None);
        assert_eq!(coerce_flag(&json!([true])), None);
    }

    #[test]
    fn test_telemetry_update_from_loose_json() {
        let update: TelemetryUpdate = serde_json::from_value(json!({
            "tractionPullsYellow": "2",
            "traction_pulls_red": -4,
            "dressingChanged": "true",
            "flushing_done": 0
        }))
        .unwrap();

        assert_eq!(update.traction_pulls_yellow, Some(2));
        assert_eq!(update.traction_pulls_red, None);
        assert_eq!(update.dressing_changed, Some(true));
        assert_eq!(update.catheter_changed, None);
        assert_eq!(update.flushing_done, Some(false));
        assert_eq!(update.adaptive_traction_alert, None);
    }

    #[test]
    fn test_missing_signals_use_baseline() {
        let normalized = Normalizer::normalize_image(None);

        assert!(!normalized.vision_available);
        assert_eq!(normalized.signals, ImageSignals::default());
        assert_eq!(normalized.defaulted_fields.len(), 7);
    }

    #[test]
    fn test_baseline_is_not_all_zero() {
        let baseline = ImageSignals::default();
        assert_eq!(baseline.erythema, 1);
        assert_eq!(baseline.moisture, 1);
        assert!((baseline.dressing_lift - 5.0).abs() < f64::EPSILON);
        assert!(baseline.chg_patch);
        assert!(!baseline.maceration);
    }

    #[test]
    fn test_partial_signals_merge_with_baseline() {
        let partial: PartialImageSignals = serde_json::from_value(json!({
            "erythema": 3,
            "drainage": "lots",
            "dressingLift": 40,
            "maceration": true,
            "chgPatch": "no"
        }))
        .unwrap();

        let normalized = Normalizer::normalize_image(Some(&partial));

        assert!(normalized.vision_available);
        assert_eq!(normalized.signals.erythema, 3);
        assert_eq!(normalized.signals.drainage, 0);
        assert_eq!(normalized.signals.moisture, 1);
        assert!((normalized.signals.dressing_lift - 40.0).abs() < f64::EPSILON);
        assert!(normalized.signals.maceration);
        assert!(normalized.signals.chg_patch);
        assert!(normalized.defaulted_fields.contains(&ImageField::Drainage));
        assert!(normalized.defaulted_fields.contains(&ImageField::ChgPatch));
        assert!(!normalized.defaulted_fields.contains(&ImageField::Erythema));
    }

    #[test]
    fn test_numeric_string_signals_are_coerced() {
        let partial: PartialImageSignals = serde_json::from_value(json!({
            "erythema": "3",
            "drainage": " 2 ",
            "ooze": "1.4",
            "moisture": "0",
            "dressingLift": "45",
            "maceration": false
        }))
        .unwrap();

        let normalized = Normalizer::normalize_image(Some(&partial));
        assert_eq!(normalized.signals.erythema, 3);
        assert_eq!(normalized.signals.drainage, 2);
        assert_eq!(normalized.signals.ooze, 1);
        assert_eq!(normalized.signals.moisture, 0);
        assert!((normalized.signals.dressing_lift - 45.0).abs() < f64::EPSILON);
        assert_eq!(
            normalized.defaulted_fields,
            vec![ImageField::ChgPatch]
        );

        let checklist = crate::types::SafetyChecklist::default();
        assert!(crate::alerts::dressing_failure(&checklist, Some(&partial)));
    }

    #[test]
    fn test_out_of_range_signals_are_clamped() {
        let partial: PartialImageSignals = serde_json::from_value(json!({
            "erythema": 9,
            "ooze": -2,
            "dressing_lift": 250.0
        }))
        .unwrap();

        let normalized = Normalizer::normalize_image(Some(&partial));
        assert_eq!(normalized.signals.erythema, 3);
        assert_eq!(normalized.signals.ooze, 0);
        assert!((normalized.signals.dressing_lift - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_non_object_signals_default_every_field() {
        let partial: PartialImageSignals = serde_json::from_value(json!("garbage")).unwrap();
        assert_eq!(partial, PartialImageSignals::default());

        let normalized = Normalizer::normalize_image(Some(&partial));
        assert!(normalized.vision_available);
        assert_eq!(normalized.signals, ImageSignals::default());
    }
}
