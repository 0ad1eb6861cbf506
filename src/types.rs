//! Core types for the CVC Sentinel engine
//!
//! This module defines the data structures that flow through each stage of the
//! engine: patient reference data, shift telemetry, image signals, intermediate
//! sub-scores, and the immutable risk snapshot with its alert triggers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ordinal risk tier shared by the CLABSI and venous-resistance bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskBand {
    Green,
    Yellow,
    Red,
}

impl RiskBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskBand::Green => "green",
            RiskBand::Yellow => "yellow",
            RiskBand::Red => "red",
        }
    }

    /// Raise the band by one level, saturating at red
    pub fn escalate(self) -> Self {
        match self {
            RiskBand::Green => RiskBand::Yellow,
            RiskBand::Yellow | RiskBand::Red => RiskBand::Red,
        }
    }
}

/// Which composite drives the predictive score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskPhase {
    Early,
    Late,
}

impl RiskPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskPhase::Early => "early",
            RiskPhase::Late => "late",
        }
    }
}

/// Patient-level risk flags recorded at admission; unrecorded flags are unset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatientFactorFlags {
    pub agitation: bool,
    #[serde(alias = "extremesAgeWeightObesity")]
    pub extremes_age_weight_obesity: bool,
    pub comorbidities: bool,
    #[serde(alias = "immuneNutrition")]
    pub immune_nutrition: bool,
}

impl PatientFactorFlags {
    /// Number of flags set
    pub fn count(&self) -> usize {
        [
            self.agitation,
            self.extremes_age_weight_obesity,
            self.comorbidities,
            self.immune_nutrition,
        ]
        .iter()
        .filter(|flag| **flag)
        .count()
    }
}

/// Bedside safety attestations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyChecklist {
    #[serde(alias = "capsClosed")]
    pub caps_closed: bool,
    #[serde(alias = "glovesWorn")]
    pub gloves_worn: bool,
    #[serde(alias = "noAbnormalities")]
    pub no_abnormalities: bool,
    #[serde(alias = "dressingIntact")]
    pub dressing_intact: bool,
}

impl Default for SafetyChecklist {
    fn default() -> Self {
        Self {
            caps_closed: true,
            gloves_worn: true,
            no_abnormalities: true,
            dressing_intact: true,
        }
    }
}

/// Complete site-appearance vector used for scoring
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageSignals {
    /// Erythema severity (0-3)
    pub erythema: u8,
    /// Drainage severity (0-3)
    pub drainage: u8,
    /// Ooze severity (0-3)
    pub ooze: u8,
    /// Moisture severity (0-3)
    pub moisture: u8,
    /// Dressing lift (percentage, 0-100)
    pub dressing_lift: f64,
    /// Chlorhexidine antiseptic patch present
    pub chg_patch: bool,
    /// Skin maceration present
    pub maceration: bool,
}

/// The conservative baseline: unremarkable but unverified.
impl Default for ImageSignals {
    fn default() -> Self {
        Self {
            erythema: 1,
            drainage: 0,
            ooze: 0,
            moisture: 1,
            dressing_lift: 5.0,
            chg_patch: true,
            maceration: false,
        }
    }
}

/// Whatever subset of the site-appearance vector a vision step produced.
///
/// Deserializes from any JSON value; unusable fields become `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "serde_json::Value")]
pub struct PartialImageSignals {
    pub erythema: Option<u8>,
    pub drainage: Option<u8>,
    pub ooze: Option<u8>,
    pub moisture: Option<u8>,
    pub dressing_lift: Option<f64>,
    pub chg_patch: Option<bool>,
    pub maceration: Option<bool>,
}

/// Field names of the site-appearance vector, for quality reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageField {
    Erythema,
    Drainage,
    Ooze,
    Moisture,
    DressingLift,
    ChgPatch,
    Maceration,
}

/// Image signals after defaults have been filled in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedImageSignals {
    /// Complete vector used for scoring
    pub signals: ImageSignals,
    /// Whether any vision output was supplied at all
    pub vision_available: bool,
    /// Fields that fell back to the conservative baseline
    pub defaulted_fields: Vec<ImageField>,
}

/// Telemetry for one 12-hour shift window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShiftTelemetry {
    pub traction_pulls_yellow: u32,
    pub traction_pulls_red: u32,
    pub dressing_changed: bool,
    pub catheter_changed: bool,
    pub flushing_done: bool,
    pub adaptive_traction_alert: bool,
}

/// A loosely-typed telemetry submission after coercion.
///
/// `None` means "not supplied"; it is never the same as zero or false.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "serde_json::Value")]
pub struct TelemetryUpdate {
    pub traction_pulls_yellow: Option<u32>,
    pub traction_pulls_red: Option<u32>,
    pub dressing_changed: Option<bool>,
    pub catheter_changed: Option<bool>,
    pub flushing_done: Option<bool>,
    pub adaptive_traction_alert: Option<bool>,
}

/// Everything the engine needs for one computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskInput {
    /// Catheter insertion time
    pub insertion_date: DateTime<Utc>,
    /// Reference time for dwell and phase calculations
    pub now: DateTime<Utc>,
    pub patient_factors: PatientFactorFlags,
    pub safety_checklist: SafetyChecklist,
    pub telemetry: ShiftTelemetry,
    /// Vision output, if the vision step ran
    pub signals: Option<PartialImageSignals>,
    /// Externally supplied deterioration signal (clamped to 0-3)
    pub trend_deterioration: Option<f64>,
    pub night_mode_assist: bool,
    pub risk_phase_override: Option<RiskPhase>,
}

/// Independent sub-scores, each clamped into its documented range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubScores {
    /// Site appearance (CLISA, 0-4)
    pub clisa: u8,
    /// Traction/device stress (0-3, half-point steps)
    pub traction: f64,
    /// Patient risk factors (0-3)
    pub patient_factors: u8,
    /// Dwell-time adjustment (0 or 1)
    pub dwell_adjustment: u8,
    /// Whole days since insertion
    pub elapsed_days: i64,
}

/// Phase-aware composite scores
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompositeScores {
    pub early: u32,
    pub late: u32,
    pub phase: RiskPhase,
    /// Early composite when phase is early, late composite otherwise
    pub predictive: u32,
    /// Traction score plus the adaptive-hardware bonus (0-4)
    pub adjusted_traction: f64,
    /// Deterioration signal after clamping (0-3)
    pub trend_penalty: f64,
}

/// Immutable computed risk record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskSnapshot {
    pub captured_at: DateTime<Utc>,
    pub clisa_score: u8,
    pub predictive_clabsi_score: u32,
    pub predictive_clabsi_band: RiskBand,
    pub predictive_venous_resistance_band: RiskBand,
    pub recommended_action: String,
    pub risk_phase: RiskPhase,
    pub early_clabsi_score: u32,
    pub late_clabsi_score: u32,
    pub trend_penalty: u8,
    pub adaptive_traction_alert: bool,
    pub traction_pulls_yellow: u32,
    pub traction_pulls_red: u32,
    /// Shift events from the telemetry window the snapshot was computed against
    #[serde(default)]
    pub dressing_changed: bool,
    #[serde(default)]
    pub catheter_changed: bool,
    #[serde(default)]
    pub flushing_done: bool,
}

/// Discrete alert categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    Traction,
    DressingFailure,
    HighClabsi,
    HighVenousResistance,
    ResourceShortage,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::Traction => "traction",
            AlertType::DressingFailure => "dressing_failure",
            AlertType::HighClabsi => "high_clabsi",
            AlertType::HighVenousResistance => "high_venous_resistance",
            AlertType::ResourceShortage => "resource_shortage",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

/// A derived alert event, handed to the external alert store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertTrigger {
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub reason: String,
    pub recommended_action: String,
}

/// Snapshot plus the alerts it fired
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub snapshot: RiskSnapshot,
    pub alerts: Vec<AlertTrigger>,
    pub image: NormalizedImageSignals,
    pub dressing_failure: bool,
}

/// Producer metadata for encoded payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayloadProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Provenance of an encoded assessment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayloadProvenance {
    pub patient_id: String,
    pub captured_at_utc: String,
    pub days_since_insertion: i64,
}

/// Input quality for an encoded assessment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayloadQuality {
    pub vision_available: bool,
    pub defaulted_fields: Vec<ImageField>,
    pub dressing_failure: bool,
}

/// Complete encoded assessment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentPayload {
    pub payload_version: String,
    pub producer: PayloadProducer,
    pub provenance: PayloadProvenance,
    pub quality: PayloadQuality,
    pub snapshot: RiskSnapshot,
    pub alerts: Vec<AlertTrigger>,
}
