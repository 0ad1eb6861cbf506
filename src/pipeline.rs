//! Pipeline orchestration
//!
//! This module provides the public API for CVC Sentinel.
//! It runs a capture through every stage of the engine:
//! Normalizer → SubScoreCalculator → PhaseComposer → BandMapper → AlertEvaluator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::alerts::{dressing_failure, AlertEvaluator};
use crate::bands::{recommended_action, venous_resistance_band, BandMapper};
use crate::composer::{CompositionInputs, PhaseComposer};
use crate::config::EngineConfig;
use crate::encoder::AssessmentEncoder;
use crate::error::ComputeError;
use crate::history::{SnapshotHistory, TrendPoint};
use crate::normalizer::{coerce_flag, Normalizer};
use crate::scoring::SubScoreCalculator;
use crate::shift::{ShiftLedger, ShiftRecord};
use crate::types::{
    AssessmentPayload, PartialImageSignals, PatientFactorFlags, RiskAssessment, RiskInput,
    RiskPhase, RiskSnapshot, SafetyChecklist, ShiftTelemetry, TelemetryUpdate,
};
use crate::vision::{parse_vision_text, DisabledVision, VisionProvider};

/// The risk-computation engine.
///
/// Pure and stateless between calls: identical input always yields identical
/// output. The only clock is the `now` carried in the input.
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskEngine {
    config: EngineConfig,
    bands: BandMapper,
}

impl RiskEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            bands: BandMapper::new(config.thresholds),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Compute the risk snapshot and its alerts
    pub fn compute(&self, input: &RiskInput) -> RiskAssessment {
        // Stage 1: Fill in missing vision output
        let image = Normalizer::normalize_image(input.signals.as_ref());

        // Stage 2: Independent sub-scores
        let scores = SubScoreCalculator::calculate(
            &image.signals,
            input.safety_checklist.dressing_intact,
            &input.telemetry,
            &input.patient_factors,
            input.insertion_date,
            input.now,
        );

        // Stage 3: Phase-aware composites
        let composite = PhaseComposer::compose(
            &scores,
            &CompositionInputs {
                night_mode_assist: input.night_mode_assist,
                adaptive_traction_alert: input.telemetry.adaptive_traction_alert,
                trend_deterioration: input.trend_deterioration,
                risk_phase_override: input.risk_phase_override,
            },
        );

        // Stage 4: Bands and action
        let snapshot = RiskSnapshot {
            captured_at: input.now,
            clisa_score: scores.clisa,
            predictive_clabsi_score: composite.predictive,
            predictive_clabsi_band: self.bands.clabsi_band(composite.predictive),
            predictive_venous_resistance_band: venous_resistance_band(&input.telemetry),
            recommended_action: recommended_action(composite.predictive).to_string(),
            risk_phase: composite.phase,
            early_clabsi_score: composite.early,
            late_clabsi_score: composite.late,
            trend_penalty: composite.trend_penalty.round() as u8,
            adaptive_traction_alert: input.telemetry.adaptive_traction_alert,
            traction_pulls_yellow: input.telemetry.traction_pulls_yellow,
            traction_pulls_red: input.telemetry.traction_pulls_red,
            dressing_changed: input.telemetry.dressing_changed,
            catheter_changed: input.telemetry.catheter_changed,
            flushing_done: input.telemetry.flushing_done,
        };

        // Stage 5: Alert triggers
        let dressing_failure = dressing_failure(&input.safety_checklist, input.signals.as_ref());
        let alerts = AlertEvaluator::evaluate(&snapshot, dressing_failure);

        debug!(
            score = snapshot.predictive_clabsi_score,
            band = snapshot.predictive_clabsi_band.as_str(),
            phase = snapshot.risk_phase.as_str(),
            "computed risk snapshot"
        );
        if !alerts.is_empty() {
            info!(count = alerts.len(), "risk alerts triggered");
        }

        RiskAssessment {
            snapshot,
            alerts,
            image,
            dressing_failure,
        }
    }
}

/// A capture submitted from the bedside
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureRequest {
    pub patient_id: String,
    pub insertion_date: DateTime<Utc>,
    pub captured_at: DateTime<Utc>,
    pub patient_factors: PatientFactorFlags,
    pub safety_checklist: SafetyChecklist,
    /// Telemetry carried with the capture, merged into the open shift window
    #[serde(default)]
    pub telemetry: Option<TelemetryUpdate>,
    /// Already-extracted vision signals
    #[serde(default)]
    pub signals: Option<PartialImageSignals>,
    /// Free-text reply from an image model, used when `signals` is absent
    #[serde(default)]
    pub vision_reply: Option<String>,
    /// Image reference handed to the processor's vision provider
    #[serde(default)]
    pub image_ref: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub trend_deterioration: Option<f64>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub night_mode_assist: bool,
    #[serde(default, deserialize_with = "lenient_phase")]
    pub risk_phase_override: Option<RiskPhase>,
}

impl CaptureRequest {
    fn validate(&self) -> Result<(), ComputeError> {
        if self.patient_id.trim().is_empty() {
            return Err(ComputeError::MissingField("patient_id".to_string()));
        }
        Ok(())
    }

    /// Signals from the request itself, or from the vision provider
    fn resolve_signals(&self, vision: &dyn VisionProvider) -> Option<PartialImageSignals> {
        if let Some(signals) = self.signals {
            return Some(signals);
        }
        if let Some(reply) = &self.vision_reply {
            return parse_vision_text(reply);
        }
        self.image_ref.as_deref().and_then(|r| vision.analyze(r))
    }

    fn to_input(
        &self,
        telemetry: ShiftTelemetry,
        signals: Option<PartialImageSignals>,
    ) -> RiskInput {
        RiskInput {
            insertion_date: self.insertion_date,
            now: self.captured_at,
            patient_factors: self.patient_factors,
            safety_checklist: self.safety_checklist,
            telemetry,
            signals,
            trend_deterioration: self.trend_deterioration,
            night_mode_assist: self.night_mode_assist,
            risk_phase_override: self.risk_phase_override,
        }
    }
}

/// A telemetry-only submission for the current shift window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySubmission {
    pub patient_id: String,
    pub submitted_at: DateTime<Utc>,
    pub telemetry: TelemetryUpdate,
}

/// Anything the processor accepts, tagged by `kind`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Submission {
    Telemetry(TelemetrySubmission),
    Capture(CaptureRequest),
}

/// What processing a submission produced
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubmissionOutcome {
    Telemetry(ShiftRecord),
    Assessment(Box<AssessmentPayload>),
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }))
}

fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(coerce_flag).unwrap_or(false))
}

fn lenient_phase<'de, D>(deserializer: D) -> Result<Option<RiskPhase>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

/// Assess a single capture JSON and return the encoded payload (stateless, one-shot).
///
/// Telemetry in the request is taken as the whole shift window. Each call uses a
/// fresh encoder, so `producer.instance_id` differs between calls; use
/// [`assess_capture_json_with`] for byte-identical output.
///
/// # Example
/// ```ignore
/// let payload = assess_capture_json(capture_json, EngineConfig::from_env())?;
/// ```
pub fn assess_capture_json(raw_json: String, config: EngineConfig) -> Result<String, ComputeError> {
    assess_capture_json_with(raw_json, config, &AssessmentEncoder::new())
}

/// Assess a single capture JSON with a caller-supplied encoder
pub fn assess_capture_json_with(
    raw_json: String,
    config: EngineConfig,
    encoder: &AssessmentEncoder,
) -> Result<String, ComputeError> {
    // Stage 1: Parse request
    let request: CaptureRequest = serde_json::from_str(&raw_json)?;
    request.validate()?;

    // Stage 2: Compute
    let telemetry = request
        .telemetry
        .as_ref()
        .map(ShiftTelemetry::from_update)
        .unwrap_or_default();
    let signals = request.resolve_signals(&DisabledVision);
    let assessment = RiskEngine::new(config).compute(&request.to_input(telemetry, signals));

    // Stage 3: Encode
    encoder.encode_to_json(&request.patient_id, request.insertion_date, &assessment)
}

/// Persisted processor state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessorState {
    pub ledger: ShiftLedger,
    pub history: SnapshotHistory,
}

/// Stateful processor holding shift windows and snapshot history.
///
/// Use this when telemetry and captures arrive as separate submissions.
pub struct SurveillanceProcessor {
    engine: RiskEngine,
    encoder: AssessmentEncoder,
    vision: Box<dyn VisionProvider>,
    state: ProcessorState,
}

impl Default for SurveillanceProcessor {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl SurveillanceProcessor {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            engine: RiskEngine::new(config),
            encoder: AssessmentEncoder::new(),
            vision: Box::new(DisabledVision),
            state: ProcessorState::default(),
        }
    }

    /// Use a vision provider for captures that carry only an image reference
    pub fn with_vision(mut self, vision: Box<dyn VisionProvider>) -> Self {
        self.vision = vision;
        self
    }

    pub fn with_encoder(mut self, encoder: AssessmentEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn engine(&self) -> &RiskEngine {
        &self.engine
    }

    /// Merge telemetry into the patient's open shift window
    pub fn record_telemetry(
        &mut self,
        patient_id: &str,
        update: &TelemetryUpdate,
        now: DateTime<Utc>,
    ) -> Result<ShiftRecord, ComputeError> {
        self.state
            .ledger
            .upsert(patient_id, update, now)
            .map(|record| record.clone())
    }

    /// Assess a capture against the patient's open shift window
    pub fn process_capture(&mut self, request: &CaptureRequest) -> Result<RiskAssessment, ComputeError> {
        request.validate()?;

        if let Some(update) = &request.telemetry {
            self.state
                .ledger
                .upsert(&request.patient_id, update, request.captured_at)?;
        }

        let telemetry = self
            .state
            .ledger
            .current(&request.patient_id, request.captured_at)
            .map(|record| record.telemetry)
            .unwrap_or_default();
        let signals = request.resolve_signals(self.vision.as_ref());

        let assessment = self.engine.compute(&request.to_input(telemetry, signals));
        self.state
            .history
            .record(&request.patient_id, assessment.snapshot.clone());

        Ok(assessment)
    }

    pub fn process_submission(
        &mut self,
        submission: &Submission,
    ) -> Result<SubmissionOutcome, ComputeError> {
        match submission {
            Submission::Telemetry(t) => self
                .record_telemetry(&t.patient_id, &t.telemetry, t.submitted_at)
                .map(SubmissionOutcome::Telemetry),
            Submission::Capture(request) => self
                .assess(request)
                .map(|payload| SubmissionOutcome::Assessment(Box::new(payload))),
        }
    }

    /// Process a capture and wrap the result in a payload
    pub fn assess(&mut self, request: &CaptureRequest) -> Result<AssessmentPayload, ComputeError> {
        let assessment = self.process_capture(request)?;
        Ok(self
            .encoder
            .encode(&request.patient_id, request.insertion_date, &assessment))
    }

    /// Process one submission JSON and return the outcome as JSON
    pub fn process_json(&mut self, raw_json: &str) -> Result<String, ComputeError> {
        let submission: Submission =
            serde_json::from_str(raw_json).map_err(|e| ComputeError::ParseError(e.to_string()))?;
        let outcome = self.process_submission(&submission)?;
        serde_json::to_string(&outcome).map_err(|e| ComputeError::EncodingError(e.to_string()))
    }

    pub fn trend(&self, patient_id: &str, limit: usize) -> Vec<TrendPoint> {
        self.state.history.trend(patient_id, limit)
    }

    pub fn latest(&self, patient_id: &str) -> Option<&RiskSnapshot> {
        self.state.history.latest(patient_id)
    }

    /// Load shift windows and history from JSON
    pub fn load_state(&mut self, json: &str) -> Result<(), ComputeError> {
        self.state =
            serde_json::from_str(json).map_err(|e| ComputeError::StateError(e.to_string()))?;
        Ok(())
    }

    /// Save shift windows and history to JSON
    pub fn save_state(&self) -> Result<String, ComputeError> {
        serde_json::to_string(&self.state).map_err(|e| ComputeError::StateError(e.to_string()))
    }
}
