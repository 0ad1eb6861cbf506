//! Assessment encoding
//!
//! This module wraps a risk assessment in the payload handed to the persistence
//! and alerting collaborators. Timestamps come from the assessment itself, so the
//! same assessment always encodes to the same payload for a given encoder.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::ComputeError;
use crate::scoring::elapsed_days;
use crate::types::{
    AssessmentPayload, PayloadProducer, PayloadProvenance, PayloadQuality, RiskAssessment,
};
use crate::{ENGINE_VERSION, PRODUCER_NAME};

/// Current payload schema version
pub const PAYLOAD_VERSION: &str = "1.0.0";

/// Encoder for assessment payloads
pub struct AssessmentEncoder {
    instance_id: String,
}

impl Default for AssessmentEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl AssessmentEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Encode an assessment for one patient
    pub fn encode(
        &self,
        patient_id: &str,
        insertion_date: DateTime<Utc>,
        assessment: &RiskAssessment,
    ) -> AssessmentPayload {
        let snapshot = &assessment.snapshot;

        AssessmentPayload {
            payload_version: PAYLOAD_VERSION.to_string(),
            producer: PayloadProducer {
                name: PRODUCER_NAME.to_string(),
                version: ENGINE_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            provenance: PayloadProvenance {
                patient_id: patient_id.to_string(),
                captured_at_utc: snapshot.captured_at.to_rfc3339(),
                days_since_insertion: elapsed_days(insertion_date, snapshot.captured_at),
            },
            quality: PayloadQuality {
                vision_available: assessment.image.vision_available,
                defaulted_fields: assessment.image.defaulted_fields.clone(),
                dressing_failure: assessment.dressing_failure,
            },
            snapshot: snapshot.clone(),
            alerts: assessment.alerts.clone(),
        }
    }

    /// Encode to JSON string
    pub fn encode_to_json(
        &self,
        patient_id: &str,
        insertion_date: DateTime<Utc>,
        assessment: &RiskAssessment,
    ) -> Result<String, ComputeError> {
        let payload = self.encode(patient_id, insertion_date, assessment);
        serde_json::to_string_pretty(&payload).map_err(ComputeError::JsonError)
    }
}
