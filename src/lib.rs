//! CVC Sentinel - Deterministic risk engine for central venous catheter surveillance
//!
//! Sentinel turns a bedside capture (site image signals, shift telemetry and
//! patient factors) into a risk snapshot through a deterministic pipeline:
//! normalization → sub-scoring → phase composition → banding → alert evaluation.
//!
//! ## Modules
//!
//! - **Engine**: Pure risk computation over one capture ([`RiskEngine`])
//! - **Processor**: Shift windows and snapshot history across captures ([`SurveillanceProcessor`])
//! - **Ward**: Ward-level CLABSI rates and supply shortage alerts

pub mod alerts;
pub mod bands;
pub mod composer;
pub mod config;
pub mod encoder;
pub mod error;
pub mod history;
pub mod normalizer;
pub mod pipeline;
pub mod scoring;
pub mod shift;
pub mod types;
pub mod vision;
pub mod ward;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::{EngineConfig, RiskThresholds};
pub use encoder::AssessmentEncoder;
pub use error::ComputeError;
pub use pipeline::{
    assess_capture_json, assess_capture_json_with, CaptureRequest, RiskEngine, Submission,
    SurveillanceProcessor,
};
pub use types::{AlertTrigger, RiskAssessment, RiskBand, RiskInput, RiskPhase, RiskSnapshot};
pub use vision::VisionProvider;

/// Engine version embedded in all assessment payloads
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for assessment payloads
pub const PRODUCER_NAME: &str = "cvc-sentinel";
