//! Vision capability
//!
//! Image analysis lives outside the engine. Providers return whatever subset of
//! the site-appearance vector they could extract, or nothing at all; the engine
//! defaults around the gaps.

use serde_json::Value;
use tracing::debug;

use crate::types::PartialImageSignals;

/// Trait for image-analysis providers
pub trait VisionProvider {
    /// Analyze a captured site image.
    ///
    /// Timeouts, errors and disabled providers all surface as `None`.
    fn analyze(&self, image_ref: &str) -> Option<PartialImageSignals>;
}

/// Provider used when image analysis is switched off
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledVision;

impl VisionProvider for DisabledVision {
    fn analyze(&self, _image_ref: &str) -> Option<PartialImageSignals> {
        None
    }
}

/// Provider that replays a fixed result, for backfill and tests
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedVision(pub Option<PartialImageSignals>);

impl VisionProvider for FixedVision {
    fn analyze(&self, _image_ref: &str) -> Option<PartialImageSignals> {
        self.0
    }
}

/// Extract signals from a model's free-text reply.
///
/// Takes the span from the first `{` to the last `}` and coerces it. Replies
/// without a parseable JSON object yield `None`.
pub fn parse_vision_text(text: &str) -> Option<PartialImageSignals> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }

    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(value @ Value::Object(_)) => Some(PartialImageSignals::from(value)),
        Ok(_) => None,
        Err(e) => {
            debug!(error = %e, "vision reply did not contain valid JSON");
            None
        }
    }
}
