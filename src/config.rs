//! Engine configuration
//!
//! Band thresholds are read once at startup from `RISK_BAND_THRESHOLDS` and passed
//! explicitly into the engine. Invalid input degrades to the defaults with a warning.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ComputeError;

/// Environment variable holding the band thresholds as JSON
pub const THRESHOLDS_ENV: &str = "RISK_BAND_THRESHOLDS";

/// Upper bounds (inclusive) of the green and yellow CLABSI bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskThresholds {
    #[serde(alias = "greenMax")]
    pub green_max: i64,
    #[serde(alias = "yellowMax")]
    pub yellow_max: i64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            green_max: 3,
            yellow_max: 6,
        }
    }
}

impl RiskThresholds {
    pub fn is_valid(&self) -> bool {
        self.green_max < self.yellow_max
    }

    /// Strict parse, for callers that want to report the problem
    pub fn try_parse(raw: &str) -> Result<Self, ComputeError> {
        let parsed: RiskThresholds = serde_json::from_str(raw)
            .map_err(|e| ComputeError::InvalidConfig(format!("{THRESHOLDS_ENV}: {e}")))?;
        if !parsed.is_valid() {
            return Err(ComputeError::InvalidConfig(format!(
                "{THRESHOLDS_ENV}: greenMax ({}) must be below yellowMax ({})",
                parsed.green_max, parsed.yellow_max
            )));
        }
        Ok(parsed)
    }

    /// Lenient parse: anything unusable falls back to the defaults
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        match raw {
            None => Self::default(),
            Some(raw) => Self::try_parse(raw).unwrap_or_else(|e| {
                warn!(error = %e, "invalid band thresholds, using defaults");
                Self::default()
            }),
        }
    }

    pub fn from_env() -> Self {
        let raw = std::env::var(THRESHOLDS_ENV).ok();
        Self::parse_or_default(raw.as_deref())
    }
}

/// Configuration handed to the engine at construction time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub thresholds: RiskThresholds,
}

impl EngineConfig {
    pub fn new(thresholds: RiskThresholds) -> Self {
        // Invalid thresholds never reach the mapper
        let thresholds = if thresholds.is_valid() {
            thresholds
        } else {
            warn!(
                green_max = thresholds.green_max,
                yellow_max = thresholds.yellow_max,
                "band thresholds out of order, using defaults"
            );
            RiskThresholds::default()
        };
        Self { thresholds }
    }

    pub fn from_env() -> Self {
        Self::new(RiskThresholds::from_env())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let thresholds = RiskThresholds::default();
        assert_eq!(thresholds.green_max, 3);
        assert_eq!(thresholds.yellow_max, 6);
        assert!(thresholds.is_valid());
    }

    #[test]
    fn test_parse_camel_case() {
        let thresholds = RiskThresholds::parse_or_default(Some(r#"{"greenMax":2,"yellowMax":8}"#));
        assert_eq!(thresholds, RiskThresholds { green_max: 2, yellow_max: 8 });
    }

    #[test]
    fn test_parse_snake_case() {
        let thresholds =
            RiskThresholds::parse_or_default(Some(r#"{"green_max":4,"yellow_max":5}"#));
        assert_eq!(thresholds, RiskThresholds { green_max: 4, yellow_max: 5 });
    }

    #[test]
    fn test_invalid_order_falls_back() {
        let thresholds = RiskThresholds::parse_or_default(Some(r#"{"greenMax":6,"yellowMax":6}"#));
        assert_eq!(thresholds, RiskThresholds::default());
        assert!(RiskThresholds::try_parse(r#"{"greenMax":7,"yellowMax":2}"#).is_err());
    }

    #[test]
    fn test_malformed_falls_back() {
        assert_eq!(
            RiskThresholds::parse_or_default(Some("not json")),
            RiskThresholds::default()
        );
        assert_eq!(
            RiskThresholds::parse_or_default(Some(r#"{"greenMax":"3"}"#)),
            RiskThresholds::default()
        );
        assert_eq!(RiskThresholds::parse_or_default(None), RiskThresholds::default());
    }

    #[test]
    fn test_engine_config_rejects_unordered() {
        let config = EngineConfig::new(RiskThresholds { green_max: 9, yellow_max: 1 });
        assert_eq!(config.thresholds, RiskThresholds::default());
    }
}
