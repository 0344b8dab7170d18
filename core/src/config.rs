//! Pipeline configuration
//!
//! The configuration is a plain struct owned by one pipeline instance. It is
//! read before every recomputation and changed one field at a time through
//! [`ConfigChange`]. Serde support lets an embedding application persist or
//! load it as JSON; missing fields fall back to [`PipelineConfig::default`].
//!
//! Copyright (c) 2025 Mohammad Atashi <mohammadaliatashi@icloud.com>

use std::fs;
use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::sampler::InterpolationMode;
use crate::smoothing::{SmoothingMethod, SmoothingParams};
use crate::tone_mapping::ToneMapOperator;

/// Configuration loading and validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Every knob the pipeline reads during recomputation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub interpolation_mode: InterpolationMode,
    pub smoothing_enabled: bool,
    pub smoothing_method: SmoothingMethod,
    pub smoothing_radius: i32,
    pub smoothing_iterations: i32,
    /// `<= 0` selects the automatic sigma `(radius + 1) / 2`
    pub gaussian_sigma: f64,
    pub tone_map_enabled: bool,
    pub tone_map_operator: ToneMapOperator,
    /// Gamma for `ToneMapOperator::Gamma`; unused by the other operators
    pub tone_map_param: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            interpolation_mode: InterpolationMode::Bilinear,
            smoothing_enabled: false,
            smoothing_method: SmoothingMethod::Gaussian,
            smoothing_radius: 1,
            smoothing_iterations: 1,
            gaussian_sigma: 0.0,
            tone_map_enabled: false,
            tone_map_operator: ToneMapOperator::Normalize01,
            tone_map_param: 0.0,
        }
    }
}

/// A change to exactly one configuration field
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum ConfigChange {
    InterpolationMode(InterpolationMode),
    SmoothingEnabled(bool),
    SmoothingMethod(SmoothingMethod),
    SmoothingRadius(i32),
    SmoothingIterations(i32),
    GaussianSigma(f64),
    ToneMapEnabled(bool),
    ToneMapOperator(ToneMapOperator),
    ToneMapParam(f64),
}

impl PipelineConfig {
    /// Apply a single-field change
    pub fn apply(&mut self, change: ConfigChange) {
        match change {
            ConfigChange::InterpolationMode(mode) => self.interpolation_mode = mode,
            ConfigChange::SmoothingEnabled(enabled) => self.smoothing_enabled = enabled,
            ConfigChange::SmoothingMethod(method) => self.smoothing_method = method,
            ConfigChange::SmoothingRadius(radius) => self.smoothing_radius = radius,
            ConfigChange::SmoothingIterations(iterations) => self.smoothing_iterations = iterations,
            ConfigChange::GaussianSigma(sigma) => self.gaussian_sigma = sigma,
            ConfigChange::ToneMapEnabled(enabled) => self.tone_map_enabled = enabled,
            ConfigChange::ToneMapOperator(operator) => self.tone_map_operator = operator,
            ConfigChange::ToneMapParam(param) => self.tone_map_param = param,
        }
    }

    /// Smoothing arguments, or `None` when the stage is disabled
    pub fn smoothing(&self) -> Option<SmoothingParams> {
        if !self.smoothing_enabled {
            return None;
        }
        Some(SmoothingParams {
            method: self.smoothing_method,
            radius: self.smoothing_radius,
            iterations: self.smoothing_iterations,
            sigma: self.gaussian_sigma,
        })
    }

    /// Tone-map operator and parameter, or `None` when the stage is disabled
    pub fn tone_mapping(&self) -> Option<(ToneMapOperator, f64)> {
        if !self.tone_map_enabled {
            return None;
        }
        Some((self.tone_map_operator, self.tone_map_param))
    }

    /// Reject values no caller can have meant.
    ///
    /// Non-positive radius/iterations are legal (they disable smoothing), so
    /// only non-finite floats are refused here.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.gaussian_sigma.is_finite() {
            return Err(ConfigError::InvalidValue {
                field: "gaussian_sigma",
                reason: format!("{} is not finite", self.gaussian_sigma),
            });
        }
        if !self.tone_map_param.is_finite() {
            return Err(ConfigError::InvalidValue {
                field: "tone_map_param",
                reason: format!("{} is not finite", self.tone_map_param),
            });
        }
        Ok(())
    }

    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.validate()?;
        if config.smoothing_enabled && (config.smoothing_radius <= 0 || config.smoothing_iterations <= 0) {
            warn!(
                "Smoothing enabled with radius={} iterations={}; the stage will pass data through",
                config.smoothing_radius, config.smoothing_iterations
            );
        }
        Ok(config)
    }

    /// Read, parse and validate a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.interpolation_mode, InterpolationMode::Bilinear);
        assert!(!config.smoothing_enabled);
        assert!(!config.tone_map_enabled);
        assert!(config.smoothing().is_none());
        assert!(config.tone_mapping().is_none());
    }

    #[test]
    fn test_apply_changes_one_field() {
        let mut config = PipelineConfig::default();
        config.apply(ConfigChange::SmoothingRadius(4));
        assert_eq!(config.smoothing_radius, 4);
        assert_eq!(
            PipelineConfig { smoothing_radius: 1, ..config },
            PipelineConfig::default()
        );

        config.apply(ConfigChange::SmoothingEnabled(true));
        config.apply(ConfigChange::SmoothingMethod(SmoothingMethod::Median));
        let params = config.smoothing().unwrap();
        assert_eq!(params.method, SmoothingMethod::Median);
        assert_eq!(params.radius, 4);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = PipelineConfig::from_json_str(
            r#"{ "interpolation_mode": "BICUBIC", "tone_map_enabled": true, "tone_map_operator": "GAMMA", "tone_map_param": 1.8 }"#,
        )
        .unwrap();
        assert_eq!(config.interpolation_mode, InterpolationMode::Bicubic);
        assert_eq!(config.tone_mapping(), Some((ToneMapOperator::Gamma, 1.8)));
        assert_eq!(config.smoothing_method, SmoothingMethod::Gaussian);
    }

    #[test]
    fn test_json_round_trip() {
        let config = PipelineConfig {
            smoothing_enabled: true,
            smoothing_method: SmoothingMethod::Box,
            smoothing_radius: 3,
            ..Default::default()
        };
        let json = config.to_json_string().unwrap();
        assert!(json.contains("\"BOX\""));
        assert_eq!(PipelineConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_unknown_mode_is_parse_error() {
        let err = PipelineConfig::from_json_str(r#"{ "interpolation_mode": "LANCZOS" }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validate_rejects_non_finite() {
        let config = PipelineConfig {
            gaussian_sigma: f64::NAN,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "gaussian_sigma", .. })
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = PipelineConfig::from_json_file("/nonexistent/heightfield.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_change_serde_shape() {
        let change: ConfigChange =
            serde_json::from_str(r#"{ "field": "tone_map_operator", "value": "ZSCORE" }"#).unwrap();
        assert_eq!(change, ConfigChange::ToneMapOperator(ToneMapOperator::ZScore));
    }
}
