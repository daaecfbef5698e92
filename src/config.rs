//! Checker configuration
//!
//! Options can be built in code or loaded from a TOML file:
//!
//! ```toml
//! seed = 42
//! resample_rule = "1min"
//! mode = "real"
//! session1_end_time = "11:30:00"
//! session2_start_time = "12:30:00"
//! cut_off_th = 0.05
//! lags = [1, 2, 3, 5, 10]
//! ```

use crate::data::frequency::ResampleRule;
use crate::data::session::SessionBoundary;
use crate::error::{Result, StylizedFactsError};
use crate::types::TimeOfDay;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Whether the input comes from a real market or a simulator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketMode {
    /// Calendar-time resampling
    #[default]
    Real,
    /// Transaction-count resampling
    Synthetic,
}

/// How strictly missing values must line up before a batch is stacked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingPolicy {
    /// Equal counts of missing values suffice
    Count,
    /// Missing values must sit at the same positions in every sequence
    #[default]
    Positional,
}

/// Small constants guarding against degenerate input
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EstimatorConfig {
    /// Added to price ratios before taking logs
    #[serde(default = "default_epsilon")]
    pub return_floor: f64,
    /// Added to variance/std products in correlation denominators
    #[serde(default = "default_epsilon")]
    pub denominator_floor: f64,
}

fn default_epsilon() -> f64 {
    1e-10
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            return_floor: default_epsilon(),
            denominator_floor: default_epsilon(),
        }
    }
}

fn default_seed() -> u64 {
    42
}

fn default_cut_off_th() -> f64 {
    0.05
}

fn default_lags() -> Vec<usize> {
    (1..=30).collect()
}

fn default_true() -> bool {
    true
}

/// Configuration for a stylized facts run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckerConfig {
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub resample_rule: ResampleRule,
    #[serde(default)]
    pub mode: MarketMode,
    #[serde(default)]
    pub session1_end_time: Option<TimeOfDay>,
    #[serde(default)]
    pub session2_start_time: Option<TimeOfDay>,
    /// Fraction of the pooled sample treated as the tail
    #[serde(default = "default_cut_off_th")]
    pub cut_off_th: f64,
    #[serde(default = "default_lags")]
    pub lags: Vec<usize>,
    /// Drop calendar-resampled series shorter than a full trading day
    #[serde(default = "default_true")]
    pub choose_full_size: bool,
    #[serde(default)]
    pub missing_policy: MissingPolicy,
    #[serde(default)]
    pub epsilon: EstimatorConfig,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            resample_rule: ResampleRule::default(),
            mode: MarketMode::default(),
            session1_end_time: None,
            session2_start_time: None,
            cut_off_th: default_cut_off_th(),
            lags: default_lags(),
            choose_full_size: true,
            missing_policy: MissingPolicy::default(),
            epsilon: EstimatorConfig::default(),
        }
    }
}

impl CheckerConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Check option ranges and combinations
    pub fn validate(&self) -> Result<()> {
        if !(self.cut_off_th > 0.0 && self.cut_off_th < 1.0) {
            return Err(StylizedFactsError::ConfigError(format!(
                "cut_off_th must lie in (0, 1), got {}",
                self.cut_off_th
            )));
        }
        if self.lags.is_empty() {
            return Err(StylizedFactsError::ConfigError(
                "at least one autocorrelation lag is required".to_string(),
            ));
        }
        if self.lags.contains(&0) {
            return Err(StylizedFactsError::ConfigError(
                "autocorrelation lags must be positive".to_string(),
            ));
        }
        if self.epsilon.return_floor < 0.0 || self.epsilon.denominator_floor < 0.0 {
            return Err(StylizedFactsError::ConfigError(
                "epsilon floors must be non-negative".to_string(),
            ));
        }
        self.session_boundary().map(|_| ())
    }

    /// Explicitly configured session boundary, if both times are given
    pub fn session_boundary(&self) -> Result<Option<SessionBoundary>> {
        match (self.session1_end_time, self.session2_start_time) {
            (Some(end), Some(start)) => SessionBoundary::new(end, start).map(Some),
            (None, None) => Ok(None),
            _ => Err(StylizedFactsError::ConfigError(
                "session1_end_time and session2_start_time must be given together".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    #[test]
    fn test_defaults() {
        let config = CheckerConfig::default();
        assert_eq!(config.seed, 42);
        assert_eq!(config.resample_rule, ResampleRule::Minute);
        assert_eq!(config.lags.len(), 30);
        assert_eq!(config.cut_off_th, 0.05);
        assert_eq!(config.epsilon.return_floor, 1e-10);
        assert!(config.validate().is_ok());
        assert_eq!(config.session_boundary().unwrap(), None);
    }

    #[test]
    fn test_from_toml() {
        let config = CheckerConfig::from_toml_str(
            r#"
            seed = 7
            resample_rule = "5min"
            mode = "synthetic"
            session1_end_time = "11:30:00"
            session2_start_time = "12:30:00"
            lags = [1, 2, 3]
            missing_policy = "count"

            [epsilon]
            denominator_floor = 1e-8
            "#,
        )
        .unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.resample_rule, ResampleRule::FiveMinutes);
        assert_eq!(config.mode, MarketMode::Synthetic);
        assert_eq!(config.missing_policy, MissingPolicy::Count);
        assert_eq!(config.epsilon.return_floor, 1e-10);
        assert_eq!(config.epsilon.denominator_floor, 1e-8);
        let boundary = config.session_boundary().unwrap().unwrap();
        assert_eq!(boundary.session1_end, NaiveTime::from_hms_opt(11, 30, 0).unwrap());
    }

    #[test]
    fn test_invalid_options() {
        let bad_cut = CheckerConfig {
            cut_off_th: 1.0,
            ..CheckerConfig::default()
        };
        assert!(matches!(
            bad_cut.validate(),
            Err(StylizedFactsError::ConfigError(_))
        ));

        let half_boundary = CheckerConfig {
            session1_end_time: NaiveTime::from_hms_opt(11, 30, 0),
            ..CheckerConfig::default()
        };
        assert!(half_boundary.validate().is_err());

        assert!(CheckerConfig::from_toml_str("lags = []").is_err());
        assert!(CheckerConfig::from_toml_str("resample_rule = \"2min\"").is_err());
    }
}
