//! Experiment parameters.

use serde::{Deserialize, Serialize};

use crate::error::{SimResult, ValidationError};

/// Parameters for sweeping request-batch sizes over repeated rounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Seed for request sampling.
    pub seed: u64,
    /// Rounds per batch size.
    pub repeat: usize,
    /// Number of source-destination pairs per round, one series per entry.
    pub pair_counts: Vec<usize>,
    /// Worker threads for parallel experiments.
    pub workers: usize,
    /// Maximum queued jobs in the worker pool.
    pub queue_capacity: usize,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            repeat: 1,
            pair_counts: vec![10],
            workers: 2,
            queue_capacity: 64,
        }
    }
}

impl ExperimentConfig {
    /// Validate parameters.
    ///
    /// Called by every entry point that consumes a config.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.repeat == 0 {
            return Err(ValidationError::InvalidExperimentConfig {
                reason: "repeat must be > 0".to_string(),
            });
        }
        if self.pair_counts.is_empty() {
            return Err(ValidationError::InvalidExperimentConfig {
                reason: "pair_counts cannot be empty".to_string(),
            });
        }
        if self.pair_counts.contains(&0) {
            return Err(ValidationError::InvalidExperimentConfig {
                reason: "pair_counts entries must be > 0".to_string(),
            });
        }
        if self.workers == 0 {
            return Err(ValidationError::InvalidExperimentConfig {
                reason: "workers must be > 0".to_string(),
            });
        }
        if self.queue_capacity == 0 {
            return Err(ValidationError::InvalidExperimentConfig {
                reason: "queue_capacity must be > 0".to_string(),
            });
        }
        Ok(())
    }

    /// Parses and validates a JSON config. Missing fields take defaults.
    pub fn from_json(json: &str) -> SimResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        ExperimentConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_zero_limits() {
        let mut c = ExperimentConfig::default();
        c.repeat = 0;
        assert!(c.validate().is_err());

        let mut c = ExperimentConfig::default();
        c.pair_counts.clear();
        assert!(c.validate().is_err());

        let mut c = ExperimentConfig::default();
        c.pair_counts = vec![3, 0];
        assert!(c.validate().is_err());

        let mut c = ExperimentConfig::default();
        c.workers = 0;
        assert!(c.validate().is_err());

        let mut c = ExperimentConfig::default();
        c.queue_capacity = 0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn json_fills_defaults() {
        let c = ExperimentConfig::from_json(r#"{"seed": 9, "pair_counts": [2, 4]}"#).unwrap();
        assert_eq!(c.seed, 9);
        assert_eq!(c.pair_counts, vec![2, 4]);
        assert_eq!(c.repeat, 1);

        let err = ExperimentConfig::from_json(r#"{"repeat": 0}"#).unwrap_err();
        assert!(err.is_validation());
    }
}
