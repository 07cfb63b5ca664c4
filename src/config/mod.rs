//! Typed configuration loaded from the environment.
//!
//! Every knob has a production default; deployments override through
//! `SWITCHBOARD__`-prefixed environment variables with `__` section
//! separators (e.g. `SWITCHBOARD__PIPELINE__CONFIDENCE_FLOOR=0.25`),
//! optionally via a `.env` file.

mod error;
mod pipeline;
mod recovery;
mod resilience;

pub use error::ConfigError;
pub use pipeline::PipelineConfig;
pub use recovery::RecoveryConfig;
pub use resilience::ResilienceConfig;

use serde::Deserialize;

const ENV_PREFIX: &str = "SWITCHBOARD";

/// Root configuration for the orchestrator.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub recovery: RecoveryConfig,
    #[serde(default)]
    pub resilience: ResilienceConfig,
    /// TTL applied to conversation snapshots on save; `None` keeps them
    /// until deleted.
    #[serde(default)]
    pub conversation_ttl_secs: Option<u64>,
}

impl OrchestratorConfig {
    /// Loads configuration from the environment, after sourcing `.env`
    /// when present.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let raw = config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;
        let loaded: Self = raw.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Rejects configurations that would disable safety behavior.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.pipeline.confidence_floor) {
            return Err(ConfigError::Invalid(
                "pipeline.confidence_floor must be within [0, 1]".into(),
            ));
        }
        if self.pipeline.processing_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "pipeline.processing_timeout_secs must be positive".into(),
            ));
        }
        if self.recovery.attempt_cap == 0 {
            return Err(ConfigError::Invalid(
                "recovery.attempt_cap must be positive".into(),
            ));
        }
        if self.recovery.attempt_window_secs == 0 {
            return Err(ConfigError::Invalid(
                "recovery.attempt_window_secs must be positive".into(),
            ));
        }
        if self.resilience.error_threshold == 0 {
            return Err(ConfigError::Invalid(
                "resilience.error_threshold must be positive".into(),
            ));
        }
        if self.resilience.error_window_secs == 0 {
            return Err(ConfigError::Invalid(
                "resilience.error_window_secs must be positive".into(),
            ));
        }
        if self.resilience.max_load == 0 {
            return Err(ConfigError::Invalid(
                "resilience.max_load must be positive".into(),
            ));
        }
        if self.resilience.close_error_allowance > self.resilience.error_threshold {
            return Err(ConfigError::Invalid(
                "resilience.close_error_allowance cannot exceed error_threshold".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        OrchestratorConfig::default().validate().unwrap();
    }

    #[test]
    fn default_values_match_contracts() {
        let cfg = OrchestratorConfig::default();
        assert_eq!(cfg.pipeline.confidence_floor, 0.3);
        assert_eq!(cfg.pipeline.max_recovery_loops, 2);
        assert_eq!(cfg.recovery.attempt_window_secs, 300);
        assert_eq!(cfg.recovery.attempt_cap, 3);
        assert_eq!(cfg.recovery.retry_backoff_secs, 2);
        assert_eq!(cfg.resilience.error_window_secs, 60);
        assert_eq!(cfg.resilience.error_threshold, 10);
        assert_eq!(cfg.resilience.probe_timeout_secs, 300);
    }

    #[test]
    fn out_of_range_floor_is_rejected() {
        let mut cfg = OrchestratorConfig::default();
        cfg.pipeline.confidence_floor = 1.5;
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn zero_threshold_is_rejected() {
        let mut cfg = OrchestratorConfig::default();
        cfg.resilience.error_threshold = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn allowance_above_threshold_is_rejected() {
        let mut cfg = OrchestratorConfig::default();
        cfg.resilience.close_error_allowance = 20;
        assert!(cfg.validate().is_err());
    }
}
