use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_MATRIX_CACHE_CAPACITY, DEFAULT_NUM_SEASONS, MAX_POSSESSION_STEPS};
use crate::error::{SimError, SimResult};

/// Simulator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Seasons per multi-season run when the caller does not say.
    pub num_seasons: usize,
    /// Possession step ceiling.
    pub max_possession_steps: usize,
    /// Built matrices retained across runs.
    pub matrix_cache_capacity: u64,
    /// Run independent seasons of a batch on the rayon pool.
    pub parallel_seasons: bool,
    /// Master seed. `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            num_seasons: DEFAULT_NUM_SEASONS,
            max_possession_steps: MAX_POSSESSION_STEPS,
            matrix_cache_capacity: DEFAULT_MATRIX_CACHE_CAPACITY,
            parallel_seasons: true,
            seed: None,
        }
    }
}

impl SimConfig {
    pub fn from_toml_str(text: &str) -> SimResult<Self> {
        let config: SimConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> SimResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.num_seasons == 0 {
            return Err(SimError::InvalidConfig("num_seasons must be at least 1".to_string()));
        }
        if self.max_possession_steps == 0 {
            return Err(SimError::InvalidConfig(
                "max_possession_steps must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SimConfig::from_toml_str("num_seasons = 250\nseed = 7\n").unwrap();
        assert_eq!(config.num_seasons, 250);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.max_possession_steps, MAX_POSSESSION_STEPS);
        assert!(config.parallel_seasons);
    }

    #[test]
    fn test_zero_step_ceiling_rejected() {
        let err = SimConfig::from_toml_str("max_possession_steps = 0").unwrap_err();
        assert!(matches!(err, SimError::InvalidConfig(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sim.toml");
        std::fs::write(&path, "matrix_cache_capacity = 8\nparallel_seasons = false\n").unwrap();

        let config = SimConfig::load(&path).unwrap();
        assert_eq!(config.matrix_cache_capacity, 8);
        assert!(!config.parallel_seasons);
    }
}
