//! Bounded cache of built transition matrices.
//!
//! Keys combine the team, the season and a blake3 hash of the adjustment
//! configuration's canonical JSON. Concurrent requests for the same key
//! share a single build, and a failed build reaches each of them as the
//! original error.

use std::sync::Arc;

use moka::sync::Cache;
use tracing::debug;

use crate::adjustment::AdjustmentConfig;
use crate::error::SimResult;
use crate::matrix::TransitionMatrix;

const BASELINE: &str = "baseline";

pub struct MatrixCache {
    cache: Cache<String, Arc<TransitionMatrix>>,
}

impl MatrixCache {
    pub fn new(max_entries: u64) -> Self {
        Self {
            cache: Cache::builder().max_capacity(max_entries).build(),
        }
    }

    /// Cache key for a team, season and optional adjustment. Adjustments
    /// that change nothing share the baseline key.
    pub fn key(team: &str, season: &str, adjustment: Option<&AdjustmentConfig>) -> SimResult<String> {
        let suffix = match adjustment {
            Some(config) if !config.is_identity() => {
                let canonical = serde_json::to_vec(config)?;
                blake3::hash(&canonical).to_hex().to_string()
            }
            _ => BASELINE.to_string(),
        };
        Ok(format!("{}:{}:{}", team, season, suffix))
    }

    /// Fetch the matrix under `key`, building it at most once.
    pub fn get_or_build<F>(&self, key: String, build: F) -> SimResult<Arc<TransitionMatrix>>
    where
        F: FnOnce() -> SimResult<TransitionMatrix>,
    {
        let mut built = false;
        let result = self.cache.try_get_with(key.clone(), || {
            built = true;
            build().map(Arc::new)
        });
        debug!(key = %key, hit = !built, "matrix cache lookup");
        result.map_err(Arc::unwrap_or_clone)
    }

    pub fn get(&self, key: &str) -> Option<Arc<TransitionMatrix>> {
        self.cache.get(key)
    }

    pub fn len(&self) -> u64 {
        self.cache.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.cache.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::box_score::{AdjustedMetrics, Stat, TargetDeltas};
    use crate::counts::CountMatrix;
    use crate::error::SimError;
    use crate::matrix::build_matrix;
    use crate::rates::RateMetrics;
    use crate::state::Side;
    use crate::test_support::{lac_counts, lac_metrics};

    fn config(targets: TargetDeltas) -> AdjustmentConfig {
        let rates = RateMetrics::from_counts(&CountMatrix::from_counts(&lac_counts()).unwrap());
        AdjustmentConfig::new(targets, rates, AdjustedMetrics::from_season(&lac_metrics()))
    }

    #[test]
    fn test_identity_adjustment_shares_baseline_key() {
        let zero = config(TargetDeltas::from_metrics(&lac_metrics(), 0.0));
        let baseline = MatrixCache::key("LAC", "2024-25", None).unwrap();
        assert_eq!(MatrixCache::key("LAC", "2024-25", Some(&zero)).unwrap(), baseline);
        assert_eq!(baseline, "LAC:2024-25:baseline");
    }

    #[test]
    fn test_key_depends_on_configuration() {
        let a = config(TargetDeltas::new().with(Side::Team, Stat::TwoPoint, 50.0));
        let b = config(TargetDeltas::new().with(Side::Team, Stat::TwoPoint, 51.0));
        let key_a = MatrixCache::key("LAC", "2024-25", Some(&a)).unwrap();
        assert_eq!(key_a, MatrixCache::key("LAC", "2024-25", Some(&a.clone())).unwrap());
        assert_ne!(key_a, MatrixCache::key("LAC", "2024-25", Some(&b)).unwrap());
        assert_ne!(key_a, MatrixCache::key("BOS", "2024-25", Some(&a)).unwrap());
    }

    #[test]
    fn test_builds_once_per_key() {
        let cache = MatrixCache::new(8);
        let key = MatrixCache::key("LAC", "2024-25", None).unwrap();
        let mut builds = 0;
        let first = cache
            .get_or_build(key.clone(), || {
                builds += 1;
                build_matrix(&lac_counts(), None)
            })
            .unwrap();
        let second = cache
            .get_or_build(key, || {
                builds += 1;
                build_matrix(&lac_counts(), None)
            })
            .unwrap();
        assert_eq!(builds, 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_failed_build_is_not_cached() {
        let cache = MatrixCache::new(8);
        let err = cache
            .get_or_build("LAC:1999-00:baseline".to_string(), || {
                Err(SimError::not_found("transition counts for LAC 1999-00"))
            })
            .unwrap_err();
        assert!(matches!(err, SimError::NotFound { .. }));
        assert!(cache.get("LAC:1999-00:baseline").is_none());
    }

    #[test]
    fn test_failed_build_keeps_error_kind_for_every_caller() {
        let cache = MatrixCache::new(8);
        let key = "LAC:2024-25:bad".to_string();
        let build = || {
            Err(SimError::InvalidAdjustment {
                state: "TEAM OREB".to_string(),
                reason: "row lost all mass".to_string(),
            })
        };
        for _ in 0..2 {
            match cache.get_or_build(key.clone(), build) {
                Err(SimError::InvalidAdjustment { state, .. }) => assert_eq!(state, "TEAM OREB"),
                other => panic!("expected InvalidAdjustment, got {:?}", other.map(|_| ())),
            }
        }
    }
}
