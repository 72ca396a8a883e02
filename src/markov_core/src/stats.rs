use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::constants::CI_95_Z;

/// Summary of season win totals across a multi-season run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiSeasonStatistics {
    pub seasons_completed: usize,
    pub mean: f64,
    /// Population standard deviation.
    pub std_dev: f64,
    /// Half-width of the 95% confidence interval of the mean.
    pub ci_95: f64,
    pub min: f64,
    pub max: f64,
}

impl MultiSeasonStatistics {
    pub fn from_wins(wins: &[f64]) -> Self {
        let n = wins.len();
        if n == 0 {
            return Self::default();
        }
        let (std_dev, ci_95) = if n < 2 {
            (0.0, 0.0)
        } else {
            let std_dev = wins.iter().population_std_dev();
            (std_dev, CI_95_Z * std_dev / (n as f64).sqrt())
        };
        Self {
            seasons_completed: n,
            mean: wins.iter().mean(),
            std_dev,
            ci_95,
            min: Statistics::min(wins.iter()),
            max: Statistics::max(wins.iter()),
        }
    }

    pub fn ci_lower(&self) -> f64 {
        self.mean - self.ci_95
    }

    pub fn ci_upper(&self) -> f64 {
        self.mean + self.ci_95
    }
}
