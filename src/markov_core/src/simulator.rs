//! Season simulation over a data source.

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::adjustment::AdjustmentConfig;
use crate::box_score::{AdjustedMetrics, AdjustedOverrides, Scenario, TargetDeltas};
use crate::cache::MatrixCache;
use crate::cancel::{CancellationRegistry, RunGuard};
use crate::config::SimConfig;
use crate::error::SimResult;
use crate::matrix::{build_matrix, TransitionMatrix};
use crate::season::{simulate_season, SeasonGames, SeasonOutcome};
use crate::source::TransitionSource;
use crate::stats::MultiSeasonStatistics;

fn seeded(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => ChaCha8Rng::from_entropy(),
    }
}

/// Result of a batch of independent seasons.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MultiSeasonRun {
    pub seasons: Vec<SeasonOutcome>,
    pub statistics: MultiSeasonStatistics,
    /// Historical simulated win total, when the source has one.
    pub baseline_wins: Option<f64>,
}

/// One completed season of a streaming run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SeasonReport {
    /// 1-based season number.
    pub season: usize,
    pub wins: u32,
    pub ties: u32,
    pub win_percentage: f64,
    pub expected_wins: f64,
    /// Statistics over seasons 1 through `season`.
    pub running_statistics: MultiSeasonStatistics,
}

/// Events emitted by a streaming run, in order.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    Season(SeasonReport),
    Cancelled { seasons_completed: usize },
    Completed { statistics: MultiSeasonStatistics },
}

/// Season-by-season run that can be cancelled between seasons.
///
/// The run stays registered for cancellation until it finishes or the
/// stream is dropped.
pub struct SeasonStream {
    matrix: Arc<TransitionMatrix>,
    possessions: u32,
    max_steps: usize,
    num_seasons: usize,
    rng: ChaCha8Rng,
    wins: Vec<f64>,
    guard: Option<RunGuard>,
}

impl SeasonStream {
    pub fn run_key(&self) -> Option<&str> {
        self.guard.as_ref().map(RunGuard::key)
    }

    fn finish(&mut self, event: RunEvent) -> Option<SimResult<RunEvent>> {
        self.guard = None;
        Some(Ok(event))
    }
}

impl Iterator for SeasonStream {
    type Item = SimResult<RunEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        let guard = self.guard.as_ref()?;

        if guard.is_cancelled() {
            info!(run = %guard.key(), seasons_completed = self.wins.len(), "run cancelled");
            let seasons_completed = self.wins.len();
            return self.finish(RunEvent::Cancelled { seasons_completed });
        }
        if self.wins.len() >= self.num_seasons {
            let statistics = MultiSeasonStatistics::from_wins(&self.wins);
            return self.finish(RunEvent::Completed { statistics });
        }

        let mut season_rng = ChaCha8Rng::seed_from_u64(self.rng.gen::<u64>());
        let outcome = match simulate_season(&self.matrix, self.possessions, self.max_steps, &mut season_rng) {
            Ok(outcome) => outcome,
            Err(err) => {
                self.guard = None;
                return Some(Err(err));
            }
        };

        self.wins.push(outcome.wins as f64);
        let season = self.wins.len();
        debug!(season, wins = outcome.wins, "season complete");
        Some(Ok(RunEvent::Season(SeasonReport {
            season,
            wins: outcome.wins,
            ties: outcome.ties,
            win_percentage: outcome.win_percentage,
            expected_wins: outcome.expected_wins,
            running_statistics: MultiSeasonStatistics::from_wins(&self.wins),
        })))
    }
}

/// Simulator over a [`TransitionSource`], caching built matrices and
/// tracking streaming runs for cancellation.
pub struct MarkovSimulator<S> {
    source: S,
    config: SimConfig,
    cache: MatrixCache,
    runs: CancellationRegistry,
}

impl<S: TransitionSource> MarkovSimulator<S> {
    pub fn new(source: S) -> Self {
        let config = SimConfig::default();
        Self {
            source,
            cache: MatrixCache::new(config.matrix_cache_capacity),
            config,
            runs: CancellationRegistry::new(),
        }
    }

    pub fn with_config(source: S, config: SimConfig) -> SimResult<Self> {
        config.validate()?;
        Ok(Self {
            source,
            cache: MatrixCache::new(config.matrix_cache_capacity),
            config,
            runs: CancellationRegistry::new(),
        })
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn cache(&self) -> &MatrixCache {
        &self.cache
    }

    /// Matrix and per-side possession count for a team and season.
    fn prepare(
        &self,
        team: &str,
        season: &str,
        adjustment: Option<&AdjustmentConfig>,
    ) -> SimResult<(Arc<TransitionMatrix>, u32)> {
        let counts = self.source.counts(team, season)?;
        let possessions = counts.possessions_per_team()?;
        let key = MatrixCache::key(team, season, adjustment)?;
        let matrix = self.cache.get_or_build(key, || build_matrix(&counts, adjustment))?;
        Ok((matrix, possessions))
    }

    /// Built (and cached) transition matrix for a team and season.
    pub fn matrix(
        &self,
        team: &str,
        season: &str,
        adjustment: Option<&AdjustmentConfig>,
    ) -> SimResult<Arc<TransitionMatrix>> {
        self.prepare(team, season, adjustment).map(|(matrix, _)| matrix)
    }

    /// Adjustment configuration for an explicit set of target deltas.
    pub fn adjustment_with_targets(
        &self,
        team: &str,
        season: &str,
        targets: TargetDeltas,
        overrides: Option<&AdjustedOverrides>,
    ) -> SimResult<AdjustmentConfig> {
        let metrics = self.source.season_metrics(team, season)?;
        let rates = self.source.rates(team, season)?;
        let adjusted = AdjustedMetrics::from_season(&metrics).with_overrides(&overrides.copied().unwrap_or_default());
        let config = AdjustmentConfig::new(targets, rates, adjusted);
        config.validate()?;
        Ok(config)
    }

    /// Adjustment configuration for a single-category scenario such as
    /// "3PT FG% +5.0%".
    pub fn adjustment_for(
        &self,
        team: &str,
        season: &str,
        scenario: &Scenario,
        overrides: Option<&AdjustedOverrides>,
    ) -> SimResult<AdjustmentConfig> {
        let metrics = self.source.season_metrics(team, season)?;
        let targets = TargetDeltas::for_scenario(&metrics, scenario);
        debug!(team, season, scenario = %scenario, "resolved scenario targets");
        self.adjustment_with_targets(team, season, targets, overrides)
    }

    /// Simulate one 82-game season.
    ///
    /// # Arguments
    /// * `team` - Team abbreviation
    /// * `season` - Season label, e.g. `2024-25`
    /// * `adjustment` - Optional hypothetical change
    /// * `seed` - Random seed; falls back to the configured seed, then entropy
    pub fn simulate_season(
        &self,
        team: &str,
        season: &str,
        adjustment: Option<&AdjustmentConfig>,
        seed: Option<u64>,
    ) -> SimResult<SeasonOutcome> {
        let (matrix, possessions) = self.prepare(team, season, adjustment)?;
        let mut rng = seeded(seed.or(self.config.seed));
        simulate_season(&matrix, possessions, self.config.max_possession_steps, &mut rng)
    }

    /// A season simulated lazily, one game per iteration.
    pub fn season_games(
        &self,
        team: &str,
        season: &str,
        adjustment: Option<&AdjustmentConfig>,
        seed: Option<u64>,
    ) -> SimResult<SeasonGames<ChaCha8Rng>> {
        let (matrix, possessions) = self.prepare(team, season, adjustment)?;
        let rng = seeded(seed.or(self.config.seed));
        Ok(SeasonGames::new(matrix, possessions, self.config.max_possession_steps, rng))
    }

    /// Simulate `num_seasons` independent seasons against one matrix.
    ///
    /// Each season gets its own seed drawn from a master generator, so the
    /// result is the same whether seasons run in parallel or not.
    pub fn simulate_seasons(
        &self,
        team: &str,
        season: &str,
        num_seasons: usize,
        adjustment: Option<&AdjustmentConfig>,
        seed: Option<u64>,
    ) -> SimResult<MultiSeasonRun> {
        let (matrix, possessions) = self.prepare(team, season, adjustment)?;
        let mut rng = seeded(seed.or(self.config.seed));
        let seeds: Vec<u64> = (0..num_seasons).map(|_| rng.gen::<u64>()).collect();
        let max_steps = self.config.max_possession_steps;

        let run_one = |s: &u64| {
            let mut season_rng = ChaCha8Rng::seed_from_u64(*s);
            simulate_season(&matrix, possessions, max_steps, &mut season_rng)
        };
        let seasons = if self.config.parallel_seasons {
            seeds.par_iter().map(run_one).collect::<SimResult<Vec<_>>>()?
        } else {
            seeds.iter().map(run_one).collect::<SimResult<Vec<_>>>()?
        };

        let wins: Vec<f64> = seasons.iter().map(|s| s.wins as f64).collect();
        let statistics = MultiSeasonStatistics::from_wins(&wins);
        info!(
            team,
            season,
            num_seasons,
            adjusted = adjustment.is_some(),
            mean = statistics.mean,
            "multi-season run complete"
        );

        Ok(MultiSeasonRun {
            seasons,
            statistics,
            baseline_wins: self.source.baseline_wins(team, season)?,
        })
    }

    /// Start a cancellable season-by-season run registered under `run_key`.
    ///
    /// Seasons use the same per-season seeds as [`Self::simulate_seasons`]
    /// for the same master seed.
    pub fn stream_seasons(
        &self,
        run_key: impl Into<String>,
        team: &str,
        season: &str,
        num_seasons: usize,
        adjustment: Option<&AdjustmentConfig>,
        seed: Option<u64>,
    ) -> SimResult<SeasonStream> {
        let (matrix, possessions) = self.prepare(team, season, adjustment)?;
        let guard = self.runs.register(run_key);
        info!(run = %guard.key(), team, season, num_seasons, "starting streaming run");
        Ok(SeasonStream {
            matrix,
            possessions,
            max_steps: self.config.max_possession_steps,
            num_seasons,
            rng: seeded(seed.or(self.config.seed)),
            wins: Vec::with_capacity(num_seasons),
            guard: Some(guard),
        })
    }

    /// Request cancellation of a streaming run. Returns false when no run is
    /// registered under `run_key`.
    pub fn cancel(&self, run_key: &str) -> bool {
        self.runs.cancel(run_key)
    }

    pub fn is_running(&self, run_key: &str) -> bool {
        self.runs.is_tracked(run_key)
    }
}
