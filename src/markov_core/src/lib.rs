//! Markov Core - Possession-level Markov chain season simulator.
//!
//! This library turns a team's observed possession transitions into a
//! 14-state transition matrix, optionally shifts it toward hypothetical
//! box-score improvements, and simulates 82-game seasons from it. Python
//! bindings via PyO3 are available behind the `python` feature.

#[cfg(feature = "python")]
use pyo3::prelude::*;

pub mod adjustment;
pub mod box_score;
pub mod cache;
pub mod cancel;
pub mod config;
pub mod constants;
pub mod counts;
pub mod error;
pub mod matrix;
pub mod possession;
pub mod rates;
pub mod report;
pub mod season;
pub mod simulator;
pub mod source;
pub mod state;
pub mod stats;

#[cfg(feature = "python")]
mod python;
#[cfg(test)]
mod test_support;

pub use adjustment::{AdjustmentCategory, AdjustmentConfig, AdjustmentDelta};
pub use box_score::{
    AdjustedMetrics, AdjustedOverrides, Scenario, SeasonMetrics, Stat, TargetDeltas, TeamAttempts,
};
pub use cache::MatrixCache;
pub use cancel::{CancellationRegistry, CancellationToken, RunGuard};
pub use config::SimConfig;
pub use constants::{GAMES_PER_SEASON, MAX_POSSESSION_STEPS};
pub use counts::{ClippedCount, CountMatrix, TeamCounts, TransitionCount};
pub use error::{SimError, SimResult};
pub use matrix::{build_matrix, TransitionMatrix};
pub use possession::{simulate_possession, ChainSampler};
pub use rates::RateMetrics;
pub use report::{adjustment_report, write_csv, ReportRow};
pub use season::{simulate_game, simulate_season, GameProgress, GameRecord, SeasonGames, SeasonOutcome};
pub use simulator::{MarkovSimulator, MultiSeasonRun, RunEvent, SeasonReport, SeasonStream};
pub use source::{CsvSource, InMemorySource, TransitionSource};
pub use state::{Phase, Side, State};
pub use stats::MultiSeasonStatistics;

/// Possession labels in canonical order for a team.
#[cfg(feature = "python")]
#[pyfunction]
fn state_labels(team: &str) -> Vec<String> {
    state::all_states().map(|s| s.label(team)).collect()
}

/// Scenario labels for the twelve single-category what-ifs.
#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(signature = (percent = constants::DEFAULT_SCENARIO_PERCENT))]
fn scenario_labels(percent: f64) -> Vec<String> {
    Scenario::all(percent).iter().map(Scenario::label).collect()
}

/// Python module definition
#[cfg(feature = "python")]
#[pymodule]
fn markov_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Classes
    m.add_class::<python::PyMarkovSimulator>()?;
    m.add_class::<python::PySeasonStream>()?;

    // Functions
    m.add_function(wrap_pyfunction!(state_labels, m)?)?;
    m.add_function(wrap_pyfunction!(scenario_labels, m)?)?;

    // Constants
    m.add("GAMES_PER_SEASON", GAMES_PER_SEASON)?;
    m.add("MAX_POSSESSION_STEPS", MAX_POSSESSION_STEPS)?;
    m.add("DEFAULT_SCENARIO_PERCENT", constants::DEFAULT_SCENARIO_PERCENT)?;

    Ok(())
}
