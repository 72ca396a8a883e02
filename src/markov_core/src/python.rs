//! Python bindings.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;

use pyo3::exceptions::{PyIOError, PyLookupError, PyValueError};
use pyo3::prelude::*;

use crate::adjustment::AdjustmentConfig;
use crate::box_score::{AdjustedOverrides, Scenario, Stat, TargetDeltas};
use crate::config::SimConfig;
use crate::error::SimError;
use crate::report::{adjustment_report, write_csv};
use crate::simulator::{MarkovSimulator, SeasonStream};
use crate::source::{CsvSource, TransitionSource};
use crate::state::Side;

impl From<SimError> for PyErr {
    fn from(err: SimError) -> PyErr {
        match err {
            SimError::NotFound { .. } => PyLookupError::new_err(err.to_string()),
            SimError::Io(_) => PyIOError::new_err(err.to_string()),
            _ => PyValueError::new_err(err.to_string()),
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> PyResult<String> {
    serde_json::to_string(value).map_err(|e| PyValueError::new_err(format!("Failed to encode result: {}", e)))
}

fn overrides(adjusted_metrics: Option<HashMap<String, f64>>) -> Option<AdjustedOverrides> {
    adjusted_metrics.map(|m| AdjustedOverrides {
        oreb_pct: m.get("oreb_pct").copied(),
        opp_oreb_pct: m.get("opp_oreb_pct").copied(),
    })
}

fn parse_stat(name: &str) -> PyResult<Stat> {
    Stat::ALL
        .into_iter()
        .find(|stat| stat.name().eq_ignore_ascii_case(name))
        .ok_or_else(|| PyValueError::new_err(format!("Unknown stat: {}", name)))
}

/// Season simulator over a directory of CSV exports.
#[pyclass(name = "MarkovSimulator")]
pub struct PyMarkovSimulator {
    inner: MarkovSimulator<CsvSource>,
}

impl PyMarkovSimulator {
    fn adjustment(
        &self,
        team: &str,
        season: &str,
        additional_vars: Option<HashMap<String, f64>>,
        adjusted_metrics: Option<HashMap<String, f64>>,
    ) -> PyResult<Option<AdjustmentConfig>> {
        let Some(vars) = additional_vars else {
            return Ok(None);
        };
        let targets = TargetDeltas::from_flat(&vars)?;
        let config =
            self.inner
                .adjustment_with_targets(team, season, targets, overrides(adjusted_metrics).as_ref())?;
        Ok(Some(config))
    }
}

#[pymethods]
impl PyMarkovSimulator {
    #[new]
    #[pyo3(signature = (data_dir, config_path = None))]
    pub fn new(data_dir: &str, config_path: Option<&str>) -> PyResult<Self> {
        let config = match config_path {
            Some(path) => SimConfig::load(path)?,
            None => SimConfig::default(),
        };
        let inner = MarkovSimulator::with_config(CsvSource::open(data_dir)?, config)?;
        Ok(PyMarkovSimulator { inner })
    }

    pub fn teams(&self, season: &str) -> PyResult<Vec<String>> {
        Ok(self.inner.source().teams(season)?)
    }

    pub fn seasons(&self) -> PyResult<Vec<String>> {
        Ok(self.inner.source().seasons()?)
    }

    pub fn baseline_wins(&self, team: &str, season: &str) -> PyResult<Option<f64>> {
        Ok(self.inner.source().baseline_wins(team, season)?)
    }

    /// Transition probabilities keyed by state label.
    #[pyo3(signature = (team, season, additional_vars = None, adjusted_metrics = None))]
    pub fn transition_matrix(
        &self,
        team: &str,
        season: &str,
        additional_vars: Option<HashMap<String, f64>>,
        adjusted_metrics: Option<HashMap<String, f64>>,
    ) -> PyResult<BTreeMap<String, BTreeMap<String, f64>>> {
        let adjustment = self.adjustment(team, season, additional_vars, adjusted_metrics)?;
        Ok(self.inner.matrix(team, season, adjustment.as_ref())?.to_labeled())
    }

    /// Target deltas for a single-category scenario, e.g. `("3PT FG%", 5.0)`.
    #[pyo3(signature = (team, season, stat, percent, opponent = false))]
    pub fn scenario_targets(
        &self,
        team: &str,
        season: &str,
        stat: &str,
        percent: f64,
        opponent: bool,
    ) -> PyResult<BTreeMap<String, f64>> {
        let side = if opponent { Side::Opponent } else { Side::Team };
        let scenario = Scenario::new(side, parse_stat(stat)?, percent);
        let config = self.inner.adjustment_for(team, season, &scenario, None)?;
        Ok(config.targets.to_flat())
    }

    /// Simulate one season. Returns the outcome as JSON.
    #[pyo3(signature = (team, season, additional_vars = None, adjusted_metrics = None, seed = None))]
    pub fn simulate_season(
        &self,
        team: &str,
        season: &str,
        additional_vars: Option<HashMap<String, f64>>,
        adjusted_metrics: Option<HashMap<String, f64>>,
        seed: Option<u64>,
    ) -> PyResult<String> {
        let adjustment = self.adjustment(team, season, additional_vars, adjusted_metrics)?;
        to_json(&self.inner.simulate_season(team, season, adjustment.as_ref(), seed)?)
    }

    /// Simulate several seasons (the configured count unless given). Returns
    /// seasons and statistics as JSON.
    #[pyo3(signature = (team, season, num_seasons = None, additional_vars = None, adjusted_metrics = None, seed = None))]
    pub fn simulate_seasons(
        &self,
        team: &str,
        season: &str,
        num_seasons: Option<usize>,
        additional_vars: Option<HashMap<String, f64>>,
        adjusted_metrics: Option<HashMap<String, f64>>,
        seed: Option<u64>,
    ) -> PyResult<String> {
        let adjustment = self.adjustment(team, season, additional_vars, adjusted_metrics)?;
        let num_seasons = num_seasons.unwrap_or(self.inner.config().num_seasons);
        let run = self
            .inner
            .simulate_seasons(team, season, num_seasons, adjustment.as_ref(), seed)?;
        to_json(&run)
    }

    /// Start a cancellable run yielding one JSON event per season.
    #[pyo3(signature = (run_key, team, season, num_seasons = None, additional_vars = None, adjusted_metrics = None, seed = None))]
    #[allow(clippy::too_many_arguments)]
    pub fn stream_seasons(
        &self,
        run_key: &str,
        team: &str,
        season: &str,
        num_seasons: Option<usize>,
        additional_vars: Option<HashMap<String, f64>>,
        adjusted_metrics: Option<HashMap<String, f64>>,
        seed: Option<u64>,
    ) -> PyResult<PySeasonStream> {
        let adjustment = self.adjustment(team, season, additional_vars, adjusted_metrics)?;
        let num_seasons = num_seasons.unwrap_or(self.inner.config().num_seasons);
        let stream = self
            .inner
            .stream_seasons(run_key, team, season, num_seasons, adjustment.as_ref(), seed)?;
        Ok(PySeasonStream { inner: stream })
    }

    pub fn cancel(&self, run_key: &str) -> bool {
        self.inner.cancel(run_key)
    }

    /// Write the twelve-scenario adjustment report for a team as CSV.
    #[pyo3(signature = (team, season, path, percent = crate::constants::DEFAULT_SCENARIO_PERCENT))]
    pub fn write_adjustment_report(&self, team: &str, season: &str, path: &str, percent: f64) -> PyResult<usize> {
        let source = self.inner.source();
        let rows = adjustment_report(
            &source.counts(team, season)?,
            &source.season_metrics(team, season)?,
            &source.rates(team, season)?,
            percent,
        )?;
        let file = File::create(path).map_err(|e| PyIOError::new_err(format!("Failed to create file: {}", e)))?;
        write_csv(&rows, file)?;
        Ok(rows.len())
    }
}

/// Iterator over a streaming run's JSON events.
#[pyclass(name = "SeasonStream")]
pub struct PySeasonStream {
    inner: SeasonStream,
}

#[pymethods]
impl PySeasonStream {
    fn __iter__(slf: PyRef<'_, Self>) -> PyRef<'_, Self> {
        slf
    }

    fn __next__(mut slf: PyRefMut<'_, Self>) -> PyResult<Option<String>> {
        match slf.inner.next() {
            Some(event) => Ok(Some(to_json(&event?)?)),
            None => Ok(None),
        }
    }
}
