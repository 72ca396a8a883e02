//! Data providers for transition counts, rate metrics and season metrics.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use crate::box_score::{SeasonMetrics, TeamAttempts};
use crate::counts::{CountMatrix, TeamCounts, TransitionCount};
use crate::error::{SimError, SimResult};
use crate::rates::RateMetrics;

/// Read access to the historical data a simulation needs.
pub trait TransitionSource: Send + Sync {
    /// Every transition count recorded for `team` in `season`.
    fn counts(&self, team: &str, season: &str) -> SimResult<TeamCounts>;

    fn rates(&self, team: &str, season: &str) -> SimResult<RateMetrics>;

    fn season_metrics(&self, team: &str, season: &str) -> SimResult<SeasonMetrics>;

    /// Previously simulated win total used as a calibration reference.
    fn baseline_wins(&self, _team: &str, _season: &str) -> SimResult<Option<f64>> {
        Ok(None)
    }

    /// Teams with counts in `season`, sorted.
    fn teams(&self, season: &str) -> SimResult<Vec<String>>;

    fn seasons(&self) -> SimResult<Vec<String>>;
}

type Key = (String, String);

fn key(team: &str, season: &str) -> Key {
    (team.to_string(), season.to_string())
}

/// A source holding everything in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    counts: HashMap<Key, TeamCounts>,
    rates: HashMap<Key, RateMetrics>,
    metrics: HashMap<Key, SeasonMetrics>,
    baseline_wins: HashMap<Key, f64>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_counts(&mut self, counts: TeamCounts) {
        let key = key(&counts.team, &counts.season);
        match self.counts.get_mut(&key) {
            Some(existing) => existing.rows.extend(counts.rows),
            None => {
                self.counts.insert(key, counts);
            }
        }
    }

    pub fn insert_rates(&mut self, team: &str, season: &str, rates: RateMetrics) {
        self.rates.insert(key(team, season), rates);
    }

    pub fn insert_season_metrics(&mut self, team: &str, season: &str, metrics: SeasonMetrics) {
        self.metrics.insert(key(team, season), metrics);
    }

    pub fn insert_baseline_wins(&mut self, team: &str, season: &str, wins: f64) {
        self.baseline_wins.insert(key(team, season), wins);
    }

    pub fn with_counts(mut self, counts: TeamCounts) -> Self {
        self.insert_counts(counts);
        self
    }

    pub fn with_season_metrics(mut self, team: &str, season: &str, metrics: SeasonMetrics) -> Self {
        self.insert_season_metrics(team, season, metrics);
        self
    }
}

impl TransitionSource for InMemorySource {
    fn counts(&self, team: &str, season: &str) -> SimResult<TeamCounts> {
        self.counts
            .get(&key(team, season))
            .cloned()
            .ok_or_else(|| SimError::not_found(format!("transition counts for {} {}", team, season)))
    }

    /// Stored rates, or rates derived from the team's own counts when none
    /// were loaded.
    fn rates(&self, team: &str, season: &str) -> SimResult<RateMetrics> {
        if let Some(rates) = self.rates.get(&key(team, season)) {
            return Ok(*rates);
        }
        debug!(team, season, "deriving rate metrics from counts");
        let counts = self.counts(team, season)?;
        Ok(RateMetrics::from_counts(&CountMatrix::from_counts(&counts)?))
    }

    fn season_metrics(&self, team: &str, season: &str) -> SimResult<SeasonMetrics> {
        self.metrics
            .get(&key(team, season))
            .copied()
            .ok_or_else(|| SimError::not_found(format!("season metrics for {} {}", team, season)))
    }

    fn baseline_wins(&self, team: &str, season: &str) -> SimResult<Option<f64>> {
        Ok(self.baseline_wins.get(&key(team, season)).copied())
    }

    fn teams(&self, season: &str) -> SimResult<Vec<String>> {
        let teams: BTreeSet<&String> = self
            .counts
            .keys()
            .filter(|(_, s)| s == season)
            .map(|(team, _)| team)
            .collect();
        Ok(teams.into_iter().cloned().collect())
    }

    fn seasons(&self) -> SimResult<Vec<String>> {
        let seasons: BTreeSet<&String> = self.counts.keys().map(|(_, season)| season).collect();
        Ok(seasons.into_iter().cloned().collect())
    }
}

#[derive(Debug, Deserialize)]
struct CountRow {
    team: String,
    season: String,
    state: String,
    next_state: String,
    count: f64,
    #[serde(default)]
    poss_per_game: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct SeasonMetricsRow {
    team: String,
    season: String,
    fg2_pct: f64,
    fg3_pct: f64,
    ft_pct: f64,
    oreb_pct: f64,
    dreb_pct: f64,
    tov_pct: f64,
    opp_fg2_pct: f64,
    opp_fg3_pct: f64,
    opp_ft_pct: f64,
    opp_oreb_pct: f64,
    opp_dreb_pct: f64,
    opp_tov_pct: f64,
    fg2_attempts: f64,
    fg3_attempts: f64,
    ft_attempts: f64,
    turnovers: f64,
    dreb: f64,
    oreb: f64,
}

impl SeasonMetricsRow {
    fn into_metrics(self) -> SeasonMetrics {
        SeasonMetrics {
            fg2_pct: self.fg2_pct,
            fg3_pct: self.fg3_pct,
            ft_pct: self.ft_pct,
            oreb_pct: self.oreb_pct,
            dreb_pct: self.dreb_pct,
            tov_pct: self.tov_pct,
            opp_fg2_pct: self.opp_fg2_pct,
            opp_fg3_pct: self.opp_fg3_pct,
            opp_ft_pct: self.opp_ft_pct,
            opp_oreb_pct: self.opp_oreb_pct,
            opp_dreb_pct: self.opp_dreb_pct,
            opp_tov_pct: self.opp_tov_pct,
            attempts: TeamAttempts {
                fg2_attempts: self.fg2_attempts,
                fg3_attempts: self.fg3_attempts,
                ft_attempts: self.ft_attempts,
                turnovers: self.turnovers,
                dreb: self.dreb,
                oreb: self.oreb,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct BaselineRow {
    team: String,
    season: String,
    wins: f64,
}

/// A directory of CSV exports:
///
/// - `transition_counts.csv`: team, season, state, next_state, count, poss_per_game
/// - `rate_metrics.csv`: team, season and one column per rate key (optional)
/// - `season_metrics.csv`: team, season, rates and attempt volumes (optional)
/// - `baseline_wins.csv`: team, season, wins (optional)
#[derive(Debug, Clone)]
pub struct CsvSource {
    dir: PathBuf,
    data: InMemorySource,
}

impl CsvSource {
    pub const COUNTS_FILE: &'static str = "transition_counts.csv";
    pub const RATES_FILE: &'static str = "rate_metrics.csv";
    pub const METRICS_FILE: &'static str = "season_metrics.csv";
    pub const BASELINE_FILE: &'static str = "baseline_wins.csv";

    pub fn open(dir: impl AsRef<Path>) -> SimResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        let mut data = InMemorySource::new();

        let mut grouped: HashMap<Key, Vec<TransitionCount>> = HashMap::new();
        let mut reader = csv::Reader::from_path(dir.join(Self::COUNTS_FILE))?;
        for row in reader.deserialize() {
            let row: CountRow = row?;
            grouped.entry((row.team, row.season)).or_default().push(TransitionCount {
                state: row.state,
                next_state: row.next_state,
                count: row.count,
                poss_per_game: row.poss_per_game,
            });
        }
        let teams = grouped.len();
        for ((team, season), rows) in grouped {
            data.insert_counts(TeamCounts::new(team, season, rows));
        }

        let rates = dir.join(Self::RATES_FILE);
        if rates.exists() {
            let mut reader = csv::Reader::from_path(rates)?;
            for row in reader.deserialize() {
                let row: HashMap<String, String> = row?;
                let (team, season) = team_season(&row)?;
                let values: HashMap<String, f64> = row
                    .iter()
                    .filter_map(|(k, v)| v.trim().parse::<f64>().ok().map(|v| (k.clone(), v)))
                    .collect();
                data.insert_rates(&team, &season, RateMetrics::from_flat(&values)?);
            }
        }

        let metrics = dir.join(Self::METRICS_FILE);
        if metrics.exists() {
            let mut reader = csv::Reader::from_path(metrics)?;
            for row in reader.deserialize() {
                let row: SeasonMetricsRow = row?;
                let (team, season) = (row.team.clone(), row.season.clone());
                data.insert_season_metrics(&team, &season, row.into_metrics());
            }
        }

        let baseline = dir.join(Self::BASELINE_FILE);
        if baseline.exists() {
            let mut reader = csv::Reader::from_path(baseline)?;
            for row in reader.deserialize() {
                let row: BaselineRow = row?;
                data.insert_baseline_wins(&row.team, &row.season, row.wins);
            }
        }

        info!(dir = %dir.display(), teams, "loaded CSV source");
        Ok(Self { dir, data })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn team_season(row: &HashMap<String, String>) -> SimResult<(String, String)> {
    let field = |name: &str| {
        row.get(name)
            .cloned()
            .ok_or_else(|| SimError::InvalidConfig(format!("rate_metrics.csv row without {}", name)))
    };
    Ok((field("team")?, field("season")?))
}

impl TransitionSource for CsvSource {
    fn counts(&self, team: &str, season: &str) -> SimResult<TeamCounts> {
        self.data.counts(team, season)
    }

    fn rates(&self, team: &str, season: &str) -> SimResult<RateMetrics> {
        self.data.rates(team, season)
    }

    fn season_metrics(&self, team: &str, season: &str) -> SimResult<SeasonMetrics> {
        self.data.season_metrics(team, season)
    }

    fn baseline_wins(&self, team: &str, season: &str) -> SimResult<Option<f64>> {
        self.data.baseline_wins(team, season)
    }

    fn teams(&self, season: &str) -> SimResult<Vec<String>> {
        self.data.teams(season)
    }

    fn seasons(&self) -> SimResult<Vec<String>> {
        self.data.seasons()
    }
}
