//! Season box-score metrics and the target deltas derived from a
//! percentage-point adjustment request.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::MIN_RATE_CHANGE;
use crate::error::{SimError, SimResult};
use crate::state::Side;

/// Season volumes the team itself recorded. Opponent volumes are
/// approximated by these as well.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamAttempts {
    pub fg2_attempts: f64,
    pub fg3_attempts: f64,
    pub ft_attempts: f64,
    pub turnovers: f64,
    pub dreb: f64,
    pub oreb: f64,
}

impl TeamAttempts {
    /// Shot-ending possessions: field goal attempts plus turnovers.
    pub fn possessions(&self) -> f64 {
        self.fg2_attempts + self.fg3_attempts + self.turnovers
    }
}

/// Team and opponent shooting, rebounding and turnover rates for a season.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeasonMetrics {
    pub fg2_pct: f64,
    pub fg3_pct: f64,
    pub ft_pct: f64,
    pub oreb_pct: f64,
    pub dreb_pct: f64,
    pub tov_pct: f64,
    pub opp_fg2_pct: f64,
    pub opp_fg3_pct: f64,
    pub opp_ft_pct: f64,
    pub opp_oreb_pct: f64,
    pub opp_dreb_pct: f64,
    pub opp_tov_pct: f64,
    pub attempts: TeamAttempts,
}

/// Adjustable box-score statistic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stat {
    TwoPoint,
    ThreePoint,
    FreeThrow,
    OffensiveRebound,
    DefensiveRebound,
    Turnover,
}

impl Stat {
    pub const ALL: [Stat; 6] = [
        Stat::TwoPoint,
        Stat::ThreePoint,
        Stat::FreeThrow,
        Stat::OffensiveRebound,
        Stat::DefensiveRebound,
        Stat::Turnover,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stat::TwoPoint => "2PT FG%",
            Stat::ThreePoint => "3PT FG%",
            Stat::FreeThrow => "FT%",
            Stat::OffensiveRebound => "OREB%",
            Stat::DefensiveRebound => "DREB%",
            Stat::Turnover => "TOV%",
        }
    }

    /// Key of the target delta in the provider's flat vocabulary.
    fn target_key(self, side: Side) -> &'static str {
        match (side, self) {
            (Side::Team, Stat::TwoPoint) => "additional_shots_made_2",
            (Side::Team, Stat::ThreePoint) => "additional_shots_made_3",
            (Side::Team, Stat::FreeThrow) => "additional_shots_made_ft",
            (Side::Team, Stat::OffensiveRebound) => "additional_oreb",
            (Side::Team, Stat::DefensiveRebound) => "additional_dreb",
            (Side::Team, Stat::Turnover) => "additional_turnovers",
            (Side::Opponent, Stat::TwoPoint) => "opp_additional_shots_made_2",
            (Side::Opponent, Stat::ThreePoint) => "opp_additional_shots_made_3",
            (Side::Opponent, Stat::FreeThrow) => "opp_additional_shots_made_ft",
            (Side::Opponent, Stat::OffensiveRebound) => "opp_additional_oreb",
            (Side::Opponent, Stat::DefensiveRebound) => "opp_additional_dreb",
            (Side::Opponent, Stat::Turnover) => "opp_additional_turnovers",
        }
    }
}

impl SeasonMetrics {
    pub fn rate(&self, side: Side, stat: Stat) -> f64 {
        match (side, stat) {
            (Side::Team, Stat::TwoPoint) => self.fg2_pct,
            (Side::Team, Stat::ThreePoint) => self.fg3_pct,
            (Side::Team, Stat::FreeThrow) => self.ft_pct,
            (Side::Team, Stat::OffensiveRebound) => self.oreb_pct,
            (Side::Team, Stat::DefensiveRebound) => self.dreb_pct,
            (Side::Team, Stat::Turnover) => self.tov_pct,
            (Side::Opponent, Stat::TwoPoint) => self.opp_fg2_pct,
            (Side::Opponent, Stat::ThreePoint) => self.opp_fg3_pct,
            (Side::Opponent, Stat::FreeThrow) => self.opp_ft_pct,
            (Side::Opponent, Stat::OffensiveRebound) => self.opp_oreb_pct,
            (Side::Opponent, Stat::DefensiveRebound) => self.opp_dreb_pct,
            (Side::Opponent, Stat::Turnover) => self.opp_tov_pct,
        }
    }

    fn rate_mut(&mut self, side: Side, stat: Stat) -> &mut f64 {
        match (side, stat) {
            (Side::Team, Stat::TwoPoint) => &mut self.fg2_pct,
            (Side::Team, Stat::ThreePoint) => &mut self.fg3_pct,
            (Side::Team, Stat::FreeThrow) => &mut self.ft_pct,
            (Side::Team, Stat::OffensiveRebound) => &mut self.oreb_pct,
            (Side::Team, Stat::DefensiveRebound) => &mut self.dreb_pct,
            (Side::Team, Stat::Turnover) => &mut self.tov_pct,
            (Side::Opponent, Stat::TwoPoint) => &mut self.opp_fg2_pct,
            (Side::Opponent, Stat::ThreePoint) => &mut self.opp_fg3_pct,
            (Side::Opponent, Stat::FreeThrow) => &mut self.opp_ft_pct,
            (Side::Opponent, Stat::OffensiveRebound) => &mut self.opp_oreb_pct,
            (Side::Opponent, Stat::DefensiveRebound) => &mut self.opp_dreb_pct,
            (Side::Opponent, Stat::Turnover) => &mut self.opp_tov_pct,
        }
    }

    /// Rates after a `percent` improvement in the team's favour.
    ///
    /// The team's rates grow by the factor `1 + percent/100` and its turnover
    /// rate shrinks by the same proportion; the opponent moves the other way.
    pub fn improved(&self, percent: f64) -> SeasonMetrics {
        let factor = 1.0 + percent / 100.0;
        let mut improved = *self;
        for stat in Stat::ALL {
            let (team, opp) = match stat {
                Stat::Turnover => (2.0 - factor, factor),
                _ => (factor, 2.0 - factor),
            };
            *improved.rate_mut(Side::Team, stat) *= team;
            *improved.rate_mut(Side::Opponent, stat) *= opp;
        }
        improved
    }

    /// Season-volume change of `stat` for `side` when its rate moves to
    /// `improved`'s value. Returns 0 for changes below the noise floor.
    pub fn additional(&self, improved: &SeasonMetrics, side: Side, stat: Stat) -> f64 {
        let before = self.rate(side, stat);
        let after = improved.rate(side, stat);
        if (after - before).abs() < MIN_RATE_CHANGE {
            return 0.0;
        }

        let a = &self.attempts;
        match stat {
            Stat::TwoPoint => after * a.fg2_attempts - a.fg2_attempts * before,
            Stat::ThreePoint => after * a.fg3_attempts - a.fg3_attempts * before,
            Stat::FreeThrow => after * a.ft_attempts - a.ft_attempts * before,
            Stat::Turnover => after * a.possessions() - a.turnovers,
            Stat::OffensiveRebound => a.oreb / before * after - a.oreb,
            Stat::DefensiveRebound => a.dreb / before * after - a.dreb,
        }
    }
}

/// A single-category improvement request, e.g. "3PT FG% +5.0%" or
/// "OPP TOV% +5.0%".
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub side: Side,
    pub stat: Stat,
    pub percent: f64,
}

impl Scenario {
    pub fn new(side: Side, stat: Stat, percent: f64) -> Self {
        Scenario { side, stat, percent }
    }

    /// The twelve single-category scenarios in report order.
    pub fn all(percent: f64) -> Vec<Scenario> {
        Side::BOTH
            .iter()
            .flat_map(|side| Stat::ALL.iter().map(move |stat| Scenario::new(*side, *stat, percent)))
            .collect()
    }

    /// Sign shown in labels: improvements raise team rates and lower
    /// opponent rates, except turnovers which move the opposite way.
    fn sign(&self) -> char {
        let raises = matches!(
            (self.side, self.stat),
            (Side::Team, s) if s != Stat::Turnover
        ) || matches!((self.side, self.stat), (Side::Opponent, Stat::Turnover));
        if raises {
            '+'
        } else {
            '-'
        }
    }

    pub fn label(&self) -> String {
        let prefix = match self.side {
            Side::Team => "",
            Side::Opponent => "OPP ",
        };
        // Percent keeps its decimal point, e.g. `2PT FG% +5.0%`
        format!("{}{} {}{:?}%", prefix, self.stat.name(), self.sign(), self.percent)
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Signed season-volume changes per adjustable category. `None` means the
/// category is not adjusted. Serialized as the flat `additional_*` mapping.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(into = "BTreeMap<String, f64>", try_from = "HashMap<String, f64>")]
pub struct TargetDeltas {
    values: BTreeMap<(Side, Stat), f64>,
}

impl TargetDeltas {
    pub fn new() -> Self {
        TargetDeltas::default()
    }

    /// Every category derived from `metrics` for a `percent` improvement.
    pub fn from_metrics(metrics: &SeasonMetrics, percent: f64) -> Self {
        let improved = metrics.improved(percent);
        let mut deltas = TargetDeltas::new();
        for side in Side::BOTH {
            for stat in Stat::ALL {
                deltas.set(side, stat, metrics.additional(&improved, side, stat));
            }
        }
        deltas
    }

    /// Only the scenario's own category.
    pub fn for_scenario(metrics: &SeasonMetrics, scenario: &Scenario) -> Self {
        let improved = metrics.improved(scenario.percent);
        let mut deltas = TargetDeltas::new();
        deltas.set(
            scenario.side,
            scenario.stat,
            metrics.additional(&improved, scenario.side, scenario.stat),
        );
        deltas
    }

    pub fn get(&self, side: Side, stat: Stat) -> Option<f64> {
        self.values.get(&(side, stat)).copied()
    }

    pub fn set(&mut self, side: Side, stat: Stat, amount: f64) {
        self.values.insert((side, stat), amount);
    }

    pub fn with(mut self, side: Side, stat: Stat, amount: f64) -> Self {
        self.set(side, stat, amount);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (Side, Stat, f64)> + '_ {
        self.values.iter().map(|((side, stat), amount)| (*side, *stat, *amount))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// True when no category would move any count.
    pub fn is_zero(&self) -> bool {
        self.values.values().all(|amount| *amount == 0.0)
    }

    /// Parse the provider's `additional_*` mapping.
    pub fn from_flat(values: &HashMap<String, f64>) -> SimResult<Self> {
        let mut deltas = TargetDeltas::new();
        for (key, amount) in values {
            let (side, stat) = Side::BOTH
                .iter()
                .flat_map(|side| Stat::ALL.iter().map(move |stat| (*side, *stat)))
                .find(|(side, stat)| stat.target_key(*side) == key)
                .ok_or_else(|| SimError::InvalidConfig(format!("unknown target delta {}", key)))?;
            if !amount.is_finite() {
                return Err(SimError::InvalidConfig(format!("target delta {} is {}", key, amount)));
            }
            deltas.set(side, stat, *amount);
        }
        Ok(deltas)
    }

    pub fn to_flat(&self) -> BTreeMap<String, f64> {
        self.iter()
            .map(|(side, stat, amount)| (stat.target_key(side).to_string(), amount))
            .collect()
    }
}

impl From<TargetDeltas> for BTreeMap<String, f64> {
    fn from(deltas: TargetDeltas) -> Self {
        deltas.to_flat()
    }
}

impl TryFrom<HashMap<String, f64>> for TargetDeltas {
    type Error = SimError;

    fn try_from(values: HashMap<String, f64>) -> SimResult<Self> {
        TargetDeltas::from_flat(&values)
    }
}

/// Rebounding rates that split a miss between an offensive rebound and an
/// opponent defensive rebound.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdjustedMetrics {
    pub oreb_pct: f64,
    pub opp_oreb_pct: f64,
}

/// Caller-supplied replacements for individual [`AdjustedMetrics`] fields.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AdjustedOverrides {
    pub oreb_pct: Option<f64>,
    pub opp_oreb_pct: Option<f64>,
}

impl AdjustedMetrics {
    pub fn from_season(metrics: &SeasonMetrics) -> Self {
        AdjustedMetrics {
            oreb_pct: metrics.oreb_pct,
            opp_oreb_pct: metrics.opp_oreb_pct,
        }
    }

    pub fn with_overrides(self, overrides: &AdjustedOverrides) -> Self {
        AdjustedMetrics {
            oreb_pct: overrides.oreb_pct.unwrap_or(self.oreb_pct),
            opp_oreb_pct: overrides.opp_oreb_pct.unwrap_or(self.opp_oreb_pct),
        }
    }

    /// Offensive rebound rate of the side whose shot missed.
    pub fn oreb_for(&self, side: Side) -> f64 {
        match side {
            Side::Team => self.oreb_pct,
            Side::Opponent => self.opp_oreb_pct,
        }
    }

    pub fn validate(&self) -> SimResult<()> {
        for (key, value) in [("oreb_pct", self.oreb_pct), ("opp_oreb_pct", self.opp_oreb_pct)] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(SimError::InvalidRate { key: key.to_string(), value });
            }
        }
        Ok(())
    }
}
