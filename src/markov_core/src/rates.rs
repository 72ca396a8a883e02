//! Conditional rate metrics used to weight adjustments.
//!
//! Each rate answers "of the events of kind X, what share came from origin Y",
//! or "of the non-turnover outcomes of state Y, what share were X". They are
//! supplied by the data provider as a flat key/value mapping, or derived
//! directly from a team's transition counts.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::counts::CountMatrix;
use crate::error::{SimError, SimResult};
use crate::state::{Phase, Side, State};

/// Shares of the competing (non-turnover) outcomes of one originating state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OutcomeShares {
    pub two_made: f64,
    pub three_made: f64,
    pub free_throw_made: f64,
    pub offensive_rebound: f64,
    /// Defensive rebound by the other side.
    pub defensive_rebound: f64,
}

impl OutcomeShares {
    pub fn total(&self) -> f64 {
        self.two_made + self.three_made + self.free_throw_made + self.offensive_rebound + self.defensive_rebound
    }

    /// Shares rescaled to sum to 1, or `None` when they carry no mass.
    pub fn normalized(&self) -> Option<OutcomeShares> {
        let total = self.total();
        if !(total > 0.0) {
            return None;
        }
        Some(OutcomeShares {
            two_made: self.two_made / total,
            three_made: self.three_made / total,
            free_throw_made: self.free_throw_made / total,
            offensive_rebound: self.offensive_rebound / total,
            defensive_rebound: self.defensive_rebound / total,
        })
    }

    /// Pair each share with its outcome state for an offense run by `side`.
    pub fn outcomes(&self, side: Side) -> [(State, f64); 5] {
        [
            (State::new(side, Phase::TwoMade), self.two_made),
            (State::new(side, Phase::ThreeMade), self.three_made),
            (State::new(side, Phase::FreeThrowMade), self.free_throw_made),
            (State::new(side, Phase::OffensiveRebound), self.offensive_rebound),
            (State::new(side.other(), Phase::DefensiveRebound), self.defensive_rebound),
        ]
    }
}

/// Rates describing one side's offense (and its defensive rebounding).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SideRates {
    /// Share of made 2s that came after an offensive rebound.
    pub two_made_from_oreb: f64,
    /// Share of made 3s that came after an offensive rebound.
    pub three_made_from_oreb: f64,
    pub ft_made_from_offense_start: f64,
    pub ft_made_from_oreb: f64,
    pub ft_made_from_ft_made: f64,
    /// Share of turnovers committed after an offensive rebound.
    pub turnover_from_oreb: f64,
    pub after_offense_start: OutcomeShares,
    pub after_oreb: OutcomeShares,
    /// Share of offensive rebounds that followed another offensive rebound.
    pub oreb_from_oreb: f64,
    /// Share of this side's defensive rebounds that followed an opponent
    /// offensive rebound.
    pub dreb_from_opp_oreb: f64,
}

pub(crate) const FIELDS_PER_SIDE: usize = 18;

const TEAM_KEYS: [&str; FIELDS_PER_SIDE] = [
    "per_2pt_made_from_oreb",
    "per_3pt_made_from_oreb",
    "per_ft_made_from_offense_start",
    "per_ft_made_from_oreb",
    "per_ft_made_from_ft_made",
    "per_turnover_from_oreb",
    "per_2pt_made_from_offense_start_tov",
    "per_3pt_made_from_offense_start_tov",
    "per_ft_made_from_offense_start_tov",
    "per_oreb_from_offense_start_tov",
    "per_opp_dreb_from_offense_start_tov",
    "per_2pt_made_from_oreb_tov",
    "per_3pt_made_from_oreb_tov",
    "per_ft_made_from_oreb_tov",
    "per_oreb_from_oreb_tov",
    "per_opp_dreb_from_oreb_tov",
    "per_oreb_from_oreb",
    "per_dreb_from_opp_oreb",
];

const OPPONENT_KEYS: [&str; FIELDS_PER_SIDE] = [
    "per_2pt_made_from_oreb_opp",
    "per_3pt_made_from_oreb_opp",
    "per_ft_made_from_offense_start_opp",
    "per_ft_made_from_oreb_opp",
    "per_ft_made_from_ft_made_opp",
    "per_turnover_from_oreb_opp",
    "per_2pt_made_from_offense_start_tov_opp",
    "per_3pt_made_from_offense_start_tov_opp",
    "per_ft_made_from_offense_start_tov_opp",
    "per_oreb_from_offense_start_tov_opp",
    "per_dreb_from_offense_start_tov_opp",
    "per_2pt_made_from_oreb_tov_opp",
    "per_3pt_made_from_oreb_tov_opp",
    "per_ft_made_from_oreb_tov_opp",
    "per_oreb_from_oreb_tov_opp",
    "per_dreb_from_oreb_tov_opp",
    "per_opp_oreb_from_oreb_opp",
    "per_opp_dreb_from_oreb",
];

fn keys(side: Side) -> &'static [&'static str; FIELDS_PER_SIDE] {
    match side {
        Side::Team => &TEAM_KEYS,
        Side::Opponent => &OPPONENT_KEYS,
    }
}

impl SideRates {
    fn to_array(&self) -> [f64; FIELDS_PER_SIDE] {
        let s = &self.after_offense_start;
        let o = &self.after_oreb;
        [
            self.two_made_from_oreb,
            self.three_made_from_oreb,
            self.ft_made_from_offense_start,
            self.ft_made_from_oreb,
            self.ft_made_from_ft_made,
            self.turnover_from_oreb,
            s.two_made,
            s.three_made,
            s.free_throw_made,
            s.offensive_rebound,
            s.defensive_rebound,
            o.two_made,
            o.three_made,
            o.free_throw_made,
            o.offensive_rebound,
            o.defensive_rebound,
            self.oreb_from_oreb,
            self.dreb_from_opp_oreb,
        ]
    }

    pub(crate) fn from_array(v: [f64; FIELDS_PER_SIDE]) -> Self {
        SideRates {
            two_made_from_oreb: v[0],
            three_made_from_oreb: v[1],
            ft_made_from_offense_start: v[2],
            ft_made_from_oreb: v[3],
            ft_made_from_ft_made: v[4],
            turnover_from_oreb: v[5],
            after_offense_start: OutcomeShares {
                two_made: v[6],
                three_made: v[7],
                free_throw_made: v[8],
                offensive_rebound: v[9],
                defensive_rebound: v[10],
            },
            after_oreb: OutcomeShares {
                two_made: v[11],
                three_made: v[12],
                free_throw_made: v[13],
                offensive_rebound: v[14],
                defensive_rebound: v[15],
            },
            oreb_from_oreb: v[16],
            dreb_from_opp_oreb: v[17],
        }
    }

    /// Derive one side's rates from observed counts.
    pub fn from_counts(counts: &CountMatrix, side: Side) -> Self {
        let start = State::offense_start(side);
        let oreb = State::new(side, Phase::OffensiveRebound);
        let ft_made = State::new(side, Phase::FreeThrowMade);
        let other = side.other();

        let origin_share = |target: State, origins: &[State], origin: State| {
            share(counts.get(origin, target), counts.total_into(target, origins))
        };
        let competing = |from: State| {
            let raw = OutcomeShares::default()
                .outcomes(side)
                .map(|(to, _)| counts.get(from, to));
            let total: f64 = raw.iter().sum();
            OutcomeShares {
                two_made: share(raw[0], total),
                three_made: share(raw[1], total),
                free_throw_made: share(raw[2], total),
                offensive_rebound: share(raw[3], total),
                defensive_rebound: share(raw[4], total),
            }
        };

        let live = [start, oreb];
        let ft_origins = [start, oreb, ft_made];
        SideRates {
            two_made_from_oreb: origin_share(State::new(side, Phase::TwoMade), &live[..], oreb),
            three_made_from_oreb: origin_share(State::new(side, Phase::ThreeMade), &live[..], oreb),
            ft_made_from_offense_start: origin_share(ft_made, &ft_origins[..], start),
            ft_made_from_oreb: origin_share(ft_made, &ft_origins[..], oreb),
            ft_made_from_ft_made: origin_share(ft_made, &ft_origins[..], ft_made),
            turnover_from_oreb: origin_share(State::new(side, Phase::Turnover), &live[..], oreb),
            after_offense_start: competing(start),
            after_oreb: competing(oreb),
            oreb_from_oreb: origin_share(oreb, &live[..], oreb),
            dreb_from_opp_oreb: origin_share(
                State::new(side, Phase::DefensiveRebound),
                &[State::offense_start(other), State::new(other, Phase::OffensiveRebound)][..],
                State::new(other, Phase::OffensiveRebound),
            ),
        }
    }
}

fn share(part: f64, total: f64) -> f64 {
    if total > 0.0 {
        part / total
    } else {
        0.0
    }
}

/// The full rate vocabulary for a team and its opponents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RateMetrics {
    pub team: SideRates,
    pub opponent: SideRates,
}

impl RateMetrics {
    pub fn side(&self, side: Side) -> &SideRates {
        match side {
            Side::Team => &self.team,
            Side::Opponent => &self.opponent,
        }
    }

    /// Every key of the flat vocabulary.
    pub fn vocabulary() -> impl Iterator<Item = &'static str> {
        TEAM_KEYS.iter().chain(OPPONENT_KEYS.iter()).copied()
    }

    /// Build from the provider's flat mapping. Every vocabulary key must be
    /// present; unknown extra keys (ids, season columns) are ignored.
    pub fn from_flat(values: &HashMap<String, f64>) -> SimResult<Self> {
        let read_side = |side: Side| -> SimResult<SideRates> {
            let mut v = [0.0; FIELDS_PER_SIDE];
            for (slot, key) in v.iter_mut().zip(keys(side).iter()) {
                *slot = *values
                    .get(*key)
                    .ok_or_else(|| SimError::UnknownRate { key: key.to_string() })?;
            }
            Ok(SideRates::from_array(v))
        };
        let rates = RateMetrics {
            team: read_side(Side::Team)?,
            opponent: read_side(Side::Opponent)?,
        };
        rates.validate()?;
        Ok(rates)
    }

    pub fn to_flat(&self) -> BTreeMap<String, f64> {
        Side::BOTH
            .iter()
            .flat_map(|side| {
                keys(*side)
                    .iter()
                    .zip(self.side(*side).to_array())
                    .map(|(key, value)| (key.to_string(), value))
            })
            .collect()
    }

    /// Every rate must be a finite probability.
    pub fn validate(&self) -> SimResult<()> {
        for (key, value) in self.to_flat() {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(SimError::InvalidRate { key, value });
            }
        }
        Ok(())
    }

    /// Derive the whole vocabulary from a team's counts.
    pub fn from_counts(counts: &CountMatrix) -> Self {
        RateMetrics {
            team: SideRates::from_counts(counts, Side::Team),
            opponent: SideRates::from_counts(counts, Side::Opponent),
        }
    }
}
