//! Historical transition counts and their pivoted matrix form.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::state::State;

/// One observed `(state, next_state)` count as supplied by the data provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransitionCount {
    pub state: String,
    pub next_state: String,
    pub count: f64,
    #[serde(default)]
    pub poss_per_game: Option<f64>,
}

impl TransitionCount {
    pub fn new(state: &str, next_state: &str, count: f64) -> Self {
        TransitionCount {
            state: state.to_string(),
            next_state: next_state.to_string(),
            count,
            poss_per_game: None,
        }
    }
}

/// All transition counts for one team and season.
#[derive(Clone, Debug, PartialEq)]
pub struct TeamCounts {
    pub team: String,
    pub season: String,
    pub rows: Vec<TransitionCount>,
}

impl TeamCounts {
    pub fn new(team: impl Into<String>, season: impl Into<String>, rows: Vec<TransitionCount>) -> Self {
        TeamCounts {
            team: team.into(),
            season: season.into(),
            rows,
        }
    }

    /// Historical average possessions per game.
    pub fn possessions_per_game(&self) -> SimResult<f64> {
        self.rows
            .iter()
            .find_map(|row| row.poss_per_game)
            .filter(|poss| poss.is_finite() && *poss > 0.0)
            .ok_or_else(|| {
                SimError::not_found(format!("possessions per game for {} {}", self.team, self.season))
            })
    }

    /// Possessions each side gets in a simulated game.
    pub fn possessions_per_team(&self) -> SimResult<u32> {
        Ok(self.possessions_per_game()?.round() as u32)
    }

    pub fn with_possessions_per_game(mut self, poss: f64) -> Self {
        for row in &mut self.rows {
            row.poss_per_game = Some(poss);
        }
        self
    }
}

/// A count that went negative after adjustment and was clipped to zero.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ClippedCount {
    pub state: State,
    pub next_state: State,
    pub value: f64,
}

/// State x next_state count matrix. Absent pairs read as zero.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CountMatrix {
    rows: BTreeMap<State, BTreeMap<State, f64>>,
}

impl CountMatrix {
    /// Pivot raw rows, summing duplicate pairs.
    pub fn from_counts(counts: &TeamCounts) -> SimResult<Self> {
        if counts.rows.is_empty() {
            return Err(SimError::not_found(format!(
                "transition counts for {} {}",
                counts.team, counts.season
            )));
        }

        let mut matrix = CountMatrix::default();
        for row in &counts.rows {
            if !row.count.is_finite() || row.count < 0.0 {
                return Err(SimError::InvalidCount {
                    state: row.state.clone(),
                    next_state: row.next_state.clone(),
                    count: row.count,
                });
            }
            let from = State::parse(&row.state, &counts.team)?;
            let to = State::parse(&row.next_state, &counts.team)?;
            *matrix.rows.entry(from).or_default().entry(to).or_insert(0.0) += row.count;
        }
        Ok(matrix)
    }

    pub fn get(&self, from: State, to: State) -> f64 {
        self.rows
            .get(&from)
            .and_then(|row| row.get(&to))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn row(&self, from: State) -> Option<&BTreeMap<State, f64>> {
        self.rows.get(&from)
    }

    pub fn has_row(&self, from: State) -> bool {
        self.rows.contains_key(&from)
    }

    pub fn row_total(&self, from: State) -> f64 {
        self.rows.get(&from).map(|row| row.values().sum()).unwrap_or(0.0)
    }

    pub fn rows(&self) -> impl Iterator<Item = (State, &BTreeMap<State, f64>)> {
        self.rows.iter().map(|(state, row)| (*state, row))
    }

    /// Sum of counts flowing into `to` from any of `origins`.
    pub fn total_into(&self, to: State, origins: &[State]) -> f64 {
        origins.iter().map(|from| self.get(*from, to)).sum()
    }

    /// Add `delta` to a pair of an observed row. Returns false when the row
    /// was never observed, leaving the matrix untouched.
    pub fn add(&mut self, from: State, to: State, delta: f64) -> bool {
        match self.rows.get_mut(&from) {
            Some(row) => {
                *row.entry(to).or_insert(0.0) += delta;
                true
            }
            None => false,
        }
    }

    /// Clip negative counts to zero and report each one.
    pub fn clip_negatives(&mut self) -> Vec<ClippedCount> {
        let mut clipped = Vec::new();
        for (from, row) in self.rows.iter_mut() {
            for (to, value) in row.iter_mut() {
                if *value < 0.0 {
                    clipped.push(ClippedCount {
                        state: *from,
                        next_state: *to,
                        value: *value,
                    });
                    *value = 0.0;
                }
            }
        }
        clipped
    }
}
