//! Possession state space.
//!
//! States are team-relative: the simulated team's states carry its own tag
//! (e.g. `LAC OREB`) and every opponent state carries the `OPP` tag.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::OPPONENT_TAG;
use crate::error::{SimError, SimResult};

/// Which side of the matchup a state belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Side {
    Team,
    Opponent,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Team, Side::Opponent];

    pub fn other(self) -> Side {
        match self {
            Side::Team => Side::Opponent,
            Side::Opponent => Side::Team,
        }
    }

    /// Tag used in state labels for this side.
    pub fn tag<'a>(self, team: &'a str) -> &'a str {
        match self {
            Side::Team => team,
            Side::Opponent => OPPONENT_TAG,
        }
    }
}

/// Phase of a possession.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phase {
    OffenseStart,
    TwoMade,
    ThreeMade,
    FreeThrowMade,
    Turnover,
    OffensiveRebound,
    DefensiveRebound,
}

impl Phase {
    pub const ALL: [Phase; 7] = [
        Phase::OffenseStart,
        Phase::TwoMade,
        Phase::ThreeMade,
        Phase::FreeThrowMade,
        Phase::Turnover,
        Phase::OffensiveRebound,
        Phase::DefensiveRebound,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Phase::OffenseStart => "Offense Start",
            Phase::TwoMade => "2pt Made",
            Phase::ThreeMade => "3pt Made",
            Phase::FreeThrowMade => "FT Made",
            Phase::Turnover => "Turnover",
            Phase::OffensiveRebound => "OREB",
            Phase::DefensiveRebound => "DREB",
        }
    }

    fn from_name(name: &str) -> Option<Phase> {
        Phase::ALL.into_iter().find(|phase| phase.name() == name)
    }

    /// Points credited when a possession enters this phase.
    pub fn points(self) -> u32 {
        match self {
            Phase::TwoMade => 2,
            Phase::ThreeMade => 3,
            Phase::FreeThrowMade => 1,
            _ => 0,
        }
    }
}

/// A possession state: a side and a phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct State {
    pub side: Side,
    pub phase: Phase,
}

impl State {
    /// Number of states in the space (7 phases per side).
    pub const COUNT: usize = 14;

    pub const fn new(side: Side, phase: Phase) -> Self {
        State { side, phase }
    }

    pub const fn offense_start(side: Side) -> Self {
        State::new(side, Phase::OffenseStart)
    }

    /// Dense index in `0..State::COUNT`.
    pub fn index(self) -> usize {
        let side = match self.side {
            Side::Team => 0,
            Side::Opponent => 1,
        };
        side * Phase::ALL.len() + self.phase as usize
    }

    pub fn from_index(index: usize) -> Option<State> {
        let side = *Side::BOTH.get(index / Phase::ALL.len())?;
        let phase = *Phase::ALL.get(index % Phase::ALL.len())?;
        Some(State::new(side, phase))
    }

    pub fn points(self) -> u32 {
        self.phase.points()
    }

    pub fn is_scoring(self) -> bool {
        self.points() > 0
    }

    /// Human-readable label, e.g. `LAC 2pt Made` or `OPP DREB`.
    pub fn label(self, team: &str) -> String {
        format!("{} {}", self.side.tag(team), self.phase.name())
    }

    /// Parse a label produced for `team`.
    pub fn parse(label: &str, team: &str) -> SimResult<State> {
        let unknown = || SimError::UnknownState { label: label.to_string() };
        let (side, rest) = if let Some(rest) = label.strip_prefix(OPPONENT_TAG).and_then(|r| r.strip_prefix(' ')) {
            (Side::Opponent, rest)
        } else if let Some(rest) = label.strip_prefix(team).and_then(|r| r.strip_prefix(' ')) {
            (Side::Team, rest)
        } else {
            return Err(unknown());
        };
        let phase = Phase::from_name(rest.trim()).ok_or_else(unknown)?;
        Ok(State::new(side, phase))
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.side {
            Side::Team => "TEAM",
            Side::Opponent => OPPONENT_TAG,
        };
        write!(f, "{} {}", tag, self.phase.name())
    }
}

/// Every state of the space in index order.
pub fn all_states() -> impl Iterator<Item = State> {
    (0..State::COUNT).filter_map(State::from_index)
}

/// Scoring states and their point values.
pub fn scoring_states() -> Vec<(State, u32)> {
    all_states().filter(|s| s.is_scoring()).map(|s| (s, s.points())).collect()
}

/// Deterministic transitions imposed by the rules of the game.
///
/// A made field goal hands the ball to the other side; a defensive rebound
/// starts the rebounder's own offense.
pub fn forced_transitions() -> [(State, State); 6] {
    use Phase::*;
    use Side::*;
    [
        (State::new(Team, TwoMade), State::offense_start(Opponent)),
        (State::new(Team, ThreeMade), State::offense_start(Opponent)),
        (State::new(Opponent, TwoMade), State::offense_start(Team)),
        (State::new(Opponent, ThreeMade), State::offense_start(Team)),
        (State::new(Team, DefensiveRebound), State::offense_start(Team)),
        (State::new(Opponent, DefensiveRebound), State::offense_start(Opponent)),
    ]
}
