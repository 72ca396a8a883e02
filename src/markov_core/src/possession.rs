//! Possession random walk.

use std::collections::BTreeMap;

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use crate::error::{SimError, SimResult};
use crate::matrix::TransitionMatrix;
use crate::state::{Side, State};

#[derive(Debug, Clone)]
struct SampledRow {
    targets: Vec<State>,
    weights: WeightedIndex<f64>,
}

/// Dense, index-addressed view of a matrix for repeated sampling.
#[derive(Debug, Clone)]
pub struct ChainSampler {
    rows: Vec<Option<SampledRow>>,
}

impl ChainSampler {
    pub fn new<'a>(rows: impl Iterator<Item = (State, &'a BTreeMap<State, f64>)>) -> Self {
        let mut dense: Vec<Option<SampledRow>> = vec![None; State::COUNT];
        for (from, row) in rows {
            let targets: Vec<State> = row.keys().copied().collect();
            // A row with no positive weight cannot be sampled and reads as missing.
            if let Ok(weights) = WeightedIndex::new(row.values().copied()) {
                dense[from.index()] = Some(SampledRow { targets, weights });
            }
        }
        ChainSampler { rows: dense }
    }

    /// Draw the successor of `from`, or `None` when it has no row.
    pub fn step<R: Rng + ?Sized>(&self, from: State, rng: &mut R) -> Option<State> {
        let row = self.rows.get(from.index())?.as_ref()?;
        row.targets.get(row.weights.sample(rng)).copied()
    }
}

/// Walk one possession for `side` from its offense start until the ball
/// passes to the other side.
///
/// # Arguments
/// * `matrix` - Transition probabilities to sample from
/// * `side` - Side on offense
/// * `max_steps` - Step ceiling before the walk is a dead chain
/// * `rng` - Random source
///
/// # Returns
/// Points scored during the possession.
pub fn simulate_possession<R: Rng + ?Sized>(
    matrix: &TransitionMatrix,
    side: Side,
    max_steps: usize,
    rng: &mut R,
) -> SimResult<u32> {
    let sampler = matrix.sampler();
    let start = State::offense_start(side);
    let handover = State::offense_start(side.other());

    let mut state = start;
    let mut points = 0;
    for _ in 0..max_steps {
        let next = sampler.step(state, rng).ok_or_else(|| SimError::MissingRow {
            state: state.label(matrix.team()),
        })?;
        points += next.points();
        if next == handover {
            return Ok(points);
        }
        state = next;
    }

    Err(SimError::DeadChain {
        start: start.label(matrix.team()),
        steps: max_steps,
    })
}
