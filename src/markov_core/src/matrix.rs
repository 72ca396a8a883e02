//! Row-stochastic transition matrix construction.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use tracing::{debug, info};

use crate::adjustment::AdjustmentConfig;
use crate::counts::{ClippedCount, CountMatrix, TeamCounts};
use crate::error::SimResult;
use crate::possession::ChainSampler;
use crate::state::{forced_transitions, State};

/// Transition probabilities for one team. Immutable once built.
#[derive(Debug)]
pub struct TransitionMatrix {
    team: String,
    rows: BTreeMap<State, BTreeMap<State, f64>>,
    anomalies: Vec<ClippedCount>,
    sampler: OnceLock<ChainSampler>,
}

impl TransitionMatrix {
    pub fn team(&self) -> &str {
        &self.team
    }

    pub fn row(&self, from: State) -> Option<&BTreeMap<State, f64>> {
        self.rows.get(&from)
    }

    pub fn probability(&self, from: State, to: State) -> f64 {
        self.row(from).and_then(|row| row.get(&to)).copied().unwrap_or(0.0)
    }

    pub fn states(&self) -> impl Iterator<Item = State> + '_ {
        self.rows.keys().copied()
    }

    pub fn rows(&self) -> impl Iterator<Item = (State, &BTreeMap<State, f64>)> {
        self.rows.iter().map(|(state, row)| (*state, row))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Counts that went negative during adjustment and were clipped.
    pub fn anomalies(&self) -> &[ClippedCount] {
        &self.anomalies
    }

    /// Dense sampling view, built on first use.
    pub fn sampler(&self) -> &ChainSampler {
        self.sampler.get_or_init(|| ChainSampler::new(self.rows()))
    }

    /// Rows keyed by the team's own state labels.
    pub fn to_labeled(&self) -> BTreeMap<String, BTreeMap<String, f64>> {
        self.rows
            .iter()
            .map(|(from, row)| {
                let row = row.iter().map(|(to, p)| (to.label(&self.team), *p)).collect();
                (from.label(&self.team), row)
            })
            .collect()
    }
}

impl PartialEq for TransitionMatrix {
    fn eq(&self, other: &Self) -> bool {
        self.team == other.team && self.rows == other.rows
    }
}

/// Build a team's transition matrix from its historical counts.
///
/// # Arguments
/// * `counts` - Every observed transition for the team and season
/// * `adjustment` - Optional hypothetical change applied to the counts
///
/// # Returns
/// A matrix whose rows each sum to 1, with forced transitions applied.
pub fn build_matrix(counts: &TeamCounts, adjustment: Option<&AdjustmentConfig>) -> SimResult<TransitionMatrix> {
    let mut pivot = CountMatrix::from_counts(counts)?;
    let anomalies = match adjustment {
        Some(config) => config.apply(&mut pivot)?,
        None => Vec::new(),
    };

    let mut rows = BTreeMap::new();
    for (from, row) in pivot.rows() {
        let total: f64 = row.values().sum();
        if !(total > 0.0) {
            debug!(state = %from, "dropping row with no mass");
            continue;
        }
        let probs: BTreeMap<State, f64> = row
            .iter()
            .filter(|(_, count)| **count > 0.0)
            .map(|(to, count)| (*to, count / total))
            .collect();
        rows.insert(from, probs);
    }

    for (from, to) in forced_transitions() {
        if let Some(row) = rows.get_mut(&from) {
            *row = BTreeMap::from([(to, 1.0)]);
        }
    }

    info!(
        team = %counts.team,
        season = %counts.season,
        adjusted = adjustment.is_some(),
        rows = rows.len(),
        clipped = anomalies.len(),
        "built transition matrix"
    );

    Ok(TransitionMatrix {
        team: counts.team.clone(),
        rows,
        anomalies,
        sampler: OnceLock::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::box_score::{AdjustedMetrics, Stat, TargetDeltas};
    use crate::constants::ROW_SUM_TOLERANCE;
    use crate::rates::RateMetrics;
    use crate::state::{Phase, Side};
    use crate::test_support::{lac_counts, lac_metrics};
    use proptest::prelude::*;

    fn config(targets: TargetDeltas) -> AdjustmentConfig {
        let rates = RateMetrics::from_counts(&CountMatrix::from_counts(&lac_counts()).unwrap());
        AdjustmentConfig::new(targets, rates, AdjustedMetrics::from_season(&lac_metrics()))
    }

    fn assert_stochastic(matrix: &TransitionMatrix) {
        for (from, row) in matrix.rows() {
            let sum: f64 = row.values().sum();
            assert!((sum - 1.0).abs() < ROW_SUM_TOLERANCE, "{} sums to {}", from, sum);
        }
    }

    #[test]
    fn test_baseline_rows_sum_to_one() {
        let matrix = build_matrix(&lac_counts(), None).unwrap();
        assert_eq!(matrix.len(), 14);
        assert_stochastic(&matrix);
        assert!(matrix.anomalies().is_empty());
    }

    #[test]
    fn test_zero_deltas_match_baseline() {
        let baseline = build_matrix(&lac_counts(), None).unwrap();
        let zeros = config(TargetDeltas::from_metrics(&lac_metrics(), 0.0));
        assert!(zeros.is_identity());
        let adjusted = build_matrix(&lac_counts(), Some(&zeros)).unwrap();
        assert_eq!(adjusted, baseline);
    }

    #[test]
    fn test_forced_transitions_are_certain() {
        let all = config(TargetDeltas::from_metrics(&lac_metrics(), 8.0));
        let matrix = build_matrix(&lac_counts(), Some(&all)).unwrap();
        for (from, to) in forced_transitions() {
            assert_eq!(matrix.probability(from, to), 1.0);
            assert_eq!(matrix.row(from).unwrap().len(), 1);
        }
    }

    #[test]
    fn test_forced_transition_overrides_noisy_row() {
        let mut counts = lac_counts();
        counts.rows.push(crate::counts::TransitionCount::new("LAC DREB", "LAC Turnover", 25.0));
        let matrix = build_matrix(&counts, None).unwrap();
        let dreb = State::new(Side::Team, Phase::DefensiveRebound);
        assert_eq!(matrix.probability(dreb, State::offense_start(Side::Team)), 1.0);
        assert_eq!(matrix.probability(dreb, State::new(Side::Team, Phase::Turnover)), 0.0);
    }

    #[test]
    fn test_two_point_improvement_shifts_miss_mass() {
        let baseline = build_matrix(&lac_counts(), None).unwrap();
        let scenario = crate::box_score::Scenario::new(Side::Team, Stat::TwoPoint, 5.0);
        let targets = TargetDeltas::for_scenario(&lac_metrics(), &scenario);
        assert!(targets.get(Side::Team, Stat::TwoPoint).unwrap() > 0.0);

        let adjusted = build_matrix(&lac_counts(), Some(&config(targets))).unwrap();
        assert_stochastic(&adjusted);

        let start = State::offense_start(Side::Team);
        let oreb = State::new(Side::Team, Phase::OffensiveRebound);
        let opp_dreb = State::new(Side::Opponent, Phase::DefensiveRebound);
        let made = State::new(Side::Team, Phase::TwoMade);
        assert!(adjusted.probability(start, made) > baseline.probability(start, made));
        assert!(adjusted.probability(start, oreb) < baseline.probability(start, oreb));
        assert!(adjusted.probability(start, opp_dreb) < baseline.probability(start, opp_dreb));
    }

    #[test]
    fn test_zero_mass_row_is_dropped() {
        let mut counts = lac_counts();
        counts.rows.retain(|row| row.state != "OPP Turnover");
        counts.rows.push(crate::counts::TransitionCount::new("OPP Turnover", "LAC Offense Start", 0.0));
        let matrix = build_matrix(&counts, None).unwrap();
        assert!(matrix.row(State::new(Side::Opponent, Phase::Turnover)).is_none());
        assert_eq!(matrix.len(), 13);
    }

    #[test]
    fn test_labeled_view_uses_team_tag() {
        let labeled = build_matrix(&lac_counts(), None).unwrap().to_labeled();
        assert_eq!(labeled["LAC 2pt Made"]["OPP Offense Start"], 1.0);
        assert!(labeled.contains_key("OPP DREB"));
    }

    proptest! {
        #[test]
        fn prop_adjusted_rows_stay_stochastic(percent in -10.0f64..10.0) {
            let all = config(TargetDeltas::from_metrics(&lac_metrics(), percent));
            let matrix = build_matrix(&lac_counts(), Some(&all)).unwrap();
            for (from, row) in matrix.rows() {
                let sum: f64 = row.values().sum();
                prop_assert!((sum - 1.0).abs() < ROW_SUM_TOLERANCE, "{} sums to {}", from, sum);
            }
        }
    }
}
