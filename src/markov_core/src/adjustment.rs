//! Count adjustments that reshape a team's transition rows to reflect a
//! hypothetical change in one or more box-score rates.
//!
//! Every category adds mass to the outcome being improved and removes the
//! same mass from competing outcomes of the same originating state, so each
//! row keeps its total count and only its shape changes.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::box_score::{AdjustedMetrics, Stat, TargetDeltas};
use crate::constants::ADJUSTED_ROW_TOLERANCE;
use crate::counts::{ClippedCount, CountMatrix};
use crate::error::{SimError, SimResult};
use crate::rates::RateMetrics;
use crate::state::{Phase, Side, State};

/// A signed count correction for one transition pair.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct AdjustmentDelta {
    pub state: State,
    pub next_state: State,
    pub delta: f64,
}

/// One of the twelve adjustable categories with its season-volume change.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentCategory {
    pub side: Side,
    pub stat: Stat,
    pub amount: f64,
}

struct DeltaBuilder {
    deltas: Vec<AdjustmentDelta>,
}

impl DeltaBuilder {
    fn new() -> Self {
        DeltaBuilder { deltas: Vec::new() }
    }

    fn push(&mut self, state: State, next_state: State, delta: f64) {
        self.deltas.push(AdjustmentDelta { state, next_state, delta });
    }

    /// `amount` more events of `to` from `from`, taken from the ways a
    /// shot from `from` by `side` can miss.
    fn replace_misses(&mut self, side: Side, from: State, to: State, amount: f64, oreb_per: f64) {
        self.push(from, to, amount);
        self.push(from, State::new(side, Phase::OffensiveRebound), -amount * oreb_per);
        self.push(
            from,
            State::new(side.other(), Phase::DefensiveRebound),
            -amount * (1.0 - oreb_per),
        );
    }
}

impl AdjustmentCategory {
    pub fn new(side: Side, stat: Stat, amount: f64) -> Self {
        AdjustmentCategory { side, stat, amount }
    }

    /// Count deltas for this category alone.
    ///
    /// # Arguments
    /// * `rates` - Origin shares weighting where the change lands
    /// * `adjusted` - Rebounding rates splitting each replaced miss
    ///
    /// # Returns
    /// Deltas forming a zero-sum group per originating state.
    pub fn deltas(&self, rates: &RateMetrics, adjusted: &AdjustedMetrics) -> SimResult<Vec<AdjustmentDelta>> {
        let a = self.amount;
        if a == 0.0 {
            return Ok(Vec::new());
        }

        let side = self.side;
        let r = rates.side(side);
        let oreb_per = adjusted.oreb_for(side);
        let start = State::offense_start(side);
        let oreb = State::new(side, Phase::OffensiveRebound);
        let ft_made = State::new(side, Phase::FreeThrowMade);
        let mut out = DeltaBuilder::new();

        match self.stat {
            Stat::TwoPoint | Stat::ThreePoint => {
                let (made, p) = if self.stat == Stat::TwoPoint {
                    (State::new(side, Phase::TwoMade), r.two_made_from_oreb)
                } else {
                    (State::new(side, Phase::ThreeMade), r.three_made_from_oreb)
                };
                out.replace_misses(side, start, made, a * (1.0 - p), oreb_per);
                out.replace_misses(side, oreb, made, a * p, oreb_per);
            }
            Stat::FreeThrow => {
                let origins = [
                    (start, r.ft_made_from_offense_start),
                    (oreb, r.ft_made_from_oreb),
                    (ft_made, r.ft_made_from_ft_made),
                ];
                for (from, share) in origins {
                    out.replace_misses(side, from, ft_made, a * share, oreb_per);
                }
            }
            Stat::Turnover => {
                let turnover = State::new(side, Phase::Turnover);
                let p = r.turnover_from_oreb;
                for (from, share, outcomes) in [
                    (start, 1.0 - p, &r.after_offense_start),
                    (oreb, p, &r.after_oreb),
                ] {
                    let moved = a * share;
                    let outcomes = outcomes.normalized().ok_or_else(|| SimError::InvalidAdjustment {
                        state: from.to_string(),
                        reason: "no competing outcomes to redistribute turnovers across".to_string(),
                    })?;
                    out.push(from, turnover, moved);
                    for (to, weight) in outcomes.outcomes(side) {
                        out.push(from, to, -moved * weight);
                    }
                }
            }
            Stat::OffensiveRebound => {
                let q = r.oreb_from_oreb;
                let lost = State::new(side.other(), Phase::DefensiveRebound);
                for (from, share) in [(start, 1.0 - q), (oreb, q)] {
                    out.push(from, oreb, a * share);
                    out.push(from, lost, -a * share);
                }
            }
            Stat::DefensiveRebound => {
                // The other side's misses: more of them end in our rebound.
                let other = side.other();
                let d = r.dreb_from_opp_oreb;
                let dreb = State::new(side, Phase::DefensiveRebound);
                let other_oreb = State::new(other, Phase::OffensiveRebound);
                for (from, share) in [(State::offense_start(other), 1.0 - d), (other_oreb, d)] {
                    out.push(from, dreb, a * share);
                    out.push(from, other_oreb, -a * share);
                }
            }
        }
        Ok(out.deltas)
    }
}

/// Everything needed to adjust a team's counts: the target changes, the
/// rate metrics weighting them, and the rebounding split.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentConfig {
    pub targets: TargetDeltas,
    pub rates: RateMetrics,
    pub adjusted: AdjustedMetrics,
}

impl AdjustmentConfig {
    pub fn new(targets: TargetDeltas, rates: RateMetrics, adjusted: AdjustedMetrics) -> Self {
        AdjustmentConfig { targets, rates, adjusted }
    }

    pub fn categories(&self) -> impl Iterator<Item = AdjustmentCategory> + '_ {
        self.targets
            .iter()
            .map(|(side, stat, amount)| AdjustmentCategory::new(side, stat, amount))
    }

    /// True when applying this configuration cannot change any count.
    pub fn is_identity(&self) -> bool {
        self.targets.is_zero()
    }

    pub fn validate(&self) -> SimResult<()> {
        self.rates.validate()?;
        self.adjusted.validate()
    }

    /// Deltas of all categories, superposed.
    pub fn deltas(&self) -> SimResult<Vec<AdjustmentDelta>> {
        self.validate()?;
        let mut all = Vec::new();
        for category in self.categories() {
            all.extend(category.deltas(&self.rates, &self.adjusted)?);
        }
        Ok(all)
    }

    /// Apply to `counts`, clip negative results and check the affected rows.
    ///
    /// # Returns
    /// The clipped counts, which callers surface as anomalies.
    pub fn apply(&self, counts: &mut CountMatrix) -> SimResult<Vec<ClippedCount>> {
        let mut grouped: BTreeMap<State, Vec<AdjustmentDelta>> = BTreeMap::new();
        for delta in self.deltas()? {
            grouped.entry(delta.state).or_default().push(delta);
        }

        let mut affected = BTreeSet::new();
        for (from, deltas) in &grouped {
            if !counts.has_row(*from) {
                debug!(state = %from, "skipping adjustment of unobserved row");
                continue;
            }
            for delta in deltas {
                counts.add(delta.state, delta.next_state, delta.delta);
            }
            affected.insert(*from);
        }

        let clipped = counts.clip_negatives();
        for anomaly in &clipped {
            warn!(
                state = %anomaly.state,
                next_state = %anomaly.next_state,
                value = anomaly.value,
                "clipped negative adjusted count"
            );
        }

        validate_rows(counts, &affected)?;
        Ok(clipped)
    }
}

/// Post-adjustment fence over the rows an adjustment touched.
fn validate_rows(counts: &CountMatrix, affected: &BTreeSet<State>) -> SimResult<()> {
    for from in affected {
        let invalid = |reason: String| SimError::InvalidAdjustment {
            state: from.to_string(),
            reason,
        };
        let Some(row) = counts.row(*from) else {
            continue;
        };
        if let Some((to, value)) = row.iter().find(|(_, v)| !(**v >= 0.0)) {
            return Err(invalid(format!("count to {} is {}", to, value)));
        }
        let total = counts.row_total(*from);
        if !(total > 0.0) {
            return Err(invalid("row lost all mass".to_string()));
        }
        let normalized: f64 = row.values().map(|v| v / total).sum();
        if (normalized - 1.0).abs() > ADJUSTED_ROW_TOLERANCE {
            return Err(invalid(format!("row normalizes to {}", normalized)));
        }
    }
    Ok(())
}
