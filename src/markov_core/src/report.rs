//! Batch export of adjusted counts for the twelve single-category
//! scenarios.

use std::io;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::adjustment::AdjustmentConfig;
use crate::box_score::{AdjustedMetrics, Scenario, SeasonMetrics, TargetDeltas};
use crate::counts::{CountMatrix, TeamCounts};
use crate::error::SimResult;
use crate::rates::RateMetrics;

/// One adjusted transition count under one scenario.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub team: String,
    pub season: String,
    pub state: String,
    pub next_state: String,
    pub count: f64,
    pub adjustment_type: String,
    pub poss_per_game: f64,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Adjusted counts of every observed transition under each of the twelve
/// scenarios at `percent`.
///
/// The rebounding split uses the improved OREB rates of the scenario.
pub fn adjustment_report(
    counts: &TeamCounts,
    metrics: &SeasonMetrics,
    rates: &RateMetrics,
    percent: f64,
) -> SimResult<Vec<ReportRow>> {
    let baseline = CountMatrix::from_counts(counts)?;
    let poss_per_game = counts.possessions_per_game()?;
    let adjusted = AdjustedMetrics::from_season(&metrics.improved(percent));

    let mut rows = Vec::new();
    for scenario in Scenario::all(percent) {
        let label = scenario.label();
        let config = AdjustmentConfig::new(TargetDeltas::for_scenario(metrics, &scenario), *rates, adjusted);
        let mut pivot = baseline.clone();
        config.apply(&mut pivot)?;

        for (from, observed) in baseline.rows() {
            for to in observed.keys() {
                rows.push(ReportRow {
                    team: counts.team.clone(),
                    season: counts.season.clone(),
                    state: from.label(&counts.team),
                    next_state: to.label(&counts.team),
                    count: round2(pivot.get(from, *to).max(0.0)),
                    adjustment_type: label.clone(),
                    poss_per_game,
                });
            }
        }
    }

    info!(team = %counts.team, season = %counts.season, percent, rows = rows.len(), "built adjustment report");
    Ok(rows)
}

/// Write report rows as CSV with a header line.
pub fn write_csv<W: io::Write>(rows: &[ReportRow], writer: W) -> SimResult<()> {
    let mut out = csv::Writer::from_writer(writer);
    for row in rows {
        out.serialize(row)?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{lac_counts, lac_metrics};
    use std::collections::BTreeMap;

    fn lac_report(percent: f64) -> Vec<ReportRow> {
        let counts = lac_counts();
        let rates = RateMetrics::from_counts(&CountMatrix::from_counts(&counts).unwrap());
        adjustment_report(&counts, &lac_metrics(), &rates, percent).unwrap()
    }

    #[test]
    fn test_one_block_per_scenario_in_order() {
        let rows = lac_report(5.0);
        let pairs = CountMatrix::from_counts(&lac_counts())
            .unwrap()
            .rows()
            .map(|(_, row)| row.len())
            .sum::<usize>();
        assert_eq!(rows.len(), 12 * pairs);

        let mut labels: Vec<&str> = Vec::new();
        for row in &rows {
            if labels.last() != Some(&row.adjustment_type.as_str()) {
                labels.push(&row.adjustment_type);
            }
        }
        assert_eq!(labels.len(), 12);
        assert_eq!(labels[0], "2PT FG% +5.0%");
        assert_eq!(labels[11], "OPP TOV% +5.0%");
        assert!(rows.iter().all(|r| r.count >= 0.0 && r.poss_per_game == 98.4));
    }

    #[test]
    fn test_scenario_conserves_row_totals() {
        let rows = lac_report(5.0);
        let mut totals: BTreeMap<(&str, &str), f64> = BTreeMap::new();
        for row in rows.iter().filter(|r| r.adjustment_type.starts_with("3PT")) {
            *totals.entry((row.adjustment_type.as_str(), row.state.as_str())).or_insert(0.0) += row.count;
        }
        let start = totals[&("3PT FG% +5.0%", "LAC Offense Start")];
        // 2600 + 1000 + 700 + 1100 + 800 + 2400, up to rounding
        assert!((start - 8600.0).abs() < 0.1, "{}", start);
    }

    #[test]
    fn test_three_point_scenario_moves_counts() {
        let rows = lac_report(5.0);
        let find = |label: &str, state: &str, next: &str| {
            rows.iter()
                .find(|r| r.adjustment_type == label && r.state == state && r.next_state == next)
                .map(|r| r.count)
                .unwrap()
        };
        assert!(find("3PT FG% +5.0%", "LAC Offense Start", "LAC 3pt Made") > 1000.0);
        assert_eq!(find("2PT FG% +5.0%", "LAC Offense Start", "LAC 3pt Made"), 1000.0);
    }

    #[test]
    fn test_csv_written_with_header() {
        let rows = lac_report(5.0);
        let file = tempfile::NamedTempFile::new().unwrap();
        write_csv(&rows, file.reopen().unwrap()).unwrap();

        let mut reader = csv::Reader::from_path(file.path()).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            vec!["team", "season", "state", "next_state", "count", "adjustment_type", "poss_per_game"]
        );
        let read: Vec<ReportRow> = reader.deserialize().collect::<Result<_, _>>().unwrap();
        assert_eq!(read, rows);
    }
}
