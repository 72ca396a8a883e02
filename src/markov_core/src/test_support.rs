//! Synthetic season data shared by unit tests.

use crate::box_score::{SeasonMetrics, TeamAttempts};
use crate::counts::{TeamCounts, TransitionCount};

pub const TEAM: &str = "LAC";
pub const SEASON: &str = "2024-25";
pub const POSS_PER_GAME: f64 = 98.4;

struct OffenseCounts {
    start: [f64; 6],
    oreb: [f64; 6],
    free_throw: [f64; 4],
    two_made: f64,
    three_made: f64,
    turnover: f64,
    dreb: f64,
}

const LAC_OFFENSE: OffenseCounts = OffenseCounts {
    // 2pt, 3pt, FT, TOV, OREB, opponent DREB
    start: [2600.0, 1000.0, 700.0, 1100.0, 800.0, 2400.0],
    oreb: [380.0, 60.0, 80.0, 90.0, 150.0, 390.0],
    // FT, opponent offense start, OREB, opponent DREB
    free_throw: [800.0, 700.0, 40.0, 120.0],
    two_made: 2980.0,
    three_made: 1060.0,
    turnover: 1190.0,
    dreb: 2700.0,
};

const OPP_OFFENSE: OffenseCounts = OffenseCounts {
    start: [2500.0, 950.0, 680.0, 1180.0, 760.0, 2520.0],
    oreb: [360.0, 55.0, 75.0, 95.0, 140.0, 400.0],
    free_throw: [780.0, 680.0, 38.0, 115.0],
    two_made: 2860.0,
    three_made: 1005.0,
    turnover: 1275.0,
    dreb: 2910.0,
};

fn offense_rows(own: &str, other: &str, c: &OffenseCounts) -> Vec<TransitionCount> {
    let l = |phase: &str| format!("{} {}", own, phase);
    let o = |phase: &str| format!("{} {}", other, phase);
    let outcomes = [
        l("2pt Made"),
        l("3pt Made"),
        l("FT Made"),
        l("Turnover"),
        l("OREB"),
        o("DREB"),
    ];

    let mut rows = Vec::new();
    for (next, count) in outcomes.iter().zip(c.start) {
        rows.push(TransitionCount::new(&l("Offense Start"), next, count));
    }
    for (next, count) in outcomes.iter().zip(c.oreb) {
        rows.push(TransitionCount::new(&l("OREB"), next, count));
    }
    let ft_next = [l("FT Made"), o("Offense Start"), l("OREB"), o("DREB")];
    for (next, count) in ft_next.iter().zip(c.free_throw) {
        rows.push(TransitionCount::new(&l("FT Made"), next, count));
    }
    rows.push(TransitionCount::new(&l("2pt Made"), &o("Offense Start"), c.two_made));
    rows.push(TransitionCount::new(&l("3pt Made"), &o("Offense Start"), c.three_made));
    rows.push(TransitionCount::new(&l("Turnover"), &o("Offense Start"), c.turnover));
    rows.push(TransitionCount::new(&l("DREB"), &l("Offense Start"), c.dreb));
    rows
}

/// A realistic team season where LAC is slightly better than its opponents.
pub fn lac_counts() -> TeamCounts {
    let mut rows = offense_rows(TEAM, "OPP", &LAC_OFFENSE);
    rows.extend(offense_rows("OPP", TEAM, &OPP_OFFENSE));
    TeamCounts::new(TEAM, SEASON, rows).with_possessions_per_game(POSS_PER_GAME)
}

/// Both sides share identical counts, so the expected win share is one half
/// less ties.
pub fn symmetric_counts() -> TeamCounts {
    let mut rows = offense_rows(TEAM, "OPP", &LAC_OFFENSE);
    rows.extend(offense_rows("OPP", TEAM, &LAC_OFFENSE));
    TeamCounts::new(TEAM, SEASON, rows).with_possessions_per_game(POSS_PER_GAME)
}

pub fn lac_metrics() -> SeasonMetrics {
    SeasonMetrics {
        fg2_pct: 0.54,
        fg3_pct: 0.36,
        ft_pct: 0.78,
        oreb_pct: 0.28,
        dreb_pct: 0.72,
        tov_pct: 0.14,
        opp_fg2_pct: 0.53,
        opp_fg3_pct: 0.355,
        opp_ft_pct: 0.77,
        opp_oreb_pct: 0.27,
        opp_dreb_pct: 0.72,
        opp_tov_pct: 0.145,
        attempts: TeamAttempts {
            fg2_attempts: 4700.0,
            fg3_attempts: 2950.0,
            ft_attempts: 1800.0,
            turnovers: 1190.0,
            dreb: 2700.0,
            oreb: 990.0,
        },
    }
}
