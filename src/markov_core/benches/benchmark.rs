use criterion::{black_box, criterion_group, criterion_main, Criterion};
use markov_core::box_score::{AdjustedMetrics, Scenario, SeasonMetrics, Stat, TeamAttempts};
use markov_core::counts::{CountMatrix, TeamCounts, TransitionCount};
use markov_core::matrix::build_matrix;
use markov_core::rates::RateMetrics;
use markov_core::season::simulate_season;
use markov_core::simulator::MarkovSimulator;
use markov_core::source::InMemorySource;
use markov_core::state::Side;
use markov_core::{AdjustmentConfig, TargetDeltas};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;

fn offense(own: &str, other: &str, start: [f64; 6], oreb: [f64; 6]) -> Vec<TransitionCount> {
    let l = |phase: &str| format!("{} {}", own, phase);
    let o = |phase: &str| format!("{} {}", other, phase);
    let outcomes = [l("2pt Made"), l("3pt Made"), l("FT Made"), l("Turnover"), l("OREB"), o("DREB")];

    let mut rows = Vec::new();
    for (next, count) in outcomes.iter().zip(start) {
        rows.push(TransitionCount::new(&l("Offense Start"), next, count));
    }
    for (next, count) in outcomes.iter().zip(oreb) {
        rows.push(TransitionCount::new(&l("OREB"), next, count));
    }
    rows.push(TransitionCount::new(&l("FT Made"), &l("FT Made"), 800.0));
    rows.push(TransitionCount::new(&l("FT Made"), &o("Offense Start"), 700.0));
    rows.push(TransitionCount::new(&l("FT Made"), &o("DREB"), 120.0));
    rows.push(TransitionCount::new(&l("2pt Made"), &o("Offense Start"), 2980.0));
    rows.push(TransitionCount::new(&l("3pt Made"), &o("Offense Start"), 1060.0));
    rows.push(TransitionCount::new(&l("Turnover"), &o("Offense Start"), 1190.0));
    rows.push(TransitionCount::new(&l("DREB"), &l("Offense Start"), 2700.0));
    rows
}

fn create_team_season() -> TeamCounts {
    let mut rows = offense(
        "LAC",
        "OPP",
        [2600.0, 1000.0, 700.0, 1100.0, 800.0, 2400.0],
        [380.0, 60.0, 80.0, 90.0, 150.0, 390.0],
    );
    rows.extend(offense(
        "OPP",
        "LAC",
        [2500.0, 950.0, 680.0, 1180.0, 760.0, 2520.0],
        [360.0, 55.0, 75.0, 95.0, 140.0, 400.0],
    ));
    TeamCounts::new("LAC", "2024-25", rows).with_possessions_per_game(98.4)
}

fn create_season_metrics() -> SeasonMetrics {
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

fn create_adjustment(counts: &TeamCounts) -> AdjustmentConfig {
    let metrics = create_season_metrics();
    let rates = RateMetrics::from_counts(&CountMatrix::from_counts(counts).unwrap());
    let scenario = Scenario::new(Side::Team, Stat::ThreePoint, 5.0);
    AdjustmentConfig::new(
        TargetDeltas::for_scenario(&metrics, &scenario),
        rates,
        AdjustedMetrics::from_season(&metrics.improved(5.0)),
    )
}

fn bench_build_matrix(c: &mut Criterion) {
    let counts = create_team_season();
    let adjustment = create_adjustment(&counts);
    assert!(!adjustment.is_identity());

    c.bench_function("build_matrix_baseline", |b| {
        b.iter(|| build_matrix(black_box(&counts), None).unwrap())
    });

    c.bench_function("build_matrix_adjusted", |b| {
        b.iter(|| build_matrix(black_box(&counts), Some(black_box(&adjustment))).unwrap())
    });
}

fn bench_single_season(c: &mut Criterion) {
    let counts = create_team_season();
    let matrix = Arc::new(build_matrix(&counts, None).unwrap());
    let possessions = counts.possessions_per_team().unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(42);

    c.bench_function("simulate_season_82_games", |b| {
        b.iter(|| simulate_season(black_box(&matrix), possessions, 50, &mut rng).unwrap())
    });
}

fn bench_multi_season(c: &mut Criterion) {
    let source = InMemorySource::new().with_counts(create_team_season());
    let simulator = MarkovSimulator::new(source);
    // Warm the matrix cache so only simulation is measured
    simulator.matrix("LAC", "2024-25", None).unwrap();

    let mut group = c.benchmark_group("multi_season");
    group.sample_size(10);
    group.bench_function("simulate_100_seasons", |b| {
        b.iter(|| {
            simulator
                .simulate_seasons("LAC", "2024-25", black_box(100), None, Some(42))
                .unwrap()
        })
    });
    group.finish();
}

criterion_group!(benches, bench_build_matrix, bench_single_season, bench_multi_season);
criterion_main!(benches);
