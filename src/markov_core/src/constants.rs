/// Games in a regular season
pub const GAMES_PER_SEASON: u32 = 82;

/// Step ceiling for a single possession walk before it is declared a dead chain
pub const MAX_POSSESSION_STEPS: usize = 50;

/// Tolerance for a built matrix row summing to 1.0
pub const ROW_SUM_TOLERANCE: f64 = 1e-6;

/// Looser tolerance used when validating adjusted count rows
pub const ADJUSTED_ROW_TOLERANCE: f64 = 0.01;

/// Rate changes smaller than this produce no target delta
pub const MIN_RATE_CHANGE: f64 = 1e-4;

/// z-score for a two-sided 95% confidence interval
pub const CI_95_Z: f64 = 1.96;

/// Percentage used by the adjustment report when none is given
pub const DEFAULT_SCENARIO_PERCENT: f64 = 5.0;

/// Seasons simulated per run unless configured otherwise
pub const DEFAULT_NUM_SEASONS: usize = 10;

/// Matrices retained by the simulator's cache unless configured otherwise
pub const DEFAULT_MATRIX_CACHE_CAPACITY: u64 = 64;

/// Team tag used for every opponent state
pub const OPPONENT_TAG: &str = "OPP";
