//! Games and 82-game seasons.

use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::constants::GAMES_PER_SEASON;
use crate::error::SimResult;
use crate::matrix::TransitionMatrix;
use crate::possession::simulate_possession;
use crate::state::Side;

/// Final score of one simulated game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub team_score: u32,
    pub opp_score: u32,
    pub is_win: bool,
}

impl GameRecord {
    pub fn new(team_score: u32, opp_score: u32) -> Self {
        GameRecord {
            team_score,
            opp_score,
            is_win: team_score > opp_score,
        }
    }

    pub fn is_tie(&self) -> bool {
        self.team_score == self.opp_score
    }
}

/// Simulate one game of `possessions` possessions per side.
pub fn simulate_game<R: Rng + ?Sized>(
    matrix: &TransitionMatrix,
    possessions: u32,
    max_steps: usize,
    rng: &mut R,
) -> SimResult<GameRecord> {
    let mut team_score = 0;
    let mut opp_score = 0;
    for _ in 0..possessions {
        team_score += simulate_possession(matrix, Side::Team, max_steps, rng)?;
        opp_score += simulate_possession(matrix, Side::Opponent, max_steps, rng)?;
    }
    Ok(GameRecord::new(team_score, opp_score))
}

/// Running state of a season after one more game.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct GameProgress {
    /// 1-based game number.
    pub game: u32,
    pub record: GameRecord,
    pub wins: u32,
    pub win_percentage: f64,
    /// Running win percentage projected over a full season.
    pub expected_wins: f64,
}

/// A completed season.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeasonOutcome {
    pub games: Vec<GameRecord>,
    pub wins: u32,
    pub ties: u32,
    pub win_percentage: f64,
    pub expected_wins: f64,
}

impl SeasonOutcome {
    pub fn from_games(games: Vec<GameRecord>) -> Self {
        let wins = games.iter().filter(|g| g.is_win).count() as u32;
        let ties = games.iter().filter(|g| g.is_tie()).count() as u32;
        let win_percentage = if games.is_empty() {
            0.0
        } else {
            wins as f64 / games.len() as f64
        };
        SeasonOutcome {
            games,
            wins,
            ties,
            win_percentage,
            expected_wins: win_percentage * GAMES_PER_SEASON as f64,
        }
    }

    pub fn losses(&self) -> u32 {
        self.games.len() as u32 - self.wins - self.ties
    }
}

/// Lazily simulated season, yielding one game at a time in order.
///
/// Stops after the last game or the first error.
pub struct SeasonGames<R> {
    matrix: Arc<TransitionMatrix>,
    possessions: u32,
    max_steps: usize,
    rng: R,
    played: u32,
    wins: u32,
    failed: bool,
}

impl<R: Rng> SeasonGames<R> {
    pub fn new(matrix: Arc<TransitionMatrix>, possessions: u32, max_steps: usize, rng: R) -> Self {
        SeasonGames {
            matrix,
            possessions,
            max_steps,
            rng,
            played: 0,
            wins: 0,
            failed: false,
        }
    }
}

impl<R: Rng> Iterator for SeasonGames<R> {
    type Item = SimResult<GameProgress>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.played >= GAMES_PER_SEASON {
            return None;
        }
        let record = match simulate_game(&self.matrix, self.possessions, self.max_steps, &mut self.rng) {
            Ok(record) => record,
            Err(err) => {
                self.failed = true;
                return Some(Err(err));
            }
        };

        self.played += 1;
        if record.is_win {
            self.wins += 1;
        }
        let win_percentage = self.wins as f64 / self.played as f64;
        Some(Ok(GameProgress {
            game: self.played,
            record,
            wins: self.wins,
            win_percentage,
            expected_wins: win_percentage * GAMES_PER_SEASON as f64,
        }))
    }
}

/// Simulate a full season against one matrix.
pub fn simulate_season<R: Rng + ?Sized>(
    matrix: &TransitionMatrix,
    possessions: u32,
    max_steps: usize,
    rng: &mut R,
) -> SimResult<SeasonOutcome> {
    let games = (0..GAMES_PER_SEASON)
        .map(|_| simulate_game(matrix, possessions, max_steps, &mut *rng))
        .collect::<SimResult<Vec<_>>>()?;
    Ok(SeasonOutcome::from_games(games))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::MAX_POSSESSION_STEPS;
    use crate::matrix::build_matrix;
    use crate::test_support::lac_counts;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn lac_matrix() -> Arc<TransitionMatrix> {
        Arc::new(build_matrix(&lac_counts(), None).unwrap())
    }

    #[test]
    fn test_tie_is_not_a_win() {
        let tie = GameRecord::new(101, 101);
        assert!(!tie.is_win);
        assert!(tie.is_tie());

        let season = SeasonOutcome::from_games(vec![tie, GameRecord::new(99, 90), GameRecord::new(80, 90)]);
        assert_eq!(season.wins, 1);
        assert_eq!(season.ties, 1);
        assert_eq!(season.losses(), 1);
        assert!((season.expected_wins - 82.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_same_seed_reproduces_season() {
        let matrix = lac_matrix();
        let first = simulate_season(&matrix, 98, MAX_POSSESSION_STEPS, &mut ChaCha8Rng::seed_from_u64(42)).unwrap();
        let second = simulate_season(&matrix, 98, MAX_POSSESSION_STEPS, &mut ChaCha8Rng::seed_from_u64(42)).unwrap();
        assert_eq!(first.games.len(), 82);
        assert_eq!(first, second);

        let other = simulate_season(&matrix, 98, MAX_POSSESSION_STEPS, &mut ChaCha8Rng::seed_from_u64(43)).unwrap();
        assert_ne!(first.games, other.games);
    }

    #[test]
    fn test_scores_are_plausible() {
        let matrix = lac_matrix();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let game = simulate_game(&matrix, 98, MAX_POSSESSION_STEPS, &mut rng).unwrap();
        assert!(game.team_score > 70 && game.team_score < 170, "{:?}", game);
        assert!(game.opp_score > 70 && game.opp_score < 170, "{:?}", game);
    }

    #[test]
    fn test_incremental_games_match_batch() {
        let matrix = lac_matrix();
        let games = SeasonGames::new(matrix.clone(), 98, MAX_POSSESSION_STEPS, ChaCha8Rng::seed_from_u64(9));
        let progress: Vec<GameProgress> = games.collect::<SimResult<_>>().unwrap();
        assert_eq!(progress.len(), 82);
        assert_eq!(progress.first().map(|p| p.game), Some(1));
        assert_eq!(progress.last().map(|p| p.game), Some(82));

        let batch = simulate_season(&matrix, 98, MAX_POSSESSION_STEPS, &mut ChaCha8Rng::seed_from_u64(9)).unwrap();
        let records: Vec<GameRecord> = progress.iter().map(|p| p.record).collect();
        assert_eq!(records, batch.games);
        let last = progress[81];
        assert_eq!(last.wins, batch.wins);
        assert!((last.expected_wins - batch.expected_wins).abs() < 1e-9);
    }

    #[test]
    fn test_incremental_stops_after_error() {
        let counts = crate::counts::TeamCounts::new(
            "LAC",
            "2024-25",
            vec![crate::counts::TransitionCount::new("LAC Offense Start", "LAC Turnover", 1.0)],
        );
        let matrix = Arc::new(build_matrix(&counts, None).unwrap());
        let mut games = SeasonGames::new(matrix, 98, MAX_POSSESSION_STEPS, ChaCha8Rng::seed_from_u64(1));
        assert!(matches!(games.next(), Some(Err(_))));
        assert!(games.next().is_none());
    }
}
