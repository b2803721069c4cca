use rayon::prelude::*;

use crate::data::{GameLog, PlayerRow, SeasonDataset};
use crate::error::PredictError;

pub const FEATURE_NAMES: [&str; 6] = [
    "recent_points_avg",
    "weighted_form",
    "opp_points_allowed",
    "home_ratio",
    "rebounds_avg",
    "assists_avg",
];

/// Minimum games of history before the model input is considered buildable.
pub const MIN_HISTORY_GAMES: usize = 3;

const RECENT_WINDOW: usize = 8;
const FORM_DECAY: f64 = 0.85;
const LEAGUE_AVG_POINTS: f64 = 18.0;

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    pub values: [f64; FEATURE_NAMES.len()],
}

impl FeatureVector {
    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|idx| self.values[idx])
    }
}

/// Build the model input for (player, opponent) from the season dataset.
/// Fails with a recoverable input error when the player has too little
/// history to say anything useful.
pub fn prepare_input(
    player: &PlayerRow,
    opponent: &str,
    dataset: &SeasonDataset,
) -> Result<FeatureVector, PredictError> {
    let mut logs: Vec<&GameLog> = dataset
        .games
        .iter()
        .filter(|g| g.player_id == player.id)
        .collect();
    logs.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.game_id.cmp(&a.game_id)));

    if logs.len() < MIN_HISTORY_GAMES {
        return Err(PredictError::Input(format!(
            "Not enough game history for {} ({} of {} games needed).",
            player.name,
            logs.len(),
            MIN_HISTORY_GAMES
        )));
    }

    let recent: Vec<&GameLog> = logs.iter().copied().take(RECENT_WINDOW).collect();

    let recent_points_avg = mean(recent.iter().map(|g| g.points));
    let weighted_form = weighted_points(&recent);
    let opp_points_allowed =
        opponent_points_allowed(dataset, opponent).unwrap_or(LEAGUE_AVG_POINTS);
    let home_ratio = recent.iter().filter(|g| g.home).count() as f64 / recent.len() as f64;
    let rebounds_avg = mean(recent.iter().map(|g| g.rebounds));
    let assists_avg = mean(recent.iter().map(|g| g.assists));

    Ok(FeatureVector {
        values: [
            recent_points_avg,
            weighted_form,
            opp_points_allowed,
            home_ratio,
            rebounds_avg,
            assists_avg,
        ],
    })
}

// Recency-weighted scoring form, newest game first.
fn weighted_points(recent: &[&GameLog]) -> f64 {
    let mut weighted = 0.0;
    let mut weight_sum = 0.0;
    for (k, game) in recent.iter().enumerate() {
        let w = FORM_DECAY.powi(k as i32);
        weighted += w * game.points;
        weight_sum += w;
    }
    if weight_sum > 0.0 {
        weighted / weight_sum
    } else {
        0.0
    }
}

/// Average points a single opposing player scores against this team across
/// the whole season. `None` when nobody in the dataset has faced them.
pub fn opponent_points_allowed(dataset: &SeasonDataset, opponent: &str) -> Option<f64> {
    let (sum, count) = dataset
        .games
        .par_iter()
        .filter(|g| g.opponent == opponent)
        .map(|g| (g.points, 1usize))
        .reduce(|| (0.0, 0), |a, b| (a.0 + b.0, a.1 + b.1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

fn mean(iter: impl Iterator<Item = f64>) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for value in iter {
        sum += value;
        count += 1;
    }
    if count == 0 { 0.0 } else { sum / count as f64 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub_player() -> PlayerRow {
        PlayerRow {
            id: "p1".to_string(),
            name: "Test Player".to_string(),
            team: "LAL".to_string(),
        }
    }

    fn stub_log(game_id: &str, date: &str, opponent: &str, home: bool, points: f64) -> GameLog {
        GameLog {
            game_id: game_id.to_string(),
            player_id: "p1".to_string(),
            date: date.to_string(),
            opponent: opponent.to_string(),
            home,
            points,
            rebounds: 5.0,
            assists: 4.0,
            minutes: 34.0,
        }
    }

    fn stub_dataset(games: Vec<GameLog>) -> SeasonDataset {
        SeasonDataset {
            season: "2023-24".to_string(),
            players: vec![stub_player()],
            teams: Vec::new(),
            games,
        }
    }

    #[test]
    fn short_history_is_an_input_error() {
        let dataset = stub_dataset(vec![
            stub_log("g1", "2024-01-01", "BOS", true, 20.0),
            stub_log("g2", "2024-01-03", "DEN", false, 22.0),
        ]);
        let err = prepare_input(&stub_player(), "BOS", &dataset).unwrap_err();
        assert!(err.user_message().contains("Not enough game history"));
    }

    #[test]
    fn weighted_form_leans_toward_recent_games() {
        let dataset = stub_dataset(vec![
            stub_log("g1", "2024-01-01", "BOS", true, 10.0),
            stub_log("g2", "2024-01-03", "DEN", false, 10.0),
            stub_log("g3", "2024-01-05", "MIA", true, 30.0),
        ]);
        let input = prepare_input(&stub_player(), "BOS", &dataset).unwrap();
        let avg = input.get("recent_points_avg").unwrap();
        let form = input.get("weighted_form").unwrap();
        // Newest game scored 30, so the decayed mean sits above the flat one.
        assert!(form > avg);
    }

    #[test]
    fn unseen_opponent_falls_back_to_league_average() {
        let dataset = stub_dataset(vec![
            stub_log("g1", "2024-01-01", "BOS", true, 20.0),
            stub_log("g2", "2024-01-03", "DEN", false, 22.0),
            stub_log("g3", "2024-01-05", "MIA", true, 24.0),
        ]);
        let input = prepare_input(&stub_player(), "SAS", &dataset).unwrap();
        assert_eq!(input.get("opp_points_allowed"), Some(LEAGUE_AVG_POINTS));
    }

    #[test]
    fn home_ratio_counts_recent_home_games() {
        let dataset = stub_dataset(vec![
            stub_log("g1", "2024-01-01", "BOS", true, 20.0),
            stub_log("g2", "2024-01-03", "DEN", false, 22.0),
            stub_log("g3", "2024-01-05", "MIA", true, 24.0),
            stub_log("g4", "2024-01-07", "MIA", true, 24.0),
        ]);
        let input = prepare_input(&stub_player(), "BOS", &dataset).unwrap();
        assert_eq!(input.get("home_ratio"), Some(0.75));
    }
}
