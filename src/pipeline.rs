use std::env;

use tracing::{info, warn};

use crate::error::PredictError;
use crate::explain::{self, ContextInfo};
use crate::features;
use crate::kg::{self, ContextSubgraph};
use crate::models::PredictionResult;
use crate::render::{self, VisualDocument};
use crate::resources;
use crate::roster;

pub const DEFAULT_RECENT_GAMES: usize = 5;

/// Everything one prediction request produces. The numeric prediction is
/// always present; explanation and visual carry their own degraded states.
#[derive(Debug, Clone)]
pub struct PredictionOutcome {
    pub season: String,
    pub player_id: String,
    pub player_name: String,
    pub opponent: String,
    pub prediction: PredictionResult,
    pub context: ContextInfo,
    pub subgraph: ContextSubgraph,
    /// `None` when the generator failed; the failure is already logged.
    pub explanation: Option<String>,
    /// `None` for an empty subgraph or a failed render.
    pub visual: Option<VisualDocument>,
    /// User-facing note set when rendering failed.
    pub render_note: Option<String>,
}

pub fn recent_games_bound() -> usize {
    env::var("HOOPS_RECENT_GAMES")
        .ok()
        .and_then(|val| val.parse::<usize>().ok())
        .unwrap_or(DEFAULT_RECENT_GAMES)
        .clamp(1, 20)
}

/// Run the full pipeline for one request: resolve inputs, build features,
/// invoke both pipelines, extract the context subgraph, compose the
/// explanation, render the graph. Stages run strictly in that order; an
/// explanation or render failure is caught here so the numeric prediction
/// always survives it.
pub fn run_prediction(
    player_name: &str,
    opponent: &str,
    season: &str,
) -> Result<PredictionOutcome, PredictError> {
    let resources = resources::load_season(season)?;

    if resources.dataset.players.is_empty() {
        return Err(PredictError::Input(format!(
            "No player data available for season {season}."
        )));
    }

    let Some(player) = roster::resolve_player(player_name, &resources.dataset.players) else {
        return Err(PredictError::Input(
            "Player not found. Please check the name and try again.".to_string(),
        ));
    };

    if resources.dataset.teams.is_empty() {
        return Err(PredictError::Input("No team data available.".to_string()));
    }
    if roster::team_by_abbreviation(opponent, &resources.dataset.teams).is_none() {
        return Err(PredictError::Input(format!(
            "Opponent team {opponent} not found."
        )));
    }

    let input = features::prepare_input(player, opponent, &resources.dataset)?;

    // Regression and classification run independently over the same
    // immutable feature vector.
    let points = resources.regressor.predict(&input);
    let exceeds_threshold = resources.classifier.predict(&input);
    let prediction = PredictionResult {
        points,
        exceeds_threshold,
    };
    info!(
        player = %player.name,
        opponent,
        season,
        points,
        exceeds_threshold,
        "prediction assembled"
    );

    let subgraph = kg::extract_context_subgraph(
        &resources.kg,
        &player.id,
        &kg::opponent_node_id(opponent),
        recent_games_bound(),
    );
    let player_team = resources.kg.player_team(&player.id);
    let context = explain::context_info(&player.name, player_team, opponent, &subgraph);

    let explanation =
        match explain::generate_explanation(&player.name, opponent, &prediction, &context) {
            Ok(text) => Some(text),
            Err(err) => {
                warn!("explanation generation failed: {err:#}");
                None
            }
        };

    let (visual, render_note) = match render::render_subgraph(&subgraph) {
        Ok(doc) => (doc, None),
        Err(err) => {
            // Full detail already logged by the renderer.
            (None, Some(err.user_message()))
        }
    };

    Ok(PredictionOutcome {
        season: season.to_string(),
        player_id: player.id.clone(),
        player_name: player.name.clone(),
        opponent: opponent.to_string(),
        prediction,
        context,
        subgraph,
        explanation,
        visual,
        render_note,
    })
}

pub fn format_points_line(prediction: &PredictionResult) -> String {
    format!("Predicted Points: {:.2}", prediction.points)
}

pub fn format_threshold_line(prediction: &PredictionResult) -> String {
    let answer = if prediction.exceeds_threshold { "Yes" } else { "No" };
    format!("Will Exceed Threshold: {answer}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_lines_match_the_ui_contract() {
        let prediction = PredictionResult {
            points: 28.4,
            exceeds_threshold: true,
        };
        assert_eq!(format_points_line(&prediction), "Predicted Points: 28.40");
        assert_eq!(
            format_threshold_line(&prediction),
            "Will Exceed Threshold: Yes"
        );

        let under = PredictionResult {
            points: 11.05,
            exceeds_threshold: false,
        };
        assert_eq!(format_points_line(&under), "Predicted Points: 11.05");
        assert_eq!(format_threshold_line(&under), "Will Exceed Threshold: No");
    }

    #[test]
    fn recent_games_bound_has_a_sane_default() {
        assert_eq!(recent_games_bound(), DEFAULT_RECENT_GAMES);
    }
}
