use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::{http_client, opt_env};
use crate::kg::{ContextEdge, ContextSubgraph, relation};
use crate::models::PredictionResult;

/// Sentinel for a player whose team association cannot be resolved. Kept as
/// an explicit value so it flows into the generator payload unchanged.
pub const UNKNOWN_TEAM: &str = "Unknown";

/// Explanation-ready context. Field names mirror the generator's expected
/// payload, so the serde renames are wire format.
#[derive(Debug, Clone, Serialize)]
pub struct ContextInfo {
    #[serde(rename = "Player")]
    pub player: String,
    #[serde(rename = "Player_Team")]
    pub player_team: String,
    #[serde(rename = "Opponent")]
    pub opponent: String,
    #[serde(rename = "Relationships")]
    pub relationships: Vec<ContextEdge>,
}

/// Shape the explanation context from an extracted subgraph. Edge order is
/// the subgraph's deterministic order; every triple references nodes of that
/// same subgraph.
pub fn context_info(
    player: &str,
    player_team: Option<String>,
    opponent: &str,
    subgraph: &ContextSubgraph,
) -> ContextInfo {
    ContextInfo {
        player: player.to_string(),
        player_team: player_team.unwrap_or_else(|| UNKNOWN_TEAM.to_string()),
        opponent: opponent.to_string(),
        relationships: subgraph.edges.clone(),
    }
}

#[derive(Debug, Serialize)]
struct ExplanationRequest<'a> {
    player: &'a str,
    opponent: &'a str,
    prediction: &'a PredictionResult,
    context: &'a ContextInfo,
}

#[derive(Debug, Deserialize)]
struct ExplanationResponse {
    #[serde(default)]
    text: String,
}

/// Produce the prediction explanation. With `HOOPS_EXPLAIN_URL` set the
/// request goes to the external generator; otherwise a deterministic local
/// template stands in. Errors are plain `anyhow` failures for the caller to
/// catch — the numeric prediction never depends on this call succeeding.
pub fn generate_explanation(
    player: &str,
    opponent: &str,
    prediction: &PredictionResult,
    context: &ContextInfo,
) -> Result<String> {
    if let Some(url) = opt_env("HOOPS_EXPLAIN_URL") {
        return request_remote(&url, player, opponent, prediction, context);
    }
    Ok(local_explanation(player, opponent, prediction, context))
}

fn request_remote(
    url: &str,
    player: &str,
    opponent: &str,
    prediction: &PredictionResult,
    context: &ContextInfo,
) -> Result<String> {
    let client = http_client()?;
    let request = ExplanationRequest {
        player,
        opponent,
        prediction,
        context,
    };
    let response: ExplanationResponse = client
        .post(url)
        .json(&request)
        .send()
        .context("explanation request failed")?
        .error_for_status()
        .context("explanation request rejected")?
        .json()
        .context("explanation response did not match the expected shape")?;
    if response.text.trim().is_empty() {
        anyhow::bail!("explanation response was empty");
    }
    Ok(response.text)
}

fn local_explanation(
    player: &str,
    opponent: &str,
    prediction: &PredictionResult,
    context: &ContextInfo,
) -> String {
    let games = context
        .relationships
        .iter()
        .filter(|e| e.relation == relation::PLAYED_IN)
        .count();
    let home_games = context
        .relationships
        .iter()
        .filter(|e| e.relation == relation::PLAYED_AT && e.target.ends_with(":home"))
        .count();

    let outcome = if prediction.exceeds_threshold {
        "clear the scoring threshold"
    } else {
        "stay under the scoring threshold"
    };

    let mut text = format!(
        "{player} ({team}) projects for {points:.2} points against {opponent}, and the model expects the line to {outcome}.",
        team = context.player_team,
        points = prediction.points,
    );
    if games > 0 {
        text.push_str(&format!(
            " The projection draws on {games} recent games in the knowledge graph ({home_games} at home), weighing matchup history against {opponent} most heavily."
        ));
    } else {
        text.push_str(" No recent matchup context was available in the knowledge graph.");
    }
    if context.player_team == UNKNOWN_TEAM {
        text.push_str(" The player's current team could not be resolved from the graph.");
    }
    text
}
