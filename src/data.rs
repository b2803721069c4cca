use std::env;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::persist;
use crate::sample_data;

const REQUEST_TIMEOUT_SECS: u64 = 10;

static CLIENT: OnceCell<Client> = OnceCell::new();

pub(crate) fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build http client")
    })
}

pub(crate) fn opt_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .and_then(|val| if val.trim().is_empty() { None } else { Some(val) })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerRow {
    pub id: String,
    pub name: String,
    /// Team abbreviation the player is rostered on.
    #[serde(default)]
    pub team: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamRow {
    pub id: String,
    pub abbreviation: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameLog {
    pub game_id: String,
    pub player_id: String,
    /// ISO date, `YYYY-MM-DD`. Kept as text on the wire; parsed where a real
    /// date is needed.
    pub date: String,
    /// Opponent team abbreviation.
    pub opponent: String,
    #[serde(default)]
    pub home: bool,
    pub points: f64,
    #[serde(default)]
    pub rebounds: f64,
    #[serde(default)]
    pub assists: f64,
    #[serde(default)]
    pub minutes: f64,
}

/// Everything a season's pipeline needs from the data providers. Loaded once
/// per season and treated as read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonDataset {
    pub season: String,
    pub players: Vec<PlayerRow>,
    pub teams: Vec<TeamRow>,
    pub games: Vec<GameLog>,
}

/// Load a season dataset through the provider chain: remote API when
/// `HOOPS_API_BASE` is set (with a disk cache), SQLite when `HOOPS_DB` is
/// set, the bundled sample feed otherwise. Empty tables are valid "no data
/// for this season" responses, not errors.
pub fn load_season_dataset(season: &str) -> Result<SeasonDataset> {
    if let Some(base) = opt_env("HOOPS_API_BASE") {
        if let Some(cached) = persist::load_cached_dataset(season) {
            return Ok(cached);
        }
        let dataset = fetch_remote_dataset(&base, season)?;
        persist::store_dataset(&dataset);
        return Ok(dataset);
    }
    if let Some(db) = opt_env("HOOPS_DB") {
        return load_sqlite_dataset(Path::new(&db), season);
    }
    Ok(sample_data::seed_dataset(season))
}

pub fn get_all_players(season: &str) -> Result<Vec<PlayerRow>> {
    load_season_dataset(season).map(|dataset| dataset.players)
}

pub fn get_team_data(season: &str) -> Result<Vec<TeamRow>> {
    load_season_dataset(season).map(|dataset| dataset.teams)
}

fn fetch_remote_dataset(base: &str, season: &str) -> Result<SeasonDataset> {
    let base = base.trim_end_matches('/');
    let players = fetch_text(&format!("{base}/players?season={season}"))?;
    let teams = fetch_text(&format!("{base}/teams?season={season}"))?;
    let games = fetch_text(&format!("{base}/games?season={season}"))?;

    Ok(SeasonDataset {
        season: season.to_string(),
        players: parse_players_json(&players)?,
        teams: parse_teams_json(&teams)?,
        games: parse_game_logs_json(&games)?,
    })
}

fn fetch_text(url: &str) -> Result<String> {
    let client = http_client()?;
    client
        .get(url)
        .header(USER_AGENT, "hoops_terminal/0.1")
        .send()
        .with_context(|| format!("request failed: {url}"))?
        .error_for_status()
        .with_context(|| format!("request rejected: {url}"))?
        .text()
        .with_context(|| format!("failed to read body: {url}"))
}

pub fn parse_players_json(raw: &str) -> Result<Vec<PlayerRow>> {
    parse_rows(raw, "players")
}

pub fn parse_teams_json(raw: &str) -> Result<Vec<TeamRow>> {
    parse_rows(raw, "teams")
}

pub fn parse_game_logs_json(raw: &str) -> Result<Vec<GameLog>> {
    parse_rows(raw, "game logs")
}

fn parse_rows<T: serde::de::DeserializeOwned>(raw: &str, what: &str) -> Result<Vec<T>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    serde_json::from_str(trimmed).with_context(|| format!("{what} json did not match the expected shape"))
}

fn load_sqlite_dataset(path: &Path, season: &str) -> Result<SeasonDataset> {
    let conn = Connection::open(path)
        .with_context(|| format!("failed to open season database {}", path.display()))?;

    let players = {
        let mut stmt = conn
            .prepare("SELECT id, name, team FROM players WHERE season = ?1 ORDER BY id")
            .context("players query failed to prepare")?;
        let rows = stmt.query_map([season], |row| {
            Ok(PlayerRow {
                id: row.get(0)?,
                name: row.get(1)?,
                team: row.get(2)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .context("players query failed")?
    };

    let teams = {
        let mut stmt = conn
            .prepare("SELECT id, abbreviation, name FROM teams ORDER BY abbreviation")
            .context("teams query failed to prepare")?;
        let rows = stmt.query_map([], |row| {
            Ok(TeamRow {
                id: row.get(0)?,
                abbreviation: row.get(1)?,
                name: row.get(2)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .context("teams query failed")?
    };

    let games = {
        let mut stmt = conn
            .prepare(
                "SELECT game_id, player_id, date, opponent, home, points, rebounds, assists, minutes \
                 FROM game_logs WHERE season = ?1 ORDER BY date, game_id",
            )
            .context("game logs query failed to prepare")?;
        let rows = stmt.query_map([season], |row| {
            Ok(GameLog {
                game_id: row.get(0)?,
                player_id: row.get(1)?,
                date: row.get(2)?,
                opponent: row.get(3)?,
                home: row.get::<_, i64>(4)? != 0,
                points: row.get(5)?,
                rebounds: row.get(6)?,
                assists: row.get(7)?,
                minutes: row.get(8)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .context("game logs query failed")?
    };

    Ok(SeasonDataset {
        season: season.to_string(),
        players,
        teams,
        games,
    })
}
