use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::data::{GameLog, PlayerRow, SeasonDataset, TeamRow};

pub const SUPPORTED_SEASONS: [&str; 3] = ["2023-24", "2022-23", "2021-22"];

const GAMES_PER_PLAYER: usize = 12;

const TEAM_SEEDS: &[(&str, &str)] = &[
    ("ATL", "Atlanta Hawks"),
    ("BOS", "Boston Celtics"),
    ("BKN", "Brooklyn Nets"),
    ("CHA", "Charlotte Hornets"),
    ("CHI", "Chicago Bulls"),
    ("CLE", "Cleveland Cavaliers"),
    ("DAL", "Dallas Mavericks"),
    ("DEN", "Denver Nuggets"),
    ("DET", "Detroit Pistons"),
    ("GSW", "Golden State Warriors"),
    ("HOU", "Houston Rockets"),
    ("IND", "Indiana Pacers"),
    ("LAC", "LA Clippers"),
    ("LAL", "Los Angeles Lakers"),
    ("MEM", "Memphis Grizzlies"),
    ("MIA", "Miami Heat"),
    ("MIL", "Milwaukee Bucks"),
    ("MIN", "Minnesota Timberwolves"),
    ("NOP", "New Orleans Pelicans"),
    ("NYK", "New York Knicks"),
    ("OKC", "Oklahoma City Thunder"),
    ("ORL", "Orlando Magic"),
    ("PHI", "Philadelphia 76ers"),
    ("PHX", "Phoenix Suns"),
    ("POR", "Portland Trail Blazers"),
    ("SAC", "Sacramento Kings"),
    ("SAS", "San Antonio Spurs"),
    ("TOR", "Toronto Raptors"),
    ("UTA", "Utah Jazz"),
    ("WAS", "Washington Wizards"),
];

// (id, name, team, scoring base)
const PLAYER_SEEDS: &[(&str, &str, &str, f64)] = &[
    ("2544", "LeBron James", "LAL", 25.5),
    ("203076", "Anthony Davis", "LAL", 24.5),
    ("201939", "Stephen Curry", "GSW", 26.5),
    ("1628369", "Jayson Tatum", "BOS", 27.0),
    ("1627759", "Jaylen Brown", "BOS", 23.0),
    ("201142", "Kevin Durant", "PHX", 27.5),
    ("1626164", "Devin Booker", "PHX", 26.0),
    ("203507", "Giannis Antetokounmpo", "MIL", 30.5),
    ("203081", "Damian Lillard", "MIL", 24.5),
    ("203999", "Nikola Jokic", "DEN", 26.0),
    ("1629029", "Luka Doncic", "DAL", 32.0),
    ("203954", "Joel Embiid", "PHI", 33.0),
    ("1630169", "Tyrese Haliburton", "IND", 20.5),
    ("1628983", "Shai Gilgeous-Alexander", "OKC", 30.0),
    ("1629627", "Zion Williamson", "NOP", 22.5),
    ("1629630", "Ja Morant", "MEM", 25.0),
    ("1630162", "Anthony Edwards", "MIN", 26.0),
    ("1628378", "Donovan Mitchell", "CLE", 27.5),
    ("1628368", "De'Aaron Fox", "SAC", 26.5),
    ("1627734", "Domantas Sabonis", "SAC", 19.5),
    ("1628973", "Jalen Brunson", "NYK", 28.0),
    ("202710", "Jimmy Butler", "MIA", 21.0),
    ("202695", "Kawhi Leonard", "LAC", 23.5),
    ("1641705", "Victor Wembanyama", "SAS", 21.0),
];

pub fn team_table() -> Vec<TeamRow> {
    TEAM_SEEDS
        .iter()
        .enumerate()
        .map(|(idx, (abbr, name))| TeamRow {
            id: (idx + 1).to_string(),
            abbreviation: (*abbr).to_string(),
            name: (*name).to_string(),
        })
        .collect()
}

pub fn team_abbreviations() -> Vec<String> {
    TEAM_SEEDS.iter().map(|(abbr, _)| (*abbr).to_string()).collect()
}

/// Deterministic sample feed: the same season string always reproduces the
/// same dataset. Seasons outside the supported set come back empty, which is
/// the provider's "no data for this season" answer.
pub fn seed_dataset(season: &str) -> SeasonDataset {
    if !SUPPORTED_SEASONS.contains(&season) {
        return SeasonDataset {
            season: season.to_string(),
            players: Vec::new(),
            teams: Vec::new(),
            games: Vec::new(),
        };
    }

    let mut rng = StdRng::seed_from_u64(season_seed(season));
    let teams = team_table();
    let players: Vec<PlayerRow> = PLAYER_SEEDS
        .iter()
        .map(|(id, name, team, _)| PlayerRow {
            id: (*id).to_string(),
            name: (*name).to_string(),
            team: (*team).to_string(),
        })
        .collect();

    let start = NaiveDate::from_ymd_opt(season_start_year(season), 10, 24)
        .expect("static season start date is valid");

    let mut games = Vec::with_capacity(PLAYER_SEEDS.len() * GAMES_PER_PLAYER);
    for &(id, _, team, base) in PLAYER_SEEDS {
        for i in 0..GAMES_PER_PLAYER {
            let opponent = loop {
                let pick = &teams[rng.gen_range(0..teams.len())];
                if pick.abbreviation != team {
                    break pick.abbreviation.clone();
                }
            };
            let date = start + chrono::Duration::days((i * 3) as i64 + rng.gen_range(0..2));
            let points = (base + rng.gen_range(-7.0..7.0)).max(2.0);
            let rebounds = (base * 0.28 + rng.gen_range(-2.0..2.0)).max(0.0);
            let assists = (base * 0.24 + rng.gen_range(-2.0..2.0)).max(0.0);
            games.push(GameLog {
                game_id: format!("{id}-{i:02}"),
                player_id: id.to_string(),
                date: date.format("%Y-%m-%d").to_string(),
                opponent,
                home: i % 2 == 0,
                points,
                rebounds,
                assists,
                minutes: rng.gen_range(28.0..40.0),
            });
        }
    }

    SeasonDataset {
        season: season.to_string(),
        players,
        teams,
        games,
    }
}

fn season_start_year(season: &str) -> i32 {
    season
        .split('-')
        .next()
        .and_then(|year| year.parse::<i32>().ok())
        .unwrap_or(2023)
}

// FNV-1a over the season string. Keeps the sample feed reproducible without
// going through the randomized std hasher.
fn season_seed(season: &str) -> u64 {
    season
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325u64, |hash, byte| {
            (hash ^ byte as u64).wrapping_mul(0x0000_0100_0000_01b3)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_dataset_is_reproducible() {
        let a = seed_dataset("2023-24");
        let b = seed_dataset("2023-24");
        assert_eq!(a.games.len(), b.games.len());
        assert_eq!(a.games[0].points, b.games[0].points);
        assert_eq!(a.games[0].opponent, b.games[0].opponent);
    }

    #[test]
    fn seasons_differ() {
        let a = seed_dataset("2023-24");
        let b = seed_dataset("2022-23");
        assert_ne!(a.games[0].date, b.games[0].date);
    }

    #[test]
    fn unsupported_season_is_empty() {
        let dataset = seed_dataset("1947-48");
        assert!(dataset.players.is_empty());
        assert!(dataset.teams.is_empty());
        assert!(dataset.games.is_empty());
    }

    #[test]
    fn players_never_face_their_own_team() {
        let dataset = seed_dataset("2023-24");
        for log in &dataset.games {
            let player = dataset
                .players
                .iter()
                .find(|p| p.id == log.player_id)
                .expect("log references a seeded player");
            assert_ne!(player.team, log.opponent);
        }
    }
}
