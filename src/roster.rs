use crate::data::{PlayerRow, TeamRow};

/// Resolve a free-text player name against the season roster. Exact match
/// first (ignoring case), then a whitespace-normalized pass. `None` covers
/// both "not found" and an empty roster; callers distinguish the two by
/// checking the roster themselves.
pub fn resolve_player<'a>(name: &str, players: &'a [PlayerRow]) -> Option<&'a PlayerRow> {
    let wanted = name.trim();
    if wanted.is_empty() {
        return None;
    }
    if let Some(player) = players.iter().find(|p| p.name.eq_ignore_ascii_case(wanted)) {
        return Some(player);
    }
    let normalized = normalize(wanted);
    players.iter().find(|p| normalize(&p.name) == normalized)
}

pub fn team_by_abbreviation<'a>(abbr: &str, teams: &'a [TeamRow]) -> Option<&'a TeamRow> {
    let wanted = abbr.trim();
    teams
        .iter()
        .find(|t| t.abbreviation.eq_ignore_ascii_case(wanted))
}

fn normalize(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Vec<PlayerRow> {
        vec![
            PlayerRow {
                id: "2544".to_string(),
                name: "LeBron James".to_string(),
                team: "LAL".to_string(),
            },
            PlayerRow {
                id: "201939".to_string(),
                name: "Stephen Curry".to_string(),
                team: "GSW".to_string(),
            },
        ]
    }

    #[test]
    fn resolves_exact_name() {
        let players = roster();
        let found = resolve_player("LeBron James", &players).expect("resolves");
        assert_eq!(found.id, "2544");
    }

    #[test]
    fn resolves_ignoring_case_and_spacing() {
        let players = roster();
        assert_eq!(resolve_player("lebron james", &players).unwrap().id, "2544");
        assert_eq!(
            resolve_player("  LeBron   James ", &players).unwrap().id,
            "2544"
        );
    }

    #[test]
    fn unknown_name_is_none() {
        let players = roster();
        assert!(resolve_player("Zzyxx Nobody", &players).is_none());
    }

    #[test]
    fn empty_roster_is_none() {
        assert!(resolve_player("LeBron James", &[]).is_none());
        assert!(resolve_player("", &roster()).is_none());
    }
}
