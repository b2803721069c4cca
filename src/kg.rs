use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{Datelike, NaiveDate};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use crate::data::SeasonDataset;

/// Node `type` attribute values. The renderer keys its styling off these
/// strings verbatim, so they are wire format, not just names.
pub mod node_type {
    pub const PLAYER: &str = "Player";
    pub const TEAM: &str = "Team";
    pub const OPPONENT_TEAM: &str = "Opponent_Team";
    pub const GAME: &str = "Game";
    pub const HOME_AWAY: &str = "Home_Away";
    pub const PERFORMANCE: &str = "Performance";
}

pub mod relation {
    pub const PLAYS_FOR: &str = "plays_for";
    pub const PLAYED_IN: &str = "played_in";
    pub const AGAINST: &str = "against";
    pub const PLAYED_AT: &str = "played_at";
    pub const PRODUCED: &str = "produced";
}

pub const HOME_NODE_ID: &str = "venue:home";
pub const AWAY_NODE_ID: &str = "venue:away";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub stats: BTreeMap<String, f64>,
}

impl Entity {
    pub fn new(id: impl Into<String>, node_type: &str) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.to_string(),
            name: None,
            stats: BTreeMap::new(),
        }
    }

    pub fn named(id: impl Into<String>, node_type: &str, name: impl Into<String>) -> Self {
        let mut entity = Self::new(id, node_type);
        entity.name = Some(name.into());
        entity
    }

    /// Display label: `name` when present, raw id otherwise.
    pub fn display_label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// A directed `{source, target, relation}` triple over entity ids.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContextEdge {
    pub source: String,
    pub target: String,
    pub relation: String,
}

/// Bounded, self-contained slice of the knowledge graph for one
/// (player, opponent) pair. Owns deep copies of its entities, so mutating a
/// subgraph never touches the source graph or any other extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextSubgraph {
    pub nodes: Vec<Entity>,
    pub edges: Vec<ContextEdge>,
}

impl ContextSubgraph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node(&self, id: &str) -> Option<&Entity> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

/// Season-wide knowledge graph. Built once per season and read-only
/// afterwards; every consumer works on extracted copies.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeGraph {
    graph: DiGraph<Entity, String>,
    index: HashMap<String, NodeIndex>,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entity, or return the index of the existing node with the
    /// same id. Attributes of an existing node are left untouched.
    pub fn upsert_entity(&mut self, entity: Entity) -> NodeIndex {
        if let Some(idx) = self.index.get(&entity.id) {
            return *idx;
        }
        let id = entity.id.clone();
        let idx = self.graph.add_node(entity);
        self.index.insert(id, idx);
        idx
    }

    /// Add a directed relation between two existing entities. Duplicate
    /// (source, target, relation) triples are collapsed; distinct relation
    /// labels between the same pair are all kept.
    pub fn relate(&mut self, source: &str, target: &str, relation: &str) -> bool {
        let (Some(&s), Some(&t)) = (self.index.get(source), self.index.get(target)) else {
            return false;
        };
        let exists = self
            .graph
            .edges_connecting(s, t)
            .any(|e| e.weight().as_str() == relation);
        if !exists {
            self.graph.add_edge(s, t, relation.to_string());
        }
        !exists
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn entity(&self, id: &str) -> Option<&Entity> {
        self.index.get(id).map(|idx| &self.graph[*idx])
    }

    pub fn entity_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn relation_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Team abbreviation the player is rostered on, resolved through the
    /// `plays_for` edge. Independent of any extracted subgraph.
    pub fn player_team(&self, player_id: &str) -> Option<String> {
        let idx = *self.index.get(player_id)?;
        self.graph
            .edges_directed(idx, Direction::Outgoing)
            .filter(|e| e.weight().as_str() == relation::PLAYS_FOR)
            .filter_map(|e| self.graph.node_weight(e.target()))
            .find(|entity| entity.node_type == node_type::TEAM)
            .map(|entity| entity.id.clone())
    }

    fn out_edges_sorted(&self, idx: NodeIndex) -> Vec<(String, NodeIndex)> {
        let mut edges: Vec<(String, String, NodeIndex)> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| {
                let target = e.target();
                (e.weight().clone(), self.graph[target].id.clone(), target)
            })
            .collect();
        edges.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        edges.into_iter().map(|(rel, _, idx)| (rel, idx)).collect()
    }
}

pub fn opponent_node_id(abbr: &str) -> String {
    format!("opp:{abbr}")
}

pub fn game_node_id(game_id: &str) -> String {
    format!("game:{game_id}")
}

pub fn performance_node_id(game_id: &str) -> String {
    format!("perf:{game_id}")
}

fn venue_node_id(home: bool) -> &'static str {
    if home { HOME_NODE_ID } else { AWAY_NODE_ID }
}

fn date_ordinal(date: &str) -> Option<f64> {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .ok()
        .map(|d| d.num_days_from_ce() as f64)
}

/// Build the season knowledge graph from the season dataset.
///
/// Nodes: players, teams, an opponent node per team, one game and one
/// performance node per game log, and the two shared venue nodes. Edges:
/// `plays_for`, `played_in`, `against`, `played_at`, `produced`.
pub fn build_knowledge_graph(dataset: &SeasonDataset) -> KnowledgeGraph {
    let mut kg = KnowledgeGraph::new();

    for team in &dataset.teams {
        kg.upsert_entity(Entity::named(
            &team.abbreviation,
            node_type::TEAM,
            &team.name,
        ));
        // Every team can be asked about as an opponent, with or without
        // head-to-head games in the log.
        kg.upsert_entity(Entity::named(
            opponent_node_id(&team.abbreviation),
            node_type::OPPONENT_TEAM,
            &team.abbreviation,
        ));
    }

    for player in &dataset.players {
        kg.upsert_entity(Entity::named(&player.id, node_type::PLAYER, &player.name));
        kg.relate(&player.id, &player.team, relation::PLAYS_FOR);
    }

    kg.upsert_entity(Entity::named(HOME_NODE_ID, node_type::HOME_AWAY, "Home"));
    kg.upsert_entity(Entity::named(AWAY_NODE_ID, node_type::HOME_AWAY, "Away"));

    for log in &dataset.games {
        let game_id = game_node_id(&log.game_id);
        let mut game = Entity::named(
            &game_id,
            node_type::GAME,
            format!("vs {} {}", log.opponent, log.date),
        );
        if let Some(ord) = date_ordinal(&log.date) {
            game.stats.insert("date_ord".to_string(), ord);
        }
        kg.upsert_entity(game);

        let opp_id = opponent_node_id(&log.opponent);
        kg.upsert_entity(Entity::named(&opp_id, node_type::OPPONENT_TEAM, &log.opponent));

        let perf_id = performance_node_id(&log.game_id);
        let mut perf = Entity::named(
            &perf_id,
            node_type::PERFORMANCE,
            format!("{:.0} pts vs {}", log.points, log.opponent),
        );
        perf.stats.insert("points".to_string(), log.points);
        perf.stats.insert("rebounds".to_string(), log.rebounds);
        perf.stats.insert("assists".to_string(), log.assists);
        perf.stats.insert("minutes".to_string(), log.minutes);
        kg.upsert_entity(perf);

        kg.relate(&log.player_id, &game_id, relation::PLAYED_IN);
        kg.relate(&game_id, &opp_id, relation::AGAINST);
        kg.relate(&game_id, venue_node_id(log.home), relation::PLAYED_AT);
        kg.relate(&game_id, &perf_id, relation::PRODUCED);
    }

    kg
}

/// Extract the bounded context for one (player, opponent) pair.
///
/// Included: the player, the player's team, the opponent node, up to
/// `recent_games` of the player's games (games against this opponent first,
/// most recent first), and each included game's opponent/venue/performance
/// neighbors, plus every graph edge whose endpoints are both included.
///
/// Unknown player or opponent yields an empty subgraph, which callers treat
/// as a displayable "no data" state, not an error. Repeated extraction from
/// an unchanged graph yields identical output, in identical order.
pub fn extract_context_subgraph(
    kg: &KnowledgeGraph,
    player_id: &str,
    opponent_id: &str,
    recent_games: usize,
) -> ContextSubgraph {
    let (Some(&player_idx), Some(&opponent_idx)) =
        (kg.index.get(player_id), kg.index.get(opponent_id))
    else {
        return ContextSubgraph::default();
    };

    fn include(order: &mut Vec<NodeIndex>, seen: &mut HashSet<NodeIndex>, idx: NodeIndex) {
        if seen.insert(idx) {
            order.push(idx);
        }
    }

    let mut order: Vec<NodeIndex> = Vec::new();
    let mut seen: HashSet<NodeIndex> = HashSet::new();

    include(&mut order, &mut seen, player_idx);
    for (rel, target) in kg.out_edges_sorted(player_idx) {
        if rel == relation::PLAYS_FOR {
            include(&mut order, &mut seen, target);
        }
    }
    include(&mut order, &mut seen, opponent_idx);

    // Player's games, most recent first; games against this opponent take
    // precedence over the rest when the bound truncates.
    let mut games: Vec<(bool, f64, String, NodeIndex)> = kg
        .out_edges_sorted(player_idx)
        .into_iter()
        .filter(|(rel, _)| rel == relation::PLAYED_IN)
        .map(|(_, game_idx)| {
            let game = &kg.graph[game_idx];
            let vs_opponent = kg
                .graph
                .edges_directed(game_idx, Direction::Outgoing)
                .any(|e| {
                    e.weight().as_str() == relation::AGAINST && e.target() == opponent_idx
                });
            let date_ord = game.stats.get("date_ord").copied().unwrap_or(0.0);
            (vs_opponent, date_ord, game.id.clone(), game_idx)
        })
        .collect();
    games.sort_by(|a, b| {
        b.0.cmp(&a.0)
            .then_with(|| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal))
            .then_with(|| b.2.cmp(&a.2))
    });

    for (_, _, _, game_idx) in games.into_iter().take(recent_games) {
        include(&mut order, &mut seen, game_idx);
        for (_, target) in kg.out_edges_sorted(game_idx) {
            include(&mut order, &mut seen, target);
        }
    }

    // Copy every edge with both endpoints inside the slice, ordered by the
    // node inclusion order so extraction stays reproducible.
    let pos: HashMap<NodeIndex, usize> = order
        .iter()
        .enumerate()
        .map(|(i, idx)| (*idx, i))
        .collect();
    let mut edges: Vec<(usize, usize, String)> = Vec::new();
    for &idx in &order {
        for edge in kg.graph.edges_directed(idx, Direction::Outgoing) {
            if let Some(&target_pos) = pos.get(&edge.target()) {
                edges.push((pos[&idx], target_pos, edge.weight().clone()));
            }
        }
    }
    edges.sort();
    edges.dedup();

    let nodes: Vec<Entity> = order.iter().map(|idx| kg.graph[*idx].clone()).collect();
    let edges = edges
        .into_iter()
        .map(|(s, t, relation)| ContextEdge {
            source: nodes[s].id.clone(),
            target: nodes[t].id.clone(),
            relation,
        })
        .collect();

    ContextSubgraph { nodes, edges }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{GameLog, PlayerRow, SeasonDataset, TeamRow};

    fn stub_dataset() -> SeasonDataset {
        let teams = vec![
            TeamRow {
                id: "1".to_string(),
                abbreviation: "LAL".to_string(),
                name: "Los Angeles Lakers".to_string(),
            },
            TeamRow {
                id: "2".to_string(),
                abbreviation: "BOS".to_string(),
                name: "Boston Celtics".to_string(),
            },
            TeamRow {
                id: "3".to_string(),
                abbreviation: "DEN".to_string(),
                name: "Denver Nuggets".to_string(),
            },
        ];
        let players = vec![PlayerRow {
            id: "2544".to_string(),
            name: "LeBron James".to_string(),
            team: "LAL".to_string(),
        }];
        let games = vec![
            stub_log("g1", "2544", "2024-01-05", "BOS", true, 28.0),
            stub_log("g2", "2544", "2024-01-08", "DEN", false, 22.0),
            stub_log("g3", "2544", "2024-01-12", "BOS", false, 31.0),
            stub_log("g4", "2544", "2024-01-15", "DEN", true, 19.0),
        ];
        SeasonDataset {
            season: "2023-24".to_string(),
            players,
            teams,
            games,
        }
    }

    fn stub_log(
        game_id: &str,
        player_id: &str,
        date: &str,
        opponent: &str,
        home: bool,
        points: f64,
    ) -> GameLog {
        GameLog {
            game_id: game_id.to_string(),
            player_id: player_id.to_string(),
            date: date.to_string(),
            opponent: opponent.to_string(),
            home,
            points,
            rebounds: 7.0,
            assists: 8.0,
            minutes: 35.0,
        }
    }

    #[test]
    fn build_links_player_to_team() {
        let kg = build_knowledge_graph(&stub_dataset());
        assert_eq!(kg.player_team("2544").as_deref(), Some("LAL"));
        assert!(kg.contains(&opponent_node_id("BOS")));
        assert_eq!(kg.entity("LAL").unwrap().node_type, node_type::TEAM);
    }

    #[test]
    fn extraction_is_deterministic() {
        let kg = build_knowledge_graph(&stub_dataset());
        let a = extract_context_subgraph(&kg, "2544", &opponent_node_id("BOS"), 5);
        let b = extract_context_subgraph(&kg, "2544", &opponent_node_id("BOS"), 5);
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn extraction_prefers_games_against_opponent() {
        let kg = build_knowledge_graph(&stub_dataset());
        let sub = extract_context_subgraph(&kg, "2544", &opponent_node_id("BOS"), 2);
        // Both BOS games make the cut before any DEN game does.
        assert!(sub.node(&game_node_id("g1")).is_some());
        assert!(sub.node(&game_node_id("g3")).is_some());
        assert!(sub.node(&game_node_id("g2")).is_none());
        assert!(sub.node(&game_node_id("g4")).is_none());
    }

    #[test]
    fn extraction_caps_game_count() {
        let kg = build_knowledge_graph(&stub_dataset());
        let sub = extract_context_subgraph(&kg, "2544", &opponent_node_id("BOS"), 1);
        let games = sub
            .nodes
            .iter()
            .filter(|n| n.node_type == node_type::GAME)
            .count();
        assert_eq!(games, 1);
        // Most recent BOS game wins the single slot.
        assert!(sub.node(&game_node_id("g3")).is_some());
    }

    #[test]
    fn unknown_ids_yield_empty_subgraph() {
        let kg = build_knowledge_graph(&stub_dataset());
        assert!(extract_context_subgraph(&kg, "nope", &opponent_node_id("BOS"), 5).is_empty());
        assert!(extract_context_subgraph(&kg, "2544", &opponent_node_id("ZZZ"), 5).is_empty());
    }

    #[test]
    fn edges_are_referentially_closed() {
        let kg = build_knowledge_graph(&stub_dataset());
        let sub = extract_context_subgraph(&kg, "2544", &opponent_node_id("BOS"), 5);
        for edge in &sub.edges {
            assert!(sub.node(&edge.source).is_some(), "missing {}", edge.source);
            assert!(sub.node(&edge.target).is_some(), "missing {}", edge.target);
        }
    }

    #[test]
    fn subgraph_is_isolated_from_source_graph() {
        let kg = build_knowledge_graph(&stub_dataset());
        let mut sub = extract_context_subgraph(&kg, "2544", &opponent_node_id("BOS"), 5);
        for node in &mut sub.nodes {
            node.name = Some("relabeled".to_string());
            node.stats.insert("poked".to_string(), 1.0);
        }
        assert_eq!(
            kg.entity("2544").unwrap().name.as_deref(),
            Some("LeBron James")
        );
        assert!(kg.entity("2544").unwrap().stats.get("poked").is_none());

        let fresh = extract_context_subgraph(&kg, "2544", &opponent_node_id("BOS"), 5);
        assert_eq!(
            fresh.node("2544").unwrap().name.as_deref(),
            Some("LeBron James")
        );
    }

    #[test]
    fn node_types_are_preserved_verbatim() {
        let kg = build_knowledge_graph(&stub_dataset());
        let sub = extract_context_subgraph(&kg, "2544", &opponent_node_id("BOS"), 5);
        let opp = sub.node(&opponent_node_id("BOS")).unwrap();
        assert_eq!(opp.node_type, "Opponent_Team");
        let venue = sub.node(HOME_NODE_ID).unwrap();
        assert_eq!(venue.node_type, "Home_Away");
    }
}
