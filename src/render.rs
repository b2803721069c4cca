use std::fs;
use std::io::Write;

use anyhow::{Context, Result};
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::error;

use crate::error::PredictError;
use crate::kg::{ContextEdge, ContextSubgraph};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeStyle {
    pub color: &'static str,
    pub shape: &'static str,
}

/// vis-network's own defaults; any node type outside the fixed table gets
/// these instead of failing.
pub const DEFAULT_STYLE: NodeStyle = NodeStyle {
    color: "#97c2fc",
    shape: "dot",
};

const NODE_STYLES: &[(&str, NodeStyle)] = &[
    ("Player", NodeStyle { color: "blue", shape: "ellipse" }),
    ("Team", NodeStyle { color: "green", shape: "box" }),
    ("Game", NodeStyle { color: "red", shape: "diamond" }),
    ("Opponent_Team", NodeStyle { color: "purple", shape: "dot" }),
    ("Home_Away", NodeStyle { color: "orange", shape: "triangle" }),
    ("Performance", NodeStyle { color: "yellow", shape: "star" }),
];

/// Fixed node-type → (color, shape) lookup.
pub fn style_for(node_type: &str) -> NodeStyle {
    NODE_STYLES
        .iter()
        .find(|(t, _)| *t == node_type)
        .map(|(_, style)| *style)
        .unwrap_or(DEFAULT_STYLE)
}

#[derive(Debug, Clone, Serialize)]
pub struct ViewNode {
    pub id: String,
    pub label: String,
    pub color: &'static str,
    pub shape: &'static str,
    /// Hover title in the rendered document.
    #[serde(rename = "title")]
    pub node_type: String,
}

/// Display copy of a subgraph: labels substituted (name when present, id
/// otherwise) and the style table applied. Built from clones, so the
/// canonical subgraph is never touched.
#[derive(Debug, Clone)]
pub struct PresentationView {
    pub nodes: Vec<ViewNode>,
    pub edges: Vec<ContextEdge>,
}

pub fn presentation_view(subgraph: &ContextSubgraph) -> PresentationView {
    let nodes = subgraph
        .nodes
        .iter()
        .map(|entity| {
            let style = style_for(&entity.node_type);
            ViewNode {
                id: entity.id.clone(),
                label: entity.display_label().to_string(),
                color: style.color,
                shape: style.shape,
                node_type: entity.node_type.clone(),
            }
        })
        .collect();
    PresentationView {
        nodes,
        edges: subgraph.edges.clone(),
    }
}

/// Self-contained interactive document for one rendered subgraph.
#[derive(Debug, Clone)]
pub struct VisualDocument {
    pub html: String,
    pub node_count: usize,
    pub edge_count: usize,
}

/// Render a subgraph to its visual document.
///
/// `Ok(None)` signals "nothing to display" for an empty subgraph; no
/// artifact is produced in that case. A serialization or IO failure is
/// logged with full detail and surfaced as a `Render` error, which callers
/// treat as "visualization unavailable" without dropping the rest of the
/// prediction result.
pub fn render_subgraph(subgraph: &ContextSubgraph) -> Result<Option<VisualDocument>, PredictError> {
    if subgraph.is_empty() {
        return Ok(None);
    }

    let view = presentation_view(subgraph);
    match build_html(&view) {
        Ok(html) => Ok(Some(VisualDocument {
            html,
            node_count: view.nodes.len(),
            edge_count: view.edges.len(),
        })),
        Err(err) => {
            error!("subgraph render failed: {err:#}");
            Err(PredictError::Render(format!("{err:#}")))
        }
    }
}

// The document goes through a named temp file so a partially written
// artifact never leaks; the handle removes the file on drop, on success and
// failure paths alike.
fn build_html(view: &PresentationView) -> Result<String> {
    #[derive(Serialize)]
    struct EdgeRow<'a> {
        from: &'a str,
        to: &'a str,
        label: &'a str,
    }

    let nodes_json = serde_json::to_string(&view.nodes).context("failed to serialize nodes")?;
    let edges: Vec<EdgeRow> = view
        .edges
        .iter()
        .map(|e| EdgeRow {
            from: &e.source,
            to: &e.target,
            label: &e.relation,
        })
        .collect();
    let edges_json = serde_json::to_string(&edges).context("failed to serialize edges")?;

    let html = HTML_TEMPLATE
        .replace("__NODES__", &nodes_json)
        .replace("__EDGES__", &edges_json);

    let mut tmp = NamedTempFile::new().context("failed to create temp document")?;
    tmp.write_all(html.as_bytes())
        .context("failed to write temp document")?;
    tmp.flush().context("failed to flush temp document")?;
    fs::read_to_string(tmp.path()).context("failed to read temp document back")
}

const HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Knowledge Graph Subgraph</title>
<script src="https://unpkg.com/vis-network/standalone/umd/vis-network.min.js"></script>
<style>#graph { width: 100%; height: 500px; border: 1px solid #ddd; }</style>
</head>
<body>
<div id="graph"></div>
<script>
  const nodes = new vis.DataSet(__NODES__);
  const edges = new vis.DataSet(__EDGES__);
  const container = document.getElementById("graph");
  new vis.Network(container, { nodes, edges }, { edges: { arrows: "to", font: { size: 10 } } });
</script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kg::Entity;

    fn stub_subgraph() -> ContextSubgraph {
        let mut perf = Entity::new("perf:g1", "Performance");
        perf.stats.insert("points".to_string(), 28.0);
        ContextSubgraph {
            nodes: vec![
                Entity::named("2544", "Player", "LeBron James"),
                Entity::new("opp:BOS", "Opponent_Team"),
                perf,
            ],
            edges: vec![ContextEdge {
                source: "2544".to_string(),
                target: "opp:BOS".to_string(),
                relation: "against".to_string(),
            }],
        }
    }

    #[test]
    fn style_table_matches_the_contract() {
        assert_eq!(style_for("Player").color, "blue");
        assert_eq!(style_for("Player").shape, "ellipse");
        assert_eq!(style_for("Team").shape, "box");
        assert_eq!(style_for("Game").color, "red");
        assert_eq!(style_for("Opponent_Team").color, "purple");
        assert_eq!(style_for("Home_Away").shape, "triangle");
        assert_eq!(style_for("Performance").shape, "star");
    }

    #[test]
    fn unknown_types_fall_back_to_defaults() {
        assert_eq!(style_for("Mascot"), DEFAULT_STYLE);
        assert_eq!(style_for(""), DEFAULT_STYLE);
    }

    #[test]
    fn empty_subgraph_renders_nothing() {
        let result = render_subgraph(&ContextSubgraph::default()).expect("empty is not an error");
        assert!(result.is_none());
    }

    #[test]
    fn labels_fall_back_to_ids() {
        let view = presentation_view(&stub_subgraph());
        assert_eq!(view.nodes[0].label, "LeBron James");
        assert_eq!(view.nodes[1].label, "opp:BOS");
    }

    #[test]
    fn rendering_leaves_the_subgraph_untouched() {
        let sub = stub_subgraph();
        let before = sub.clone();
        let _ = render_subgraph(&sub).expect("renders");
        assert_eq!(sub, before);
    }

    #[test]
    fn document_embeds_styled_nodes_and_edges() {
        let doc = render_subgraph(&stub_subgraph())
            .expect("renders")
            .expect("non-empty");
        assert_eq!(doc.node_count, 3);
        assert_eq!(doc.edge_count, 1);
        assert!(doc.html.contains("LeBron James"));
        assert!(doc.html.contains("\"color\":\"blue\""));
        assert!(doc.html.contains("\"shape\":\"ellipse\""));
        assert!(doc.html.contains("\"label\":\"against\""));
    }
}
