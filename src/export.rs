use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::pipeline::{self, PredictionOutcome};

pub struct ReportSummary {
    pub nodes: usize,
    pub relationships: usize,
}

/// Write a prediction report workbook: a summary sheet plus the context
/// nodes and relationships behind it.
pub fn export_prediction_report(path: &Path, outcome: &PredictionOutcome) -> Result<ReportSummary> {
    let mut workbook = Workbook::new();

    let summary_rows = vec![
        vec![
            "Generated".to_string(),
            Utc::now().format("%Y-%m-%d %H:%M UTC").to_string(),
        ],
        vec!["Season".to_string(), outcome.season.clone()],
        vec!["Player".to_string(), outcome.player_name.clone()],
        vec!["Team".to_string(), outcome.context.player_team.clone()],
        vec!["Opponent".to_string(), outcome.opponent.clone()],
        vec![
            "Prediction".to_string(),
            pipeline::format_points_line(&outcome.prediction),
        ],
        vec![
            "Threshold".to_string(),
            pipeline::format_threshold_line(&outcome.prediction),
        ],
        vec![
            "Explanation".to_string(),
            outcome
                .explanation
                .clone()
                .unwrap_or_else(|| "Unavailable".to_string()),
        ],
    ];
    let summary = workbook.add_worksheet();
    summary.set_name("Prediction").context("failed to name summary sheet")?;
    write_rows(summary, &summary_rows)?;

    let mut node_rows = vec![vec![
        "Id".to_string(),
        "Type".to_string(),
        "Label".to_string(),
    ]];
    for node in &outcome.subgraph.nodes {
        node_rows.push(vec![
            node.id.clone(),
            node.node_type.clone(),
            node.display_label().to_string(),
        ]);
    }
    let nodes = workbook.add_worksheet();
    nodes.set_name("Nodes").context("failed to name nodes sheet")?;
    write_rows(nodes, &node_rows)?;

    let mut edge_rows = vec![vec![
        "Source".to_string(),
        "Target".to_string(),
        "Relation".to_string(),
    ]];
    for edge in &outcome.context.relationships {
        edge_rows.push(vec![
            edge.source.clone(),
            edge.target.clone(),
            edge.relation.clone(),
        ]);
    }
    let edges = workbook.add_worksheet();
    edges
        .set_name("Relationships")
        .context("failed to name relationships sheet")?;
    write_rows(edges, &edge_rows)?;

    workbook
        .save(path)
        .with_context(|| format!("failed to save report to {}", path.display()))?;

    Ok(ReportSummary {
        nodes: outcome.subgraph.node_count(),
        relationships: outcome.context.relationships.len(),
    })
}

fn write_rows(sheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (r, row) in rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            sheet
                .write_string(r as u32, c as u16, cell.as_str())
                .context("failed to write report cell")?;
        }
    }
    Ok(())
}
