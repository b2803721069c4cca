use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use hoops_terminal::export;
use hoops_terminal::pipeline;

// Headless single prediction: `oneshot <player> <opponent> [season]
// [--html <path>] [--report <path>]`. Prints the same display strings the
// TUI shows.
fn main() -> ExitCode {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();

    let mut args = std::env::args().skip(1);
    let Some(player) = args.next() else {
        return usage();
    };
    let Some(opponent) = args.next() else {
        return usage();
    };
    let mut season = "2023-24".to_string();
    let mut html_path: Option<PathBuf> = None;
    let mut report_path: Option<PathBuf> = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--html" => html_path = args.next().map(PathBuf::from),
            "--report" => report_path = args.next().map(PathBuf::from),
            other => season = other.to_string(),
        }
    }

    let outcome = match pipeline::run_prediction(&player, &opponent, &season) {
        Ok(outcome) => outcome,
        Err(err) => {
            eprintln!("{}", err.user_message());
            return ExitCode::FAILURE;
        }
    };

    println!("{} vs {} ({season})", outcome.player_name, outcome.opponent);
    println!("{}", pipeline::format_points_line(&outcome.prediction));
    println!("{}", pipeline::format_threshold_line(&outcome.prediction));
    println!();
    match &outcome.explanation {
        Some(text) => println!("{text}"),
        None => println!("Explanation unavailable."),
    }
    println!();
    match (&outcome.visual, &outcome.render_note) {
        (Some(doc), _) => println!(
            "Subgraph: {} nodes, {} edges",
            doc.node_count, doc.edge_count
        ),
        (None, Some(note)) => println!("{note}"),
        (None, None) => println!("No subgraph available to display."),
    }

    if let (Some(path), Some(doc)) = (&html_path, &outcome.visual) {
        match fs::write(path, &doc.html) {
            Ok(()) => println!("Graph written to {}", path.display()),
            Err(err) => eprintln!("Could not write graph to {}: {err}", path.display()),
        }
    }
    if let Some(path) = &report_path {
        match export::export_prediction_report(path, &outcome) {
            Ok(summary) => println!(
                "Report written to {} ({} nodes, {} relationships)",
                path.display(),
                summary.nodes,
                summary.relationships
            ),
            Err(err) => eprintln!("Report export failed: {err:#}"),
        }
    }

    ExitCode::SUCCESS
}

fn usage() -> ExitCode {
    eprintln!("usage: oneshot <player> <opponent> [season] [--html <path>] [--report <path>]");
    ExitCode::from(2)
}
