use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use hoops_terminal::features::prepare_input;
use hoops_terminal::kg::{build_knowledge_graph, extract_context_subgraph, opponent_node_id};
use hoops_terminal::render::render_subgraph;
use hoops_terminal::sample_data::seed_dataset;

fn bench_build_knowledge_graph(c: &mut Criterion) {
    let dataset = seed_dataset("2023-24");
    c.bench_function("build_knowledge_graph", |b| {
        b.iter(|| {
            let kg = build_knowledge_graph(black_box(&dataset));
            black_box(kg.entity_count());
        })
    });
}

fn bench_extract_subgraph(c: &mut Criterion) {
    let dataset = seed_dataset("2023-24");
    let kg = build_knowledge_graph(&dataset);
    let opponent = opponent_node_id("BOS");
    c.bench_function("extract_context_subgraph", |b| {
        b.iter(|| {
            let sub = extract_context_subgraph(black_box(&kg), "2544", &opponent, 5);
            black_box(sub.node_count());
        })
    });
}

fn bench_render_subgraph(c: &mut Criterion) {
    let dataset = seed_dataset("2023-24");
    let kg = build_knowledge_graph(&dataset);
    let sub = extract_context_subgraph(&kg, "2544", &opponent_node_id("BOS"), 5);
    c.bench_function("render_subgraph", |b| {
        b.iter(|| {
            let doc = render_subgraph(black_box(&sub)).expect("renders");
            black_box(doc.map(|d| d.html.len()));
        })
    });
}

fn bench_prepare_input(c: &mut Criterion) {
    let dataset = seed_dataset("2023-24");
    let player = dataset
        .players
        .iter()
        .find(|p| p.id == "2544")
        .expect("sample roster has LeBron");
    c.bench_function("prepare_input", |b| {
        b.iter(|| {
            let input = prepare_input(black_box(player), "BOS", &dataset).expect("builds");
            black_box(input.values[0]);
        })
    });
}

criterion_group!(
    perf,
    bench_build_knowledge_graph,
    bench_extract_subgraph,
    bench_render_subgraph,
    bench_prepare_input
);
criterion_main!(perf);
