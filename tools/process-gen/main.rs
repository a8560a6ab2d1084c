use clap::Parser;
use procgraph::prelude::*;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use std::fs;

/// A CLI tool to generate random, well-formed process files
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// The path to write the generated JSON file to
    #[arg(short, long, default_value = "generated_process.json")]
    output: String,

    /// Number of random edits to attempt
    #[arg(short, long, default_value_t = 40)]
    edits: usize,

    /// Seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,

    /// Shape limit of the generated process
    #[arg(long, default_value_t = 100)]
    limit: usize,
}

#[derive(Debug, Clone, Copy)]
enum EditKind {
    InsertTask,
    InsertUserDecision,
    InsertSystemDecision,
    AddCondition,
    DeleteTask,
    DeleteDecision,
    DeleteBranch,
}

const EDITS: [EditKind; 7] = [
    EditKind::InsertTask,
    EditKind::InsertUserDecision,
    EditKind::InsertSystemDecision,
    EditKind::AddCondition,
    EditKind::DeleteTask,
    EditKind::DeleteDecision,
    EditKind::DeleteBranch,
];

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let config = EditorConfig::default().with_shape_limit(cli.limit);
    config.validate()?;
    let editor = ProcessEditor::builder(config.clone())
        .with_messages(std::sync::Arc::new(Quiet))
        .build();
    let mut graph = ShapeFactory::new(1, &config).new_process(1);

    println!("Generating a process with {} random edits...", cli.edits);
    let mut applied = 0;
    for _ in 0..cli.edits {
        let Some(kind) = EDITS.choose(&mut rng).copied() else {
            break;
        };
        match apply_random_edit(&editor, &mut graph, kind, &mut rng) {
            Some(Ok(())) => applied += 1,
            Some(Err(e)) if e.is_rejection() => {}
            Some(Err(e)) => return Err(format!("{:?} failed: {}", kind, e).into()),
            None => {}
        }
    }

    let problems = validate_process(&graph, &config);
    if let Some(problem) = problems.first() {
        return Err(format!("generated process is invalid: {}", problem).into());
    }

    fs::write(&cli.output, graph.to_json()?)?;
    println!(
        "-> Applied {} edit(s), {} shapes. Saved to '{}'",
        applied,
        graph.shape_count(),
        cli.output
    );
    Ok(())
}

/// Drops editor messages; rejections are expected here.
struct Quiet;

impl MessageSink for Quiet {
    fn add_error(&self, _message: &str) {}
    fn add_warning(&self, _message: &str) {}
}

/// Applies one edit of `kind` at a random valid spot. `None` when there is no such spot.
fn apply_random_edit(
    editor: &ProcessEditor,
    graph: &mut ProcessGraph,
    kind: EditKind,
    rng: &mut StdRng,
) -> Option<std::result::Result<(), EditError>> {
    let result = match kind {
        EditKind::InsertTask => {
            let link = random_link(graph, rng, |source, destination| {
                !matches!(source, ShapeKind::UserTask | ShapeKind::Start)
                    && matches!(
                        destination,
                        ShapeKind::UserTask | ShapeKind::UserDecision | ShapeKind::End
                    )
            })?;
            editor
                .insert_task(graph, &[link.source_id], link.destination_id)
                .map(drop)
        }
        EditKind::InsertUserDecision => {
            let link = random_link(graph, rng, |source, destination| {
                matches!(source, ShapeKind::Precondition | ShapeKind::SystemTask)
                    && matches!(destination, ShapeKind::UserTask | ShapeKind::End)
            })?;
            editor.insert_user_decision(graph, &link).map(drop)
        }
        EditKind::InsertSystemDecision => {
            let link = random_link(graph, rng, |source, destination| {
                matches!(source, ShapeKind::UserTask | ShapeKind::SystemDecision)
                    && matches!(destination, ShapeKind::SystemTask | ShapeKind::SystemDecision)
            })?;
            editor.insert_system_decision(graph, &link).map(drop)
        }
        EditKind::AddCondition => {
            let decision_id = random_decision(graph, rng)?;
            let merge_id = graph.branch_destination(decision_id, 1)?;
            let label = rng
                .random_bool(0.5)
                .then(|| format!("Case {}", rng.random_range(1..100)));
            editor
                .insert_decision_condition(graph, decision_id, label, merge_id)
                .map(drop)
        }
        EditKind::DeleteTask => {
            let task_id = *graph.ids_of_kind(ShapeKind::UserTask).choose(rng)?;
            editor.delete_user_task(graph, task_id)
        }
        EditKind::DeleteDecision => {
            let decision_id = random_decision(graph, rng)?;
            editor.delete_decision(graph, decision_id)
        }
        EditKind::DeleteBranch => {
            let decision_id = random_decision(graph, rng)?;
            let branches: Vec<Link> = graph
                .outgoing(decision_id)
                .into_iter()
                .filter(|link| !link.is_default())
                .cloned()
                .collect();
            let link = branches.choose(rng)?.clone();
            editor.delete_decision_branch(graph, &link)
        }
    };
    Some(result)
}

fn random_link(
    graph: &ProcessGraph,
    rng: &mut StdRng,
    accept: impl Fn(ShapeKind, ShapeKind) -> bool,
) -> Option<Link> {
    let candidates: Vec<&Link> = graph
        .links()
        .iter()
        .filter(|link| {
            match (graph.kind_of(link.source_id), graph.kind_of(link.destination_id)) {
                (Some(source), Some(destination)) => accept(source, destination),
                _ => false,
            }
        })
        .collect();
    candidates.choose(rng).map(|link| (*link).clone())
}

fn random_decision(graph: &ProcessGraph, rng: &mut StdRng) -> Option<ShapeId> {
    let decisions: Vec<ShapeId> = graph
        .shapes()
        .filter(|shape| shape.kind.is_decision())
        .map(|shape| shape.id)
        .collect();
    decisions.choose(rng).copied()
}
