use clap::{Parser, Subcommand};
use procgraph::collab::MemoryClipboard;
use procgraph::prelude::*;
use std::fs;
use std::sync::Arc;
use std::time::Instant;

/// Inspect and edit process flowgraph files
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to an editor configuration JSON file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Where to write the edited process (defaults to stdout)
    #[arg(short, long, global = true)]
    output: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check a process file against the editor invariants
    Validate { process: String },
    /// Print the scope of a shape
    Scope { process: String, id: ShapeId },
    /// Print the scope of one decision branch
    BranchScope {
        process: String,
        decision: ShapeId,
        order: i32,
    },
    /// Insert a user task pair on the link(s) into DESTINATION
    InsertTask {
        process: String,
        destination: ShapeId,
        #[arg(required = true)]
        sources: Vec<ShapeId>,
    },
    /// Insert a decision on the link SOURCE -> DESTINATION
    InsertDecision {
        process: String,
        source: ShapeId,
        destination: ShapeId,
        /// Insert a system decision instead of a user decision
        #[arg(long)]
        system: bool,
    },
    /// Append a branch to a decision
    AddCondition {
        process: String,
        decision: ShapeId,
        merge: ShapeId,
        #[arg(long)]
        label: Option<String>,
    },
    /// Delete a user task and its system shapes
    DeleteTask { process: String, id: ShapeId },
    /// Delete a decision and its non-default branches
    DeleteDecision { process: String, id: ShapeId },
    /// Delete one non-default decision branch
    DeleteBranch {
        process: String,
        decision: ShapeId,
        order: i32,
    },
    /// Copy shapes into a clipboard file
    Copy {
        process: String,
        #[arg(required = true)]
        ids: Vec<ShapeId>,
    },
    /// Paste a clipboard file on the link(s) into DESTINATION
    Paste {
        process: String,
        clipboard: String,
        destination: ShapeId,
        #[arg(required = true)]
        sources: Vec<ShapeId>,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EditorConfig::from_file(path).unwrap_or_else(|e| {
            exit_with_error(&format!("Failed to load config '{}': {}", path, e))
        }),
        None => EditorConfig::default(),
    };

    let start = Instant::now();
    run(&cli, config);
    log::info!("finished in {:?}", start.elapsed());
}

fn run(cli: &Cli, config: EditorConfig) {
    let clipboard = Arc::new(MemoryClipboard::new());
    let editor = ProcessEditor::builder(config.clone())
        .with_clipboard(clipboard.clone())
        .build();

    match &cli.command {
        Command::Validate { process } => {
            let graph = load_process(process);
            let problems = validate_process(&graph, &config);
            if problems.is_empty() {
                println!("'{}' is valid ({} shapes)", process, graph.shape_count());
                return;
            }
            for problem in &problems {
                println!("  -> {}", problem);
            }
            exit_with_error(&format!("{} problem(s) found", problems.len()));
        }
        Command::Scope { process, id } => {
            let graph = load_process(process);
            print_scope(&get_scope(&graph, *id));
        }
        Command::BranchScope {
            process,
            decision,
            order,
        } => {
            let graph = load_process(process);
            let link = graph
                .branch_link(*decision, *order)
                .unwrap_or_else(|| {
                    exit_with_error(&format!("Decision {} has no branch {}", decision, order))
                })
                .clone();
            print_scope(&get_branch_scope(&graph, &link));
        }
        Command::InsertTask {
            process,
            destination,
            sources,
        } => edit(cli, process, |graph| {
            editor.insert_task(graph, sources, *destination).map(drop)
        }),
        Command::InsertDecision {
            process,
            source,
            destination,
            system,
        } => edit(cli, process, |graph| {
            let edge = find_link(graph, *source, *destination)?;
            if *system {
                editor.insert_system_decision(graph, &edge).map(drop)
            } else {
                editor.insert_user_decision(graph, &edge).map(drop)
            }
        }),
        Command::AddCondition {
            process,
            decision,
            merge,
            label,
        } => edit(cli, process, |graph| {
            editor
                .insert_decision_condition(graph, *decision, label.clone(), *merge)
                .map(drop)
        }),
        Command::DeleteTask { process, id } => {
            edit(cli, process, |graph| editor.delete_user_task(graph, *id))
        }
        Command::DeleteDecision { process, id } => {
            edit(cli, process, |graph| editor.delete_decision(graph, *id))
        }
        Command::DeleteBranch {
            process,
            decision,
            order,
        } => edit(cli, process, |graph| {
            let link = graph
                .branch_link(*decision, *order)
                .cloned()
                .ok_or(EditError::LinkNotFound {
                    source_id: *decision,
                    destination_id: *decision,
                })?;
            editor.delete_decision_branch(graph, &link)
        }),
        Command::Copy { process, ids } => {
            let graph = load_process(process);
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .unwrap_or_else(|e| exit_with_error(&format!("Failed to start runtime: {}", e)));
            let data = runtime
                .block_on(editor.copy(&graph, ids))
                .unwrap_or_else(|e| exit_with_error(&format!("Copy failed: {}", e)));
            let json = data
                .to_json()
                .unwrap_or_else(|e| exit_with_error(&format!("Failed to encode clipboard: {}", e)));
            write_output(cli, &json);
        }
        Command::Paste {
            process,
            clipboard: clipboard_path,
            destination,
            sources,
        } => {
            let json = fs::read_to_string(clipboard_path).unwrap_or_else(|e| {
                exit_with_error(&format!("Failed to read '{}': {}", clipboard_path, e))
            });
            let data = ProcessClipboardData::from_json(&json)
                .unwrap_or_else(|e| exit_with_error(&format!("Invalid clipboard file: {}", e)));
            clipboard.set_data(data);
            edit(cli, process, |graph| {
                editor.paste(graph, sources, *destination).map(drop)
            });
        }
    }
}

/// Loads a process, applies one edit and writes the result.
fn edit(
    cli: &Cli,
    path: &str,
    operation: impl FnOnce(&mut ProcessGraph) -> std::result::Result<(), EditError>,
) {
    let mut graph = load_process(path);
    let before = graph.shape_count();
    operation(&mut graph).unwrap_or_else(|e| exit_with_error(&format!("Edit failed: {}", e)));
    log::info!("shape count {} -> {}", before, graph.shape_count());

    let json = graph
        .to_json()
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to encode process: {}", e)));
    write_output(cli, &json);
}

fn find_link(graph: &ProcessGraph, source: ShapeId, destination: ShapeId) -> std::result::Result<Link, EditError> {
    graph
        .outgoing(source)
        .into_iter()
        .find(|link| link.destination_id == destination)
        .cloned()
        .ok_or(EditError::LinkNotFound {
            source_id: source,
            destination_id: destination,
        })
}

fn load_process(path: &str) -> ProcessGraph {
    ProcessGraph::from_file(path)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to load process '{}': {}", path, e)))
}

fn print_scope(scope: &ScopeContext) {
    println!("Scope of {} (previous {:?})", scope.id, scope.previous_id);
    println!("  Shapes: {:?}", scope.shape_ids());
    if !scope.merge_ids.is_empty() {
        println!("  Merge points: {:?}", scope.merge_ids);
    }
    for mapping in &scope.mappings {
        println!(
            "  Branch {}: end {:?}, target {:?}{}",
            mapping.key(),
            mapping.end_id,
            mapping.target_id,
            if mapping.is_infinite_loop { " (loop)" } else { "" }
        );
    }
}

fn write_output(cli: &Cli, content: &str) {
    match &cli.output {
        Some(path) => {
            fs::write(path, content)
                .unwrap_or_else(|e| exit_with_error(&format!("Failed to write '{}': {}", path, e)));
            println!("Wrote '{}'", path);
        }
        None => println!("{}", content),
    }
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
