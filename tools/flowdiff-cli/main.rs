use clap::{Parser, ValueEnum};
use flowdiff::prelude::*;
use itertools::Itertools;
use std::fs;
use std::time::Instant;
use tracing::info;

/// How every pending change should be resolved.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ResolveCli {
    /// Fold every change into the before flow.
    Accept,
    /// Revert every change in the after flow.
    Reject,
}

/// Structural diff and merge of two workflow definitions
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the before (snapshot) flow JSON file
    before_path: String,
    /// Path to the after (current) flow JSON file
    after_path: String,

    /// Report removals as `shadowed` instead of `removed`
    #[arg(long)]
    shadowed: bool,

    /// Mark every change as pending review
    #[arg(long)]
    pending: bool,

    /// Print the display-adjusted actions as JSON instead of a tree
    #[arg(long)]
    json: bool,

    /// Resolve every change and emit the resulting flow
    #[arg(short, long, value_enum)]
    resolve: Option<ResolveCli>,

    /// Where to write the resolved flow; printed to stdout when omitted
    #[arg(short, long)]
    output: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flowdiff=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let before = load_flow(&cli.before_path);
    let after = load_flow(&cli.after_path);

    let diff_start = Instant::now();
    let mut session = DiffSession::builder()
        .edit_mode(cli.pending || cli.resolve.is_some())
        .mark_removed_as_shadowed(cli.shadowed)
        .auto_clear(false)
        .build();
    session
        .set_before_flow(before)
        .unwrap_or_else(|e| exit_with_error(&format!("Before flow rejected: {}", e)));
    session
        .set_current_flow(after)
        .unwrap_or_else(|e| exit_with_error(&format!("After flow rejected: {}", e)));
    info!(elapsed = ?diff_start.elapsed(), "Diff computed");

    if cli.json {
        let actions = serde_json::to_string_pretty(session.module_actions())
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to encode actions: {}", e)));
        println!("{}", actions);
    } else {
        print_review(&session);
    }

    if let Some(resolve) = cli.resolve {
        resolve_all(session, resolve, cli.output.as_deref());
    }
}

fn load_flow(path: &str) -> FlowValue {
    let json = fs::read_to_string(path)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to read flow file '{}': {}", path, e)));
    FlowValue::from_json(&json)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to load '{}': {}", path, e)))
}

fn print_review(session: &DiffSession) {
    let Some(merged) = session.merged_flow() else {
        println!("Nothing to compare.");
        return;
    };
    let actions = session.module_actions();

    println!("{}", DisplayFlow::new(merged).with_actions(actions));

    if actions.is_empty() {
        println!("No changes.");
        return;
    }

    let counts = actions.values().counts_by(|info| info.action);
    println!("--- Change Summary ---");
    for action in [
        ModuleAction::Added,
        ModuleAction::Modified,
        ModuleAction::Removed,
        ModuleAction::Shadowed,
    ] {
        if let Some(count) = counts.get(&action) {
            println!("{:<10} {}", action.to_string(), count);
        }
    }
    println!("Pending:   {}", session.has_pending_changes());
}

fn resolve_all(mut session: DiffSession, resolve: ResolveCli, output: Option<&str>) {
    let start = Instant::now();
    let outcome = match resolve {
        ResolveCli::Accept => session.accept_all(),
        ResolveCli::Reject => session.reject_all(),
    }
    .unwrap_or_else(|e| exit_with_error(&format!("Resolution failed: {}", e)));

    info!(?outcome, elapsed = ?start.elapsed(), "Resolved all changes");
    if session.has_pending_changes() {
        eprintln!(
            "Warning: {} change(s) could not be resolved",
            session.module_actions().len()
        );
    }

    let resolved = match resolve {
        ResolveCli::Accept => session.before_flow().cloned(),
        ResolveCli::Reject => session.into_current_flow(),
    }
    .unwrap_or_else(|| exit_with_error("Session no longer holds a flow"));

    let json = resolved
        .to_json_pretty()
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to encode flow: {}", e)));
    match output {
        Some(path) => {
            fs::write(path, json)
                .unwrap_or_else(|e| exit_with_error(&format!("Failed to write '{}': {}", path, e)));
            println!("Resolved flow written to '{}'", path);
        }
        None => println!("{}", json),
    }
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
