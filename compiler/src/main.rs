use clap::Parser;
use log::info;
use std::path::{Path, PathBuf};

use tirc::diag::Diagnostic;
use tirc::lower::LowerOptions;
use tirc::pipeline::{compile, compute_provenance, CompileOptions};

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum EmitStage {
    /// Graph listing
    Ir,
    /// Graphviz DOT
    Dot,
    /// Graph as JSON
    Json,
    /// Lowered backend program
    Program,
    /// Per-annotation statistics on zero inputs
    Summary,
    /// Provenance JSON
    BuildInfo,
}

#[derive(Parser, Debug)]
#[command(
    name = "tirc",
    version,
    about = "Tensor IR compiler — lowers annotated .tir graphs to a backend program"
)]
struct Cli {
    /// Input .tir source file
    source: PathBuf,

    /// Output file path (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output stage
    #[arg(long, value_enum, default_value_t = EmitStage::Program)]
    emit: EmitStage,

    /// Lower without recording annotations
    #[arg(long)]
    strip_annotations: bool,

    /// Log compiler phases
    #[arg(long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();

    info!("source = {}", cli.source.display());
    info!("emit   = {:?}", cli.emit);

    let source = match std::fs::read_to_string(&cli.source) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("tirc: error: {}: {}", cli.source.display(), e);
            std::process::exit(2);
        }
    };

    let options = CompileOptions {
        lower: LowerOptions {
            strip_annotations: cli.strip_annotations,
        },
    };
    let result = compile(&source, &options);
    for diag in &result.diagnostics {
        eprintln!("{}", render(&cli.source, &source, diag));
    }
    if result.has_errors() {
        std::process::exit(1);
    }

    let (Some(graph), Some(program)) = (result.graph, result.program) else {
        eprintln!("tirc: error: compilation produced no program");
        std::process::exit(1);
    };

    let text = match cli.emit {
        EmitStage::Ir => graph.to_string(),
        EmitStage::Dot => tirc::dot::emit_dot(&graph),
        EmitStage::Json => match serde_json::to_string_pretty(&graph) {
            Ok(s) => s + "\n",
            Err(e) => fail(&e),
        },
        EmitStage::Program => program.to_string(),
        EmitStage::Summary => match tirc::stats::summarize(&program) {
            Ok(summary) => summary.to_string(),
            Err(e) => fail(&e),
        },
        EmitStage::BuildInfo => match compute_provenance(&source, &graph).and_then(|p| p.to_json())
        {
            Ok(s) => s + "\n",
            Err(e) => fail(&e),
        },
    };

    match &cli.output {
        Some(path) => {
            if let Err(e) = std::fs::write(path, &text) {
                eprintln!("tirc: error: {}: {}", path.display(), e);
                std::process::exit(2);
            }
            info!("wrote {}", path.display());
        }
        None => print!("{text}"),
    }
}

fn fail(e: &dyn std::fmt::Display) -> ! {
    eprintln!("tirc: error: {e}");
    std::process::exit(1);
}

/// `path:line:col: <diagnostic>` with 1-based line and column.
fn render(path: &Path, source: &str, diag: &Diagnostic) -> String {
    let offset = diag.span.start.min(source.len());
    let before = &source[..offset];
    let line = before.matches('\n').count() + 1;
    let col = before
        .rfind('\n')
        .map_or(before.chars().count(), |nl| before[nl + 1..].chars().count())
        + 1;
    format!("{}:{}:{}: {}", path.display(), line, col, diag)
}
