//! CLI argument definitions

use callscope_core::DEFAULT_OUTDIR;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "callscope")]
#[command(
    author,
    version,
    about = "Explain a symbol in a Python repository by following its calls"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "cli")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (defaults to the user config directory)
    #[arg(long, global = true, env = "CALLSCOPE_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Explore a symbol and write an explanation
    Explain(ExplainArgs),

    /// Index a repository and report statistics
    Index(IndexArgs),

    /// Resolve a reference to a declaration
    Resolve(ResolveArgs),

    /// Search for literal occurrences of a name
    Usages(UsagesArgs),
}

#[derive(Args)]
pub struct RepoArgs {
    /// Repository root
    #[arg(long, default_value = ".")]
    pub repo: PathBuf,

    /// Additional source roots (vendored code); the repository wins collisions
    #[arg(long = "extra-path")]
    pub extra_paths: Vec<PathBuf>,
}

#[derive(Args)]
pub struct ExplainArgs {
    #[command(flatten)]
    pub repo: RepoArgs,

    /// Qualified or partial name of the symbol to explain
    #[arg(long)]
    pub target: String,

    /// File whose imports disambiguate the target
    #[arg(long)]
    pub hint_file: Option<String>,

    /// Where blackboard.json and final_explanation.md are written
    #[arg(long, default_value = DEFAULT_OUTDIR)]
    pub outdir: PathBuf,

    /// Maximum planning rounds
    #[arg(long)]
    pub max_iters: Option<usize>,

    /// Extra guidance for the planner and synthesizer
    #[arg(long)]
    pub prompt: Option<String>,

    /// Planner model (defaults to the configured model)
    #[arg(long)]
    pub planner_model: Option<String>,

    /// Synthesizer model (defaults to the configured model)
    #[arg(long)]
    pub synth_model: Option<String>,

    /// Run without an oracle; the explanation is built from raw evidence
    #[arg(long)]
    pub offline: bool,
}

#[derive(Args)]
pub struct IndexArgs {
    #[command(flatten)]
    pub repo: RepoArgs,

    /// List every indexed symbol
    #[arg(long)]
    pub symbols: bool,
}

#[derive(Args)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub repo: RepoArgs,

    /// Reference to resolve, e.g. `helpers.normalize`
    pub query: String,

    /// File whose imports are used as context
    #[arg(long)]
    pub context: Option<String>,

    /// Print the declaration source and its calls
    #[arg(long)]
    pub open: bool,
}

#[derive(Args)]
pub struct UsagesArgs {
    #[command(flatten)]
    pub repo: RepoArgs,

    /// Text to search for
    pub needle: String,

    /// Maximum hits
    #[arg(short = 'n', default_value = "30")]
    pub limit: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Cli,
    Json,
}
