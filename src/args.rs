use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Increase verbosity. Default prints progress dots; `-v` prints each
    /// candidate program; `-vv` also dumps evaluation artifacts.
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build a distribution model from normalized type-registry files
    Extract(ExtractArgs),
    /// Generate a minimal value for an FQN, then walk its mutation space
    Explore(ExploreArgs),
    /// Re-evaluate saved value files against the built-in host
    Synth(SynthArgs),
    /// Print statistics about a distribution model
    Inspect(InspectArgs),
}

#[derive(Debug, Parser)]
pub struct ExtractArgs {
    /// Normalized type-registry JSON file(s). Later files win on FQN
    /// clashes.
    #[arg(required = true, value_name = "REGISTRY")]
    pub registries: Vec<PathBuf>,

    /// Output path for the distribution model JSON.
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: PathBuf,

    /// Root construct interface FQN recognized by the scope biaser.
    /// Can be provided multiple times.
    #[arg(long, value_name = "FQN")]
    pub root_interface: Vec<String>,

    /// Disable the stock biasing policies (scope/id shapes, arn hints).
    #[arg(long, default_value_t = false)]
    pub no_bias: bool,
}

#[derive(Debug, Parser)]
pub struct ExploreArgs {
    /// Target fully-qualified type name (e.g. `m.Stack`).
    #[arg(value_name = "FQN")]
    pub fqn: String,

    /// Distribution model produced by `extract`.
    #[arg(short = 'm', long, value_name = "FILE")]
    pub model: PathBuf,

    /// Evaluate each candidate and keep only successfully-evaluating
    /// variants for further exploration. Requires `--registry`.
    #[arg(short = 's', long, default_value_t = false)]
    pub synth: bool,

    /// Seed for deterministic replay.
    #[arg(short = 'S', long, default_value_t = 0)]
    pub seed: u64,

    /// Number of mutation steps to perform.
    #[arg(short = 'V', long, default_value_t = 8)]
    pub variants: usize,

    /// Candidates sampled per mutation step (reservoir size).
    #[arg(long, default_value_t = 4)]
    pub samples: usize,

    /// Write each surviving value as `<content-hash>.json` into this
    /// directory, plus an exploration report.
    #[arg(short = 'o', long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Type registry backing the built-in evaluation host (with `-s`).
    #[arg(long, value_name = "FILE")]
    pub registry: Option<PathBuf>,
}

#[derive(Debug, Parser)]
pub struct SynthArgs {
    /// Saved value JSON file(s) to re-evaluate.
    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Type registry backing the built-in evaluation host.
    #[arg(long, value_name = "FILE")]
    pub registry: PathBuf,
}

#[derive(Debug, Parser)]
pub struct InspectArgs {
    /// Distribution model to summarize.
    #[arg(short = 'm', long, value_name = "FILE")]
    pub model: PathBuf,
}
