//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Sync, build and publish a static site to a gh-pages branch
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Output directory path (relative to project root)
    #[arg(short, long, global = true, value_hint = clap::ValueHint::DirPath)]
    pub output: Option<PathBuf>,

    /// Config file path (default: deploy.toml)
    #[arg(short = 'C', long, global = true, default_value = "deploy.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands (default: build)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Sync the output checkout and run the site generator
    #[command(visible_alias = "b")]
    Build,

    /// Build, then commit the output and push it to the deploy branch
    #[command(visible_alias = "p")]
    Publish {
        #[command(flatten)]
        args: PublishArgs,
    },
}

/// Publish command arguments.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct PublishArgs {
    /// Force push (overwrites remote history)
    #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub force: Option<bool>,

    /// Commit and push even when the generator produced no changes
    #[arg(short, long)]
    pub allow_empty: bool,
}

impl Cli {
    /// Subcommand to run, `build` when none was given.
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Build)
    }
}
