//! pages-deploy - sync, build and publish a static site to a gh-pages branch.

mod cli;
mod config;
mod deploy;
mod logger;
mod utils;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::Config;
use deploy::{Deployer, Task};
use utils::exec::SystemExecutor;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = Config::load(&cli)?;

    let task = match cli.command() {
        Commands::Build => Task::Build,
        Commands::Publish { .. } => Task::Publish,
    };

    Deployer::new(&config, SystemExecutor).run(task)
}
