//! CLI entry point for fabrica.

mod cmd;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use clap_complete::{generate, Shell};
use std::io;

use fabrica::cli::{Cli, Commands};
use fabrica::config::Config;
use fabrica::logging::{self, Verbosity};
use fabrica::ui;

fn main() -> Result<()> {
    // Deep expression chains recurse; Windows only gives the main thread 1MB.
    const STACK_SIZE: usize = 8 * 1024 * 1024; // 8 MB

    let thread = std::thread::Builder::new()
        .stack_size(STACK_SIZE)
        .spawn(run)
        .context("failed to spawn main thread")?;

    match thread.join() {
        Ok(result) => result,
        Err(payload) => std::panic::resume_unwind(payload),
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    if cli.quiet {
        std::env::set_var("FABRICA_QUIET", "1");
    }
    if !ui::stdout_is_tty() {
        colored::control::set_override(false);
    }

    // These never read the project configuration.
    match cli.command {
        Commands::Version => return cmd_version(cli.verbose),
        Commands::Completion { shell } => return cmd_completion(shell),
        _ => {}
    }

    let config = Config::load()?;
    logging::init(Verbosity::from_flags(cli.quiet, cli.verbose), &config.logging.level);
    if !config.project.name.is_empty() {
        log::debug!("Project: {}", config.project.name);
    }

    match cli.command {
        Commands::Compute {
            definitions,
            data,
            json,
            parallel,
            workers,
            trace,
            features,
        } => cmd::compute::cmd_compute(
            &config,
            cmd::compute::ComputeOptions {
                definitions,
                data,
                json,
                parallel,
                workers,
                trace,
                features,
            },
        ),
        Commands::Graph {
            definitions,
            format,
            detail,
            output,
        } => cmd::graph::cmd_graph(&config, &definitions, format, detail, output),
        Commands::Validate { definitions, strict } => cmd::validate::cmd_validate(&config, &definitions, strict),
        Commands::List {
            definitions,
            group,
            files,
        } => cmd::list::cmd_list(&config, &definitions, group.as_deref(), files),
        Commands::Transforms => cmd::transforms::cmd_transforms(),
        Commands::Version | Commands::Completion { .. } => Ok(()),
    }
}

fn cmd_completion(shell: Shell) -> Result<()> {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "fabrica", &mut io::stdout());
    Ok(())
}

fn cmd_version(verbose: bool) -> Result<()> {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    println!("fabrica {}", VERSION);

    if verbose {
        const GIT_SHA: &str = env!("GIT_SHA");
        const BUILD_DATE: &str = env!("BUILD_DATE");
        println!("commit: {}", GIT_SHA);
        println!("built: {}", BUILD_DATE);
    }

    Ok(())
}
