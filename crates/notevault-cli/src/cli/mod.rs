//! # CLI Layer
//!
//! The only place that knows about arguments, stdout and exit codes. Every
//! subcommand opens the vault through [`notevault::init::open`], calls one
//! handler and prints what it returns.
//!
//! Library diagnostics arrive through the `log` facade; [`run`] installs
//! `env_logger` with a filter chosen by `-v` (`RUST_LOG` still wins).

mod handlers;
mod render;
mod setup;

use anyhow::{Context, Result};
use clap::Parser;
use notevault::init;

use setup::{Cli, Commands};

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(setup::log_filter(cli.verbose)),
    )
    .init();

    let ctx = init::open(cli.data.clone()).context("opening vault")?;
    log::debug!("Using data directory {}", ctx.data_dir.display());
    let vault = &ctx.vault;

    let output = match cli.command {
        Commands::Info { json } => handlers::info(vault, json)?,
        Commands::List { json } => handlers::list(vault, json)?,
        Commands::Add {
            title,
            content,
            tags,
            category,
        } => handlers::add(vault, title, content, tags, category)?,
        Commands::Delete { id } => handlers::delete(vault, &id)?,
        Commands::Backups => handlers::backups(vault)?,
        Commands::Restore => handlers::restore(vault)?,
        Commands::Prune { keep } => handlers::prune(vault, keep)?,
        Commands::Clear { yes } => handlers::clear(vault, yes)?,
    };
    print!("{}", output);
    Ok(())
}
