// src/main.rs

use clap::Parser;
use edm::cli::{self, Cli, Commands, FATAL_EXIT};
use edm::system::System;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli::verbosity_filter(cli.verbose))),
        )
        .init();

    let base = cli.base.clone().unwrap_or_else(cli::default_base);
    let mut system = match System::new(base) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("fatal: {e}");
            std::process::exit(FATAL_EXIT);
        }
    };

    match &cli.command {
        Commands::Build(args) => {
            let failures = cli::build::run(args, &mut system);
            std::process::exit(failures as i32);
        }
        Commands::Pack(args) => {
            cli::pack::run(args, &mut system)?;
        }
        Commands::Get(args) => {
            if let Err(e) = cli::get::run(args, &mut system) {
                tracing::error!("{e}");
                std::process::exit(cli::INVALID_ARGS_EXIT);
            }
        }
        Commands::Toolset(args) => {
            cli::toolset::run(args, &mut system)?;
        }
    }

    Ok(())
}
