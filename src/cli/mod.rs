// src/cli/mod.rs

//! The `edm` command surface: `build`, `pack`, `get`, `toolset`.

pub mod build;
pub mod get;
pub mod pack;
pub mod toolset;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Fatal setup error exit code (config/lock failures before any command
/// logic runs); `-666` per the design notes, wrapped to the platform's
/// signed exit range.
pub const FATAL_EXIT: i32 = -666;
/// Invalid query arguments to `get`.
pub const INVALID_ARGS_EXIT: i32 = 22;

#[derive(Parser, Debug)]
#[command(name = "edm", about = "Content-addressed dependency manager for prebuilt native libraries")]
pub struct Cli {
    /// Increase verbosity; repeatable (-v, -vv, -vvv).
    #[arg(short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Override the base directory (default: `$HOME/.edm`).
    #[arg(long, global = true)]
    pub base: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build one or more recipes found at `location`.
    Build(build::BuildArgs),
    /// Inspect or move packages between the local store and remotes.
    Pack(pack::PackArgs),
    /// Resolve a query to a local CMake config dir, pulling if necessary.
    Get(get::GetArgs),
    /// Manage compiler toolsets.
    Toolset(toolset::ToolsetArgs),
}

pub fn default_base() -> PathBuf {
    dirs_home().join(".edm")
}

fn dirs_home() -> PathBuf {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Map a verbosity count to a `tracing` filter directive: the default (no
/// `-v`) is `info`, each repetition steps down to `debug` then `trace`.
pub fn verbosity_filter(count: u8) -> &'static str {
    match count {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}
