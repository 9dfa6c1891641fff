// src/cli/build.rs

use crate::builder::{self, CrossMap};
use crate::recipe::discovery;
use crate::system::System;
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Directory to discover recipes under.
    pub location: PathBuf,

    /// Recurse into subdirectories looking for more recipes.
    #[arg(long)]
    pub recursive: bool,

    /// Bound on recursion depth; negative means unbounded. Implies
    /// `--recursive` when set.
    #[arg(long)]
    pub recursive_depth: Option<i32>,

    /// Rebuild and overwrite even if the exact identity already exists.
    #[arg(long)]
    pub force: bool,

    #[arg(long = "cross-c")]
    pub cross_c: Option<String>,
    #[arg(long = "cross-cxx")]
    pub cross_cxx: Option<String>,
    #[arg(long = "cross-arch")]
    pub cross_arch: Option<String>,
    #[arg(long = "cross-os")]
    pub cross_os: Option<String>,
    #[arg(long)]
    pub single_thread: bool,
}

/// Returns the number of recipes that failed to build; this is the
/// process's exit code on return from `run`.
pub fn run(args: &BuildArgs, system: &mut System) -> usize {
    let depth = if let Some(d) = args.recursive_depth {
        d
    } else if args.recursive {
        -1
    } else {
        0
    };
    let recipes = discovery::discover(&args.location, depth);
    if recipes.is_empty() {
        tracing::warn!("no recipes found under {}", args.location.display());
        return 0;
    }
    let cross = CrossMap {
        c_compiler: args.cross_c.clone(),
        cxx_compiler: args.cross_cxx.clone(),
        cross_arch: args.cross_arch.clone(),
        cross_os: args.cross_os.clone(),
        single_thread: args.single_thread,
    };
    let scratch = system.temp_path.clone();
    builder::build_all(&recipes, system, &scratch, &cross, args.force)
}
