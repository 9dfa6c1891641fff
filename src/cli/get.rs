// src/cli/get.rs

use crate::error::{Error, Result};
use crate::identity::Properties;
use crate::package_manager::PackageManager;
use crate::system::System;
use clap::Args;

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Query in `name` or `name/version` form.
    pub query: String,

    #[arg(long)]
    pub kind: Option<String>,
    #[arg(long)]
    pub os: Option<String>,
    #[arg(long)]
    pub arch: Option<String>,
    #[arg(long)]
    pub compiler: Option<String>,
    #[arg(long)]
    pub glibc: Option<String>,

    /// Remote to pull from when no local match exists; defaults to the
    /// configured default remote.
    #[arg(long)]
    pub remote: Option<String>,
}

impl GetArgs {
    fn to_properties(&self) -> Result<Properties> {
        let (name, version) = match self.query.split_once('/') {
            Some((n, v)) => (n.to_string(), v.to_string()),
            None if !self.query.is_empty() => (self.query.clone(), "*".to_string()),
            None => return Err(Error::validation("query must not be empty")),
        };
        Ok(Properties {
            name,
            version,
            os: self.os.clone().unwrap_or_else(|| "any".to_string()),
            arch: self.arch.clone().unwrap_or_else(|| "any".to_string()),
            kind: self.kind.clone().unwrap_or_else(|| "any".to_string()),
            compiler: self.compiler.clone().unwrap_or_else(|| "any".to_string()),
            glibc: self.glibc.clone().unwrap_or_default(),
            ..Properties::wildcard()
        })
    }
}

/// Prints the CMake config dir for the best local match (highest in the
/// total order). Falls back to a transparent pull from the named or
/// default remote when no local match exists.
pub fn run(args: &GetArgs, system: &mut System) -> Result<()> {
    let query = args.to_properties()?;

    let local = system.store.query(&query);
    if let Some(best) = local.last() {
        match &best.cmake_config_dir {
            Some(dir) => {
                println!("{dir}");
                return Ok(());
            }
            None => {
                return Err(Error::validation(format!(
                    "{} has no CMake config directory",
                    best.properties
                )))
            }
        }
    }

    let remote_hits = {
        let manager = PackageManager::new(system);
        manager.query(&query)
    };
    let best = remote_hits
        .last()
        .cloned()
        .ok_or_else(|| Error::validation(format!("no match for {query}")))?;

    let mut manager = PackageManager::new(system);
    let dest = manager.add_from_remote(&best, args.remote.as_deref())?;
    let dep = crate::dependency::Dependency::from_local_dir(&dest)?;
    match dep.cmake_config_dir {
        Some(dir) => {
            println!("{dir}");
            Ok(())
        }
        None => Err(Error::validation(format!("{} has no CMake config directory", dep.properties))),
    }
}
