// src/cli/pack.rs

use crate::dependency::Dependency;
use crate::error::{Error, Result};
use crate::identity::Properties;
use crate::package_manager::PackageManager;
use crate::system::System;
use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct PackArgs {
    #[command(subcommand)]
    pub action: PackAction,
}

#[derive(Subcommand, Debug)]
pub enum PackAction {
    /// Pull a matching package from a remote into the local store.
    Pull(Selectors),
    /// Pack a local match and push it to a remote.
    Push(Selectors),
    /// Import an already-built package tree or archive into the local store.
    Add(AddArgs),
    /// Remove matching packages from the local store.
    Rm(Selectors),
    /// List matching packages, local and remote.
    Ls(Selectors),
    /// Prune superseded versions from the local store, keeping the newest.
    Clean(Selectors),
}

#[derive(Args, Debug, Clone, Default)]
pub struct Selectors {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub version: Option<String>,
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

    /// Explicit remote by name.
    #[arg(long)]
    pub remote: Option<String>,
    /// Use the configured default remote.
    #[arg(long)]
    pub default: bool,

    /// Overwrite an existing match instead of refusing (push only).
    #[arg(long)]
    pub force: bool,
    /// Recurse into transitive dependencies (clean only).
    #[arg(long)]
    pub recurse: bool,
    /// Print the full identity string rather than name/version (ls only).
    #[arg(long)]
    pub full: bool,
}

impl Selectors {
    fn to_properties(&self) -> Properties {
        Properties {
            name: self.name.clone().unwrap_or_else(|| "*".to_string()),
            version: self.version.clone().unwrap_or_else(|| "*".to_string()),
            os: self.os.clone().unwrap_or_else(|| "any".to_string()),
            arch: self.arch.clone().unwrap_or_else(|| "any".to_string()),
            kind: self.kind.clone().unwrap_or_else(|| "any".to_string()),
            compiler: self.compiler.clone().unwrap_or_else(|| "any".to_string()),
            glibc: self.glibc.clone().unwrap_or_default(),
            ..Properties::wildcard()
        }
    }

    fn remote_name(&self, system: &System) -> Result<Option<String>> {
        if let Some(name) = &self.remote {
            return Ok(Some(name.clone()));
        }
        if self.default {
            return Ok(Some(
                system
                    .default_remote()
                    .ok_or_else(|| Error::config("no default remote configured"))?
                    .name()
                    .to_string(),
            ));
        }
        Ok(None)
    }
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Path to a package directory (containing `edp.info`) to import.
    #[arg(long)]
    pub source: PathBuf,
}

pub fn run(args: &PackArgs, system: &mut System) -> Result<()> {
    match &args.action {
        PackAction::Pull(sel) => pull(sel, system),
        PackAction::Push(sel) => push(sel, system),
        PackAction::Add(add) => add_package(add, system),
        PackAction::Rm(sel) => remove(sel, system),
        PackAction::Ls(sel) => list(sel, system),
        PackAction::Clean(sel) => clean(sel, system),
    }
}

fn pull(sel: &Selectors, system: &mut System) -> Result<()> {
    let query = sel.to_properties();
    let remote_name = sel.remote_name(system)?;
    let hits = {
        let manager = PackageManager::new(system);
        manager.query(&query)
    };
    let best = hits
        .last()
        .cloned()
        .ok_or_else(|| Error::validation(format!("no match for {query}")))?;
    let mut manager = PackageManager::new(system);
    let dest = manager.add_from_remote(&best, remote_name.as_deref())?;
    println!("{}", dest.display());
    Ok(())
}

fn push(sel: &Selectors, system: &mut System) -> Result<()> {
    let query = sel.to_properties();
    let remote_name = sel.remote_name(system)?;
    let dep = system
        .store
        .query(&query)
        .last()
        .cloned()
        .ok_or_else(|| Error::validation(format!("no local match for {query}")))?;
    let mut manager = PackageManager::new(system);
    manager.add_to_remote(&dep, remote_name.as_deref(), sel.force)
}

fn add_package(args: &AddArgs, system: &mut System) -> Result<()> {
    let mut manager = PackageManager::new(system);
    let dest = manager.add_from_location(&args.source)?;
    println!("{}", dest.display());
    Ok(())
}

fn remove(sel: &Selectors, system: &mut System) -> Result<()> {
    let removed = system.store.delete(&sel.to_properties())?;
    println!("removed {removed} package(s)");
    Ok(())
}

fn list(sel: &Selectors, system: &mut System) -> Result<()> {
    let query = sel.to_properties();
    let manager = PackageManager::new(system);
    for dep in manager.query(&query) {
        if sel.full {
            println!("[{}] {}", dep.source_name(), dep.properties);
        } else {
            println!("[{}] {}/{}", dep.source_name(), dep.properties.name, dep.properties.version);
        }
    }
    Ok(())
}

/// Keep only the newest version within each (name, os, arch, kind,
/// compiler) group, dropping the rest.
fn clean(sel: &Selectors, system: &mut System) -> Result<()> {
    let query = sel.to_properties();
    let matches = system.store.query(&query);
    let mut groups: std::collections::HashMap<(String, String, String, String, String), Vec<Dependency>> =
        std::collections::HashMap::new();
    for dep in matches {
        let key = (
            dep.properties.name.clone(),
            dep.properties.os.clone(),
            dep.properties.arch.clone(),
            dep.properties.kind.clone(),
            dep.properties.compiler.clone(),
        );
        groups.entry(key).or_default().push(dep);
    }
    let mut removed = 0;
    for mut group in groups.into_values() {
        if group.len() < 2 {
            continue;
        }
        group.sort_by(|a, b| a.properties.cmp(&b.properties));
        let newest = group.pop().unwrap();
        for stale in group {
            if newest.properties.version_greater(&stale.properties) {
                removed += system.store.delete(&stale.properties)?;
            }
        }
    }
    println!("cleaned {removed} superseded package(s)");
    Ok(())
}
