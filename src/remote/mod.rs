// src/remote/mod.rs

//! Remote repository abstraction: deplist sync, query, push, pull against a
//! backend (HTTP(S), FTP, or a shared folder).
//!
//! The `deplist.txt` of a remote is the sole authoritative enumeration of
//! that remote's contents; object files at `<name>/<hash>.tgz` are
//! reachable iff listed in it. Default trait methods implement the shared
//! deplist-sync, query, pull and push semantics on top of each backend's
//! `get_file`/`send_file` primitives; backends override them only when the
//! wire protocol genuinely differs (HTTP's action dispatcher).

pub mod folder;
pub mod ftp;
pub mod http;

use crate::dependency::Dependency;
use crate::error::{Error, Result};
use crate::identity::Properties;
use std::cell::Cell;
use std::path::{Path, PathBuf};

/// Shared state every backend composes: the cached deplist, validity and
/// default flags. `valid` is a `Cell` because a non-200 response must be
/// able to invalidate the remote from `&self` methods (`get_file`, `pull`,
/// `push` take `&self` on the trait) without widening their signatures.
#[derive(Default)]
pub struct RemoteState {
    pub dependencies: Vec<Dependency>,
    pub valid: Cell<bool>,
    pub default: bool,
}

/// Contract a remote backend must satisfy.
pub trait Remote {
    fn name(&self) -> &str;
    fn kind(&self) -> &'static str;
    fn is_default(&self) -> bool;
    fn is_valid(&self) -> bool;

    /// Establish a session; implementations set their validity flag on
    /// success.
    fn connect(&mut self) -> Result<()>;

    /// Fetch a named blob to a local directory, returning the local path.
    fn get_file(&self, remote_name: &str, local_dir: &Path) -> Result<PathBuf>;

    /// Upload a blob under a remote name.
    fn send_file(&self, local_path: &Path, remote_name: &str) -> Result<()>;

    fn deplist(&self) -> &[Dependency];
    fn deplist_mut(&mut self) -> &mut Vec<Dependency>;

    /// Download `deplist.txt` to a temp location and parse it.
    fn pull_deplist(&mut self) -> Result<()> {
        let temp = tempfile::tempdir().map_err(Error::from)?;
        let local = self.get_file("deplist.txt", temp.path())?;
        let contents = std::fs::read_to_string(&local)?;
        let deps = parse_deplist(&contents);
        *self.deplist_mut() = deps;
        Ok(())
    }

    /// Write the cached deplist locally and upload it.
    fn push_deplist(&mut self) -> Result<()> {
        let temp = tempfile::tempdir().map_err(Error::from)?;
        let local = temp.path().join("deplist.txt");
        std::fs::write(&local, format_deplist(self.deplist()))?;
        self.send_file(&local, "deplist.txt")
    }

    /// Same semantics as local store query, operating on the cached
    /// deplist.
    fn query(&self, q: &Properties) -> Vec<Dependency> {
        let mut found: Vec<Dependency> = self
            .deplist()
            .iter()
            .filter(|d| d.matches(q))
            .cloned()
            .map(|mut d| {
                d.source = Some(self.name().to_string());
                d
            })
            .collect();
        found.sort();
        found
    }

    /// Resolve `dep` to a single remote object and download it into
    /// `dest`, producing a local `<hash>.tgz`.
    fn pull(&self, dep: &Dependency, dest: &Path) -> Result<PathBuf> {
        if dest.exists() && !dest.is_dir() {
            return Err(Error::io(format!("{} is not a directory", dest.display())));
        }
        let matches = self.query(&dep.properties);
        if matches.len() != 1 {
            return Err(Error::validation(format!(
                "pull requires exactly one match, found {}",
                matches.len()
            )));
        }
        let object = format!(
            "{}/{}.tgz",
            matches[0].properties.name,
            matches[0].properties.hash()
        );
        self.get_file(&object, dest)
    }

    /// Upload `file` as the object for `dep`; refuses when `query(dep)`
    /// already returns a match unless `force`. On success, appends `dep` to
    /// the cached deplist and synchronizes it to the remote.
    fn push(&mut self, dep: &Dependency, file: &Path, force: bool) -> Result<()> {
        if !file.exists() {
            return Err(Error::io(format!("{} does not exist", file.display())));
        }
        if !self.query(&dep.properties).is_empty() && !force {
            return Err(Error::validation(format!(
                "{} already on remote {}",
                dep.properties, self.name()
            )));
        }
        let object = format!("{}/{}.tgz", dep.properties.name, dep.properties.hash());
        self.send_file(file, &object)?;
        self.deplist_mut().push(dep.clone());
        self.push_deplist()
    }
}

fn parse_deplist(contents: &str) -> Vec<Dependency> {
    contents
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| Dependency::new(Properties::parse(l)))
        .filter(|d| d.properties.valid)
        .collect()
}

fn format_deplist(deps: &[Dependency]) -> String {
    let mut out = String::new();
    for dep in deps {
        out.push_str(&dep.properties.format());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deplist_round_trips_through_text_form() {
        let deps = vec![
            Dependency::new(Properties::new("foo", "1.0")),
            Dependency::new(Properties::new("bar", "2.0")),
        ];
        let text = format_deplist(&deps);
        let parsed = parse_deplist(&text);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].properties.name, "foo");
    }
}
