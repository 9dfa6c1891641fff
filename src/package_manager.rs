// src/package_manager.rs

//! Façade combining the local store and the configured remotes: the single
//! entry point the CLI's `pack`/`get` commands drive.

use crate::dependency::Dependency;
use crate::error::{Error, Result};
use crate::identity::Properties;
use crate::system::{query_remotes, System};
use std::path::{Path, PathBuf};

pub struct PackageManager<'a> {
    system: &'a mut System,
}

impl<'a> PackageManager<'a> {
    pub fn new(system: &'a mut System) -> Self {
        PackageManager { system }
    }

    /// Query local store and every configured remote, merged and sorted;
    /// each hit is tagged with its source ("local" or a remote name).
    pub fn query(&self, q: &Properties) -> Vec<Dependency> {
        let mut found = self.system.store.query(q);
        for dep in &mut found {
            dep.source = Some("local".to_string());
        }
        found.extend(query_remotes(&self.system.remotes, q));
        found.sort();
        found
    }

    /// Import an already-built package tree (e.g. extracted from a `.tgz`)
    /// into the local store.
    pub fn add_from_location(&mut self, src_dir: &Path) -> Result<PathBuf> {
        self.system.import_folder(src_dir)
    }

    /// Pull `dep` from `remote_name` (or the default remote when `None`),
    /// extract it, and import the result into the local store.
    pub fn add_from_remote(&mut self, dep: &Dependency, remote_name: Option<&str>) -> Result<PathBuf> {
        let remote = match remote_name {
            Some(name) => self
                .system
                .remote_named(name)
                .ok_or_else(|| Error::config(format!("no remote named {name}")))?,
            None => self
                .system
                .default_remote()
                .ok_or_else(|| Error::config("no default remote configured"))?,
        };
        let staging = tempfile::tempdir().map_err(Error::from)?;
        let archive = remote.pull(dep, staging.path())?;
        let extracted = extract_archive(&archive, staging.path())?;
        self.system.import_folder(&extracted)
    }

    /// Pack the local match for `dep` and push it to `remote_name` (or the
    /// default remote).
    pub fn add_to_remote(&mut self, dep: &Dependency, remote_name: Option<&str>, force: bool) -> Result<()> {
        let staging = tempfile::tempdir().map_err(Error::from)?;
        let archive = self.system.store.pack(dep, staging.path())?;
        let name = match remote_name {
            Some(n) => n.to_string(),
            None => self
                .system
                .default_remote()
                .ok_or_else(|| Error::config("no default remote configured"))?
                .name()
                .to_string(),
        };
        let remote = self
            .system
            .remote_named_mut(&name)
            .ok_or_else(|| Error::config(format!("no remote named {name}")))?;
        remote.push(dep, &archive, force)
    }

    pub fn remove_package(&mut self, q: &Properties) -> Result<usize> {
        self.system.store.delete(q)
    }
}

/// Unpack a `.tgz` archive whose top-level entry is the package directory,
/// returning the path to that directory inside `dest`.
fn extract_archive(archive: &Path, dest: &Path) -> Result<PathBuf> {
    let file = std::fs::File::open(archive)?;
    let decoder = flate2::read::GzDecoder::new(file);
    let mut ar = tar::Archive::new(decoder);
    ar.unpack(dest)
        .map_err(|e| Error::io(format!("extracting {}: {e}", archive.display())))?;
    let entries: Vec<PathBuf> = std::fs::read_dir(dest)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    entries
        .into_iter()
        .next()
        .ok_or_else(|| Error::io(format!("{} did not unpack a directory", archive.display())))
}
