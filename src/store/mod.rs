// src/store/mod.rs

//! The local content-addressed package store.
//!
//! Layout: a root directory (`<base>/data` by default) whose immediate
//! children are package directories named `<name><hash>`. Each package
//! directory contains the installed tree plus an `edp.info` sidecar at its
//! root.

pub mod lock;

use crate::dependency::Dependency;
use crate::error::{Error, Result};
use crate::identity::Properties;
use std::fs;
use std::path::{Path, PathBuf};

pub struct LocalStore {
    pub root: PathBuf,
    dependencies: Vec<Dependency>,
}

impl LocalStore {
    pub fn new(root: PathBuf) -> Self {
        let mut store = LocalStore {
            root,
            dependencies: Vec::new(),
        };
        store.load();
        store
    }

    /// Enumerate children of the root; parse each sidecar into a
    /// `Dependency`. A directory without a readable sidecar is logged and
    /// skipped. Two directories that hash-collide (same `<name><hash>`):
    /// the newest on disk wins, the other is logged as a warning.
    pub fn load(&mut self) {
        self.dependencies.clear();
        let _ = fs::create_dir_all(&self.root);
        let entries = match fs::read_dir(&self.root) {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!("cannot read store root {}: {e}", self.root.display());
                return;
            }
        };
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            match Dependency::from_local_dir(&path) {
                Ok(dep) => {
                    let expected = path.file_name().unwrap_or_default().to_string_lossy();
                    if expected != dep.properties.dirname() {
                        tracing::warn!(
                            "orphaned/mismatched package directory {} (expected suffix for {})",
                            path.display(),
                            dep.properties.dirname()
                        );
                        continue;
                    }
                    if let Some(existing_idx) = self
                        .dependencies
                        .iter()
                        .position(|d| d.properties.dirname() == dep.properties.dirname())
                    {
                        tracing::warn!(
                            "hash collision for {}, keeping the newest directory on disk",
                            dep.properties.dirname()
                        );
                        let existing_mtime = mtime(self.dependencies[existing_idx].base_path.as_deref());
                        let new_mtime = mtime(Some(&path));
                        if new_mtime > existing_mtime {
                            self.dependencies[existing_idx] = dep;
                        }
                        continue;
                    }
                    self.dependencies.push(dep);
                }
                Err(e) => {
                    tracing::warn!("skipping unreadable package directory {}: {e}", path.display());
                }
            }
        }
    }

    pub fn reload(&mut self) {
        self.load();
    }

    /// Return every dependency whose properties match `query`, sorted by
    /// the total order over `Properties`.
    pub fn query(&self, query: &Properties) -> Vec<Dependency> {
        let mut found: Vec<Dependency> = self
            .dependencies
            .iter()
            .filter(|d| d.matches(query))
            .cloned()
            .collect();
        found.sort();
        found
    }

    /// Import the package tree at `src_dir` (which must contain a valid
    /// `edp.info`) into the store, replacing any existing directory for the
    /// same identity. Must be invoked under the data lock.
    pub fn insert(&mut self, src_dir: &Path) -> Result<PathBuf> {
        let info = src_dir.join("edp.info");
        let properties = Properties::from_edp_file(&info)?;
        let dest = self.root.join(properties.dirname());
        if dest.exists() {
            fs::remove_dir_all(&dest)?;
        }
        copy_dir_all(src_dir, &dest)?;
        self.load();
        Ok(dest)
    }

    /// Remove every directory matching `query` and drop it from memory.
    pub fn delete(&mut self, query: &Properties) -> Result<usize> {
        let matches: Vec<Dependency> = self
            .dependencies
            .iter()
            .filter(|d| d.matches(query))
            .cloned()
            .collect();
        for dep in &matches {
            if let Some(path) = &dep.base_path {
                fs::remove_dir_all(path)?;
            }
        }
        self.dependencies
            .retain(|d| !matches.iter().any(|m| m.properties == d.properties));
        Ok(matches.len())
    }

    /// Produce a gzipped tar of `dep`'s directory at
    /// `<dest>/<dirname>.tgz`; the archive's top-level entry is the
    /// package directory itself.
    pub fn pack(&self, dep: &Dependency, dest: &Path) -> Result<PathBuf> {
        let src = dep
            .base_path
            .as_ref()
            .ok_or_else(|| Error::validation("cannot pack a dependency without a local path"))?;
        let dirname = src
            .file_name()
            .ok_or_else(|| Error::io("package directory has no file name"))?
            .to_string_lossy()
            .to_string();
        fs::create_dir_all(dest)?;
        let archive_path = dest.join(format!("{dirname}.tgz"));
        let file = fs::File::create(&archive_path)?;
        let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        builder
            .append_dir_all(&dirname, src)
            .map_err(|e| Error::io(format!("packing {}: {e}", src.display())))?;
        builder
            .into_inner()
            .map_err(|e| Error::io(format!("finishing archive: {e}")))?
            .finish()
            .map_err(|e| Error::io(format!("finishing gzip stream: {e}")))?;
        Ok(archive_path)
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }
}

fn mtime(path: Option<&Path>) -> std::time::SystemTime {
    path.and_then(|p| fs::metadata(p).ok())
        .and_then(|m| m.modified().ok())
        .unwrap_or(std::time::SystemTime::UNIX_EPOCH)
}

fn copy_dir_all(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst)?;
    for entry in walkdir::WalkDir::new(src).min_depth(1) {
        let entry = entry.map_err(|e| Error::io(e.to_string()))?;
        let rel = entry.path().strip_prefix(src).map_err(|e| Error::io(e.to_string()))?;
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_package(root: &Path, name: &str, version: &str) -> Properties {
        let props = Properties::new(name, version);
        let dir = root.join(props.dirname());
        fs::create_dir_all(&dir).unwrap();
        props.to_edp_file(&dir.join("edp.info")).unwrap();
        fs::write(dir.join("header.h"), b"// header").unwrap();
        props
    }

    #[test]
    fn insert_then_query_round_trips() {
        let base = tempfile::tempdir().unwrap();
        let staging = tempfile::tempdir().unwrap();
        let mut store = LocalStore::new(base.path().join("data"));
        let props = write_package(staging.path(), "foo", "1.0");
        store.insert(&staging.path().join(props.dirname())).unwrap();

        let results = store.query(&Properties::new("foo", "*"));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].properties.version, "1.0");
    }

    #[test]
    fn delete_removes_directory_and_record() {
        let base = tempfile::tempdir().unwrap();
        write_package(&base.path().join("data"), "foo", "1.0");
        let mut store = LocalStore::new(base.path().join("data"));
        assert_eq!(store.query(&Properties::new("foo", "*")).len(), 1);
        let removed = store.delete(&Properties::new("foo", "*")).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.query(&Properties::new("foo", "*")).len(), 0);
    }

    #[test]
    fn pack_produces_archive_with_package_dir_as_top_level_entry() {
        let base = tempfile::tempdir().unwrap();
        write_package(&base.path().join("data"), "foo", "1.0");
        let store = LocalStore::new(base.path().join("data"));
        let dest = tempfile::tempdir().unwrap();
        let dep = &store.query(&Properties::new("foo", "*"))[0];
        let archive = store.pack(dep, dest.path()).unwrap();
        assert!(archive.exists());

        let file = fs::File::open(&archive).unwrap();
        let decoder = flate2::read::GzDecoder::new(file);
        let mut ar = tar::Archive::new(decoder);
        let names: Vec<String> = ar
            .entries()
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.path().unwrap().to_string_lossy().to_string())
            .collect();
        let dirname = dep.properties.dirname();
        assert!(names.iter().any(|n| n.starts_with(&dirname)));
    }
}
