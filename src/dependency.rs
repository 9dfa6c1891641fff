// src/dependency.rs

//! `Dependency`: a `Properties` value plus where it lives, if anywhere.

use crate::identity::Properties;
use std::path::{Path, PathBuf};

/// A package entry as seen by a store or remote: its identity, an optional
/// local base path (set once materialized on disk) and the semicolon-joined
/// list of discovered CMake config directories.
#[derive(Debug, Clone)]
pub struct Dependency {
    pub properties: Properties,
    pub base_path: Option<PathBuf>,
    pub cmake_config_dir: Option<String>,
    /// Name of the source this entry was found through: "local" or a remote
    /// name, filled in by `PackageManager::query`.
    pub source: Option<String>,
}

impl Dependency {
    pub fn new(properties: Properties) -> Self {
        Dependency {
            properties,
            base_path: None,
            cmake_config_dir: None,
            source: None,
        }
    }

    /// Load a dependency materialized at `dir`: requires `dir/edp.info` to
    /// parse, and records every `*onfig.cmake` found under the tree.
    pub fn from_local_dir(dir: &Path) -> crate::error::Result<Dependency> {
        let info = dir.join("edp.info");
        let properties = Properties::from_edp_file(&info)?;
        let mut configs = Vec::new();
        for entry in walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let name = entry.file_name().to_string_lossy();
            if name.ends_with("onfig.cmake") {
                if let Some(parent) = entry.path().parent() {
                    configs.push(parent.to_string_lossy().to_string());
                }
            }
        }
        let cmake_config_dir = if configs.is_empty() {
            None
        } else {
            Some(configs.join(";"))
        };
        Ok(Dependency {
            properties,
            base_path: Some(dir.to_path_buf()),
            cmake_config_dir,
            source: None,
        })
    }

    /// Relative store path: `<base_path>` if materialized, else
    /// `<name>/<hash>`.
    pub fn path(&self) -> String {
        match &self.base_path {
            Some(p) => p.to_string_lossy().to_string(),
            None => format!("{}/{}", self.properties.name, self.properties.hash()),
        }
    }

    pub fn matches(&self, query: &Properties) -> bool {
        self.properties.matches(query)
    }

    pub fn source_name(&self) -> &str {
        self.source.as_deref().unwrap_or("local")
    }
}

impl PartialEq for Dependency {
    fn eq(&self, other: &Self) -> bool {
        self.properties == other.properties
    }
}
impl Eq for Dependency {}

impl PartialOrd for Dependency {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Dependency {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.properties.cmp(&other.properties)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_falls_back_to_name_hash_when_not_materialized() {
        let dep = Dependency::new(Properties::new("foo", "1.0"));
        assert!(dep.path().starts_with("foo/"));
    }
}
