// src/system.rs

//! Process-wide configuration, remote registry and toolset management.
//!
//! `config.ini` is a JSON document despite its extension (kept faithful to
//! the source, which named it this way). Reads and mutations take a
//! per-file micro-lock distinct from the data lock in [`crate::store::lock`]:
//! shorter timeout, no staleness override, because config writes are small
//! and contention here should resolve quickly or not at all.

use crate::dependency::Dependency;
use crate::error::{Error, Result};
use crate::host;
use crate::identity::Properties;
use crate::remote::folder::Folder;
use crate::remote::ftp::Ftp;
use crate::remote::http::Http;
use crate::remote::Remote;
use crate::store::lock::Locker;
use crate::store::LocalStore;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::{Duration, SystemTime};

const CONFIG_POLL: Duration = Duration::from_millis(500);
const CONFIG_TIMEOUT: Duration = Duration::from_secs(5);

/// A named compiler/platform tuple a recipe's settings can be filled in
/// from. `os`/`arch` are auto-filled from the host probe when omitted at
/// creation time, and then omitted again on serialization.
#[derive(Debug, Clone)]
pub struct Toolset {
    pub compiler_path: String,
    pub os: String,
    pub arch: String,
    pub glibc: String,
    pub default: bool,
    pub autofill: bool,
}

impl Toolset {
    pub fn new(
        compiler_path: impl Into<String>,
        os: Option<String>,
        arch: Option<String>,
        glibc: String,
        default: bool,
    ) -> Self {
        let autofill = os.is_none() || arch.is_none();
        Toolset {
            compiler_path: compiler_path.into(),
            os: os.unwrap_or_else(|| host::os().to_string()),
            arch: arch.unwrap_or_else(|| host::arch().to_string()),
            glibc,
            default,
            autofill,
        }
    }
}

impl Serialize for Toolset {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let field_count = if self.autofill { 3 } else { 5 };
        let mut s = serializer.serialize_struct("Toolset", field_count)?;
        s.serialize_field("compiler_path", &self.compiler_path)?;
        if !self.autofill {
            s.serialize_field("os", &self.os)?;
            s.serialize_field("arch", &self.arch)?;
        }
        s.serialize_field("glibc", &self.glibc)?;
        s.serialize_field("default", &self.default)?;
        s.end()
    }
}

impl<'de> Deserialize<'de> for Toolset {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            compiler_path: String,
            #[serde(default)]
            os: Option<String>,
            #[serde(default)]
            arch: Option<String>,
            #[serde(default)]
            glibc: String,
            #[serde(default)]
            default: bool,
        }
        let raw = Raw::deserialize(deserializer)?;
        Ok(Toolset::new(raw.compiler_path, raw.os, raw.arch, raw.glibc, raw.default))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RemoteConfig {
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub root: Option<String>,
    #[serde(default)]
    pub default: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    remotes: Vec<RemoteConfig>,
    #[serde(default)]
    toolsets: Vec<Toolset>,
    #[serde(default)]
    base_path: Option<String>,
    #[serde(default)]
    data_path: Option<String>,
    #[serde(default)]
    temp_path: Option<String>,
}

/// Per-file micro-lock: creates `<config>.lock` for the duration of a read
/// or mutation. Five-second deadline, no staleness override — see
/// `Error::Lock` in §7 of the design notes this replaces the source's
/// `exit(-1)` on contention.
struct ConfigLock {
    path: PathBuf,
}

impl ConfigLock {
    fn acquire(config_path: &Path) -> Result<Self> {
        let path = PathBuf::from(format!("{}.lock", config_path.display()));
        let start = SystemTime::now();
        loop {
            match fs::OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok(ConfigLock { path }),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    if SystemTime::now().duration_since(start).unwrap_or(Duration::ZERO) > CONFIG_TIMEOUT {
                        return Err(Error::lock(format!(
                            "timed out waiting for config lock {}",
                            path.display()
                        )));
                    }
                    sleep(CONFIG_POLL);
                }
                Err(e) => return Err(Error::from(e)),
            }
        }
    }
}

impl Drop for ConfigLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

pub struct System {
    pub base: PathBuf,
    pub data_path: PathBuf,
    pub temp_path: PathBuf,
    config_path: PathBuf,
    pub store: LocalStore,
    pub remotes: Vec<Box<dyn Remote>>,
    pub toolsets: Vec<Toolset>,
}

impl System {
    pub fn new(base: PathBuf) -> Result<Self> {
        let config_path = base.join("config.ini");
        let _lock = ConfigLock::acquire(&config_path)?;

        let config = read_config(&config_path)?;

        let data_path = config
            .data_path
            .map(PathBuf::from)
            .unwrap_or_else(|| base.join("data"));
        let temp_path = config
            .temp_path
            .map(PathBuf::from)
            .unwrap_or_else(|| base.join("tmp"));
        fs::create_dir_all(&data_path)?;
        fs::create_dir_all(&temp_path)?;

        let remotes = build_remotes(&config.remotes);
        let store = LocalStore::new(data_path.clone());

        write_config(&config_path, &config)?;

        Ok(System {
            base,
            data_path,
            temp_path,
            config_path,
            store,
            remotes,
            toolsets: config.toolsets,
        })
    }

    pub fn default_remote(&self) -> Option<&dyn Remote> {
        self.remotes.iter().find(|r| r.is_default()).map(|r| r.as_ref())
    }

    pub fn remote_named(&self, name: &str) -> Option<&dyn Remote> {
        self.remotes.iter().find(|r| r.name() == name).map(|r| r.as_ref())
    }

    pub fn remote_named_mut(&mut self, name: &str) -> Option<&mut Box<dyn Remote>> {
        self.remotes.iter_mut().find(|r| r.name() == name)
    }

    fn with_config_mutation(&mut self, f: impl FnOnce(&mut ConfigFile)) -> Result<()> {
        let _lock = ConfigLock::acquire(&self.config_path)?;
        let mut config = read_config(&self.config_path)?;
        f(&mut config);
        write_config(&self.config_path, &config)
    }

    pub fn add_remote(&mut self, entry: RemoteConfig) -> Result<()> {
        self.with_config_mutation(|c| {
            c.remotes.retain(|r| r.name != entry.name);
            c.remotes.push(entry.clone());
        })?;
        let boxed = build_remote(&entry);
        self.remotes.retain(|r| r.name() != entry.name);
        if let Some(r) = boxed {
            self.remotes.push(r);
        }
        Ok(())
    }

    pub fn del_remote(&mut self, name: &str) -> Result<()> {
        self.with_config_mutation(|c| c.remotes.retain(|r| r.name != name))?;
        self.remotes.retain(|r| r.name() != name);
        Ok(())
    }

    pub fn add_toolset(&mut self, toolset: Toolset) -> Result<()> {
        self.with_config_mutation(|c| c.toolsets.push(toolset.clone()))?;
        self.toolsets.push(toolset);
        Ok(())
    }

    pub fn del_toolset(&mut self, compiler_path: &str) -> Result<()> {
        self.with_config_mutation(|c| c.toolsets.retain(|t| t.compiler_path != compiler_path))?;
        self.toolsets.retain(|t| t.compiler_path != compiler_path);
        Ok(())
    }

    /// Import a package tree under the data lock: parse `edp.info`,
    /// compute the destination directory, remove any existing directory,
    /// copy the new tree, clear temp, reload the local database.
    pub fn import_folder(&mut self, src_dir: &Path) -> Result<PathBuf> {
        let locker = Locker::new(&self.data_path);
        if !locker.acquire() {
            return Err(Error::lock("timed out acquiring data lock for import_folder"));
        }
        let result = self.store.insert(src_dir);
        self.clear_tmp();
        locker.release();
        result
    }

    /// Empty the temp directory; best effort, never fails the caller.
    pub fn clear_tmp(&self) {
        let Ok(entries) = fs::read_dir(&self.temp_path) else {
            return;
        };
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            let result = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            if let Err(e) = result {
                tracing::warn!("failed to clear {}: {e}", path.display());
            }
        }
    }
}

fn read_config(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        return Ok(ConfigFile::default());
    }
    let text = fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|e| Error::config(format!("parsing {}: {e}", path.display())))
}

fn write_config(path: &Path, config: &ConfigFile) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let text = serde_json::to_string_pretty(config)
        .map_err(|e| Error::config(format!("serializing config: {e}")))?;
    fs::write(path, text)?;
    Ok(())
}

fn build_remotes(entries: &[RemoteConfig]) -> Vec<Box<dyn Remote>> {
    let mut default_assigned = false;
    entries
        .iter()
        .filter_map(|entry| {
            let mut entry = entry.clone();
            if entry.default && default_assigned {
                entry.default = false;
            } else if entry.default {
                default_assigned = true;
            }
            build_remote(&entry)
        })
        .collect()
}

fn build_remote(entry: &RemoteConfig) -> Option<Box<dyn Remote>> {
    match entry.kind.as_str() {
        "srv" | "srvs" => {
            let scheme = if entry.kind == "srvs" { "https" } else { "http" };
            let url = entry.url.clone().unwrap_or_else(|| {
                format!("{scheme}://{}", entry.host.clone().unwrap_or_default())
            });
            Some(Box::new(Http::new(
                entry.name.clone(),
                url,
                entry.username.clone(),
                entry.password.clone(),
                entry.default,
            )))
        }
        "ftp" => Some(Box::new(Ftp::new(
            entry.name.clone(),
            entry.host.clone().unwrap_or_default(),
            entry.port.unwrap_or(21),
            entry.username.clone().unwrap_or_default(),
            entry.password.clone().unwrap_or_default(),
            entry.root.clone().unwrap_or_else(|| "/".to_string()),
            entry.default,
        ))),
        "folder" => Some(Box::new(Folder::new(
            entry.name.clone(),
            PathBuf::from(entry.root.clone().unwrap_or_default()),
            entry.default,
        ))),
        other => {
            tracing::warn!("remote '{}' has unknown kind '{other}', skipping", entry.name);
            None
        }
    }
}

/// Query every configured remote, tagging each hit with its source.
pub fn query_remotes(remotes: &[Box<dyn Remote>], query: &Properties) -> Vec<Dependency> {
    let mut found: Vec<Dependency> = remotes.iter().flat_map(|r| r.query(query)).collect();
    found.sort();
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toolset_autofill_round_trips_without_os_arch() {
        let t = Toolset::new("/usr/bin/gcc", None, None, String::new(), false);
        let json = serde_json::to_string(&t).unwrap();
        assert!(!json.contains("\"os\""));
        let back: Toolset = serde_json::from_str(&json).unwrap();
        assert!(back.autofill);
    }

    #[test]
    fn toolset_explicit_os_arch_are_serialized() {
        let t = Toolset::new(
            "/usr/bin/gcc",
            Some("Linux".into()),
            Some("x86_64".into()),
            String::new(),
            false,
        );
        let json = serde_json::to_string(&t).unwrap();
        assert!(json.contains("\"os\":\"Linux\""));
    }

    #[test]
    fn new_system_creates_data_and_temp_directories() {
        let base = tempfile::tempdir().unwrap();
        let system = System::new(base.path().to_path_buf()).unwrap();
        assert!(system.data_path.is_dir());
        assert!(system.temp_path.is_dir());
        assert!(base.path().join("config.ini").exists());
    }

    #[test]
    fn unknown_remote_kind_is_skipped() {
        let entries = vec![RemoteConfig {
            kind: "carrier-pigeon".into(),
            name: "r".into(),
            ..Default::default()
        }];
        assert!(build_remotes(&entries).is_empty());
    }
}
