// src/recipe/mod.rs

//! Declarative recipe model: a `recipe.toml` record plus optional shell
//! hook scripts, replacing the source's dynamically loaded Recipe
//! subclasses (REDESIGN FLAG (per-recipe dynamic loading) in the design
//! notes).

pub mod discovery;

use crate::error::{Error, Result};
use crate::identity::Properties;
use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Debug, Clone, Deserialize)]
pub struct RecipeFile {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub os: Option<String>,
    #[serde(default)]
    pub arch: Option<String>,
    pub source_dir: String,
    #[serde(default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub cache_variables: Vec<String>,
    #[serde(default = "default_configs")]
    pub config: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<DependencySpec>,
}

fn default_kind() -> String {
    "shared".to_string()
}

fn default_configs() -> Vec<String> {
    vec!["Debug".to_string(), "Release".to_string()]
}

#[derive(Debug, Clone, Deserialize)]
pub struct DependencySpec {
    pub name: String,
    #[serde(default = "wildcard_version")]
    pub version: String,
    #[serde(default)]
    pub os: Option<String>,
    #[serde(default)]
    pub arch: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub compiler: Option<String>,
}

fn wildcard_version() -> String {
    "*".to_string()
}

impl DependencySpec {
    pub fn to_properties(&self) -> Properties {
        Properties {
            name: self.name.clone(),
            version: self.version.clone(),
            os: self.os.clone().unwrap_or_else(|| "any".to_string()),
            arch: self.arch.clone().unwrap_or_else(|| "any".to_string()),
            kind: self.kind.clone().unwrap_or_else(|| "any".to_string()),
            compiler: self.compiler.clone().unwrap_or_else(|| "any".to_string()),
            ..Properties::wildcard()
        }
    }
}

/// Settings Builder fills in via `define()` before running the pipeline:
/// the concrete platform/compiler/date this build targets.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub os: String,
    pub arch: String,
    pub compiler: String,
    pub install_path: PathBuf,
    pub glibc: String,
    pub build_date: Option<DateTime<FixedOffset>>,
}

/// A recipe as loaded from disk: the declarative record plus its directory
/// (where `hooks/*` live) and the settings Builder assigns before running
/// the pipeline.
#[derive(Debug, Clone)]
pub struct Recipe {
    pub dir: PathBuf,
    pub file: RecipeFile,
    pub settings: Settings,
}

impl Recipe {
    pub fn source_dir(&self) -> PathBuf {
        let p = Path::new(&self.file.source_dir);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.dir.join(p)
        }
    }

    pub fn hook_path(&self, hook: &str) -> PathBuf {
        self.dir.join("hooks").join(hook)
    }

    /// Run a named hook script if present; a missing hook is the
    /// documented no-op default.
    fn run_hook(&self, hook: &str) -> Result<()> {
        let path = self.hook_path(hook);
        if !path.exists() {
            return Ok(());
        }
        let status = Command::new(&path)
            .current_dir(&self.dir)
            .status()
            .map_err(|e| Error::build(self.identity_string(), format!("running hook {hook}: {e}")))?;
        if !status.success() {
            return Err(Error::build(
                self.identity_string(),
                format!("hook {hook} exited with {status}"),
            ));
        }
        Ok(())
    }

    pub fn source(&self) -> Result<()> {
        self.run_hook("source")
    }

    pub fn configure(&self) -> Result<()> {
        self.run_hook("configure")
    }

    pub fn install(&self) -> Result<()> {
        self.run_hook("install")
    }

    pub fn clean(&self) -> Result<()> {
        self.run_hook("clean")
    }

    fn identity_string(&self) -> String {
        format!("{}/{}", self.file.name, self.file.version)
    }

    pub fn properties(&self) -> Properties {
        Properties {
            name: self.file.name.clone(),
            version: self.file.version.clone(),
            os: self.settings.os.clone(),
            arch: self.settings.arch.clone(),
            kind: self.file.kind.clone(),
            compiler: self.settings.compiler.clone(),
            glibc: self.settings.glibc.clone(),
            build_date: self.settings.build_date,
            valid: true,
        }
    }
}

pub fn load(dir: &Path) -> Result<Recipe> {
    let toml_path = dir.join("recipe.toml");
    let text = std::fs::read_to_string(&toml_path)
        .map_err(|e| Error::validation(format!("reading {}: {e}", toml_path.display())))?;
    let file: RecipeFile = toml::from_str(&text)
        .map_err(|e| Error::validation(format!("parsing {}: {e}", toml_path.display())))?;
    Ok(Recipe {
        dir: dir.to_path_buf(),
        file,
        settings: Settings::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_parses_minimal_recipe() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("recipe.toml"),
            r#"
            name = "foo"
            version = "1.0"
            source_dir = "src"
            "#,
        )
        .unwrap();
        let recipe = load(dir.path()).unwrap();
        assert_eq!(recipe.file.name, "foo");
        assert_eq!(recipe.file.kind, "shared");
        assert_eq!(recipe.file.config, vec!["Debug", "Release"]);
    }

    #[test]
    fn missing_hook_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("recipe.toml"),
            r#"name = "foo"
            version = "1.0"
            source_dir = "src""#,
        )
        .unwrap();
        let recipe = load(dir.path()).unwrap();
        assert!(recipe.source().is_ok());
        assert!(recipe.clean().is_ok());
    }
}
