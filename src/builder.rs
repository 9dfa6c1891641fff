// src/builder.rs

//! The build pipeline: resolve settings, skip if already present, fetch
//! sources, resolve transitive local dependencies, configure and build via
//! CMake, finalize into the local store.

use crate::error::{Error, Result};
use crate::host;
use crate::identity::Properties;
use crate::recipe::Recipe;
use crate::system::System;
use chrono::Local;
use std::path::Path;
use std::process::Command;

/// Cross-compilation overrides threaded through from the CLI.
#[derive(Debug, Clone, Default)]
pub struct CrossMap {
    pub c_compiler: Option<String>,
    pub cxx_compiler: Option<String>,
    pub cross_arch: Option<String>,
    pub cross_os: Option<String>,
    pub single_thread: bool,
}

/// Run every recipe's pipeline, continuing past individual failures.
/// Returns the number of recipes that failed, matching the CLI's "exit code
/// is the failure count" contract.
pub fn build_all(
    recipes: &[Recipe],
    system: &mut System,
    scratch: &Path,
    cross: &CrossMap,
    force: bool,
) -> usize {
    let mut failures = 0;
    for recipe in recipes {
        match build_one(recipe, system, scratch, cross, force) {
            Ok(BuildOutcome::Installed(path)) => {
                tracing::info!("built {} -> {}", recipe.file.name, path.display());
            }
            Ok(BuildOutcome::Skipped) => {
                tracing::info!("{} already present, skipping", recipe.file.name);
            }
            Err(e) => {
                tracing::error!("build failed for {}: {e}", recipe.file.name);
                failures += 1;
            }
        }
    }
    failures
}

enum BuildOutcome {
    Installed(std::path::PathBuf),
    Skipped,
}

fn build_one(
    recipe: &Recipe,
    system: &mut System,
    scratch: &Path,
    cross: &CrossMap,
    force: bool,
) -> Result<BuildOutcome> {
    let mut recipe = recipe.clone();

    resolve_settings(&mut recipe, cross, scratch);

    let identity = recipe.properties();
    // The presence check must not pin build_date: this build's timestamp is
    // freshly minted and will never equal a previously stored one.
    let presence_query = Properties {
        build_date: None,
        ..identity.clone()
    };
    if !force && !system.store.query(&presence_query).is_empty() {
        return Ok(BuildOutcome::Skipped);
    }

    let source_dir = recipe.source_dir();
    if !source_dir.is_dir() {
        return Err(Error::build(
            identity.to_string(),
            format!("source_dir {} does not exist", source_dir.display()),
        ));
    }
    if !source_dir.join("CMakeLists.txt").is_file() {
        return Err(Error::build(
            identity.to_string(),
            format!("{} has no CMakeLists.txt", source_dir.display()),
        ));
    }

    let result = run_pipeline(&recipe, &identity, system, cross);
    // Failure or success, the hook contract requires clean() and temp
    // clearing on every path out of the pipeline once source() has run.
    let _ = recipe.clean();
    system.clear_tmp();
    result.map(BuildOutcome::Installed)
}

fn resolve_settings(recipe: &mut Recipe, cross: &CrossMap, scratch: &Path) {
    let s = &mut recipe.settings;
    s.install_path = scratch.join("install");
    if recipe.file.kind == "header" {
        s.os = "any".to_string();
        s.arch = "any".to_string();
        s.compiler = "any".to_string();
        s.glibc = String::new();
    } else {
        s.os = cross
            .cross_os
            .clone()
            .or_else(|| recipe.file.os.clone())
            .unwrap_or_else(|| host::os().to_string());
        s.arch = cross
            .cross_arch
            .clone()
            .or_else(|| recipe.file.arch.clone())
            .unwrap_or_else(|| host::arch().to_string());
        s.compiler = host::default_compiler().to_string();
        s.glibc = if host::os() == "Linux" {
            host::glibc_version()
        } else {
            String::new()
        };
    }
    s.build_date = Some(Local::now().fixed_offset());
}

fn run_pipeline(
    recipe: &Recipe,
    identity: &Properties,
    system: &mut System,
    cross: &CrossMap,
) -> Result<std::path::PathBuf> {
    recipe
        .source()
        .map_err(|e| Error::build(identity.to_string(), e.to_string()))?;

    let mut config_prefix_path = Vec::new();
    for dep_spec in &recipe.file.dependencies {
        let mut query = dep_spec.to_properties();
        if query.os == "any" {
            query.os = recipe.settings.os.clone();
        }
        if query.arch == "any" {
            query.arch = recipe.settings.arch.clone();
        }
        let matches = system.store.query(&query);
        let dep = matches.first().ok_or_else(|| {
            Error::build(
                identity.to_string(),
                format!("missing dependency {}/{}", dep_spec.name, dep_spec.version),
            )
        })?;
        if let Some(dir) = &dep.cmake_config_dir {
            config_prefix_path.push(dir.clone());
        }
    }

    let build_dir = recipe.settings.install_path.parent().unwrap().join("build");
    std::fs::create_dir_all(&build_dir)
        .map_err(|e| Error::build(identity.to_string(), format!("creating build dir: {e}")))?;

    let mut configs = recipe.file.config.clone();
    if !matches!(recipe.file.kind.as_str(), "shared" | "static") {
        configs = vec!["Release".to_string()];
    }
    let multi_config = configs.len() > 1;
    let generator = if multi_config {
        "Ninja Multi-Config"
    } else {
        "Ninja"
    };

    let mut cmake_args = vec![
        "-S".to_string(),
        recipe.source_dir().to_string_lossy().to_string(),
        "-B".to_string(),
        build_dir.to_string_lossy().to_string(),
        "-G".to_string(),
        generator.to_string(),
        format!(
            "-DCMAKE_INSTALL_PREFIX={}",
            recipe.settings.install_path.display()
        ),
        format!(
            "-DBUILD_SHARED_LIBS={}",
            if recipe.file.kind == "shared" { "ON" } else { "OFF" }
        ),
    ];
    if recipe.settings.os == "Linux" {
        cmake_args.push("-DCMAKE_SKIP_INSTALL_RPATH=ON".to_string());
        cmake_args.push("-DCMAKE_POSITION_INDEPENDENT_CODE=ON".to_string());
    }
    if !config_prefix_path.is_empty() {
        cmake_args.push(format!("-DCMAKE_PREFIX_PATH={}", config_prefix_path.join(";")));
    }
    if let Some(c) = &cross.c_compiler {
        cmake_args.push(format!("-DCMAKE_C_COMPILER={c}"));
    }
    if let Some(cxx) = &cross.cxx_compiler {
        cmake_args.push(format!("-DCMAKE_CXX_COMPILER={cxx}"));
    }
    for var in &recipe.file.cache_variables {
        cmake_args.push(format!("-D{var}"));
    }

    recipe
        .configure()
        .map_err(|e| Error::build(identity.to_string(), e.to_string()))?;

    run_cmake(identity, &cmake_args)?;

    for cfg in &configs {
        let mut build_args = vec![
            "--build".to_string(),
            build_dir.to_string_lossy().to_string(),
            "--target".to_string(),
            "install".to_string(),
            "--config".to_string(),
            cfg.clone(),
        ];
        if cross.single_thread {
            build_args.push("-j".to_string());
            build_args.push("1".to_string());
        }
        run_cmake(identity, &build_args)?;
    }

    recipe
        .install()
        .map_err(|e| Error::build(identity.to_string(), e.to_string()))?;

    let sidecar = recipe.settings.install_path.join("edp.info");
    identity.to_edp_file(&sidecar)?;

    system.import_folder(&recipe.settings.install_path)
}

/// Invoke `cmake` as an argv vector, never a shell string.
fn run_cmake(identity: &Properties, args: &[String]) -> Result<()> {
    let status = Command::new("cmake")
        .args(args)
        .status()
        .map_err(|e| Error::build(identity.to_string(), format!("launching cmake: {e}")))?;
    if !status.success() {
        return Err(Error::build(
            identity.to_string(),
            format!("cmake exited with {status}"),
        ));
    }
    Ok(())
}
