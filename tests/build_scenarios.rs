// tests/build_scenarios.rs

//! End-to-end build pipeline scenarios. Exercises the real `cmake`/`ninja`
//! toolchain against a minimal header-only project.

use edm::builder::{self, CrossMap};
use edm::recipe::{self, RecipeFile};
use edm::system::System;
use std::fs;
use std::path::Path;

fn write_header_only_recipe(dir: &Path, name: &str, version: &str, deps: &[&str]) {
    fs::create_dir_all(dir.join("src/include")).unwrap();
    fs::write(dir.join("src/include/dummy.h"), b"#pragma once\n").unwrap();
    fs::write(
        dir.join("src/CMakeLists.txt"),
        r#"
cmake_minimum_required(VERSION 3.16)
project(dummy LANGUAGES NONE)
install(DIRECTORY include/ DESTINATION include)
"#,
    )
    .unwrap();

    let deps_toml = deps
        .iter()
        .map(|d| format!("[[dependencies]]\nname = \"{d}\"\n"))
        .collect::<Vec<_>>()
        .join("\n");

    fs::write(
        dir.join("recipe.toml"),
        format!(
            r#"
name = "{name}"
version = "{version}"
source_dir = "src"
kind = "header"

{deps_toml}
"#
        ),
    )
    .unwrap();
}

fn new_system(base: &Path) -> System {
    System::new(base.to_path_buf()).unwrap()
}

#[test]
fn build_and_import_installs_a_new_package() {
    let base = tempfile::tempdir().unwrap();
    let recipes_dir = tempfile::tempdir().unwrap();
    write_header_only_recipe(recipes_dir.path(), "foo", "1.0", &[]);

    let mut system = new_system(base.path());
    let recipes = recipe::discovery::discover(recipes_dir.path(), 0);
    assert_eq!(recipes.len(), 1);

    let scratch = system.temp_path.clone();
    let failures = builder::build_all(&recipes, &mut system, &scratch, &CrossMap::default(), false);
    assert_eq!(failures, 0);

    system.store.reload();
    let results = system.store.query(&edm::identity::Properties::new("foo", "*"));
    assert_eq!(results.len(), 1, "query(name=foo) should return exactly one result");
}

#[test]
fn skip_if_present_avoids_rebuilding() {
    let base = tempfile::tempdir().unwrap();
    let recipes_dir = tempfile::tempdir().unwrap();
    write_header_only_recipe(recipes_dir.path(), "foo", "1.0", &[]);

    let mut system = new_system(base.path());
    let recipes = recipe::discovery::discover(recipes_dir.path(), 0);
    let scratch = system.temp_path.clone();
    builder::build_all(&recipes, &mut system, &scratch, &CrossMap::default(), false);
    system.store.reload();

    let before = system.store.query(&edm::identity::Properties::new("foo", "*"));
    let dir = before[0].base_path.clone().unwrap();
    let mtime_before = fs::metadata(&dir).unwrap().modified().unwrap();

    let failures = builder::build_all(&recipes, &mut system, &scratch, &CrossMap::default(), false);
    assert_eq!(failures, 0);
    system.store.reload();
    let mtime_after = fs::metadata(&dir).unwrap().modified().unwrap();
    assert_eq!(mtime_before, mtime_after, "re-running without --force must not touch the directory");
}

#[test]
fn transitive_local_dependency_resolves_cmake_prefix_path() {
    let base = tempfile::tempdir().unwrap();
    let foo_dir = tempfile::tempdir().unwrap();
    let bar_dir = tempfile::tempdir().unwrap();
    write_header_only_recipe(foo_dir.path(), "foo", "1.0", &[]);
    write_header_only_recipe(bar_dir.path(), "bar", "1.0", &["foo"]);

    let mut system = new_system(base.path());
    let scratch = system.temp_path.clone();

    let foo_recipes = recipe::discovery::discover(foo_dir.path(), 0);
    let failures = builder::build_all(&foo_recipes, &mut system, &scratch, &CrossMap::default(), false);
    assert_eq!(failures, 0);
    system.store.reload();

    let bar_recipes = recipe::discovery::discover(bar_dir.path(), 0);
    let failures = builder::build_all(&bar_recipes, &mut system, &scratch, &CrossMap::default(), false);
    assert_eq!(failures, 0, "building bar should succeed once foo is already in the store");

    system.store.reload();
    assert_eq!(system.store.query(&edm::identity::Properties::new("bar", "*")).len(), 1);
}

#[test]
fn missing_dependency_fails_the_build_without_invoking_cmake() {
    let base = tempfile::tempdir().unwrap();
    let bar_dir = tempfile::tempdir().unwrap();
    write_header_only_recipe(bar_dir.path(), "bar", "1.0", &["does-not-exist"]);

    let mut system = new_system(base.path());
    let scratch = system.temp_path.clone();
    let recipes = recipe::discovery::discover(bar_dir.path(), 0);
    let failures = builder::build_all(&recipes, &mut system, &scratch, &CrossMap::default(), false);
    assert_eq!(failures, 1, "missing dependency must count as a build failure");

    let _: RecipeFile = recipes[0].file.clone();
}
