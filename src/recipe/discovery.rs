// src/recipe/discovery.rs

//! Recursive recipe discovery: find every `recipe.toml`-bearing directory
//! under a root, up to a depth bound.

use super::{load, Recipe};
use std::path::Path;

/// `depth < 0` recurses without bound, `depth == 0` looks only at `root`
/// itself. A directory whose name contains `conan` or `doxy` is skipped
/// entirely (kept from the original repo-hygiene filter). Malformed
/// recipes are logged and skipped; discovery never aborts.
pub fn discover(root: &Path, depth: i32) -> Vec<Recipe> {
    let mut found = Vec::new();
    walk(root, depth, &mut found);
    found
}

fn walk(dir: &Path, remaining_depth: i32, found: &mut Vec<Recipe>) {
    if should_skip(dir) {
        return;
    }
    if dir.join("recipe.toml").is_file() {
        match load(dir) {
            Ok(recipe) => found.push(recipe),
            Err(e) => tracing::warn!("skipping malformed recipe at {}: {e}", dir.display()),
        }
    }
    if remaining_depth == 0 {
        return;
    }
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.is_dir() {
            walk(&path, remaining_depth - 1, found);
        }
    }
}

fn should_skip(dir: &Path) -> bool {
    dir.file_name()
        .map(|n| {
            let n = n.to_string_lossy().to_lowercase();
            n.contains("conan") || n.contains("doxy")
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_recipe(dir: &Path, name: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(
            dir.join("recipe.toml"),
            format!(r#"name = "{name}"
            version = "1.0"
            source_dir = "src""#),
        )
        .unwrap();
    }

    #[test]
    fn discovers_recipes_at_unbounded_depth() {
        let root = tempfile::tempdir().unwrap();
        write_recipe(&root.path().join("a"), "a");
        write_recipe(&root.path().join("a/nested/b"), "b");
        let found = discover(root.path(), -1);
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn depth_zero_only_looks_at_root() {
        let root = tempfile::tempdir().unwrap();
        write_recipe(root.path(), "root");
        write_recipe(&root.path().join("nested"), "nested");
        let found = discover(root.path(), 0);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].file.name, "root");
    }

    #[test]
    fn skips_conan_and_doxy_directories() {
        let root = tempfile::tempdir().unwrap();
        write_recipe(&root.path().join("conan-cache"), "skip-me");
        write_recipe(&root.path().join("doxygen-output"), "skip-me-too");
        write_recipe(&root.path().join("real"), "keep-me");
        let found = discover(root.path(), -1);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].file.name, "keep-me");
    }

    #[test]
    fn malformed_recipe_is_skipped_without_aborting() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("bad")).unwrap();
        fs::write(root.path().join("bad/recipe.toml"), "not valid toml [[[").unwrap();
        write_recipe(&root.path().join("good"), "good");
        let found = discover(root.path(), -1);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].file.name, "good");
    }
}
