// src/remote/folder.rs

//! Shared-folder remote backend: the "remote" is a directory reachable on
//! the local filesystem (typically a network mount). No credentials.

use super::{Remote, RemoteState};
use crate::dependency::Dependency;
use crate::error::{Error, Result};
use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};

pub struct Folder {
    name: String,
    root: PathBuf,
    state: RemoteState,
}

impl Folder {
    pub fn new(name: impl Into<String>, root: PathBuf, default: bool) -> Self {
        Folder {
            name: name.into(),
            root,
            state: RemoteState {
                dependencies: Vec::new(),
                valid: Cell::new(false),
                default,
            },
        }
    }
}

impl Remote for Folder {
    fn name(&self) -> &str {
        &self.name
    }
    fn kind(&self) -> &'static str {
        "folder"
    }
    fn is_default(&self) -> bool {
        self.state.default
    }
    fn is_valid(&self) -> bool {
        self.state.valid.get()
    }

    fn connect(&mut self) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        self.state.valid.set(self.root.is_dir());
        if !self.state.valid.get() {
            return Err(Error::io(format!("{} is not a directory", self.root.display())));
        }
        Ok(())
    }

    fn get_file(&self, remote_name: &str, local_dir: &Path) -> Result<PathBuf> {
        let src = self.root.join(remote_name);
        let filename = Path::new(remote_name)
            .file_name()
            .ok_or_else(|| Error::io(format!("{remote_name} has no filename")))?;
        let dest = local_dir.join(filename);
        fs::create_dir_all(local_dir)?;
        fs::copy(&src, &dest).map_err(|e| {
            self.state.valid.set(false);
            Error::io(format!("copying {}: {e}", src.display()))
        })?;
        Ok(dest)
    }

    fn send_file(&self, local_path: &Path, remote_name: &str) -> Result<()> {
        let dest = self.root.join(remote_name);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(local_path, &dest).map_err(|e| {
            self.state.valid.set(false);
            Error::io(format!("copying to {}: {e}", dest.display()))
        })?;
        Ok(())
    }

    fn deplist(&self) -> &[Dependency] {
        &self.state.dependencies
    }
    fn deplist_mut(&mut self) -> &mut Vec<Dependency> {
        &mut self.state.dependencies
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_creates_missing_directory() {
        let base = tempfile::tempdir().unwrap();
        let root = base.path().join("shared");
        let mut folder = Folder::new("local-share", root.clone(), true);
        folder.connect().unwrap();
        assert!(root.is_dir());
        assert!(folder.is_valid());
    }

    #[test]
    fn send_then_get_round_trips_bytes() {
        let base = tempfile::tempdir().unwrap();
        let mut folder = Folder::new("local-share", base.path().join("shared"), true);
        folder.connect().unwrap();

        let staging = tempfile::tempdir().unwrap();
        let src = staging.path().join("pkg.tgz");
        fs::write(&src, b"archive bytes").unwrap();
        folder.send_file(&src, "foo/pkg.tgz").unwrap();

        let dest = tempfile::tempdir().unwrap();
        let fetched = folder.get_file("foo/pkg.tgz", dest.path()).unwrap();
        assert_eq!(fs::read(fetched).unwrap(), b"archive bytes");
    }
}
