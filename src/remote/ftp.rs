// src/remote/ftp.rs

//! FTP remote backend: classic control connection, binary transfer mode,
//! paths rooted absolutely at the configured URL (Open Question 9.a).

use super::{Remote, RemoteState};
use crate::dependency::Dependency;
use crate::error::{Error, Result};
use std::cell::Cell;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use suppaftp::FtpStream;

pub struct Ftp {
    name: String,
    host: String,
    port: u16,
    username: String,
    password: String,
    root: String,
    state: RemoteState,
    session: Mutex<Option<FtpStream>>,
}

impl Ftp {
    pub fn new(
        name: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
        root: impl Into<String>,
        default: bool,
    ) -> Self {
        Ftp {
            name: name.into(),
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
            root: root.into(),
            state: RemoteState {
                dependencies: Vec::new(),
                valid: Cell::new(false),
                default,
            },
            session: Mutex::new(None),
        }
    }

    fn absolute(&self, remote_name: &str) -> String {
        format!("{}/{}", self.root.trim_end_matches('/'), remote_name.trim_start_matches('/'))
    }

    fn with_session<T>(&self, f: impl FnOnce(&mut FtpStream) -> Result<T>) -> Result<T> {
        let mut guard = self.session.lock().expect("ftp session mutex poisoned");
        let stream = guard
            .as_mut()
            .ok_or_else(|| Error::network(format!("remote {} not connected", self.name)))?;
        f(stream)
    }
}

impl Remote for Ftp {
    fn name(&self) -> &str {
        &self.name
    }
    fn kind(&self) -> &'static str {
        "ftp"
    }
    fn is_default(&self) -> bool {
        self.state.default
    }
    fn is_valid(&self) -> bool {
        self.state.valid.get()
    }

    fn connect(&mut self) -> Result<()> {
        let mut stream = FtpStream::connect(format!("{}:{}", self.host, self.port))
            .map_err(|e| Error::network(format!("connecting to {}: {e}", self.host)))?;
        stream
            .login(&self.username, &self.password)
            .map_err(|e| Error::network(format!("ftp login failed: {e}")))?;
        stream
            .transfer_type(suppaftp::types::FileType::Binary)
            .map_err(|e| Error::network(format!("setting binary mode: {e}")))?;
        *self.session.lock().expect("ftp session mutex poisoned") = Some(stream);
        self.state.valid.set(true);
        Ok(())
    }

    fn get_file(&self, remote_name: &str, local_dir: &Path) -> Result<PathBuf> {
        let path = self.absolute(remote_name);
        let filename = Path::new(remote_name)
            .file_name()
            .ok_or_else(|| Error::network(format!("{remote_name} has no filename")))?;
        let dest = local_dir.join(filename);
        fs::create_dir_all(local_dir)?;
        let result = self.with_session(|stream| {
            let mut reader = stream
                .retr_as_stream(&path)
                .map_err(|e| Error::network(format!("RETR {path}: {e}")))?;
            let mut bytes = Vec::new();
            reader
                .read_to_end(&mut bytes)
                .map_err(|e| Error::network(format!("reading {path}: {e}")))?;
            stream
                .finalize_retr_stream(reader)
                .map_err(|e| Error::network(format!("finalizing RETR {path}: {e}")))?;
            fs::write(&dest, &bytes)?;
            Ok(())
        });
        if result.is_err() {
            self.state.valid.set(false);
        }
        result?;
        Ok(dest)
    }

    fn send_file(&self, local_path: &Path, remote_name: &str) -> Result<()> {
        let path = self.absolute(remote_name);
        let bytes = fs::read(local_path)?;
        let result = self.with_session(|stream| {
            let mut cursor = std::io::Cursor::new(bytes);
            stream
                .put_file(&path, &mut cursor)
                .map_err(|e| Error::network(format!("STOR {path}: {e}")))?;
            Ok(())
        });
        if result.is_err() {
            self.state.valid.set(false);
        }
        result
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
    fn absolute_path_is_rooted_at_configured_directory() {
        let ftp = Ftp::new("r", "ftp.example.com", 21, "u", "p", "/pub/edm", false);
        assert_eq!(ftp.absolute("foo/abcd.tgz"), "/pub/edm/foo/abcd.tgz");
    }

    #[test]
    fn absolute_path_tolerates_trailing_and_leading_slashes() {
        let ftp = Ftp::new("r", "ftp.example.com", 21, "u", "p", "/pub/edm/", false);
        assert_eq!(ftp.absolute("/deplist.txt"), "/pub/edm/deplist.txt");
    }
}
