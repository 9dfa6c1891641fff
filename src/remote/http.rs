// src/remote/http.rs

//! HTTP(S) remote backend: basic auth, a hand-rolled `multipart/form-data`
//! encoder, and the short-code wire identity used by the action dispatcher.

use super::{Remote, RemoteState};
use crate::dependency::Dependency;
use crate::error::{Error, Result};
use crate::identity::Properties;
use base64::Engine;
use chrono::Local;
use std::cell::Cell;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Payloads at or above this size go through `/upload` instead of `/api`.
const UPLOAD_THRESHOLD: u64 = 50 * 1024 * 1024;

fn encode_os(os: &str) -> Option<&'static str> {
    match os {
        "Windows" => Some("w"),
        "Linux" => Some("l"),
        _ => None,
    }
}

fn encode_arch(arch: &str) -> Option<&'static str> {
    match arch {
        "x86_64" => Some("x"),
        "aarch64" => Some("a"),
        _ => None,
    }
}

fn encode_kind(kind: &str) -> Option<&'static str> {
    match kind {
        "shared" => Some("r"),
        "static" => Some("t"),
        "header" => Some("h"),
        "any" => Some("a"),
        _ => None,
    }
}

fn encode_compiler(compiler: &str) -> Option<&'static str> {
    match compiler {
        "gnu" => Some("g"),
        "msvc" => Some("m"),
        _ => None,
    }
}

/// Build the short-coded field list for an identity. Unset/unrecognized
/// fields are omitted; `name` and `version` always pass through verbatim.
fn short_code_fields(p: &Properties) -> Vec<(&'static str, String)> {
    let mut fields = vec![
        ("name", p.name.clone()),
        ("version", p.version.clone()),
    ];
    if let Some(c) = encode_os(&p.os) {
        fields.push(("os", c.to_string()));
    }
    if let Some(c) = encode_arch(&p.arch) {
        fields.push(("arch", c.to_string()));
    }
    if let Some(c) = encode_kind(&p.kind) {
        fields.push(("kind", c.to_string()));
    }
    if let Some(c) = encode_compiler(&p.compiler) {
        fields.push(("compiler", c.to_string()));
    }
    fields
}

/// A minimal, boundary-based `multipart/form-data` body builder: no
/// dependency on a form crate, mirroring the server's own hand-built parser.
struct Multipart {
    boundary: String,
    body: Vec<u8>,
}

impl Multipart {
    fn new() -> Self {
        Multipart {
            boundary: format!("----edmBoundary{}", std::process::id()),
            body: Vec::new(),
        }
    }

    fn field(&mut self, name: &str, value: &str) -> &mut Self {
        write!(
            self.body,
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
            self.boundary, name, value
        )
        .ok();
        self
    }

    fn file(&mut self, name: &str, filename: &str, bytes: &[u8]) -> &mut Self {
        write!(
            self.body,
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
            self.boundary, name, filename
        )
        .ok();
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    fn finish(mut self) -> (String, Vec<u8>) {
        write!(self.body, "--{}--\r\n", self.boundary).ok();
        (
            format!("multipart/form-data; boundary={}", self.boundary),
            self.body,
        )
    }
}

pub struct Http {
    name: String,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
    client: reqwest::blocking::Client,
    state: RemoteState,
}

impl Http {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        username: Option<String>,
        password: Option<String>,
        default: bool,
    ) -> Self {
        Http {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            username,
            password,
            client: reqwest::blocking::Client::new(),
            state: RemoteState {
                dependencies: Vec::new(),
                valid: Cell::new(false),
                default,
            },
        }
    }

    fn auth_header(&self) -> Option<String> {
        let user = self.username.as_deref().unwrap_or("");
        let pass = self.password.as_deref().unwrap_or("");
        if user.is_empty() && pass.is_empty() {
            return None;
        }
        let token = base64::engine::general_purpose::STANDARD.encode(format!("{user}:{pass}"));
        Some(format!("Basic {token}"))
    }

    /// Any non-200 response marks the remote invalid for the rest of this
    /// process, regardless of which `&self` method observed it.
    fn log_failure(&self, status: reqwest::StatusCode, body: &str) {
        self.state.valid.set(false);
        tracing::warn!("remote {} marked invalid after non-200 response", self.name);
        let banner = format!(
            "[{}] {} on {}: {}\n",
            Local::now().to_rfc3339(),
            status,
            self.base_url,
            body
        );
        if let Ok(mut f) = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open("error.log")
        {
            let _ = f.write_all(banner.as_bytes());
        }
    }
}

impl Remote for Http {
    fn name(&self) -> &str {
        &self.name
    }
    fn kind(&self) -> &'static str {
        "srv"
    }
    fn is_default(&self) -> bool {
        self.state.default
    }
    fn is_valid(&self) -> bool {
        self.state.valid.get()
    }

    fn connect(&mut self) -> Result<()> {
        let mut req = self.client.get(format!("{}/api", self.base_url));
        if let Some(h) = self.auth_header() {
            req = req.header("Authorization", h);
        }
        let resp = req.send().map_err(|e| Error::network(e.to_string()))?;
        let success = resp.status().is_success();
        self.state.valid.set(success);
        if !success {
            let status = resp.status();
            let body = resp.text().unwrap_or_default();
            self.log_failure(status, &body);
            return Err(Error::network(format!("connect to {} failed: {}", self.base_url, status)));
        }
        Ok(())
    }

    fn get_file(&self, remote_name: &str, local_dir: &Path) -> Result<PathBuf> {
        let mut req = self.client.get(format!("{}/{}", self.base_url, remote_name));
        if let Some(h) = self.auth_header() {
            req = req.header("Authorization", h);
        }
        let resp = req.send().map_err(|e| Error::network(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            self.log_failure(status, &body);
            return Err(Error::network(format!("GET {remote_name} failed: {status}")));
        }
        let bytes = resp.bytes().map_err(|e| Error::network(e.to_string()))?;
        fs::create_dir_all(local_dir)?;
        let filename = Path::new(remote_name)
            .file_name()
            .ok_or_else(|| Error::network(format!("server path {remote_name} has no filename")))?;
        let dest = local_dir.join(filename);
        fs::write(&dest, &bytes)?;
        Ok(dest)
    }

    fn send_file(&self, local_path: &Path, remote_name: &str) -> Result<()> {
        let bytes = fs::read(local_path)?;
        let endpoint = if bytes.len() as u64 >= UPLOAD_THRESHOLD {
            format!("{}/upload", self.base_url)
        } else {
            format!("{}/api", self.base_url)
        };
        let mut mp = Multipart::new();
        mp.field("action", "push");
        mp.field("name", remote_name);
        mp.file(
            "package",
            local_path.file_name().unwrap_or_default().to_string_lossy().as_ref(),
            &bytes,
        );
        let (content_type, body) = mp.finish();
        let mut req = self
            .client
            .post(&endpoint)
            .header("Content-Type", content_type)
            .body(body);
        if let Some(h) = self.auth_header() {
            req = req.header("Authorization", h);
        }
        let resp = req.send().map_err(|e| Error::network(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            self.log_failure(status, &body);
            return Err(Error::network(format!("upload to {endpoint} failed: {status}")));
        }
        Ok(())
    }

    fn deplist(&self) -> &[Dependency] {
        &self.state.dependencies
    }
    fn deplist_mut(&mut self) -> &mut Vec<Dependency> {
        &mut self.state.dependencies
    }

    /// Overridden: the deplist lives directly at `GET /api`, not at a
    /// `deplist.txt` object.
    fn pull_deplist(&mut self) -> Result<()> {
        let mut req = self.client.get(format!("{}/api", self.base_url));
        if let Some(h) = self.auth_header() {
            req = req.header("Authorization", h);
        }
        let resp = req.send().map_err(|e| Error::network(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            self.log_failure(status, &body);
            return Err(Error::network(format!("GET /api failed: {status}")));
        }
        let text = resp.text().map_err(|e| Error::network(e.to_string()))?;
        self.state.dependencies = text
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| Dependency::new(Properties::parse(l)))
            .filter(|d| d.properties.valid)
            .collect();
        Ok(())
    }

    /// Overridden: pull dispatches `action=pull` with the short-coded
    /// identity, then follows the returned path with a plain `GET`.
    fn pull(&self, dep: &Dependency, dest: &Path) -> Result<PathBuf> {
        let mut mp = Multipart::new();
        mp.field("action", "pull");
        for (k, v) in short_code_fields(&dep.properties) {
            mp.field(k, &v);
        }
        let (content_type, body) = mp.finish();
        let mut req = self
            .client
            .post(format!("{}/api", self.base_url))
            .header("Content-Type", content_type)
            .body(body);
        if let Some(h) = self.auth_header() {
            req = req.header("Authorization", h);
        }
        let resp = req.send().map_err(|e| Error::network(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            self.log_failure(status, &body);
            return Err(Error::network(format!("action=pull failed: {status}")));
        }
        let remote_path = resp.text().map_err(|e| Error::network(e.to_string()))?;
        let remote_path = remote_path.trim();
        // Reject a server-returned path that escapes the destination
        // directory: no traversal components, not absolute.
        if remote_path.contains("..") || Path::new(remote_path).is_absolute() {
            return Err(Error::network(format!(
                "server returned unsafe path: {remote_path}"
            )));
        }
        self.get_file(remote_path, dest)
    }

    /// Overridden: dispatches `action=push` with the short-coded identity
    /// plus the `package` file part, selecting `/upload` above the size
    /// threshold.
    fn push(&mut self, dep: &Dependency, file: &Path, force: bool) -> Result<()> {
        if !file.exists() {
            return Err(Error::io(format!("{} does not exist", file.display())));
        }
        if !self.query(&dep.properties).is_empty() && !force {
            return Err(Error::validation(format!(
                "{} already on remote {}",
                dep.properties, self.name
            )));
        }
        let bytes = fs::read(file)?;
        let endpoint = if bytes.len() as u64 >= UPLOAD_THRESHOLD {
            format!("{}/upload", self.base_url)
        } else {
            format!("{}/api", self.base_url)
        };
        let mut mp = Multipart::new();
        mp.field("action", "push");
        for (k, v) in short_code_fields(&dep.properties) {
            mp.field(k, &v);
        }
        mp.file(
            "package",
            file.file_name().unwrap_or_default().to_string_lossy().as_ref(),
            &bytes,
        );
        let (content_type, body) = mp.finish();
        let mut req = self
            .client
            .post(&endpoint)
            .header("Content-Type", content_type)
            .body(body);
        if let Some(h) = self.auth_header() {
            req = req.header("Authorization", h);
        }
        let resp = req.send().map_err(|e| Error::network(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            self.log_failure(status, &body);
            return Err(Error::network(format!("action=push failed: {status}")));
        }
        self.state.dependencies.push(dep.clone());
        self.push_deplist()
    }
}
