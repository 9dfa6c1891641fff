// src/host.rs

//! Minimal machine-detection shim: the handful of facts Builder and System
//! need about the host they're running on. Replaces the source's dynamic
//! `Machine` probe with a narrow, compile-time-resolved interface.

use std::process::Command;

/// Host operating system name, in the vocabulary `Properties` uses.
pub fn os() -> &'static str {
    if cfg!(target_os = "windows") {
        "Windows"
    } else if cfg!(target_os = "linux") {
        "Linux"
    } else if cfg!(target_os = "macos") {
        "Darwin"
    } else {
        "any"
    }
}

/// Host CPU architecture, in the vocabulary `Properties` uses.
pub fn arch() -> &'static str {
    if cfg!(target_arch = "x86_64") {
        "x86_64"
    } else if cfg!(target_arch = "aarch64") {
        "aarch64"
    } else {
        "any"
    }
}

/// The compiler family Builder defaults to for this host: `msvc` on
/// Windows, `gnu` elsewhere.
pub fn default_compiler() -> &'static str {
    if cfg!(target_os = "windows") {
        "msvc"
    } else {
        "gnu"
    }
}

/// glibc version string reported by `ldd --version`'s first line, empty off
/// Linux or when the probe fails.
pub fn glibc_version() -> String {
    if os() != "Linux" {
        return String::new();
    }
    let output = match Command::new("ldd").arg("--version").output() {
        Ok(o) => o,
        Err(_) => return String::new(),
    };
    let text = String::from_utf8_lossy(&output.stdout);
    text.lines()
        .next()
        .and_then(|line| line.rsplit(' ').next())
        .map(|v| v.to_string())
        .unwrap_or_default()
}
