// src/identity/mod.rs

//! Package identity: the `Properties` tuple, its textual forms, hashing,
//! ordering and query matching.
//!
//! A package's identity is the eight-attribute tuple `(name, version, os,
//! arch, kind, compiler, glibc, build_date)`. `Properties` is immutable once
//! constructed; every mutating helper returns a new value.

pub mod glob;
pub mod version;

use chrono::{DateTime, FixedOffset, SubsecRound, TimeZone};
use sha1::{Digest, Sha1};
use std::cmp::Ordering;
use std::fmt;
use std::path::Path;

/// Attributes for which a wildcard does not suppress matching: the source's
/// mandatory pair `{name, version}` must always be satisfied, wildcard or not.
const MANDATORY: [&str; 2] = ["name", "version"];

/// Values treated as "unconstrained" outside the mandatory pair.
fn is_wildcard(v: &str) -> bool {
    matches!(v, "" | "*" | "any")
}

/// The eight-attribute package identity. `build_date` has no string form of
/// its own among the source attributes: `None` means "unconstrained" (the
/// only sensible wildcard for a query), `Some(_)` is a concrete timestamp.
#[derive(Debug, Clone)]
pub struct Properties {
    pub name: String,
    pub version: String,
    pub os: String,
    pub arch: String,
    pub kind: String,
    pub compiler: String,
    pub glibc: String,
    pub build_date: Option<DateTime<FixedOffset>>,
    /// False when this value was produced by parsing a malformed one-line
    /// string; callers must then treat the entry as absent.
    pub valid: bool,
}

impl Default for Properties {
    fn default() -> Self {
        Properties {
            name: "*".to_string(),
            version: "*".to_string(),
            os: "any".to_string(),
            arch: "any".to_string(),
            kind: "any".to_string(),
            compiler: "any".to_string(),
            glibc: String::new(),
            build_date: None,
            valid: true,
        }
    }
}

impl Properties {
    /// A query that matches anything: every attribute is a wildcard.
    pub fn wildcard() -> Self {
        Properties::default()
    }

    /// A concrete, minimal identity for `name`/`version`; other attributes
    /// default to "any" as in [`Properties::default`].
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Properties {
            name: name.into(),
            version: version.into(),
            ..Properties::default()
        }
    }

    fn attrs(&self) -> [(&'static str, String); 7] {
        [
            ("name", self.name.clone()),
            ("version", self.version.clone()),
            ("os", self.os.clone()),
            ("arch", self.arch.clone()),
            ("kind", self.kind.clone()),
            ("compiler", self.compiler.clone()),
            ("glibc", self.glibc.clone()),
        ]
    }

    /// SHA-1 over the concatenation of every attribute's textual form, in
    /// attribute order, plus the build date when one is set. This is the
    /// package's storage key.
    pub fn hash(&self) -> String {
        let mut hasher = Sha1::new();
        for (_, v) in self.attrs() {
            hasher.update(v.as_bytes());
        }
        if let Some(d) = self.build_date {
            hasher.update(d.to_rfc3339().as_bytes());
        }
        hex::encode(hasher.finalize())
    }

    /// True iff `self` (the stored candidate) satisfies `query`. For every
    /// source attribute, either side is a wildcard and the attribute is not
    /// one of the mandatory pair, or a glob translation of the query
    /// attribute regex-matches the candidate attribute. `build_date` is
    /// never mandatory: a query's `None` (or a candidate's `None`) always
    /// matches, and two concrete dates must be exactly equal.
    pub fn matches(&self, query: &Properties) -> bool {
        let self_attrs = self.attrs();
        let query_attrs = query.attrs();
        for i in 0..self_attrs.len() {
            let (attr, candidate) = &self_attrs[i];
            let (_, pattern) = &query_attrs[i];
            if !MANDATORY.contains(attr) && (is_wildcard(pattern) || is_wildcard(candidate)) {
                continue;
            }
            if !glob::glob_match(pattern, candidate) {
                return false;
            }
        }
        match (query.build_date, self.build_date) {
            (None, _) | (_, None) => true,
            (Some(q), Some(c)) => q == c,
        }
    }

    /// True iff `self`'s version is strictly greater than `other`'s.
    pub fn version_greater(&self, other: &Properties) -> bool {
        version::gt(&self.version, &other.version)
    }

    /// Glibc compatibility check: always true off Linux or when unconstrained,
    /// otherwise true iff this package's version precedes the system's.
    pub fn libc_compatible(&self, system_libc_version: &str) -> bool {
        if is_wildcard(system_libc_version) {
            return true;
        }
        if self.os != "Linux" {
            return true;
        }
        version::lt(&self.version, system_libc_version)
    }

    /// Textual one-line form:
    /// `"<name>/<version> (<iso8601 build-date>) [<arch>, <kind>, <os>, <compiler>[, <glibc>]]"`.
    pub fn format(&self) -> String {
        let date_str = self
            .build_date
            .map(|d| d.trunc_subsecs(0).to_rfc3339())
            .unwrap_or_default();
        let mut out = format!(
            "{}/{} ({}) [{}, {}, {}, {}",
            self.name, self.version, date_str, self.arch, self.kind, self.os, self.compiler
        );
        if !self.glibc.is_empty() && self.glibc != "*" {
            out.push_str(", ");
            out.push_str(&self.glibc);
        }
        out.push(']');
        out
    }

    /// Parse the one-line form. On malformed input, returns a
    /// default-constructed value with `valid = false`; the caller must treat
    /// it as absent.
    pub fn parse(line: &str) -> Properties {
        match Self::try_parse(line) {
            Some(p) => p,
            None => {
                tracing::error!("malformed identity line: '{line}'");
                let mut p = Properties::default();
                p.valid = false;
                p
            }
        }
    }

    fn try_parse(line: &str) -> Option<Properties> {
        let line = line.trim();
        let (predicate, rest) = line.split_once(' ')?;
        let (name, version) = predicate.split_once('/')?;
        let rest = rest.trim();

        let (date_str, rest) = if let Some(open) = rest.find('(') {
            let close = rest.find(')')?;
            let date = rest[open + 1..close].trim().to_string();
            (Some(date), rest[close + 1..].trim())
        } else {
            (None, rest)
        };

        let bracket_start = rest.find('[')?;
        let bracket_end = rest.rfind(']')?;
        let items: Vec<&str> = rest[bracket_start + 1..bracket_end]
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect();
        if items.len() != 4 && items.len() != 5 {
            return None;
        }

        let build_date = match date_str {
            Some(d) if !d.is_empty() => Some(DateTime::parse_from_rfc3339(&d).ok()?),
            _ => None,
        };

        Some(Properties {
            name: name.to_string(),
            version: version.to_string(),
            arch: items[0].to_string(),
            kind: items[1].to_string(),
            os: items[2].to_string(),
            compiler: items[3].to_string(),
            glibc: items.get(4).map(|s| s.to_string()).unwrap_or_default(),
            build_date,
            valid: true,
        })
    }

    /// Read the `edp.info` sidecar grammar: `key = value` lines, whitespace
    /// tolerant, unknown keys ignored, missing keys retain defaults.
    pub fn from_edp_str(contents: &str) -> Properties {
        let mut p = Properties::default();
        for line in contents.lines() {
            let Some((key, val)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let val = val.trim();
            if val.is_empty() {
                continue;
            }
            match key {
                "name" => p.name = val.to_string(),
                "version" => p.version = val.to_string(),
                "os" => p.os = val.to_string(),
                "arch" => p.arch = val.to_string(),
                "kind" => p.kind = val.to_string(),
                "compiler" => p.compiler = val.to_string(),
                "glibc" => p.glibc = val.to_string(),
                "build_date" => {
                    if let Ok(d) = DateTime::parse_from_rfc3339(val) {
                        p.build_date = Some(d);
                    }
                }
                _ => continue,
            }
        }
        p
    }

    pub fn from_edp_file(path: &Path) -> crate::error::Result<Properties> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| crate::error::Error::io(format!("reading {}: {e}", path.display())))?;
        Ok(Properties::from_edp_str(&contents))
    }

    /// Emit the sidecar form: all keys, unconditionally, one per line.
    pub fn to_edp_str(&self) -> String {
        let date_str = self
            .build_date
            .map(|d| d.trunc_subsecs(0).to_rfc3339())
            .unwrap_or_default();
        format!(
            "name = {}\nversion = {}\nos = {}\narch = {}\nkind = {}\ncompiler = {}\nglibc = {}\nbuild_date = {}\n",
            self.name, self.version, self.os, self.arch, self.kind, self.compiler, self.glibc, date_str,
        )
    }

    pub fn to_edp_file(&self, path: &Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_edp_str())?;
        Ok(())
    }

    /// Directory name this identity would occupy in the local store.
    pub fn dirname(&self) -> String {
        format!("{}{}", self.name, self.hash())
    }
}

impl fmt::Display for Properties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format())
    }
}

impl PartialEq for Properties {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.version == other.version
            && self.os == other.os
            && self.arch == other.arch
            && self.kind == other.kind
            && self.compiler == other.compiler
            && self.glibc == other.glibc
            && self.build_date == other.build_date
    }
}
impl Eq for Properties {}

impl Ord for Properties {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| version::compare(&self.version, &other.version))
            .then_with(|| self.os.cmp(&other.os))
            .then_with(|| self.arch.cmp(&other.arch))
            .then_with(|| self.kind.cmp(&other.kind))
            .then_with(|| self.compiler.cmp(&other.compiler))
            .then_with(|| version::compare(&self.glibc, &other.glibc))
            .then_with(|| self.build_date.cmp(&other.build_date))
    }
}

impl PartialOrd for Properties {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Properties {
        Properties {
            name: "foo".into(),
            version: "1.0".into(),
            os: "Linux".into(),
            arch: "x86_64".into(),
            kind: "shared".into(),
            compiler: "gnu".into(),
            glibc: String::new(),
            build_date: Some(
                FixedOffset::east_opt(0)
                    .unwrap()
                    .with_ymd_and_hms(2024, 3, 4, 12, 0, 0)
                    .unwrap(),
            ),
            valid: true,
        }
    }

    #[test]
    fn round_trip_one_line_form() {
        let p = sample();
        let parsed = Properties::parse(&p.format());
        assert_eq!(p, parsed);
    }

    #[test]
    fn round_trip_sidecar_form() {
        let p = sample();
        let parsed = Properties::from_edp_str(&p.to_edp_str());
        assert_eq!(p, parsed);
    }

    #[test]
    fn self_match_is_true() {
        let p = sample();
        assert!(p.matches(&p));
    }

    #[test]
    fn wildcard_query_matches_everything() {
        let p = sample();
        let q = Properties {
            name: "foo".into(),
            ..Properties::wildcard()
        };
        assert!(p.matches(&q));
    }

    #[test]
    fn unconstrained_build_date_matches_any_concrete_timestamp() {
        let p = sample();
        let q = Properties::new("foo", "1.0");
        assert!(q.build_date.is_none());
        assert!(p.matches(&q));
    }

    #[test]
    fn mismatched_concrete_build_dates_do_not_match() {
        let p = sample();
        let mut q = sample();
        q.build_date = Some(
            FixedOffset::east_opt(0)
                .unwrap()
                .with_ymd_and_hms(2020, 1, 1, 0, 0, 0)
                .unwrap(),
        );
        assert!(!p.matches(&q));
    }

    #[test]
    fn glob_query_matches_name_prefix() {
        let p = sample();
        let q = Properties::new("f*", "*");
        assert!(p.matches(&q));
        let q2 = Properties::new("xf*", "*");
        assert!(!p.matches(&q2));
    }

    #[test]
    fn malformed_line_yields_invalid_flag() {
        let p = Properties::parse("not a valid identity line");
        assert!(!p.valid);
    }

    #[test]
    fn hash_is_stable_and_distinguishes_identities() {
        let a = sample();
        let mut b = sample();
        b.version = "2.0".into();
        assert_eq!(a.hash(), sample().hash());
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn ordering_is_total_over_versions() {
        let mut a = sample();
        a.version = "1.9".into();
        let mut b = sample();
        b.version = "1.10".into();
        assert!(a < b);
    }
}
