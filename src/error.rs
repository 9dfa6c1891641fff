// src/error.rs

//! Crate-wide error taxonomy.
//!
//! Variants follow the error taxonomy of the design: configuration,
//! I/O, lock, network, build and validation errors. Read operations and
//! transient failures are expected to be logged and absorbed by the caller
//! rather than propagated through this type; `Error` is reserved for
//! failures that abort the enclosing operation.

use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed configuration, missing required remote fields, unknown kind.
    #[error("configuration error: {0}")]
    Config(String),

    /// Missing directories, permission denied, unreadable sidecar.
    #[error("io error: {0}")]
    Io(String),

    /// Deadlock timeout acquiring the data or config lock.
    #[error("lock error: {0}")]
    Lock(String),

    /// Connection failure, non-200 status, exception during transfer.
    #[error("network error: {0}")]
    Network(String),

    /// Missing CMakeLists.txt, missing dependency, non-zero CMake exit.
    #[error("build error for {identity}: {message}")]
    Build { identity: String, message: String },

    /// Malformed identity line, malformed recipe.
    #[error("validation error: {0}")]
    Validation(String),
}

impl Error {
    pub fn io(msg: impl fmt::Display) -> Self {
        Error::Io(msg.to_string())
    }

    pub fn config(msg: impl fmt::Display) -> Self {
        Error::Config(msg.to_string())
    }

    pub fn lock(msg: impl fmt::Display) -> Self {
        Error::Lock(msg.to_string())
    }

    pub fn network(msg: impl fmt::Display) -> Self {
        Error::Network(msg.to_string())
    }

    pub fn build(identity: impl fmt::Display, message: impl fmt::Display) -> Self {
        Error::Build {
            identity: identity.to_string(),
            message: message.to_string(),
        }
    }

    pub fn validation(msg: impl fmt::Display) -> Self {
        Error::Validation(msg.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}
