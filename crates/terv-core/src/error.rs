//! Error taxonomy shared by every core subsystem.
//!
//! Each step of the resolve/retrieve/install pipeline returns one of these
//! variants instead of panicking; the CLI layer decides how to surface them.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TervError {
    #[error("Invalid version request: {0}")]
    Resolution(String),

    #[error("No compatible version found")]
    NoCompatibleVersion,

    #[error("HTTP error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unexpected value returned by API: {0}")]
    ResponseShape(String),

    #[error("Checksum mismatch for {file_name}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        file_name: String,
        expected: String,
        actual: String,
    },

    #[error("Checksum not found for {0} in checksums file")]
    ChecksumNotFound(String),

    #[error("Signature verification failed: {0}")]
    SignatureInvalid(String),

    #[error("cosign executable not found")]
    CosignNotInstalled,

    #[error("Unsupported install mode: {0}")]
    InstallMode(String),

    #[error("Unsupported list mode: {0}")]
    ListMode(String),

    #[error("Lock error in {dir}: {source}")]
    Lock {
        dir: String,
        source: std::io::Error,
    },

    #[error("Failed to spawn {path}: {source}")]
    ProcessSpawn {
        path: String,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("{context}: {message}")]
    Context {
        context: &'static str,
        message: String,
    },
}

impl TervError {
    /// Create an error with context for better debugging.
    pub fn context(ctx: &'static str, msg: impl std::fmt::Display) -> Self {
        Self::Context {
            context: ctx,
            message: msg.to_string(),
        }
    }

    /// Shorthand for a resolution failure.
    pub fn resolution(msg: impl std::fmt::Display) -> Self {
        Self::Resolution(msg.to_string())
    }
}

impl From<zip::result::ZipError> for TervError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Archive(err.to_string())
    }
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, TervError>;
