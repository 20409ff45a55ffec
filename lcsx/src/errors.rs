//! Hierarchical error types for LCSX.
//!
//! Errors are categorized by the component that raises them:
//! - [`FetchError`]: network transfer failed after exhausting retries
//! - [`ExtractError`]: archive corrupt or in an unsupported format (fatal)
//! - [`ProvisionError`]: helper binary could not be provisioned (fatal)
//! - [`BootstrapError`]: rootfs could not be made valid (fatal)
//! - [`ConfigError`]: configuration file missing, malformed or unwritable
//! - [`ValidationError`]: malformed user input (recovered by re-prompting)
//! - [`LaunchError`]: the sandboxed session could not be started

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type LcsxResult<T> = Result<T, LcsxError>;

// ============================================================================
// Top-Level Error
// ============================================================================

/// Errors that can occur while setting up or launching an environment.
///
/// ```ignore
/// match runtime.prepare(&mut source) {
///     Err(LcsxError::Fetch(_)) => { /* network exhausted its retries */ }
///     Err(LcsxError::Validation(_)) => { /* user input rejected */ }
///     Err(_) => { /* fatal, abort */ }
///     Ok(config) => { /* CONFIGURED */ }
/// }
/// ```
#[derive(Debug, Error)]
pub enum LcsxError {
    #[error("fetch: {0}")]
    Fetch(#[from] FetchError),

    /// The HTTP client could not be constructed.
    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    #[error("extract: {0}")]
    Extract(#[from] ExtractError),

    #[error("provision: {0}")]
    Provision(#[from] ProvisionError),

    #[error("bootstrap: {0}")]
    Bootstrap(#[from] BootstrapError),

    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("validation: {0}")]
    Validation(#[from] ValidationError),

    #[error("launch: {0}")]
    Launch(#[from] LaunchError),

    /// Generic IO error (catch-all).
    #[error("io: {0}")]
    Io(#[from] io::Error),
}

// ============================================================================
// Network Errors
// ============================================================================

/// A single transfer attempt failed.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unsupported url scheme '{0}'")]
    UnsupportedScheme(String),

    #[error("server responded with HTTP {0}")]
    Status(u16),

    #[error("http: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io: {0}")]
    Io(#[from] io::Error),
}

/// Every attempt to fetch `url` failed.
///
/// Only raised after the retry budget is spent; the destination file is
/// guaranteed not to exist when this is returned.
#[derive(Debug, Error)]
#[error("{url} after {attempts} attempt(s): {cause}")]
pub struct FetchError {
    pub url: String,
    pub attempts: u32,
    #[source]
    pub cause: TransportError,
}

// ============================================================================
// Archive Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unsupported archive format for {path}")]
    UnsupportedFormat { path: PathBuf },

    #[error("corrupt archive {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("entry {entry}: {source}")]
    Entry {
        entry: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

// ============================================================================
// Provisioning Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum ProvisionError {
    /// No download is published for this architecture. Not retryable.
    #[error("{artifact} is not available for architecture '{arch}'")]
    UnsupportedArchitecture { artifact: String, arch: String },

    /// The archive downloaded fine but the binary is not inside it,
    /// which means the upstream archive layout changed.
    #[error("binary '{binary}' not found in {dir} after extraction")]
    BinaryNotFound { binary: String, dir: PathBuf },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

// ============================================================================
// Bootstrap Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum BootstrapError {
    /// A fresh extraction still lacks the configured shell.
    #[error("rootfs at {root} has no {shell} after a fresh download")]
    InvalidAfterFetch { root: PathBuf, shell: String },

    #[error("package bootstrap exited with {status}")]
    PackageBootstrap { status: String },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

// ============================================================================
// Config Errors
// ============================================================================

/// Configuration store failures.
///
/// `Missing` and `Malformed` are kept apart so callers can decide
/// whether a migration should be attempted.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no configuration at {0}")]
    Missing(PathBuf),

    #[error("malformed configuration at {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("incomplete configuration, missing: {}", .0.join(", "))]
    Incomplete(Vec<&'static str>),

    #[error("serialize: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

// ============================================================================
// Validation Errors
// ============================================================================

/// Malformed user input. Never escapes the prompt boundary in interactive
/// mode; scripted sources surface it directly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("username: {0}")]
    Username(String),

    #[error("hostname: {0}")]
    Hostname(String),

    #[error("password: {0}")]
    Password(String),

    #[error("port: {0}")]
    Port(String),

    #[error("credential: {0}")]
    Credential(String),

    #[error("path: {0}")]
    Path(String),

    /// Answer outside a fixed set of options.
    #[error("choice: {0}")]
    Choice(String),

    #[error("architecture: unsupported '{0}'")]
    Architecture(String),

    #[error("{field}: no valid answer after {attempts} attempt(s)")]
    Exhausted { field: &'static str, attempts: u32 },
}

// ============================================================================
// Launch Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("configuration is not launchable: {0}")]
    NotConfigured(String),

    #[error("spawn {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
}

// ============================================================================
// Convenience Constructors
// ============================================================================

impl ExtractError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl ProvisionError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl BootstrapError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl ConfigError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True when the file simply does not exist yet.
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing(_))
    }
}
