//! The persisted configuration record.

use crate::artifacts::Artifact;
use crate::errors::ValidationError;
use crate::runtime::layout::DataLayout;
use crate::runtime::platform::Architecture;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

// ============================================================================
// Secrets
// ============================================================================

/// A password. Renders as `****` in `Debug` and `Display`; use
/// [`Secret::expose`] where the plain value is genuinely needed.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

/// Basic-auth credential for the HTTP-served terminal, stored as `user:pass`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Credential {
    user: String,
    password: Secret,
}

impl Credential {
    pub fn new(user: impl Into<String>, password: Secret) -> Self {
        Self {
            user: user.into(),
            password,
        }
    }

    /// The `user:pass` form handed to the backend.
    pub fn to_arg(&self) -> String {
        format!("{}:{}", self.user, self.password.expose())
    }
}

impl FromStr for Credential {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(user), Some(pass), None) if !user.is_empty() && !pass.is_empty() => {
                Ok(Self::new(user, Secret::new(pass)))
            }
            (Some(_), Some(_), None) => Err(ValidationError::Credential(
                "both username and password are required".to_string(),
            )),
            _ => Err(ValidationError::Credential(
                "expected the form 'username:password'".to_string(),
            )),
        }
    }
}

/// Stored records split at the first `:` only; the password may contain
/// further colons when it comes from the system account.
impl TryFrom<String> for Credential {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.split_once(':') {
            Some((user, pass)) if !user.is_empty() && !pass.is_empty() => {
                Ok(Self::new(user, Secret::new(pass)))
            }
            _ => Err(ValidationError::Credential(
                "expected the form 'username:password'".to_string(),
            )),
        }
    }
}

impl From<Credential> for String {
    fn from(value: Credential) -> Self {
        value.to_arg()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:****", self.user)
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:****", self.user)
    }
}

// ============================================================================
// Terminal backends
// ============================================================================

/// How the session inside the sandbox reaches the operator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TerminalService {
    /// The sandboxed shell runs on the current terminal.
    #[default]
    Native,

    /// Single-session remote pty relay.
    Sshx {
        #[serde(default)]
        binary_path: PathBuf,
    },

    /// Terminal served over HTTP.
    Gotty {
        #[serde(default)]
        binary_path: PathBuf,
        #[serde(default)]
        port: u16,
        #[serde(default)]
        credential: Option<Credential>,
    },
}

/// Backend selector without the provisioned details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminalKind {
    Native,
    Sshx,
    Gotty,
}

impl TerminalKind {
    pub fn name(&self) -> &'static str {
        match self {
            TerminalKind::Native => "native",
            TerminalKind::Sshx => "sshx",
            TerminalKind::Gotty => "gotty",
        }
    }

    /// Artifact backing this backend, if any.
    pub fn artifact(&self) -> Option<Artifact> {
        match self {
            TerminalKind::Native => None,
            TerminalKind::Sshx => Some(Artifact::Sshx),
            TerminalKind::Gotty => Some(Artifact::Gotty),
        }
    }
}

impl fmt::Display for TerminalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TerminalService {
    pub fn kind(&self) -> TerminalKind {
        match self {
            TerminalService::Native => TerminalKind::Native,
            TerminalService::Sshx { .. } => TerminalKind::Sshx,
            TerminalService::Gotty { .. } => TerminalKind::Gotty,
        }
    }

    pub fn binary_path(&self) -> Option<&Path> {
        match self {
            TerminalService::Native => None,
            TerminalService::Sshx { binary_path } | TerminalService::Gotty { binary_path, .. } => {
                Some(binary_path)
            }
        }
    }

    /// Backend-specific fields that are absent or invalid.
    fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        match self {
            TerminalService::Native => {}
            TerminalService::Sshx { binary_path } => {
                if binary_path.as_os_str().is_empty() {
                    missing.push("terminal_service.binary_path");
                }
            }
            TerminalService::Gotty {
                binary_path, port, ..
            } => {
                if binary_path.as_os_str().is_empty() {
                    missing.push("terminal_service.binary_path");
                }
                if super::validation::validate_port(*port).is_err() {
                    missing.push("terminal_service.port");
                }
            }
        }
        missing
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Persistent record at `<data_dir>/config.json`.
///
/// Every field defaults when absent so that a partial file reads as
/// incomplete rather than malformed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub user: String,
    pub hostname: String,
    pub password: Secret,
    pub architecture: Option<Architecture>,
    pub distro_url: String,
    pub shell_path: String,
    pub sandbox_binary_name: String,
    pub rootfs_path: Option<PathBuf>,
    pub terminal_service: TerminalService,
    pub data_dir: PathBuf,
}

impl Configuration {
    /// Names of required fields that are empty, in declaration order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        let mut require = |name, present: bool| {
            if !present {
                missing.push(name);
            }
        };

        require("user", !self.user.is_empty());
        require("hostname", !self.hostname.is_empty());
        require("password", !self.password.is_empty());
        require("architecture", self.architecture.is_some());
        require("distro_url", !self.distro_url.is_empty());
        require("shell_path", !self.shell_path.is_empty());
        require("sandbox_binary_name", !self.sandbox_binary_name.is_empty());
        require(
            "rootfs_path",
            self.rootfs_path
                .as_ref()
                .is_some_and(|p| !p.as_os_str().is_empty()),
        );

        missing.extend(self.terminal_service.missing_fields());
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    pub fn layout(&self) -> DataLayout {
        DataLayout::new(&self.data_dir)
    }

    /// Sandbox binary under this record's data directory.
    pub fn sandbox_binary_path(&self) -> PathBuf {
        self.layout()
            .artifact_dir(Artifact::Proot.name())
            .join(&self.sandbox_binary_name)
    }

    /// Prompt installed in the guest shell: `user@host# `.
    pub fn prompt(&self) -> String {
        format!("{}@{}# ", self.user, self.hostname)
    }
}
