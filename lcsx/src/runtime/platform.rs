//! Host CPU architecture.

use crate::errors::{ProvisionError, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Architectures with published proot, rootfs and backend builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Architecture {
    #[serde(rename = "x86_64")]
    X86_64,
    #[serde(rename = "aarch64")]
    Aarch64,
}

impl Architecture {
    pub const ALL: [Architecture; 2] = [Architecture::X86_64, Architecture::Aarch64];

    /// Architecture of the running host.
    ///
    /// Nothing can be provisioned for any other host, so this fails with
    /// the provisioning error rather than a validation error.
    pub fn host() -> Result<Self, ProvisionError> {
        std::env::consts::ARCH
            .parse()
            .map_err(|_| ProvisionError::UnsupportedArchitecture {
                artifact: "lcsx".to_string(),
                arch: std::env::consts::ARCH.to_string(),
            })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Architecture::X86_64 => "x86_64",
            Architecture::Aarch64 => "aarch64",
        }
    }

    /// Go-style name used by some release pages.
    pub fn go_name(&self) -> &'static str {
        match self {
            Architecture::X86_64 => "amd64",
            Architecture::Aarch64 => "arm64",
        }
    }

    /// File name of the proot build for this architecture.
    pub fn sandbox_binary_name(&self) -> &'static str {
        match self {
            Architecture::X86_64 => "proot",
            Architecture::Aarch64 => "prootarm64",
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Architecture {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "x86_64" | "amd64" => Ok(Architecture::X86_64),
            "aarch64" | "arm64" => Ok(Architecture::Aarch64),
            other => Err(ValidationError::Architecture(other.to_string())),
        }
    }
}
