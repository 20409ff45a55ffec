//! Per-run options for the LCSX runtime.

use crate::config::{Credential, TerminalKind};
use crate::rootfs::Distro;
use std::path::PathBuf;

/// Basic-auth policy requested for the HTTP-served terminal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CredentialChoice {
    /// Keep an existing credential, otherwise ask the setup source.
    #[default]
    Unspecified,
    /// Use exactly this credential.
    Explicit(Credential),
    /// Use the configured system user and password.
    System,
    /// Serve without authentication.
    Disabled,
}

/// Options resolved from the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Data directory named explicitly by the operator.
    ///
    /// When absent the default directory is used and, on a fresh setup,
    /// the setup source may pick another one.
    pub data_dir: Option<PathBuf>,

    /// Distribution to install on a fresh setup.
    pub distro: Option<Distro>,

    /// Terminal backend to switch to, even on an existing configuration.
    pub terminal: Option<TerminalKind>,

    /// Listen port for the HTTP-served terminal.
    pub port: Option<u16>,

    pub credential: CredentialChoice,
}
