//! Sources of first-run answers.

use super::constants::defaults;
use crate::config::validation;
use crate::config::{Secret, TerminalKind};
use crate::errors::LcsxResult;
use crate::rootfs::Distro;
use std::path::{Path, PathBuf};

/// Values fixed by the command line; a source must not ask for these.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetupRequest {
    pub distro: Option<Distro>,
    pub terminal: Option<TerminalKind>,
    pub port: Option<u16>,
}

/// Validated answers for a fresh setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupAnswers {
    pub user: String,
    pub hostname: String,
    pub password: Secret,
    pub distro: Distro,
    pub terminal: TerminalKind,
    pub port: u16,
}

impl SetupAnswers {
    /// Re-check every field. Sources that bypass prompting call this
    /// before handing answers back.
    pub fn validate(self) -> LcsxResult<Self> {
        validation::validate_username(&self.user)?;
        validation::validate_hostname(&self.hostname)?;
        validation::validate_password(self.password.expose())?;
        validation::validate_port(self.port)?;
        Ok(self)
    }
}

/// Supplies the operator's choices during a fresh setup.
///
/// Implementations either return validated values or fail after their own
/// bounded re-prompting; invalid input never reaches the runtime.
pub trait SetupSource {
    /// Pick the data directory, given the default one.
    fn choose_data_dir(&mut self, default: &Path) -> LcsxResult<PathBuf>;

    /// Collect identity, distribution and terminal backend.
    fn collect(&mut self, request: &SetupRequest) -> LcsxResult<SetupAnswers>;

    /// Whether the HTTP-served terminal should require the system
    /// credentials. Asked only when nothing else decided it.
    fn confirm_basic_auth(&mut self) -> LcsxResult<bool>;
}

/// Non-interactive setup with fixed defaults.
#[derive(Debug, Clone, Default)]
pub struct AutoSetup;

impl SetupSource for AutoSetup {
    fn choose_data_dir(&mut self, default: &Path) -> LcsxResult<PathBuf> {
        Ok(default.to_path_buf())
    }

    fn collect(&mut self, request: &SetupRequest) -> LcsxResult<SetupAnswers> {
        SetupAnswers {
            user: defaults::USER.to_string(),
            hostname: defaults::HOSTNAME.to_string(),
            password: Secret::new(defaults::PASSWORD),
            distro: request.distro.unwrap_or(Distro::Debian),
            terminal: request.terminal.unwrap_or(TerminalKind::Native),
            port: request.port.unwrap_or(defaults::GOTTY_PORT),
        }
        .validate()
    }

    fn confirm_basic_auth(&mut self) -> LcsxResult<bool> {
        Ok(false)
    }
}
