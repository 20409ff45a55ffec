//! Setup and launch orchestration.

use super::constants::defaults;
use super::context::LcsxContext;
use super::layout::DataLayout;
use super::options::{CredentialChoice, RunOptions};
use super::setup::{SetupRequest, SetupSource};
use crate::artifacts::{Artifact, Provisioner};
use crate::config::{
    ConfigStatus, ConfigStore, Configuration, Credential, TerminalKind, TerminalService,
};
use crate::errors::LcsxResult;
use crate::launch;
use crate::rootfs::Bootstrapper;
use std::process::ExitStatus;

// ============================================================================
// PUBLIC API
// ============================================================================

/// Drives a run from whatever is on disk to a launchable configuration.
///
/// ```text
/// NO_CONFIG ─► BOOTSTRAPPING ─► PROVISIONING ─► CONFIGURED ─► LAUNCHED
///                                    ▲               │
///                                    └── terminal ───┘
///                                        change
/// ```
///
/// A configuration is persisted only once both bootstrapping and
/// provisioning have succeeded, so a fatal error leaves the previous
/// record (or none) in place.
pub struct LcsxRuntime {
    ctx: LcsxContext,
    default_layout: DataLayout,
    options: RunOptions,
    outcome: Option<PrepareOutcome>,
}

/// Which path the last [`LcsxRuntime::prepare`] took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrepareOutcome {
    /// A stored record was loaded from the data directory.
    Existing {
        terminal_changed: Option<TerminalKind>,
    },
    /// The record was copied over from the default data directory.
    Migrated {
        terminal_changed: Option<TerminalKind>,
    },
    /// Setup ran and wrote a new record.
    Created,
}

impl LcsxRuntime {
    /// `ctx` must be rooted at `options.data_dir` when one was given, and at
    /// `default_layout` otherwise.
    pub fn new(ctx: LcsxContext, default_layout: DataLayout, options: RunOptions) -> Self {
        Self {
            ctx,
            default_layout,
            options,
            outcome: None,
        }
    }

    /// Set by a successful [`prepare`](Self::prepare).
    pub fn outcome(&self) -> Option<PrepareOutcome> {
        self.outcome
    }

    /// Bring the data directory to CONFIGURED and return the record.
    pub fn prepare(&mut self, source: &mut dyn SetupSource) -> LcsxResult<Configuration> {
        self.outcome = None;
        let migrated = self.migrate_if_needed()?;

        let mut status = ConfigStore::new(self.ctx.layout().clone()).status()?;

        if !status.is_complete() && self.options.data_dir.is_none() {
            let chosen = source.choose_data_dir(self.ctx.layout().data_dir())?;
            if chosen != self.ctx.layout().data_dir() {
                tracing::info!(data_dir = %chosen.display(), "Using chosen data directory");
                self.ctx = self.ctx.relocated(DataLayout::new(chosen));
                status = ConfigStore::new(self.ctx.layout().clone()).status()?;
            }
        }

        let (config, outcome) = match status {
            ConfigStatus::Complete(config) => {
                let config = self.reconcile(*config, source)?;
                let terminal_changed = self.options.terminal;
                let outcome = if migrated {
                    PrepareOutcome::Migrated { terminal_changed }
                } else {
                    PrepareOutcome::Existing { terminal_changed }
                };
                (config, outcome)
            }
            other => {
                match &other {
                    ConfigStatus::Missing => tracing::info!("No configuration found"),
                    ConfigStatus::Malformed(reason) => {
                        tracing::warn!("Configuration unreadable, starting over: {}", reason)
                    }
                    ConfigStatus::Incomplete(missing) => {
                        tracing::warn!(?missing, "Configuration incomplete, starting over")
                    }
                    ConfigStatus::Complete(_) => {}
                }
                (self.fresh_setup(source)?, PrepareOutcome::Created)
            }
        };
        self.outcome = Some(outcome);
        Ok(config)
    }

    /// Run the sandboxed session for `config`, blocking until it ends.
    pub fn launch(&self, config: &Configuration) -> LcsxResult<ExitStatus> {
        Ok(launch::launch(config)?)
    }

    /// [`prepare`](Self::prepare) then [`launch`](Self::launch).
    pub fn run(&mut self, source: &mut dyn SetupSource) -> LcsxResult<ExitStatus> {
        let config = self.prepare(source)?;
        self.launch(&config)
    }

    // ========================================================================
    // STATE TRANSITIONS
    // ========================================================================

    /// True when a record was copied into the custom data directory.
    fn migrate_if_needed(&self) -> LcsxResult<bool> {
        if self.options.data_dir.is_none() {
            return Ok(false);
        }
        let store = ConfigStore::new(self.ctx.layout().clone());
        if store.is_configured() {
            return Ok(false);
        }
        match store.migrate_from(&self.default_layout)? {
            Some(config) => {
                tracing::info!(
                    data_dir = %config.data_dir.display(),
                    "Configuration migrated to custom data directory"
                );
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// CONFIGURED: apply a forced terminal change, then repair what is missing.
    fn reconcile(
        &self,
        mut config: Configuration,
        source: &mut dyn SetupSource,
    ) -> LcsxResult<Configuration> {
        let store = ConfigStore::new(self.ctx.layout().clone());
        tracing::info!(user = %config.user, hostname = %config.hostname, "Configuration found");

        if let Some(kind) = self.options.terminal {
            let port = self
                .options
                .port
                .or(gotty_port(&config.terminal_service))
                .unwrap_or(defaults::GOTTY_PORT);
            config.terminal_service = self.provision_terminal(kind, port, &config, source)?;
            store.save(&config)?;
            tracing::info!(terminal = %kind, "Terminal service updated");
        }

        let provisioner = Provisioner::new(&self.ctx);
        provisioner.ensure(Artifact::Proot)?;
        if let Some(artifact) = config.terminal_service.kind().artifact()
            && config
                .terminal_service
                .binary_path()
                .is_none_or(|p| !p.is_file())
        {
            let path = provisioner.ensure(artifact)?;
            set_binary_path(&mut config.terminal_service, path);
            store.save(&config)?;
        }

        let before = config.rootfs_path.clone();
        let config = Bootstrapper::new(&self.ctx).ensure(config)?;
        if config.rootfs_path != before {
            store.save(&config)?;
        }
        Ok(config)
    }

    /// NO_CONFIG → BOOTSTRAPPING → PROVISIONING → CONFIGURED.
    fn fresh_setup(&self, source: &mut dyn SetupSource) -> LcsxResult<Configuration> {
        let layout = self.ctx.layout();
        layout.prepare()?;

        let request = SetupRequest {
            distro: self.options.distro,
            terminal: self.options.terminal,
            port: self.options.port,
        };
        let answers = source.collect(&request)?;
        let arch = self.ctx.arch();
        tracing::info!(
            user = %answers.user,
            hostname = %answers.hostname,
            distro = %answers.distro,
            terminal = %answers.terminal,
            %arch,
            "Starting fresh setup"
        );

        // BOOTSTRAPPING
        Provisioner::new(&self.ctx).ensure(Artifact::Proot)?;
        let config = Configuration {
            user: answers.user,
            hostname: answers.hostname,
            password: answers.password,
            architecture: Some(arch),
            distro_url: answers.distro.url(arch),
            shell_path: answers.distro.shell().to_string(),
            sandbox_binary_name: arch.sandbox_binary_name().to_string(),
            rootfs_path: None,
            terminal_service: TerminalService::Native,
            data_dir: layout.data_dir().to_path_buf(),
        };
        let mut config = Bootstrapper::new(&self.ctx).ensure(config)?;

        // PROVISIONING
        config.terminal_service =
            self.provision_terminal(answers.terminal, answers.port, &config, source)?;

        ConfigStore::new(layout.clone()).save(&config)?;
        tracing::info!("Setup complete");
        Ok(config)
    }

    fn provision_terminal(
        &self,
        kind: TerminalKind,
        port: u16,
        config: &Configuration,
        source: &mut dyn SetupSource,
    ) -> LcsxResult<TerminalService> {
        let provisioner = Provisioner::new(&self.ctx);
        Ok(match kind {
            TerminalKind::Native => TerminalService::Native,
            TerminalKind::Sshx => TerminalService::Sshx {
                binary_path: provisioner.ensure(Artifact::Sshx)?,
            },
            TerminalKind::Gotty => {
                let binary_path = provisioner.ensure(Artifact::Gotty)?;
                let credential = self.resolve_credential(config, source)?;
                TerminalService::Gotty {
                    binary_path,
                    port,
                    credential,
                }
            }
        })
    }

    /// Explicit credential, then `--credential yes|no`, then the existing
    /// credential, then ask.
    fn resolve_credential(
        &self,
        config: &Configuration,
        source: &mut dyn SetupSource,
    ) -> LcsxResult<Option<Credential>> {
        let credential = match &self.options.credential {
            CredentialChoice::Explicit(credential) => Some(credential.clone()),
            CredentialChoice::System => system_credential(config),
            CredentialChoice::Disabled => None,
            CredentialChoice::Unspecified => match &config.terminal_service {
                TerminalService::Gotty {
                    credential: Some(existing),
                    ..
                } => Some(existing.clone()),
                _ if source.confirm_basic_auth()? => system_credential(config),
                _ => None,
            },
        };

        match &credential {
            Some(c) => tracing::info!(credential = %c, "gotty will require basic authentication"),
            None => tracing::info!("gotty will run without authentication"),
        }
        Ok(credential)
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn system_credential(config: &Configuration) -> Option<Credential> {
    if config.user.is_empty() || config.password.is_empty() {
        tracing::warn!("System credentials not found, gotty will run without authentication");
        return None;
    }
    Some(Credential::new(&config.user, config.password.clone()))
}

fn gotty_port(service: &TerminalService) -> Option<u16> {
    match service {
        TerminalService::Gotty { port, .. } => Some(*port),
        _ => None,
    }
}

fn set_binary_path(service: &mut TerminalService, path: std::path::PathBuf) {
    match service {
        TerminalService::Native => {}
        TerminalService::Sshx { binary_path } | TerminalService::Gotty { binary_path, .. } => {
            *binary_path = path;
        }
    }
}
