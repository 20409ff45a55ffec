//! LCSX: bootstrap and launch unprivileged Linux environments under proot.
//!
//! A run resolves a data directory, downloads and validates a distribution
//! root filesystem, provisions the sandbox binary and an optional terminal
//! backend, persists the result as `config.json`, and finally execs the
//! sandboxed session.

pub mod archive;
pub mod artifacts;
pub mod config;
pub mod errors;
pub mod launch;
pub mod net;
pub mod rootfs;
pub mod runtime;

#[cfg(test)]
mod testing;

pub use config::{Configuration, Credential, Secret, TerminalKind, TerminalService};
pub use errors::{LcsxError, LcsxResult};
pub use rootfs::Distro;
pub use runtime::{LcsxRuntime, PrepareOutcome};
pub use runtime::layout::DataLayout;
pub use runtime::options::{CredentialChoice, RunOptions};
pub use runtime::platform::Architecture;
pub use runtime::setup::{AutoSetup, SetupAnswers, SetupRequest, SetupSource};
