//! proot command builder.
//!
//! proot emulates chroot, mount --bind and root identity with ptrace, so
//! it needs no privileges and no kernel namespaces. The flags used here:
//!
//! - `-r <path>`: use `path` as the guest root (mounted read-write)
//! - `-0`: make the guest believe it runs as uid 0
//! - `-w <path>`: initial working directory inside the guest
//! - `-b <host>:<guest>`: bind a host path into the guest

use std::path::{Path, PathBuf};
use std::process::Command;

/// Builder for constructing proot command arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProotCommand {
    program: PathBuf,
    args: Vec<String>,
}

impl ProotCommand {
    /// Start a command that will run the proot binary at `program`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Use `path` as the guest root filesystem.
    pub fn rootfs(mut self, path: impl AsRef<Path>) -> Self {
        self.args.push("-r".to_string());
        self.args.push(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Emulate the superuser inside the guest.
    pub fn root_id(mut self) -> Self {
        self.args.push("-0".to_string());
        self
    }

    /// Set the working directory inside the guest.
    pub fn cwd(mut self, path: impl AsRef<Path>) -> Self {
        self.args.push("-w".to_string());
        self.args.push(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Bind `src` on the host to `dest` in the guest.
    pub fn bind(mut self, src: impl AsRef<Path>, dest: impl AsRef<Path>) -> Self {
        self.args.push("-b".to_string());
        self.args.push(format!(
            "{}:{}",
            src.as_ref().to_string_lossy(),
            dest.as_ref().to_string_lossy()
        ));
        self
    }

    /// Bind a host path onto the same path in the guest.
    pub fn bind_same(self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        self.bind(path, path)
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Get the proot arguments (for testing/debugging).
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Full argument vector: proot flags followed by the guest command.
    pub fn argv(&self, guest: &[String]) -> Vec<String> {
        self.args.iter().chain(guest).cloned().collect()
    }

    /// Build the command that runs `guest` inside the sandbox.
    pub fn build(&self, guest: &[String]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.args(guest);
        cmd
    }
}
