use super::distro::{Distro, PackageFamily};
use super::guest;
use crate::archive;
use crate::artifacts::{Artifact, Provisioner};
use crate::config::Configuration;
use crate::errors::BootstrapError;
use crate::launch::ProotCommand;
use crate::runtime::constants::guest_paths;
use crate::runtime::context::LcsxContext;
use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Written inside the guest once the apk base set is installed.
const APK_MARKER: &str = "etc/.lcsx-apk-bootstrapped";

/// Packages installed into a fresh Alpine tree.
const APK_BASE_PACKAGES: &[&str] = &["alpine-base", "bash"];

/// How the rootfs was obtained on this call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootfsState {
    /// An existing valid tree was reused.
    Reused,
    /// The tree was (re)downloaded and extracted.
    Fetched,
}

/// Owns `<data_dir>/rootfs`.
pub struct Bootstrapper<'a> {
    ctx: &'a LcsxContext,
}

impl<'a> Bootstrapper<'a> {
    pub fn new(ctx: &'a LcsxContext) -> Self {
        Self { ctx }
    }

    /// Root of the current tree: the single wrapped directory under
    /// `<data_dir>/rootfs` when there is one, else `<data_dir>/rootfs`.
    pub fn candidate_root(&self) -> PathBuf {
        let base = self.ctx.layout().rootfs_dir();
        if base.is_dir() {
            archive::content_root(&base).unwrap_or(base)
        } else {
            base
        }
    }

    /// Make sure a valid tree exists for `config` and record its root.
    ///
    /// An invalid tree is never repaired in place: it is deleted and the
    /// distribution tarball is fetched again.
    pub fn ensure(&self, mut config: Configuration) -> Result<Configuration, BootstrapError> {
        let (root, state) = self.ensure_tree(&config)?;

        if state == RootfsState::Fetched {
            match guest::write_resolv_conf(&root) {
                Ok(path) => tracing::info!(path = %path.display(), "resolv.conf updated"),
                Err(e) => tracing::warn!("Could not write resolv.conf: {}", e),
            }
        }

        if Distro::identify(&config.distro_url)
            .is_some_and(|d| d.package_family() == PackageFamily::Apk)
        {
            self.bootstrap_apk(&root)?;
        }

        match guest::install_prompt(&root, &config.shell_path, &config.prompt()) {
            Ok(path) => tracing::debug!(path = %path.display(), "Prompt installed"),
            Err(e) => tracing::warn!("Could not update shell profile: {}", e),
        }

        config.rootfs_path = Some(root);
        Ok(config)
    }

    fn ensure_tree(&self, config: &Configuration) -> Result<(PathBuf, RootfsState), BootstrapError> {
        let candidate = self.candidate_root();
        if guest::is_valid(&candidate, &config.shell_path) {
            tracing::debug!(root = %candidate.display(), "Rootfs is valid");
            return Ok((candidate, RootfsState::Reused));
        }

        let base = self.ctx.layout().rootfs_dir();
        if base.exists() {
            tracing::info!(root = %candidate.display(), shell = %config.shell_path, "Rootfs invalid, re-downloading");
            wipe(&base).map_err(|e| BootstrapError::io(&base, e))?;
        }

        let archive_path = self.ctx.layout().rootfs_archive_path();
        self.ctx.fetcher().fetch(&config.distro_url, &archive_path)?;
        let root = archive::extract(&archive_path, &base)?;

        if !guest::is_valid(&root, &config.shell_path) {
            return Err(BootstrapError::InvalidAfterFetch {
                root,
                shell: config.shell_path.clone(),
            });
        }

        tracing::info!(root = %root.display(), "Rootfs extracted");
        Ok((root, RootfsState::Fetched))
    }

    /// Install the apk base set with the static apk, at most once per tree.
    fn bootstrap_apk(&self, root: &Path) -> Result<(), BootstrapError> {
        let marker = root.join(APK_MARKER);
        if marker.exists() {
            return Ok(());
        }

        let provisioner = Provisioner::new(self.ctx);
        let proot = provisioner.ensure(Artifact::Proot)?;
        let apk = provisioner.ensure(Artifact::ApkStatic)?;
        let apk_dir = apk
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.ctx.layout().artifact_dir(Artifact::ApkStatic.name()));
        let apk_name = apk
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "apk.static".to_string());

        let mut guest_cmd = vec![
            format!("{}/{}", guest_paths::APK_DIR, apk_name),
            "-U".to_string(),
            "--no-cache".to_string(),
            "add".to_string(),
        ];
        guest_cmd.extend(APK_BASE_PACKAGES.iter().map(|p| p.to_string()));

        let command = ProotCommand::new(&proot)
            .rootfs(root)
            .root_id()
            .bind_same(guest_paths::PROC)
            .bind(&apk_dir, guest_paths::APK_DIR)
            .cwd("/");

        tracing::info!(packages = ?APK_BASE_PACKAGES, "Bootstrapping apk base packages");
        let status = command
            .build(&guest_cmd)
            .status()
            .map_err(|e| BootstrapError::io(&proot, e))?;
        if !status.success() {
            return Err(BootstrapError::PackageBootstrap {
                status: status.to_string(),
            });
        }

        if let Some(parent) = marker.parent() {
            fs::create_dir_all(parent).map_err(|e| BootstrapError::io(parent, e))?;
        }
        fs::write(&marker, b"").map_err(|e| BootstrapError::io(&marker, e))?;
        Ok(())
    }
}

/// Delete a tree, making read-only directories writable if the first
/// attempt is refused.
fn wipe(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            for entry in WalkDir::new(path).into_iter().filter_map(Result::ok) {
                if entry.file_type().is_dir() {
                    let _ = fs::set_permissions(entry.path(), fs::Permissions::from_mode(0o755));
                }
            }
            fs::remove_dir_all(path)
        }
        other => other,
    }
}
