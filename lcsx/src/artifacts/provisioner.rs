use super::catalog::{Artifact, Packaging};
use crate::archive;
use crate::errors::ProvisionError;
use crate::runtime::constants::perms;
use crate::runtime::context::LcsxContext;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Per-download scratch directories inside the artifact directory.
const STAGING_PREFIX: &str = ".staging-";

/// Makes helper binaries available under `<data_dir>/libs/<artifact>/`.
pub struct Provisioner<'a> {
    ctx: &'a LcsxContext,
}

impl<'a> Provisioner<'a> {
    pub fn new(ctx: &'a LcsxContext) -> Self {
        Self { ctx }
    }

    /// Path of an already provisioned binary, without touching the network.
    pub fn locate(&self, artifact: Artifact) -> Option<PathBuf> {
        let source = artifact.source(self.ctx.arch());
        find_binary(&self.ctx.layout().artifact_dir(artifact.name()), &source.binary)
    }

    /// Ensure `artifact` is present and executable, downloading it if needed.
    pub fn ensure(&self, artifact: Artifact) -> Result<PathBuf, ProvisionError> {
        let dir = self.ctx.layout().artifact_dir(artifact.name());
        let source = artifact.source(self.ctx.arch());

        if let Some(existing) = find_binary(&dir, &source.binary) {
            tracing::debug!(
                artifact = %artifact,
                path = %existing.display(),
                "Artifact already provisioned"
            );
            mark_executable(&existing)?;
            return Ok(existing);
        }

        tracing::info!(
            artifact = %artifact,
            arch = %self.ctx.arch(),
            url = %source.url,
            "Provisioning artifact"
        );
        fs::create_dir_all(&dir).map_err(|e| ProvisionError::io(&dir, e))?;

        // Only a finished binary is renamed into place; an interrupted run
        // leaves nothing that find_binary would accept.
        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(&dir)
            .map_err(|e| ProvisionError::io(&dir, e))?;

        let staged = match source.packaging {
            Packaging::Raw => {
                let path = staging.path().join(&source.binary);
                self.ctx.fetcher().fetch(&source.url, &path)?;
                path
            }
            Packaging::Archive => {
                let download = staging.path().join(source.file_name());
                let unpacked = staging.path().join("unpacked");
                self.ctx.fetcher().fetch(&source.url, &download)?;
                archive::extract(&download, &unpacked)?;
                find_binary(&unpacked, &source.binary).ok_or_else(|| {
                    ProvisionError::BinaryNotFound {
                        binary: source.binary.clone(),
                        dir: dir.clone(),
                    }
                })?
            }
        };
        mark_executable(&staged)?;

        let binary = dir.join(&source.binary);
        fs::rename(&staged, &binary).map_err(|e| ProvisionError::io(&binary, e))?;

        tracing::info!(artifact = %artifact, path = %binary.display(), "Artifact ready");
        Ok(binary)
    }
}

/// First regular file named `binary` in a depth-first walk of `dir`.
///
/// Siblings are visited in file-name order so the result does not depend
/// on directory iteration order. Staging directories are never searched.
fn find_binary(dir: &Path, binary: &str) -> Option<PathBuf> {
    if !dir.is_dir() {
        return None;
    }
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0 || !entry.file_name().to_string_lossy().starts_with(STAGING_PREFIX)
        })
        .filter_map(Result::ok)
        .find(|entry| entry.file_type().is_file() && entry.file_name() == binary)
        .map(|entry| entry.into_path())
}

fn mark_executable(path: &Path) -> Result<(), ProvisionError> {
    let mut permissions = fs::metadata(path)
        .map_err(|e| ProvisionError::io(path, e))?
        .permissions();
    if permissions.mode() & 0o777 == perms::EXECUTABLE {
        return Ok(());
    }
    permissions.set_mode(perms::EXECUTABLE);
    fs::set_permissions(path, permissions).map_err(|e| ProvisionError::io(path, e))
}
