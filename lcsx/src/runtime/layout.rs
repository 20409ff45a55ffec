use crate::errors::{ConfigError, LcsxResult};
use std::path::{Path, PathBuf};

/// Directory structure constants
pub mod dirs {
    /// Provisioned helper binaries, one subdirectory per artifact
    pub const LIBS_DIR: &str = "libs";

    /// Extraction target for the distribution tarball
    pub const ROOTFS_DIR: &str = "rootfs";

    /// Persisted configuration record
    pub const CONFIG_FILE: &str = "config.json";

    /// Distribution tarball while it is being fetched and extracted
    pub const ROOTFS_ARCHIVE: &str = "rootfs.tar";
}

// ============================================================================
// DATA DIRECTORY LAYOUT
// ============================================================================

/// Filesystem layout rooted at the data directory.
///
/// ```text
/// <data_dir>/
/// ├── config.json
/// ├── rootfs.tar             # only while a download is in flight
/// ├── libs/
/// │   ├── proot/proot        # sandbox binary
/// │   ├── sshx/sshx          # single-command terminal relay
/// │   ├── gotty/gotty        # HTTP-served terminal
/// │   └── apk-static/...     # static apk for Alpine bootstrap
/// └── rootfs/
///     └── <wrapped-dir>/     # optional version-named wrapper
/// ```
///
/// Concurrent use of one data directory by several processes is not
/// supported; nothing here takes a lock.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataLayout {
    data_dir: PathBuf,
}

impl DataLayout {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Default data directory: `data/` next to the running executable.
    pub fn default_data_dir() -> PathBuf {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));
        exe_dir.join(super::constants::defaults::DATA_DIR_NAME)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Configuration file: <data_dir>/config.json
    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join(dirs::CONFIG_FILE)
    }

    /// Artifacts root: <data_dir>/libs
    pub fn libs_dir(&self) -> PathBuf {
        self.data_dir.join(dirs::LIBS_DIR)
    }

    /// Per-artifact directory: <data_dir>/libs/<name>
    pub fn artifact_dir(&self, name: &str) -> PathBuf {
        self.libs_dir().join(name)
    }

    /// Rootfs extraction target: <data_dir>/rootfs
    pub fn rootfs_dir(&self) -> PathBuf {
        self.data_dir.join(dirs::ROOTFS_DIR)
    }

    /// Rootfs download target: <data_dir>/rootfs.tar
    pub fn rootfs_archive_path(&self) -> PathBuf {
        self.data_dir.join(dirs::ROOTFS_ARCHIVE)
    }

    /// Rewrite `path` so that it is rooted in this layout instead of `old`.
    ///
    /// Returns `None` when `path` does not live under `old`.
    pub fn rebase(&self, old: &DataLayout, path: &Path) -> Option<PathBuf> {
        path.strip_prefix(old.data_dir())
            .ok()
            .map(|rest| self.data_dir.join(rest))
    }

    /// Create the data directory and the artifacts root.
    pub fn prepare(&self) -> LcsxResult<()> {
        std::fs::create_dir_all(&self.data_dir)
            .map_err(|e| ConfigError::io(&self.data_dir, e))?;

        std::fs::create_dir_all(self.libs_dir())
            .map_err(|e| ConfigError::io(self.libs_dir(), e))?;

        Ok(())
    }
}
