use super::model::{Configuration, TerminalService};
use crate::errors::ConfigError;
use crate::runtime::layout::DataLayout;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use walkdir::WalkDir;

/// What is on disk at the configuration path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigStatus {
    Missing,
    Malformed(String),
    Incomplete(Vec<&'static str>),
    Complete(Box<Configuration>),
}

impl ConfigStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, ConfigStatus::Complete(_))
    }
}

/// Sole owner of `<data_dir>/config.json`.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    layout: DataLayout,
}

impl ConfigStore {
    pub fn new(layout: DataLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    /// Classify the file. Only unexpected IO failures are errors.
    pub fn status(&self) -> Result<ConfigStatus, ConfigError> {
        match self.read() {
            Ok(config) => {
                let missing = config.missing_fields();
                if missing.is_empty() {
                    Ok(ConfigStatus::Complete(Box::new(config)))
                } else {
                    Ok(ConfigStatus::Incomplete(missing))
                }
            }
            Err(ConfigError::Missing(_)) => Ok(ConfigStatus::Missing),
            Err(ConfigError::Malformed { source, .. }) => {
                Ok(ConfigStatus::Malformed(source.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    /// True only for a readable, complete record.
    pub fn is_configured(&self) -> bool {
        self.status().is_ok_and(|s| s.is_complete())
    }

    /// Parse the record without checking completeness.
    ///
    /// `data_dir` is always reported as this store's directory, regardless
    /// of what the file says.
    pub fn read(&self) -> Result<Configuration, ConfigError> {
        let path = self.layout.config_path();
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ConfigError::Missing(path));
            }
            Err(e) => return Err(ConfigError::io(path, e)),
        };

        let mut config: Configuration =
            serde_json::from_str(&raw).map_err(|e| ConfigError::Malformed {
                path: path.clone(),
                source: e,
            })?;
        config.data_dir = self.layout.data_dir().to_path_buf();
        Ok(config)
    }

    /// Load a complete record.
    pub fn load(&self) -> Result<Configuration, ConfigError> {
        let config = self.read()?;
        let missing = config.missing_fields();
        if !missing.is_empty() {
            return Err(ConfigError::Incomplete(missing));
        }
        Ok(config)
    }

    /// Persist atomically: write a sibling temp file, then rename it over
    /// the old record.
    pub fn save(&self, config: &Configuration) -> Result<(), ConfigError> {
        let dir = self.layout.data_dir();
        fs::create_dir_all(dir).map_err(|e| ConfigError::io(dir, e))?;

        let mut record = config.clone();
        record.data_dir = dir.to_path_buf();
        let json = serde_json::to_string_pretty(&record).map_err(ConfigError::Serialize)?;

        let path = self.layout.config_path();
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| ConfigError::io(dir, e))?;
        tmp.write_all(json.as_bytes())
            .and_then(|()| tmp.write_all(b"\n"))
            .map_err(|e| ConfigError::io(tmp.path(), e))?;
        tmp.persist(&path)
            .map_err(|e| ConfigError::io(&path, e.error))?;

        tracing::debug!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    /// Copy the record from `old` into this store's directory.
    ///
    /// Paths rooted in the old directory are rewritten to the new one and
    /// provisioned artifacts are copied where the new directory lacks them.
    /// The rootfs tree is not copied; the next bootstrap re-fetches it.
    ///
    /// Returns `None` when `old` holds no readable record.
    pub fn migrate_from(&self, old: &DataLayout) -> Result<Option<Configuration>, ConfigError> {
        if old.data_dir() == self.layout.data_dir() {
            return Ok(None);
        }

        let mut config = match ConfigStore::new(old.clone()).read() {
            Ok(config) => config,
            Err(ConfigError::Missing(_)) => return Ok(None),
            Err(ConfigError::Malformed { path, source }) => {
                tracing::warn!(path = %path.display(), "Not migrating malformed configuration: {}", source);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        tracing::info!(
            from = %old.data_dir().display(),
            to = %self.layout.data_dir().display(),
            "Migrating configuration"
        );

        config.data_dir = self.layout.data_dir().to_path_buf();
        if let Some(rootfs) = &config.rootfs_path
            && let Some(rebased) = self.layout.rebase(old, rootfs)
        {
            config.rootfs_path = Some(rebased);
        }
        match &mut config.terminal_service {
            TerminalService::Native => {}
            TerminalService::Sshx { binary_path } | TerminalService::Gotty { binary_path, .. } => {
                if let Some(rebased) = self.layout.rebase(old, binary_path) {
                    *binary_path = rebased;
                }
            }
        }

        let copied = self.copy_missing_artifacts(old)?;
        tracing::debug!(copied, "Artifacts copied during migration");

        self.save(&config)?;
        Ok(Some(config))
    }

    fn copy_missing_artifacts(&self, old: &DataLayout) -> Result<usize, ConfigError> {
        let old_libs = old.libs_dir();
        if !old_libs.is_dir() {
            return Ok(0);
        }

        let mut copied = 0;
        for entry in WalkDir::new(&old_libs).follow_links(false) {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(&old_libs).to_path_buf();
                ConfigError::io(path, e.into())
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let Some(target) = self.layout.rebase(old, entry.path()) else {
                continue;
            };
            if target.exists() {
                continue;
            }
            copy_file(entry.path(), &target)?;
            copied += 1;
        }
        Ok(copied)
    }
}

/// Copy contents and permission bits.
fn copy_file(from: &Path, to: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(|e| ConfigError::io(parent, e))?;
    }
    fs::copy(from, to).map_err(|e| ConfigError::io(to, e))?;
    tracing::debug!(from = %from.display(), to = %to.display(), "Copied artifact");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::Secret;
    use crate::runtime::platform::Architecture;
    use std::os::unix::fs::PermissionsExt;

    fn complete(data_dir: &Path) -> Configuration {
        Configuration {
            user: "alice".into(),
            hostname: "box".into(),
            password: Secret::new("hunter22"),
            architecture: Some(Architecture::Aarch64),
            distro_url: "https://mirror.invalid/debian.tar.xz".into(),
            shell_path: "/bin/bash".into(),
            sandbox_binary_name: "prootarm64".into(),
            rootfs_path: Some(data_dir.join("rootfs/debian")),
            terminal_service: TerminalService::Native,
            data_dir: data_dir.to_path_buf(),
        }
    }

    #[test]
    fn test_missing_vs_malformed_vs_incomplete() {
        let temp = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(DataLayout::new(temp.path()));

        assert_eq!(store.status().unwrap(), ConfigStatus::Missing);
        assert!(store.load().unwrap_err().is_missing());

        fs::write(store.layout().config_path(), "{ not json").unwrap();
        assert!(matches!(store.status().unwrap(), ConfigStatus::Malformed(_)));
        assert!(!store.is_configured());

        fs::write(store.layout().config_path(), r#"{"user":"alice"}"#).unwrap();
        match store.status().unwrap() {
            ConfigStatus::Incomplete(missing) => assert!(missing.contains(&"hostname")),
            other => panic!("unexpected status {other:?}"),
        }
        assert!(matches!(store.load(), Err(ConfigError::Incomplete(_))));
    }

    #[test]
    fn test_save_then_load() {
        let temp = tempfile::tempdir().unwrap();
        let data_dir = temp.path().join("data");
        let store = ConfigStore::new(DataLayout::new(&data_dir));

        let config = complete(&data_dir);
        store.save(&config).unwrap();

        assert!(store.is_configured());
        assert_eq!(store.load().unwrap(), config);
        // Only the record is left behind, no temp files
        let names: Vec<_> = fs::read_dir(&data_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec!["config.json"]);
    }

    #[test]
    fn test_system_credential_with_colon_survives_reload() {
        let temp = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(DataLayout::new(temp.path()));

        let password = "pa:ss123";
        crate::config::validation::validate_password(password).unwrap();
        let mut config = complete(temp.path());
        config.password = Secret::new(password);
        config.terminal_service = TerminalService::Gotty {
            binary_path: temp.path().join("libs/gotty/gotty"),
            port: 6040,
            credential: Some(crate::config::Credential::new("alice", Secret::new(password))),
        };
        store.save(&config).unwrap();

        assert_eq!(
            store.status().unwrap(),
            ConfigStatus::Complete(Box::new(config))
        );
    }

    #[test]
    fn test_read_reports_store_directory() {
        let temp = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(DataLayout::new(temp.path()));
        let mut config = complete(temp.path());
        config.data_dir = "/somewhere/else".into();
        fs::write(
            store.layout().config_path(),
            serde_json::to_string(&config).unwrap(),
        )
        .unwrap();

        assert_eq!(store.read().unwrap().data_dir, temp.path());
    }

    #[test]
    fn test_migration_rewrites_and_copies() {
        let temp = tempfile::tempdir().unwrap();
        let old = DataLayout::new(temp.path().join("a"));
        let new = DataLayout::new(temp.path().join("b"));

        let gotty = old.artifact_dir("gotty").join("gotty");
        fs::create_dir_all(gotty.parent().unwrap()).unwrap();
        fs::write(&gotty, b"#!gotty").unwrap();
        fs::set_permissions(&gotty, fs::Permissions::from_mode(0o755)).unwrap();

        // Already present at the destination; must not be overwritten
        let proot_new = new.artifact_dir("proot").join("prootarm64");
        fs::create_dir_all(proot_new.parent().unwrap()).unwrap();
        fs::write(&proot_new, b"newer").unwrap();
        let proot_old = old.artifact_dir("proot").join("prootarm64");
        fs::create_dir_all(proot_old.parent().unwrap()).unwrap();
        fs::write(&proot_old, b"older").unwrap();

        let mut config = complete(old.data_dir());
        config.terminal_service = TerminalService::Gotty {
            binary_path: gotty.clone(),
            port: 6040,
            credential: None,
        };
        ConfigStore::new(old.clone()).save(&config).unwrap();

        let store = ConfigStore::new(new.clone());
        let migrated = store.migrate_from(&old).unwrap().unwrap();

        let new_gotty = new.artifact_dir("gotty").join("gotty");
        assert_eq!(migrated.data_dir, new.data_dir());
        assert_eq!(migrated.terminal_service.binary_path(), Some(new_gotty.as_path()));
        assert_eq!(
            migrated.rootfs_path,
            Some(new.data_dir().join("rootfs/debian"))
        );
        assert_eq!(fs::read(&new_gotty).unwrap(), b"#!gotty");
        assert_eq!(
            fs::metadata(&new_gotty).unwrap().permissions().mode() & 0o777,
            0o755
        );
        assert_eq!(fs::read(&proot_new).unwrap(), b"newer");
        assert_eq!(store.load().unwrap(), migrated);
    }

    #[test]
    fn test_migration_keeps_foreign_paths() {
        let temp = tempfile::tempdir().unwrap();
        let old = DataLayout::new(temp.path().join("a"));
        let new = DataLayout::new(temp.path().join("b"));

        let mut config = complete(old.data_dir());
        config.terminal_service = TerminalService::Sshx {
            binary_path: "/opt/sshx/sshx".into(),
        };
        ConfigStore::new(old.clone()).save(&config).unwrap();

        let migrated = ConfigStore::new(new).migrate_from(&old).unwrap().unwrap();
        assert_eq!(
            migrated.terminal_service.binary_path(),
            Some(Path::new("/opt/sshx/sshx"))
        );
    }

    #[test]
    fn test_nothing_to_migrate() {
        let temp = tempfile::tempdir().unwrap();
        let old = DataLayout::new(temp.path().join("a"));
        let store = ConfigStore::new(DataLayout::new(temp.path().join("b")));

        assert!(store.migrate_from(&old).unwrap().is_none());

        fs::create_dir_all(old.data_dir()).unwrap();
        fs::write(old.config_path(), "[]").unwrap();
        assert!(store.migrate_from(&old).unwrap().is_none());
        assert!(!store.layout().config_path().exists());
    }
}
