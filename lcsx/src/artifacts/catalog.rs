//! Closed mapping from `(artifact, architecture)` to a download.

use crate::runtime::constants::urls;
use crate::runtime::platform::Architecture;
use std::fmt;

/// External helper binaries provisioned under `<data_dir>/libs/<name>/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    /// The sandbox binary.
    Proot,
    /// Single-command terminal relay.
    Sshx,
    /// HTTP-served terminal.
    Gotty,
    /// Statically linked apk used to bootstrap Alpine.
    ApkStatic,
}

/// How the download is packaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packaging {
    /// The download is the executable itself.
    Raw,
    /// A (possibly compressed) tarball containing the executable.
    Archive,
}

/// Where to get an artifact for one architecture and what to look for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSource {
    pub url: String,
    pub binary: String,
    pub packaging: Packaging,
}

impl ArtifactSource {
    /// Last URL path segment, used as the local download name.
    pub fn file_name(&self) -> &str {
        self.url.rsplit('/').next().unwrap_or(&self.url)
    }
}

impl Artifact {
    pub const ALL: [Artifact; 4] = [
        Artifact::Proot,
        Artifact::Sshx,
        Artifact::Gotty,
        Artifact::ApkStatic,
    ];

    /// Directory name under `libs/`.
    pub fn name(&self) -> &'static str {
        match self {
            Artifact::Proot => "proot",
            Artifact::Sshx => "sshx",
            Artifact::Gotty => "gotty",
            Artifact::ApkStatic => "apk-static",
        }
    }

    pub fn source(&self, arch: Architecture) -> ArtifactSource {
        match self {
            Artifact::Proot => {
                let binary = arch.sandbox_binary_name();
                ArtifactSource {
                    url: format!("{}/{}", urls::PROOT_BASE, binary),
                    binary: binary.to_string(),
                    packaging: Packaging::Raw,
                }
            }
            Artifact::Sshx => ArtifactSource {
                url: format!(
                    "{}/sshx-{}-unknown-linux-musl.tar.gz",
                    urls::SSHX_BASE,
                    arch.as_str()
                ),
                binary: "sshx".to_string(),
                packaging: Packaging::Archive,
            },
            Artifact::Gotty => ArtifactSource {
                url: format!(
                    "{}/gotty_linux_{}.tar.gz",
                    urls::GOTTY_BASE,
                    arch.go_name()
                ),
                binary: "gotty".to_string(),
                packaging: Packaging::Archive,
            },
            Artifact::ApkStatic => ArtifactSource {
                url: format!(
                    "{}/{}/apk-tools-static-{}.apk",
                    urls::APK_STATIC_BASE,
                    arch.as_str(),
                    urls::APK_TOOLS_STATIC_VERSION
                ),
                binary: "apk.static".to_string(),
                packaging: Packaging::Archive,
            },
        }
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
