//! Supported guest distributions.

use crate::runtime::constants::{defaults, urls};
use crate::runtime::platform::Architecture;
use std::fmt;
use std::str::FromStr;

/// Package manager family of a distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageFamily {
    Apt,
    /// Minimal family; its base set is installed with a static `apk`.
    Apk,
    Pacman,
    Xbps,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Distro {
    Debian,
    Alpine,
    ArchLinux,
    Void,
}

impl Distro {
    pub const ALL: [Distro; 4] = [Distro::Debian, Distro::Alpine, Distro::ArchLinux, Distro::Void];

    pub fn name(&self) -> &'static str {
        match self {
            Distro::Debian => "Debian",
            Distro::Alpine => "Alpine",
            Distro::ArchLinux => "Arch Linux",
            Distro::Void => "Void",
        }
    }

    /// Release-asset prefix on the proot-distro release page.
    fn asset_stem(&self) -> &'static str {
        match self {
            Distro::Debian => "debian-trixie",
            Distro::Alpine => "alpine",
            Distro::ArchLinux => "archlinux",
            Distro::Void => "void",
        }
    }

    pub fn url(&self, arch: Architecture) -> String {
        format!(
            "{base}/{version}/{stem}-{arch}-pd-{version}.tar.xz",
            base = urls::PROOT_DISTRO_BASE,
            version = urls::PROOT_DISTRO_VERSION,
            stem = self.asset_stem(),
            arch = arch.as_str(),
        )
    }

    pub fn shell(&self) -> &'static str {
        match self {
            Distro::Alpine => "/bin/sh",
            _ => defaults::SHELL,
        }
    }

    pub fn package_family(&self) -> PackageFamily {
        match self {
            Distro::Debian => PackageFamily::Apt,
            Distro::Alpine => PackageFamily::Apk,
            Distro::ArchLinux => PackageFamily::Pacman,
            Distro::Void => PackageFamily::Xbps,
        }
    }

    /// Recognize a catalog distribution from its tarball URL.
    pub fn identify(url: &str) -> Option<Distro> {
        let file = url.rsplit('/').next()?;
        Distro::ALL.into_iter().find(|d| {
            file.strip_prefix(d.asset_stem())
                .and_then(|rest| rest.strip_prefix('-'))
                .is_some_and(|rest| {
                    Architecture::ALL
                        .iter()
                        .any(|arch| rest.starts_with(arch.as_str()))
                })
        })
    }
}

impl fmt::Display for Distro {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Distro {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debian" => Ok(Distro::Debian),
            "alpine" => Ok(Distro::Alpine),
            "arch" | "archlinux" | "arch linux" => Ok(Distro::ArchLinux),
            "void" => Ok(Distro::Void),
            other => Err(format!("unknown distribution '{other}'")),
        }
    }
}
