//! Constants for the LCSX runtime
//!
//! Centralized location for hardcoded values, download locations and defaults.

/// Identity used by automatic setup.
pub mod defaults {
    pub const USER: &str = "lcsx";
    pub const HOSTNAME: &str = "debian";
    pub const PASSWORD: &str = "123456";

    /// Shell used when a distribution does not specify one
    pub const SHELL: &str = "/bin/bash";

    /// Listen port for the HTTP-served terminal
    pub const GOTTY_PORT: u16 = 6040;

    /// Name of the data directory created next to the executable
    pub const DATA_DIR_NAME: &str = "data";
}

pub mod envs {
    /// Overrides the log filter set by `--log-level`.
    pub const RUST_LOG: &str = "RUST_LOG";

    pub const HOST_CPUS: &str = "LCSX_HOST_CPUS";
    pub const HOST_MEMORY: &str = "LCSX_HOST_MEMORY";
    pub const HOST_DISK: &str = "LCSX_HOST_DISK";
}

/// Network transfer policy
pub mod network {
    use std::time::Duration;

    pub const MAX_DOWNLOAD_RETRIES: u32 = 3;
    pub const RETRY_DELAY: Duration = Duration::from_secs(5);
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
    pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

    /// Resolvers written into every freshly extracted rootfs
    pub const DNS_SERVERS: &[&str] = &["8.8.8.8", "1.1.1.1", "9.9.9.9"];
}

/// Download locations
pub mod urls {
    /// proot builds pinned to a known-good commit
    pub const PROOT_BASE: &str =
        "https://raw.githubusercontent.com/SterTheStar/lcsx/8d13901c99e8a222838999e11682ea0a7d797940/libs";

    pub const PROOT_DISTRO_VERSION: &str = "v4.29.0";
    pub const PROOT_DISTRO_BASE: &str =
        "https://github.com/termux/proot-distro/releases/download";

    pub const GOTTY_BASE: &str = "https://github.com/yudai/gotty/releases/download/v1.0.1";

    pub const SSHX_BASE: &str = "https://sshx.s3.amazonaws.com";

    pub const APK_STATIC_BASE: &str = "https://dl-cdn.alpinelinux.org/alpine/v3.21/main";
    pub const APK_TOOLS_STATIC_VERSION: &str = "2.14.6-r3";
}

/// Paths inside the sandbox
pub mod guest_paths {
    pub const HOME: &str = "/root";
    pub const PROC: &str = "/proc";
    pub const ENV: &str = "/usr/bin/env";

    /// Host pseudo-terminal nodes bound for terminal backends
    pub const PTY_NODES: &[&str] = &["/dev/ptmx", "/dev/pts", "/dev/tty"];

    pub const SSHX_DIR: &str = "/sshx";
    pub const GOTTY_DIR: &str = "/gotty";
    pub const APK_DIR: &str = "/apk";
}

/// Filesystem permissions
pub mod perms {
    pub const EXECUTABLE: u32 = 0o755;
}
