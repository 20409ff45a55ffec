use super::host::HostResources;
use super::proot::ProotCommand;
use crate::config::{Configuration, TerminalService};
use crate::errors::LaunchError;
use crate::runtime::constants::guest_paths;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

/// Listen address for the HTTP-served terminal.
const GOTTY_LISTEN: &str = "0.0.0.0";

/// A fully composed sandbox invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub proot: ProotCommand,
    /// Command run inside the guest, starting with the env prefix.
    pub guest: Vec<String>,
}

impl Invocation {
    /// Every argument after the proot program.
    pub fn argv(&self) -> Vec<String> {
        self.proot.argv(&self.guest)
    }
}

/// Build the invocation that enters the sandbox for `config`.
pub fn compose(config: &Configuration, host: &HostResources) -> Result<Invocation, LaunchError> {
    let missing = config.missing_fields();
    if !missing.is_empty() {
        return Err(LaunchError::NotConfigured(format!(
            "missing {}",
            missing.join(", ")
        )));
    }
    let rootfs = config
        .rootfs_path
        .as_deref()
        .ok_or_else(|| LaunchError::NotConfigured("missing rootfs_path".into()))?;

    let mut proot = ProotCommand::new(config.sandbox_binary_path())
        .rootfs(rootfs)
        .root_id()
        .bind_same(guest_paths::PROC);

    let shell = config.shell_path.as_str();
    let mut guest = env_prefix(host);

    match &config.terminal_service {
        TerminalService::Native => {
            guest.extend([shell.to_string(), "-c".to_string(), login(config)]);
        }
        TerminalService::Sshx { binary_path } => {
            let (dir, exe) = split_binary(binary_path)?;
            proot = with_pty_nodes(proot.bind(dir, guest_paths::SSHX_DIR));
            guest.extend([
                guest_binary(guest_paths::SSHX_DIR, exe),
                "--shell".to_string(),
                shell.to_string(),
            ]);
        }
        TerminalService::Gotty {
            binary_path,
            port,
            credential,
        } => {
            let (dir, exe) = split_binary(binary_path)?;
            proot = with_pty_nodes(proot.bind(dir, guest_paths::GOTTY_DIR));
            guest.extend([
                guest_binary(guest_paths::GOTTY_DIR, exe),
                "-a".to_string(),
                GOTTY_LISTEN.to_string(),
                "-p".to_string(),
                port.to_string(),
            ]);
            // gotty stops parsing its own flags at the first positional
            if let Some(credential) = credential {
                guest.extend(["--credential".to_string(), credential.to_arg()]);
            }
            guest.extend([
                "-w".to_string(),
                shell.to_string(),
                "-c".to_string(),
                login(config),
            ]);
        }
    }

    let proot = proot.cwd(guest_paths::HOME);
    Ok(Invocation { proot, guest })
}

/// Compose and run the session, blocking until it ends.
pub fn launch(config: &Configuration) -> Result<ExitStatus, LaunchError> {
    let host = HostResources::gather(&config.data_dir);
    let invocation = compose(config, &host)?;

    tracing::info!(
        user = %config.user,
        hostname = %config.hostname,
        terminal = %config.terminal_service.kind(),
        "Entering sandbox"
    );
    tracing::debug!(program = %invocation.proot.program().display(), argv = ?invocation.argv(), "Sandbox invocation");

    let status = invocation
        .proot
        .build(&invocation.guest)
        .status()
        .map_err(|e| LaunchError::Spawn {
            program: invocation.proot.program().to_path_buf(),
            source: e,
        })?;

    tracing::info!(%status, "Sandbox session ended");
    Ok(status)
}

fn env_prefix(host: &HostResources) -> Vec<String> {
    let mut prefix = vec![
        guest_paths::ENV.to_string(),
        format!("HOME={}", guest_paths::HOME),
    ];
    prefix.extend(host.env_assignments());
    prefix
}

/// Shell script that installs the prompt and replaces itself with the shell.
fn login(config: &Configuration) -> String {
    format!(
        "export PS1=\"{}\"; exec {}",
        config.prompt(),
        config.shell_path
    )
}

fn with_pty_nodes(proot: ProotCommand) -> ProotCommand {
    guest_paths::PTY_NODES
        .iter()
        .fold(proot, |proot, node| proot.bind_same(node))
}

fn split_binary(binary: &Path) -> Result<(PathBuf, String), LaunchError> {
    let dir = binary.parent().filter(|d| !d.as_os_str().is_empty());
    let exe = binary.file_name();
    match (dir, exe) {
        (Some(dir), Some(exe)) => {
            let dir = std::path::absolute(dir).unwrap_or_else(|_| dir.to_path_buf());
            Ok((dir, exe.to_string_lossy().into_owned()))
        }
        _ => Err(LaunchError::NotConfigured(format!(
            "terminal backend path {} has no directory",
            binary.display()
        ))),
    }
}

fn guest_binary(mount: &str, exe: String) -> String {
    format!("{mount}/{exe}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Secret;
    use crate::runtime::platform::Architecture;

    fn config(service: TerminalService) -> Configuration {
        Configuration {
            user: "alice".into(),
            hostname: "box".into(),
            password: Secret::new("hunter22"),
            architecture: Some(Architecture::X86_64),
            distro_url: "https://mirror.invalid/debian.tar.xz".into(),
            shell_path: "/bin/bash".into(),
            sandbox_binary_name: "proot".into(),
            rootfs_path: Some("/data/rootfs/debian".into()),
            terminal_service: service,
            data_dir: "/data".into(),
        }
    }

    fn host() -> HostResources {
        HostResources {
            cpus: 4,
            memory_bytes: 1024,
            disk_bytes: 2048,
        }
    }

    fn position(argv: &[String], needle: &str) -> usize {
        argv.iter()
            .position(|a| a == needle)
            .unwrap_or_else(|| panic!("{needle} not in {argv:?}"))
    }

    #[test]
    fn test_native_invocation() {
        let inv = compose(&config(TerminalService::Native), &host()).unwrap();

        assert_eq!(inv.proot.program(), Path::new("/data/libs/proot/proot"));
        assert_eq!(
            inv.proot.args(),
            [
                "-r",
                "/data/rootfs/debian",
                "-0",
                "-b",
                "/proc:/proc",
                "-w",
                "/root"
            ]
        );
        assert_eq!(
            inv.guest,
            [
                "/usr/bin/env",
                "HOME=/root",
                "LCSX_HOST_CPUS=4",
                "LCSX_HOST_MEMORY=1024",
                "LCSX_HOST_DISK=2048",
                "/bin/bash",
                "-c",
                "export PS1=\"alice@box# \"; exec /bin/bash"
            ]
        );
    }

    #[test]
    fn test_sshx_binds_binary_dir_and_ptys() {
        let inv = compose(
            &config(TerminalService::Sshx {
                binary_path: "/data/libs/sshx/sshx".into(),
            }),
            &host(),
        )
        .unwrap();

        let args = inv.proot.args();
        assert!(args.contains(&"/data/libs/sshx:/sshx".to_string()));
        for node in ["/dev/ptmx:/dev/ptmx", "/dev/pts:/dev/pts", "/dev/tty:/dev/tty"] {
            assert!(args.contains(&node.to_string()), "{node}");
        }
        assert_eq!(inv.guest[5..], ["/sshx/sshx", "--shell", "/bin/bash"]);
    }

    #[test]
    fn test_gotty_credential_precedes_shell_flags() {
        let inv = compose(
            &config(TerminalService::Gotty {
                binary_path: "/data/libs/gotty/gotty".into(),
                port: 6040,
                credential: Some("alice:secret".parse().unwrap()),
            }),
            &host(),
        )
        .unwrap();

        let guest = &inv.guest;
        let cred = position(guest, "--credential");
        assert_eq!(guest[cred + 1], "alice:secret");
        assert!(cred < position(guest, "-w"));
        assert!(cred < position(guest, "-c"));
        assert_eq!(
            guest[5..10],
            ["/gotty/gotty", "-a", "0.0.0.0", "-p", "6040"]
        );
        assert!(inv.argv().contains(&"/data/libs/gotty:/gotty".to_string()));
    }

    #[test]
    fn test_gotty_without_credential() {
        let inv = compose(
            &config(TerminalService::Gotty {
                binary_path: "/data/libs/gotty/gotty".into(),
                port: 7000,
                credential: None,
            }),
            &host(),
        )
        .unwrap();

        assert!(!inv.guest.contains(&"--credential".to_string()));
        assert_eq!(inv.guest[10], "-w");
    }

    #[test]
    fn test_incomplete_config_is_refused() {
        let mut cfg = config(TerminalService::Native);
        cfg.rootfs_path = None;
        let err = compose(&cfg, &host()).unwrap_err();
        assert!(matches!(err, LaunchError::NotConfigured(ref m) if m.contains("rootfs_path")));
    }

    #[test]
    fn test_spawn_failure_names_program() {
        let temp = tempfile::tempdir().unwrap();
        let mut cfg = config(TerminalService::Native);
        cfg.data_dir = temp.path().to_path_buf();

        let err = launch(&cfg).unwrap_err();
        assert!(
            matches!(err, LaunchError::Spawn { ref program, .. } if program.ends_with("libs/proot/proot"))
        );
    }
}
