//! Checks and edits applied to an extracted guest tree from the host side.

use crate::runtime::constants::network;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Guest path of the configured shell, relative to the root.
fn in_guest(root: &Path, guest_path: &str) -> PathBuf {
    root.join(guest_path.trim_start_matches('/'))
}

/// A tree is valid when the configured shell exists inside it.
///
/// The shell may be an absolute symlink into the guest (Alpine's `/bin/sh`
/// points at `/bin/busybox`), so the link itself is checked, not its target.
pub fn is_valid(root: &Path, shell: &str) -> bool {
    fs::symlink_metadata(in_guest(root, shell)).is_ok()
}

/// Overwrite `/etc/resolv.conf` with fixed public resolvers.
pub fn write_resolv_conf(root: &Path) -> io::Result<PathBuf> {
    let etc = root.join("etc");
    fs::create_dir_all(&etc)?;

    let path = etc.join("resolv.conf");
    // Often a dangling link to a systemd-managed file
    if fs::symlink_metadata(&path).is_ok_and(|m| m.file_type().is_symlink()) {
        fs::remove_file(&path)?;
    }

    let mut content = String::new();
    for server in network::DNS_SERVERS {
        content.push_str(&format!("nameserver {server}\n"));
    }
    content.push_str("options edns0\n");
    fs::write(&path, content)?;
    Ok(path)
}

/// Start-up file read by `shell` for the guest root user.
pub fn profile_path(root: &Path, shell: &str) -> PathBuf {
    let file = if shell.ends_with("bash") {
        ".bashrc"
    } else {
        ".profile"
    };
    root.join("root").join(file)
}

/// Append `export PS1="<prompt>"` to the shell start-up file unless an
/// identical line is already there.
pub fn install_prompt(root: &Path, shell: &str, prompt: &str) -> io::Result<PathBuf> {
    let path = profile_path(root, shell);
    let line = format!("export PS1=\"{prompt}\"");

    match fs::read_to_string(&path) {
        Ok(existing) if existing.lines().any(|l| l == line) => return Ok(path),
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    writeln!(file)?;
    writeln!(file, "{line}")?;
    Ok(path)
}
