#![allow(dead_code)]

use assert_cmd::Command;
use std::path::Path;
use std::time::Duration;

/// `lcsx` with `HOME` redirected so nothing touches the real home directory.
pub fn lcsx(home: &Path) -> Command {
    let bin_path = env!("CARGO_BIN_EXE_lcsx");
    let mut cmd = Command::new(bin_path);
    cmd.timeout(Duration::from_secs(30));
    cmd.env("HOME", home);
    cmd.env_remove("RUST_LOG");
    cmd
}
