//! Host resource summary exported into the guest.

use crate::runtime::constants::envs;
use std::path::Path;
use sysinfo::{Disks, System};

/// CPU, memory and disk capacity of the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostResources {
    pub cpus: usize,
    pub memory_bytes: u64,
    pub disk_bytes: u64,
}

impl HostResources {
    /// Probe the host. `data_dir` selects the disk whose capacity is reported.
    pub fn gather(data_dir: &Path) -> Self {
        let mut sys = System::new();
        sys.refresh_cpu();
        sys.refresh_memory();

        let resources = Self {
            cpus: sys.cpus().len(),
            memory_bytes: sys.total_memory(),
            disk_bytes: disk_capacity(data_dir),
        };
        tracing::debug!(
            cpus = resources.cpus,
            memory_bytes = resources.memory_bytes,
            disk_bytes = resources.disk_bytes,
            "Collected host resources"
        );
        resources
    }

    /// `KEY=value` assignments for `/usr/bin/env`.
    pub fn env_assignments(&self) -> Vec<String> {
        vec![
            format!("{}={}", envs::HOST_CPUS, self.cpus),
            format!("{}={}", envs::HOST_MEMORY, self.memory_bytes),
            format!("{}={}", envs::HOST_DISK, self.disk_bytes),
        ]
    }
}

/// Total size of the filesystem with the longest mount point containing `path`.
fn disk_capacity(path: &Path) -> u64 {
    let disks = Disks::new_with_refreshed_list();
    disks
        .list()
        .iter()
        .filter(|disk| path.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().as_os_str().len())
        .map(|disk| disk.total_space())
        .unwrap_or(0)
}
