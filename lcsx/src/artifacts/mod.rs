//! Provisioning of external helper binaries (proot, terminal backends, apk).

mod catalog;
mod provisioner;

pub use catalog::{Artifact, ArtifactSource, Packaging};
pub use provisioner::Provisioner;
