//! Guest root filesystem: distribution catalog, bootstrap and host-side edits.

mod bootstrap;
mod distro;
pub mod guest;

pub use bootstrap::{Bootstrapper, RootfsState};
pub use distro::{Distro, PackageFamily};
