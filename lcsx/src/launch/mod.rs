//! Composition and execution of the sandboxed session.

mod composer;
mod host;
mod proot;

pub use composer::{Invocation, compose, launch};
pub use host::HostResources;
pub use proot::ProotCommand;
