//! Configuration record, its on-disk store, and input validation.

mod model;
mod store;
pub mod validation;

pub use model::{Configuration, Credential, Secret, TerminalKind, TerminalService};
pub use store::{ConfigStatus, ConfigStore};
