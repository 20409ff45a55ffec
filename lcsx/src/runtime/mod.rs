pub mod constants;
pub(crate) mod context;
pub mod layout;
pub mod options;
pub mod platform;
pub mod setup;

mod core;
pub use context::LcsxContext;
pub use core::{LcsxRuntime, PrepareOutcome};
