//! CLI command handlers, one file per command.

mod extract;
mod fetch;
mod remove;

pub use extract::run_extract;
pub use fetch::run_fetch;
pub use remove::run_remove;
