//! Command-line wrapper around the Vikunja task API.
//!
//! Commands are forwarded to the `vikunja.sh` client script together with the
//! credentials from `credentials.json`. Task descriptions written as plain
//! text are converted to HTML on the way through (see [`format`]).

pub mod command;
pub mod credentials;
pub mod format;
pub mod script;

pub use command::Vikunja;
