//! Command-line and structured-file sources for confbind.
//!
//! - [`FlagSource`] scans `-key=value` style arguments.
//! - [`FileSource`] reads a YAML, JSON or TOML document, generating it from
//!   the registered defaults when it does not exist yet.

mod file;
mod flag;
mod writer;

pub use file::{FileConf, FileSource, Format};
pub use flag::FlagSource;
