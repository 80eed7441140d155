//! Subcommand implementations.

pub mod check;
pub mod init;
pub mod model;
pub mod output;
