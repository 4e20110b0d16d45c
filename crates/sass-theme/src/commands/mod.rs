//! Command implementations for the sass-theme CLI
//!
//! Each command module handles the CLI interface and delegates to
//! sass-theme-loader for the actual work.

pub mod compile;
pub mod vars;
