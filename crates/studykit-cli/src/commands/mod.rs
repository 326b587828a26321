//! Subcommand implementations for the `studykit` CLI.

pub mod sync;
pub mod term;
