//! CLI subcommands.

pub mod sync;
