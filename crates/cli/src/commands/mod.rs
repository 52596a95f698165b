//! CLI subcommands

pub mod meter;
pub mod query;
pub mod status;
