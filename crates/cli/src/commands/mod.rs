//! Subcommand implementations

pub mod health;
pub mod nodes;
pub mod placement;
