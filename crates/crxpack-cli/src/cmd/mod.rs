//! Subcommand implementations.

pub mod id;
pub mod pack;
pub mod verify;
