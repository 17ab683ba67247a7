//! Subcommand implementations.

pub mod config;
pub mod engine;
pub mod process;
pub mod render;
