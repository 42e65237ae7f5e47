//! Editor time diary CLI library.
//!
//! This crate provides the CLI interface for the editor time diary.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands};
pub use config::Config;
