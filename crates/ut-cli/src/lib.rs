//! User engagement tracker CLI library.
//!
//! This crate provides the CLI interface for replaying recorded sensor frames
//! through the engagement coordinator.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands};
pub use config::Config;
