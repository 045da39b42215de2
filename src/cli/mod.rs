//! CLI module
//!
//! Command-line interface for stitching queries.
//!
//! # Commands
//!
//! - `fetch` - Stitch every page of a query on one or more classes
//! - `check` - Validate configuration and probe the server

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
