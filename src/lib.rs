// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # stitch-query
//!
//! Fetch complete result sets from a Parse-style query API whose queries
//! return at most 1000 records per request.
//!
//! ## Features
//!
//! - **Offset Stitching**: Walks `skip`/`limit` pages until a short page
//! - **Super Stitch**: Cursors on `createdAt` to go past the offset depth
//! - **Pluggable Engines**: Parse REST client and an in-memory engine
//! - **Pass-through Options**: Master key, session token, anything else
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stitch_query::{stitch, ParseClient, ParseConfig, Query, Result, StitchOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = ParseClient::new(
//!         ParseConfig::builder()
//!             .server_url("https://example.com/parse")
//!             .application_id("my-app")
//!             .build(),
//!     )?;
//!
//!     let query = Query::new("GameScore").greater_than("score", 100);
//!     let options = StitchOptions::new().with_super_stitch(true);
//!     let scores = stitch(&client, query, &options).await?;
//!
//!     println!("{} scores", scores.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  QueryStitcher::stitch(query, options) → Vec<Record>        │
//! │  offset pages (skip += 1000) ──► createdAt cursor windows   │
//! └─────────────────────────────────────────────────────────────┘
//!                               │ find(page query)
//!               ┌───────────────┴───────────────┐
//!               │          QueryEngine          │
//!               ├───────────────┬───────────────┤
//!               │  ParseClient  │ MemoryEngine  │
//!               │  (REST)       │ (in-process)  │
//!               └───────────────┴───────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Query builder
pub mod query;

/// Query engine trait and in-memory engine
pub mod engine;

/// Page stitching
pub mod pagination;

/// Parse REST client
pub mod http;

/// Configuration
pub mod config;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::{Config, ParseConfig};
pub use engine::{FindOptions, MemoryEngine, QueryEngine};
pub use error::{Error, Result};
pub use http::ParseClient;
pub use pagination::{
    stitch, QueryStitcher, StitchLimits, StitchOptions, StitchOutcome, StopReason, MAX_QUERIES,
    PAGE_SIZE,
};
pub use query::Query;
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
