//! Pagination module
//!
//! Stitches paged query results into one list.
//!
//! # Overview
//!
//! Query APIs cap both the page size and the reachable offset. The
//! stitcher walks offsets until a short page comes back, and with
//! super-stitch enabled restarts the offset window after the `createdAt`
//! of the last record once the offset budget is spent.
//!
//! ```rust,ignore
//! use stitch_query::{stitch, MemoryEngine, Query, StitchOptions};
//!
//! let engine = MemoryEngine::new();
//! let options = StitchOptions::new().with_super_stitch(true);
//! let records = stitch(&engine, Query::new("GameScore"), &options).await?;
//! ```

mod stitcher;
mod types;

pub use stitcher::{stitch, QueryStitcher};
pub use types::{
    prepare_query, NextPage, StitchLimits, StitchOptions, StitchOutcome, StitchState, StopReason,
    MAX_QUERIES, PAGE_SIZE,
};
