//! Query engine module
//!
//! The stitcher talks to storage only through [`QueryEngine`]: one call
//! executes one query window and returns the matching records.
//!
//! # Overview
//!
//! The engine module provides:
//! - `QueryEngine` - The async trait every backend implements
//! - `FindOptions` - Engine-specific options passed through untouched
//! - `MemoryEngine` - In-memory backend with Parse-like limits
//!
//! The Parse REST backend lives in [`crate::http`].

mod memory;
mod types;

pub use memory::MemoryEngine;
pub use types::{FindOptions, MemoryEngineConfig};

use crate::error::Result;
use crate::query::Query;
use crate::types::Record;
use async_trait::async_trait;

/// A backend able to execute a single query window
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Execute the query and return matching records in engine order
    async fn find(&self, query: &Query, options: &FindOptions) -> Result<Vec<Record>>;
}

#[async_trait]
impl<E: QueryEngine + ?Sized> QueryEngine for std::sync::Arc<E> {
    async fn find(&self, query: &Query, options: &FindOptions) -> Result<Vec<Record>> {
        (**self).find(query, options).await
    }
}
