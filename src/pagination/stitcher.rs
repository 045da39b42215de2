//! Query stitcher
//!
//! Runs a query page by page and concatenates the pages. Offsets carry the
//! first `MAX_QUERIES` pages; with super-stitch enabled, the window is then
//! restarted after the `createdAt` of the last record seen, which lifts the
//! offset depth limit entirely.

use super::types::{
    prepare_query, NextPage, StitchLimits, StitchOptions, StitchOutcome, StitchState, StopReason,
};
use crate::engine::QueryEngine;
use crate::error::Result;
use crate::query::Query;
use crate::types::{format_date, Record};
use tracing::{debug, info, warn};

/// Stitches successive pages of a query into one result list
///
/// One fetch is in flight at a time. The stitcher only borrows the engine,
/// so any number of stitch calls can share it concurrently.
#[derive(Debug)]
pub struct QueryStitcher<'e, E: QueryEngine + ?Sized> {
    engine: &'e E,
    limits: StitchLimits,
}

impl<'e, E: QueryEngine + ?Sized> QueryStitcher<'e, E> {
    /// Create a stitcher with the default page size and offset budget
    pub fn new(engine: &'e E) -> Self {
        Self {
            engine,
            limits: StitchLimits::default(),
        }
    }

    /// Override the page size and offset budget
    #[must_use]
    pub fn with_limits(mut self, limits: StitchLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Limits in effect
    pub fn limits(&self) -> StitchLimits {
        self.limits
    }

    /// Fetch every page of `query` and return the concatenated records
    ///
    /// Without super-stitch the result silently stops at
    /// `PAGE_SIZE * MAX_QUERIES` records. The query's limit, skip and (for
    /// super-stitch) sort order are overwritten.
    pub async fn stitch(&self, query: Query, options: &StitchOptions) -> Result<Vec<Record>> {
        Ok(self.stitch_with_outcome(query, options).await?.records)
    }

    /// Like [`stitch`](Self::stitch), also reporting why stitching stopped
    pub async fn stitch_with_outcome(
        &self,
        query: Query,
        options: &StitchOptions,
    ) -> Result<StitchOutcome> {
        if options.super_stitch && query.has_order() {
            debug!(
                "super stitch replaces sort order '{}' on {}",
                query.order_param().unwrap_or_default(),
                query.class_name
            );
        }

        let base = prepare_query(query, self.limits, options.super_stitch);
        let mut state = StitchState::new();

        loop {
            let page_query = state.page_query(&base, self.limits);
            let page = self.engine.find(&page_query, &options.find_options).await?;

            debug!(
                "{}: page {} (skip {}) returned {} records",
                base.class_name,
                state.current_page,
                page_query.skip,
                page.len()
            );

            match state.process_page(page, self.limits, options.super_stitch) {
                NextPage::Offset { .. } => {}
                NextPage::Cursor { start_date } => {
                    debug!(
                        "{}: offset budget spent, continuing after createdAt {}",
                        base.class_name,
                        format_date(&start_date)
                    );
                }
                NextPage::Done(reason) => {
                    match reason {
                        StopReason::Exhausted => {}
                        StopReason::OffsetBudget => debug!(
                            "{}: stopped at offset depth {}",
                            base.class_name,
                            self.limits.offset_depth()
                        ),
                        StopReason::MissingCursor => warn!(
                            "{}: last record has no createdAt, cannot super stitch further",
                            base.class_name
                        ),
                    }

                    let outcome = state.finish(reason);
                    info!(
                        "{}: stitched {} records from {} pages",
                        base.class_name,
                        outcome.records.len(),
                        outcome.pages_fetched
                    );
                    return Ok(outcome);
                }
            }
        }
    }
}

/// Stitch a query against an engine with default limits
pub async fn stitch<E: QueryEngine + ?Sized>(
    engine: &E,
    query: Query,
    options: &StitchOptions,
) -> Result<Vec<Record>> {
    QueryStitcher::new(engine).stitch(query, options).await
}
