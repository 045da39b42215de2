//! Pagination types
//!
//! Limits, options, and the per-call state machine used by the stitcher.

use crate::engine::FindOptions;
use crate::query::Query;
use crate::types::{encode_date, JsonValue, Record, CREATED_AT};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Records requested per page
pub const PAGE_SIZE: usize = 1000;

/// Offset pages fetched per cursor window
pub const MAX_QUERIES: usize = 10;

/// Page size and offset budget used while stitching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StitchLimits {
    page_size: usize,
    max_queries: usize,
}

impl Default for StitchLimits {
    fn default() -> Self {
        Self {
            page_size: PAGE_SIZE,
            max_queries: MAX_QUERIES,
        }
    }
}

impl StitchLimits {
    /// Create limits; both values are raised to at least 1
    pub fn new(page_size: usize, max_queries: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            max_queries: max_queries.max(1),
        }
    }

    /// Records requested per page
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Offset pages per cursor window
    pub fn max_queries(&self) -> usize {
        self.max_queries
    }

    /// Records reachable through offsets alone
    pub fn offset_depth(&self) -> usize {
        self.page_size * self.max_queries
    }
}

/// Options for a stitch call
///
/// Deserializes from the same shape callers pass around as JSON:
/// `{"superStitch": true, "useMasterKey": true}`. Every key other than
/// `superStitch` lands in `find_options` and reaches the engine untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StitchOptions {
    /// Continue past the offset budget by cursoring on `createdAt`
    #[serde(rename = "superStitch", default)]
    pub super_stitch: bool,
    /// Engine-specific options
    #[serde(flatten)]
    pub find_options: FindOptions,
}

impl StitchOptions {
    /// Default options (no super-stitch, no engine options)
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable super-stitch
    #[must_use]
    pub fn with_super_stitch(mut self, enabled: bool) -> Self {
        self.super_stitch = enabled;
        self
    }

    /// Add an engine option
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.find_options = self.find_options.with(key, value);
        self
    }
}

/// Why stitching stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// A short page was returned; nothing is left
    Exhausted,
    /// The offset budget ran out without super-stitch
    OffsetBudget,
    /// Super-stitch could not continue: the last record has no `createdAt`
    MissingCursor,
}

/// What to fetch after a page has been processed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextPage {
    /// Next offset page in the current window
    Offset {
        /// Zero-based page index within the window
        page: usize,
    },
    /// First page of a new window after the cursor
    Cursor {
        /// Records must be created strictly after this
        start_date: DateTime<Utc>,
    },
    /// No more pages
    Done(StopReason),
}

impl NextPage {
    /// Check if this is a done result
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }
}

/// Final result of a stitch call
#[derive(Debug, Clone, PartialEq)]
pub struct StitchOutcome {
    /// Every fetched record, in fetch order
    pub records: Vec<Record>,
    /// Number of `find` calls made
    pub pages_fetched: usize,
    /// Number of cursor windows opened after the first
    pub cursor_windows: usize,
    /// Why stitching stopped
    pub stop_reason: StopReason,
}

impl StitchOutcome {
    /// Whether more matching records may exist than were returned
    pub fn is_truncated(&self) -> bool {
        self.stop_reason != StopReason::Exhausted
    }
}

/// Tracks pagination state during one stitch call
#[derive(Debug, Clone, Default)]
pub struct StitchState {
    /// Zero-based page index within the current window
    pub current_page: usize,
    /// Records fetched so far (append-only)
    pub accumulated: Vec<Record>,
    /// Lower bound on `createdAt` for the current window
    pub cursor_start_date: Option<DateTime<Utc>>,
    /// Pages fetched so far
    pub pages_fetched: usize,
    /// Cursor windows opened so far
    pub cursor_windows: usize,
}

impl StitchState {
    /// Create a new state
    pub fn new() -> Self {
        Self::default()
    }

    /// Offset of the current page
    pub fn skip(&self, limits: StitchLimits) -> usize {
        self.current_page * limits.page_size()
    }

    /// Derive the query for the current page from the prepared base query
    pub fn page_query(&self, base: &Query, limits: StitchLimits) -> Query {
        let query = base.clone().skip(self.skip(limits));
        match &self.cursor_start_date {
            Some(start_date) => query.greater_than(CREATED_AT, encode_date(start_date)),
            None => query,
        }
    }

    /// Append a fetched page and decide what comes next
    pub fn process_page(
        &mut self,
        page: Vec<Record>,
        limits: StitchLimits,
        super_stitch: bool,
    ) -> NextPage {
        let full = page.len() >= limits.page_size();
        self.pages_fetched += 1;
        self.accumulated.extend(page);

        if !full {
            return NextPage::Done(StopReason::Exhausted);
        }

        if self.current_page + 1 < limits.max_queries() {
            self.current_page += 1;
            return NextPage::Offset {
                page: self.current_page,
            };
        }

        if !super_stitch {
            return NextPage::Done(StopReason::OffsetBudget);
        }

        match self.accumulated.last().and_then(Record::created_at) {
            Some(start_date) => {
                self.current_page = 0;
                self.cursor_start_date = Some(start_date);
                self.cursor_windows += 1;
                NextPage::Cursor { start_date }
            }
            None => NextPage::Done(StopReason::MissingCursor),
        }
    }

    /// Consume the state into the final outcome
    pub fn finish(self, stop_reason: StopReason) -> StitchOutcome {
        StitchOutcome {
            records: self.accumulated,
            pages_fetched: self.pages_fetched,
            cursor_windows: self.cursor_windows,
            stop_reason,
        }
    }
}

/// Apply the stitcher's page size and, for super-stitch, its sort order
pub fn prepare_query(query: Query, limits: StitchLimits, super_stitch: bool) -> Query {
    let query = query.limit(limits.page_size());
    if super_stitch {
        query.ascending(CREATED_AT)
    } else {
        query
    }
}
