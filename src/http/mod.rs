//! HTTP module
//!
//! Parse REST API backend for the stitcher.
//!
//! # Features
//!
//! - **Query Engine**: `ParseClient` runs one query window per request
//! - **Credentials**: Application id, REST key, master key, session token
//! - **Rate Limiting**: Optional token bucket rate limiter using governor

mod client;
mod rate_limit;

pub use client::{
    ParseClient, HEADER_APPLICATION_ID, HEADER_MASTER_KEY, HEADER_REST_API_KEY,
    HEADER_SESSION_TOKEN,
};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
