//! Query module
//!
//! A [`Query`] is a plain value describing what to fetch from a query
//! engine: the class, its `where` constraints, sort keys and the
//! `limit`/`skip` window.
//!
//! # Overview
//!
//! Queries are built with consuming builder methods and are cheap to clone.
//! The stitcher never mutates the caller's query in place; every page is
//! fetched with a fresh copy carrying that page's window.

mod types;

pub use types::{Query, SortDirection, SortKey};

pub(crate) use types::is_operator_map;
