//! Grouped aggregation and summary publishing.
//!
//! This module turns cleaned records into per-group rounded averages,
//! assembles the dashboard summary tables, writes them out, and optionally
//! uploads the results to S3.

pub mod aggregate;
pub mod analyzer;
pub mod summary;
pub mod types;
pub mod utility;
pub mod writetos3;
