//! Core domain types
//!
//! These types mirror the records the import-job API returns and are shared
//! between the HTTP client (decoding) and the watcher (tracking).

pub mod job;
