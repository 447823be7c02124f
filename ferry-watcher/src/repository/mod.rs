//! Repository layer
//!
//! Repositories abstract communication with the import-job API. They are
//! trait-based so the loader and reconciler can be driven by in-memory fakes.

mod jobs;

pub use jobs::{HttpJobRepository, JobRepository};
