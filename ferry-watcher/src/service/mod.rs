//! Service layer
//!
//! Services combine repositories with session state. The job list loader is
//! the only path that replaces the whole collection.

mod loader;

pub use loader::JobListLoader;
