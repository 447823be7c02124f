//! Ferry Watcher
//!
//! Keeps a local, ordered collection of import jobs in sync with the API.
//!
//! Architecture:
//! - Configuration: API location, token and polling cadence
//! - Repositories: the `JobRepository` seam over the HTTP client
//! - Store: the job collection (arena keyed by id plus an order list)
//! - Services: the job list loader that seeds the collection
//! - Scheduler: the polling reconciler that refreshes in-flight jobs
//!
//! The reconciler only polls while at least one job is `Pending` or
//! `Running`, and stops its timer as soon as every job is terminal.

pub mod config;
pub mod repository;
pub mod scheduler;
pub mod service;
pub mod store;

pub use config::WatchConfig;
pub use repository::{HttpJobRepository, JobRepository};
pub use scheduler::{CollectionView, Reconciler, TickOutcome, TickReport};
pub use service::JobListLoader;
pub use store::JobStore;
