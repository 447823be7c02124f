//! Scheduler layer
//!
//! Owns the job collection and the polling cycle that keeps in-flight jobs
//! fresh. The timer only runs while some job is still active.

pub mod reconciler;

pub use reconciler::{CollectionView, Reconciler, TickOutcome, TickReport};
