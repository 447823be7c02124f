//! Job collection
//!
//! Jobs are held in a map keyed by id plus a separate order list, so
//! replacing one job never moves or duplicates another.

use ferry_core::domain::job::{Job, JobId};
use std::collections::HashMap;

/// Ordered collection of jobs keyed by id
#[derive(Debug, Clone, Default)]
pub struct JobStore {
    jobs: HashMap<JobId, Job>,
    order: Vec<JobId>,
}

impl JobStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole collection with a full load
    ///
    /// A duplicated id keeps its first position; the later record wins.
    pub fn replace_all(&mut self, jobs: Vec<Job>) {
        self.jobs.clear();
        self.order.clear();

        for job in jobs {
            self.admit(job);
        }
    }

    /// Replaces a known job in place
    ///
    /// Returns `false` (and changes nothing) when the id is not tracked.
    pub fn replace(&mut self, job: Job) -> bool {
        match self.jobs.get_mut(&job.id) {
            Some(slot) => {
                *slot = job;
                true
            }
            None => false,
        }
    }

    /// Adds a job the collection has not seen yet, or replaces a known one
    pub fn admit(&mut self, job: Job) {
        let id = job.id;
        if self.jobs.insert(id, job).is_none() {
            self.order.push(id);
        }
    }

    /// Ids of jobs still `Pending` or `Running`, in collection order
    pub fn active_ids(&self) -> Vec<JobId> {
        self.order
            .iter()
            .filter(|id| self.jobs.get(*id).is_some_and(Job::is_active))
            .copied()
            .collect()
    }

    /// Looks up a job by id
    pub fn get(&self, id: JobId) -> Option<&Job> {
        self.jobs.get(&id)
    }

    /// Clones the collection in its maintained order
    pub fn jobs(&self) -> Vec<Job> {
        self.order
            .iter()
            .filter_map(|id| self.jobs.get(id))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
