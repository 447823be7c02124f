//! Job list loader
//!
//! Fetches the full job list on demand and hands it to the reconciler.
//! Failures are returned to the caller; nothing here retries on its own.

use ferry_client::{Credentials, Result};
use ferry_core::domain::job::Job;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::repository::JobRepository;
use crate::scheduler::Reconciler;

/// Loads complete job snapshots and seeds the reconciler with them
#[derive(Clone)]
pub struct JobListLoader {
    repo: Arc<dyn JobRepository>,
    credentials: Credentials,
}

impl JobListLoader {
    /// Creates a loader
    ///
    /// # Arguments
    /// * `repo` - Source of the job list
    /// * `credentials` - Session token, cleared when the API rejects it
    pub fn new(repo: Arc<dyn JobRepository>, credentials: Credentials) -> Self {
        Self { repo, credentials }
    }

    /// Loads every job in server order
    ///
    /// An unauthorized response clears the stored credentials before the
    /// error is returned.
    pub async fn load_all(&self) -> Result<Vec<Job>> {
        match self.repo.load_all().await {
            Ok(jobs) => Ok(jobs),
            Err(e) if e.is_unauthorized() => {
                warn!("Job list rejected as unauthorized, clearing credentials");
                self.credentials.clear();
                Err(e)
            }
            Err(e) => {
                error!("Failed to load job list: {}", e);
                Err(e)
            }
        }
    }

    /// Loads the job list and seeds the reconciler with it
    ///
    /// On failure the reconciler is left untouched: same collection, and no
    /// timer is started.
    ///
    /// # Returns
    /// The number of jobs loaded
    pub async fn refresh(&self, reconciler: &Reconciler) -> Result<usize> {
        let jobs = self.load_all().await?;
        let count = jobs.len();

        reconciler.seed(jobs);
        info!("Loaded {} job(s)", count);

        Ok(count)
    }
}
