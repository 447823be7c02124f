//! Jobs repository
//!
//! Read access to import jobs:
//! - Loading the full job list
//! - Fetching the current snapshot of one job

use async_trait::async_trait;
use ferry_client::{ImportClient, Result};
use ferry_core::domain::job::{Job, JobId};

/// Repository trait for reading import jobs
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Loads every job, in server order
    ///
    /// Always a full snapshot, safe to call repeatedly.
    async fn load_all(&self) -> Result<Vec<Job>>;

    /// Fetches the current snapshot of one job
    ///
    /// Must be safe to call concurrently for distinct ids.
    ///
    /// # Arguments
    /// * `id` - A job id previously returned by the API
    async fn fetch_one(&self, id: JobId) -> Result<Job>;
}

/// HTTP implementation of JobRepository
#[derive(Debug, Clone)]
pub struct HttpJobRepository {
    client: ImportClient,
}

impl HttpJobRepository {
    /// Creates a repository backed by the given client
    pub fn new(client: ImportClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl JobRepository for HttpJobRepository {
    async fn load_all(&self) -> Result<Vec<Job>> {
        self.client.list_jobs().await
    }

    async fn fetch_one(&self, id: JobId) -> Result<Job> {
        self.client.get_job(id).await
    }
}
