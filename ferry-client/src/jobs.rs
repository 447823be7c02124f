//! Import-job API endpoints

use crate::ImportClient;
use crate::error::{ClientError, Result};
use ferry_core::domain::job::{Job, JobId};
use ferry_core::dto::job::{CreateJob, CreateJobResponse};
use tracing::debug;

impl ImportClient {
    /// List every job visible to the current user, in server order
    ///
    /// Each call is a full snapshot; nothing is incremental.
    pub async fn list_jobs(&self) -> Result<Vec<Job>> {
        let url = format!("{}/import_jobs", self.base_url);
        let response = self.authorize(self.client.get(&url)).send().await?;

        let jobs: Vec<Job> = self.handle_response(response).await?;
        debug!("Listed {} job(s)", jobs.len());
        Ok(jobs)
    }

    /// Get the current snapshot of one job
    ///
    /// # Arguments
    /// * `job_id` - The job identifier
    pub async fn get_job(&self, job_id: JobId) -> Result<Job> {
        let url = format!("{}/import_jobs/{}", self.base_url, job_id);
        let response = self.authorize(self.client.get(&url)).send().await?;

        self.handle_response(response).await
    }

    /// Create a new import job
    ///
    /// The request is checked locally first: at least one source, and
    /// credentials for every selected source.
    ///
    /// # Example
    /// ```no_run
    /// # use ferry_client::{Credentials, ImportClient};
    /// # use ferry_core::dto::job::CreateJob;
    /// # use std::collections::HashMap;
    /// # async fn example() -> ferry_client::Result<()> {
    /// let client = ImportClient::new("http://localhost:8000/api/v1", Credentials::default());
    /// let created = client.create_job(CreateJob {
    ///     selected_sources: vec!["products".to_string()],
    ///     credentials: HashMap::from([(
    ///         "products".to_string(),
    ///         HashMap::from([("apiKey".to_string(), "secret".to_string())]),
    ///     )]),
    /// }).await?;
    /// println!("created job {}", created.job_id);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn create_job(&self, req: CreateJob) -> Result<CreateJobResponse> {
        if req.selected_sources.is_empty() {
            return Err(ClientError::InvalidRequest(
                "at least one source must be selected".to_string(),
            ));
        }
        let missing = req.missing_credentials();
        if !missing.is_empty() {
            return Err(ClientError::InvalidRequest(format!(
                "missing credentials for source(s): {}",
                missing.join(", ")
            )));
        }

        let url = format!("{}/import_jobs", self.base_url);
        let response = self
            .authorize(self.client.post(&url))
            .json(&req)
            .send()
            .await?;

        self.handle_response(response).await
    }
}
