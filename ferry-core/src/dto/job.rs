//! Job DTOs exchanged with the import-job API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::job::{JobId, JobStatus};

/// Request to create a new import job
///
/// `credentials` is keyed by source name; every selected source needs an entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJob {
    pub selected_sources: Vec<String>,
    pub credentials: HashMap<String, HashMap<String, String>>,
}

impl CreateJob {
    /// Names of selected sources that have no credentials attached
    pub fn missing_credentials(&self) -> Vec<&str> {
        self.selected_sources
            .iter()
            .filter(|source| !self.credentials.contains_key(source.as_str()))
            .map(String::as_str)
            .collect()
    }
}

/// Response returned once a job has been accepted
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobResponse {
    pub job_id: JobId,
    pub status: JobStatus,
    #[serde(with = "crate::timestamp")]
    pub created_at: DateTime<Utc>,
}
