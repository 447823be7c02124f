#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use ferry_client::{ClientError, FailureKind, Result};
use ferry_core::domain::job::{Job, JobId, JobStatus, SourceProgress};
use ferry_watcher::JobRepository;
use tokio::sync::Notify;

pub fn job(id: i64, status: JobStatus) -> Job {
    let created = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
    Job {
        id: JobId(id),
        status,
        selected_sources: vec!["products".to_string()],
        progress: BTreeMap::from([(
            "products".to_string(),
            SourceProgress {
                completed: 0,
                total: 30,
                status,
            },
        )]),
        error: (status == JobStatus::Failed).then(|| "import failed".to_string()),
        created_at: created,
        updated_at: created,
    }
}

pub fn error_for(kind: FailureKind) -> ClientError {
    match kind {
        FailureKind::Auth => ClientError::Unauthorized("Could not validate credentials".to_string()),
        FailureKind::NotFound => ClientError::NotFound("Job not found".to_string()),
        FailureKind::Network => ClientError::from_status(503, "Service Unavailable"),
    }
}

/// Holds a fetch until the test releases it
#[derive(Default)]
pub struct Gate {
    pub started: Notify,
    pub release: Notify,
}

/// Scripted in-memory repository
///
/// Each job replays its queued replies in order; the last one repeats.
#[derive(Default)]
pub struct FakeRepository {
    list: Mutex<Option<std::result::Result<Vec<Job>, FailureKind>>>,
    replies: Mutex<HashMap<JobId, VecDeque<std::result::Result<JobStatus, FailureKind>>>>,
    gates: Mutex<HashMap<JobId, Arc<Gate>>>,
    calls: Mutex<Vec<JobId>>,
}

impl FakeRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_list(&self, list: std::result::Result<Vec<Job>, FailureKind>) {
        *self.list.lock().unwrap() = Some(list);
    }

    pub fn script(&self, id: i64, replies: Vec<std::result::Result<JobStatus, FailureKind>>) {
        self.replies
            .lock()
            .unwrap()
            .insert(JobId(id), replies.into_iter().collect());
    }

    pub fn gate(&self, id: i64) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        self.gates.lock().unwrap().insert(JobId(id), Arc::clone(&gate));
        gate
    }

    pub fn calls(&self) -> Vec<JobId> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobRepository for FakeRepository {
    async fn load_all(&self) -> Result<Vec<Job>> {
        match self.list.lock().unwrap().clone() {
            Some(Ok(jobs)) => Ok(jobs),
            Some(Err(kind)) => Err(error_for(kind)),
            None => Ok(Vec::new()),
        }
    }

    async fn fetch_one(&self, id: JobId) -> Result<Job> {
        self.calls.lock().unwrap().push(id);

        let gate = self.gates.lock().unwrap().get(&id).cloned();
        if let Some(gate) = gate {
            gate.started.notify_one();
            gate.release.notified().await;
        }

        let reply = {
            let mut replies = self.replies.lock().unwrap();
            match replies.get_mut(&id) {
                Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
                Some(queue) => queue.front().copied().unwrap_or(Err(FailureKind::NotFound)),
                None => Err(FailureKind::NotFound),
            }
        };

        reply.map(|status| job(id.0, status)).map_err(error_for)
    }
}
