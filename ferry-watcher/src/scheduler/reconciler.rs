//! Polling reconciler
//!
//! Holds the job collection and refreshes the jobs that are still `Pending`
//! or `Running`. Each cycle fetches every active job concurrently, waits for
//! all of them to settle, then merges the successful results in one step.
//!
//! The poll timer runs if and only if the active set is non-empty. It is
//! re-evaluated after every seed, admit and tick, and cancelled on dispose.

use ferry_client::FailureKind;
use ferry_core::domain::job::{Job, JobId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::repository::JobRepository;
use crate::store::JobStore;

/// How a polling cycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No job was active, nothing was fetched and the timer is stopped
    Idle,
    /// Fetch results were merged into the collection
    Merged,
    /// Another cycle was still in flight, nothing was fetched
    Skipped,
    /// The collection was re-seeded mid-cycle, results were dropped
    Discarded,
    /// The reconciler has been disposed
    Disposed,
}

/// Summary of one polling cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub outcome: TickOutcome,
    /// Jobs whose fresh snapshot was merged
    pub fetched: Vec<JobId>,
    /// Jobs that could not be refreshed this cycle
    pub failures: Vec<(JobId, FailureKind)>,
    /// Size of the active set once the cycle finished
    pub active: usize,
}

impl TickReport {
    fn empty(outcome: TickOutcome, active: usize) -> Self {
        Self {
            outcome,
            fetched: Vec::new(),
            failures: Vec::new(),
            active,
        }
    }

    /// Whether every fetch of this cycle was rejected as unauthorized
    ///
    /// The reconciler keeps retrying regardless; this lets the consumer
    /// detect a dead session and stop.
    pub fn all_unauthorized(&self) -> bool {
        self.fetched.is_empty()
            && !self.failures.is_empty()
            && self.failures.iter().all(|(_, kind)| *kind == FailureKind::Auth)
    }
}

/// Read-only view published to observers after every state change
#[derive(Debug, Clone, Default)]
pub struct CollectionView {
    /// Increases by one with every publication
    pub revision: u64,
    /// The job collection in its maintained order
    pub jobs: Vec<Job>,
    /// Ids still being polled, in collection order
    pub active: Vec<JobId>,
    /// Report of the cycle that produced this view, if any
    pub last_tick: Option<TickReport>,
}

struct State {
    store: JobStore,
    /// Bumped by seed and dispose; a cycle started under an older value is stale
    generation: u64,
    revision: u64,
    disposed: bool,
}

struct Shared {
    repo: Arc<dyn JobRepository>,
    poll_interval: Duration,
    state: Mutex<State>,
    timer: Mutex<Option<JoinHandle<()>>>,
    cycle_in_flight: AtomicBool,
    views: watch::Sender<Arc<CollectionView>>,
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_timer(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.timer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn stop_timer(&self) {
        if let Some(handle) = self.lock_timer().take() {
            handle.abort();
            debug!("Poll timer cancelled");
        }
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let timer = self.timer.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = timer.take() {
            handle.abort();
        }
    }
}

/// Marks the single polling cycle allowed in flight; released on drop
struct CycleGuard<'a>(&'a AtomicBool);

impl<'a> CycleGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CycleGuard(flag))
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Owner of the job collection and its polling cycle
///
/// Cloning is cheap; all clones share the same collection and timer. The
/// timer is a Tokio task, so `seed`, `admit` and `tick` must run inside a
/// Tokio runtime.
#[derive(Clone)]
pub struct Reconciler {
    shared: Arc<Shared>,
}

impl Reconciler {
    /// Creates an empty reconciler
    ///
    /// # Arguments
    /// * `repo` - Source of fresh job snapshots
    /// * `poll_interval` - Delay between two polling cycles
    pub fn new(repo: Arc<dyn JobRepository>, poll_interval: Duration) -> Self {
        let (views, _) = watch::channel(Arc::new(CollectionView::default()));
        Self {
            shared: Arc::new(Shared {
                repo,
                poll_interval,
                state: Mutex::new(State {
                    store: JobStore::new(),
                    generation: 0,
                    revision: 0,
                    disposed: false,
                }),
                timer: Mutex::new(None),
                cycle_in_flight: AtomicBool::new(false),
                views,
            }),
        }
    }

    /// Installs a full job collection, replacing the previous one
    ///
    /// A cycle still in flight will not merge into the new collection.
    pub fn seed(&self, jobs: Vec<Job>) {
        let mut state = self.shared.lock_state();
        if state.disposed {
            warn!("Ignoring seed of {} job(s): reconciler disposed", jobs.len());
            return;
        }

        state.store.replace_all(jobs);
        state.generation += 1;

        let active = state.store.active_ids().len();
        info!("Seeded {} job(s), {} active", state.store.len(), active);

        self.sync_timer(active);
        self.publish(&mut state, None);
    }

    /// Adds a job introduced by a creation response, or refreshes a known one
    pub fn admit(&self, job: Job) {
        let mut state = self.shared.lock_state();
        if state.disposed {
            warn!("Ignoring job {}: reconciler disposed", job.id);
            return;
        }

        if let Some(current) = state.store.get(job.id) {
            if !supersedes(current, &job) {
                warn!(
                    "Ignoring {} snapshot for job {}: already {}",
                    job.status, job.id, current.status
                );
                return;
            }
        }

        debug!("Admitting job {} ({})", job.id, job.status);
        state.store.admit(job);

        let active = state.store.active_ids().len();
        self.sync_timer(active);
        self.publish(&mut state, None);
    }

    /// Runs one polling cycle
    ///
    /// Normally driven by the internal timer; calling it directly is
    /// supported. Fetch failures never escape: they are logged, reported in
    /// the [`TickReport`], and the affected jobs stay active for next time.
    pub async fn tick(&self) -> TickReport {
        let Some(_cycle) = CycleGuard::acquire(&self.shared.cycle_in_flight) else {
            debug!("Polling cycle already in flight, skipping tick");
            let active = self.shared.lock_state().store.active_ids().len();
            return TickReport::empty(TickOutcome::Skipped, active);
        };

        let (targets, generation) = {
            let state = self.shared.lock_state();
            if state.disposed {
                return TickReport::empty(TickOutcome::Disposed, 0);
            }

            let targets = state.store.active_ids();
            if targets.is_empty() {
                self.shared.stop_timer();
                return TickReport::empty(TickOutcome::Idle, 0);
            }
            (targets, state.generation)
        };

        debug!("Polling {} active job(s)", targets.len());
        let results = self.fetch_all(&targets).await;

        let mut state = self.shared.lock_state();
        if state.disposed {
            debug!("Reconciler disposed mid-cycle, dropping {} result(s)", results.len());
            return TickReport::empty(TickOutcome::Disposed, 0);
        }
        if state.generation != generation {
            debug!("Collection re-seeded mid-cycle, dropping {} result(s)", results.len());
            let active = state.store.active_ids().len();
            return TickReport::empty(TickOutcome::Discarded, active);
        }

        let mut report = TickReport::empty(TickOutcome::Merged, 0);
        for (id, result) in results {
            match result {
                Ok(job) => {
                    let accepted = state
                        .store
                        .get(id)
                        .is_some_and(|current| supersedes(current, &job));
                    if accepted && state.store.replace(job) {
                        report.fetched.push(id);
                    }
                }
                Err(kind) => report.failures.push((id, kind)),
            }
        }

        let active = state.store.active_ids().len();
        report.active = active;

        if active == 0 {
            info!("All jobs settled, polling stopped");
        } else {
            debug!(
                "Cycle merged {} job(s), {} failed, {} still active",
                report.fetched.len(),
                report.failures.len(),
                active
            );
        }

        self.sync_timer(active);
        self.publish(&mut state, Some(report.clone()));
        report
    }

    /// Current job collection in its maintained order
    ///
    /// Never blocks on a cycle and never triggers a fetch.
    pub fn snapshot(&self) -> Vec<Job> {
        self.shared.views.borrow().jobs.clone()
    }

    /// Latest published view
    pub fn view(&self) -> Arc<CollectionView> {
        Arc::clone(&self.shared.views.borrow())
    }

    /// Receiver notified after every seed, admit and completed cycle
    pub fn subscribe(&self) -> watch::Receiver<Arc<CollectionView>> {
        self.shared.views.subscribe()
    }

    /// Ids of jobs still being polled, in collection order
    pub fn active_ids(&self) -> Vec<JobId> {
        self.shared.lock_state().store.active_ids()
    }

    /// Whether the poll timer is currently scheduled
    pub fn is_polling(&self) -> bool {
        self.shared
            .lock_timer()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Whether [`Reconciler::dispose`] has been called
    pub fn is_disposed(&self) -> bool {
        self.shared.lock_state().disposed
    }

    /// Cancels the timer and drops the results of any cycle in flight
    ///
    /// The last snapshot stays readable. Further seeds and ticks are ignored.
    pub fn dispose(&self) {
        let mut state = self.shared.lock_state();
        if state.disposed {
            return;
        }

        state.disposed = true;
        state.generation += 1;
        self.shared.stop_timer();
        info!("Reconciler disposed");
    }

    /// Fetches every target concurrently and waits for all of them to settle
    async fn fetch_all(&self, ids: &[JobId]) -> Vec<(JobId, Result<Job, FailureKind>)> {
        let handles: Vec<_> = ids
            .iter()
            .map(|&id| {
                let repo = Arc::clone(&self.shared.repo);
                (id, tokio::spawn(async move { repo.fetch_one(id).await }))
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (id, handle) in handles {
            let result = match handle.await {
                Ok(Ok(job)) if job.id == id => Ok(job),
                Ok(Ok(job)) => {
                    warn!("Poll for job {} returned job {}, ignoring", id, job.id);
                    Err(FailureKind::Network)
                }
                Ok(Err(e)) => {
                    warn!("Failed to poll job {}: {}", id, e);
                    Err(e.kind())
                }
                Err(e) => {
                    warn!("Poll task for job {} did not complete: {}", id, e);
                    Err(FailureKind::Network)
                }
            };
            results.push((id, result));
        }

        results
    }

    /// Starts or stops the timer to match the size of the active set
    ///
    /// Called with the state lock held so the timer always agrees with the
    /// collection that was just published.
    fn sync_timer(&self, active: usize) {
        if active == 0 {
            self.shared.stop_timer();
            return;
        }

        let mut timer = self.shared.lock_timer();
        if timer.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }
        if let Some(stale) = timer.take() {
            stale.abort();
        }

        *timer = Some(self.spawn_timer());
        debug!("Poll timer started (interval: {:?})", self.shared.poll_interval);
    }

    fn spawn_timer(&self) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.shared);
        let period = self.shared.poll_interval;

        tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                let Some(shared) = weak.upgrade() else {
                    break;
                };
                let report = Reconciler { shared }.tick().await;

                match report.outcome {
                    TickOutcome::Idle | TickOutcome::Disposed => break,
                    TickOutcome::Merged if report.active == 0 => break,
                    _ => {}
                }
            }
        })
    }

    fn publish(&self, state: &mut State, last_tick: Option<TickReport>) {
        state.revision += 1;
        let view = CollectionView {
            revision: state.revision,
            jobs: state.store.jobs(),
            active: state.store.active_ids(),
            last_tick,
        };
        self.shared.views.send_replace(Arc::new(view));
    }
}

/// Whether `fresh` may replace `current`
///
/// A terminal snapshot is final: any later snapshot with a different status
/// is stale.
fn supersedes(current: &Job, fresh: &Job) -> bool {
    !current.status.is_terminal() || fresh.status == current.status
}
