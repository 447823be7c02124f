mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{FakeRepository, job};
use ferry_client::FailureKind;
use ferry_core::domain::job::{JobId, JobStatus};
use ferry_watcher::{Reconciler, TickOutcome};
use tokio::time::Instant;

const INTERVAL: Duration = Duration::from_millis(2000);

fn reconciler(repo: &Arc<FakeRepository>) -> Reconciler {
    Reconciler::new(repo.clone(), INTERVAL)
}

fn statuses(reconciler: &Reconciler) -> Vec<(i64, JobStatus)> {
    reconciler
        .snapshot()
        .iter()
        .map(|job| (job.id.0, job.status))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn completed_job_stops_the_timer() {
    let repo = FakeRepository::new();
    repo.script(2, vec![Ok(JobStatus::Completed)]);
    let reconciler = reconciler(&repo);

    reconciler.seed(vec![job(1, JobStatus::Completed), job(2, JobStatus::Running)]);
    assert_eq!(reconciler.active_ids(), vec![JobId(2)]);
    assert!(reconciler.is_polling());

    let report = reconciler.tick().await;

    assert_eq!(report.outcome, TickOutcome::Merged);
    assert_eq!(report.fetched, vec![JobId(2)]);
    assert_eq!(report.active, 0);
    assert!(reconciler.active_ids().is_empty());
    assert!(!reconciler.is_polling());
    assert_eq!(repo.calls(), vec![JobId(2)]);
    assert_eq!(
        statuses(&reconciler),
        vec![(1, JobStatus::Completed), (2, JobStatus::Completed)]
    );
}

#[tokio::test(start_paused = true)]
async fn network_failure_leaves_job_untouched_and_active() {
    let repo = FakeRepository::new();
    repo.script(3, vec![Err(FailureKind::Network)]);
    let reconciler = reconciler(&repo);

    reconciler.seed(vec![job(3, JobStatus::Running)]);
    let before = reconciler.snapshot();

    let report = reconciler.tick().await;

    assert_eq!(report.outcome, TickOutcome::Merged);
    assert!(report.fetched.is_empty());
    assert_eq!(report.failures, vec![(JobId(3), FailureKind::Network)]);
    assert_eq!(reconciler.snapshot(), before);
    assert_eq!(reconciler.active_ids(), vec![JobId(3)]);
    assert!(reconciler.is_polling());
}

#[tokio::test(start_paused = true)]
async fn not_found_job_stays_tracked() {
    let repo = FakeRepository::new();
    repo.script(8, vec![Err(FailureKind::NotFound)]);
    let reconciler = reconciler(&repo);

    reconciler.seed(vec![job(8, JobStatus::Pending)]);
    let report = reconciler.tick().await;

    assert_eq!(report.failures, vec![(JobId(8), FailureKind::NotFound)]);
    assert_eq!(reconciler.active_ids(), vec![JobId(8)]);
    assert!(reconciler.is_polling());
}

#[tokio::test(start_paused = true)]
async fn failed_fetch_is_retried_next_cycle() {
    let repo = FakeRepository::new();
    repo.script(4, vec![Err(FailureKind::Network), Ok(JobStatus::Completed)]);
    let reconciler = reconciler(&repo);

    reconciler.seed(vec![job(4, JobStatus::Running)]);
    reconciler.tick().await;
    let report = reconciler.tick().await;

    assert_eq!(report.fetched, vec![JobId(4)]);
    assert_eq!(repo.calls(), vec![JobId(4), JobId(4)]);
    assert!(!reconciler.is_polling());
}

#[tokio::test(start_paused = true)]
async fn merge_preserves_order_and_identity() {
    let repo = FakeRepository::new();
    repo.script(1, vec![Ok(JobStatus::Completed)]);
    repo.script(3, vec![Ok(JobStatus::Running)]);
    let reconciler = reconciler(&repo);

    reconciler.seed(vec![
        job(1, JobStatus::Pending),
        job(2, JobStatus::Failed),
        job(3, JobStatus::Pending),
    ]);
    reconciler.tick().await;

    assert_eq!(
        statuses(&reconciler),
        vec![
            (1, JobStatus::Completed),
            (2, JobStatus::Failed),
            (3, JobStatus::Running),
        ]
    );
    assert_eq!(reconciler.active_ids(), vec![JobId(3)]);
}

#[tokio::test(start_paused = true)]
async fn partial_failure_does_not_affect_other_jobs() {
    let repo = FakeRepository::new();
    repo.script(1, vec![Err(FailureKind::Network)]);
    repo.script(2, vec![Ok(JobStatus::Completed)]);
    let reconciler = reconciler(&repo);

    reconciler.seed(vec![job(1, JobStatus::Running), job(2, JobStatus::Running)]);
    let report = reconciler.tick().await;

    assert_eq!(report.fetched, vec![JobId(2)]);
    assert_eq!(report.failures, vec![(JobId(1), FailureKind::Network)]);
    assert_eq!(
        statuses(&reconciler),
        vec![(1, JobStatus::Running), (2, JobStatus::Completed)]
    );
    assert_eq!(reconciler.active_ids(), vec![JobId(1)]);
}

#[tokio::test(start_paused = true)]
async fn terminal_jobs_are_never_polled_again() {
    let repo = FakeRepository::new();
    repo.script(1, vec![Ok(JobStatus::Completed), Ok(JobStatus::Running)]);
    let reconciler = reconciler(&repo);

    reconciler.seed(vec![job(1, JobStatus::Running)]);
    reconciler.tick().await;
    let report = reconciler.tick().await;

    assert_eq!(report.outcome, TickOutcome::Idle);
    assert_eq!(repo.calls(), vec![JobId(1)]);
    assert_eq!(statuses(&reconciler), vec![(1, JobStatus::Completed)]);
}

#[tokio::test(start_paused = true)]
async fn stale_fetch_after_dispose_is_not_merged() {
    let repo = FakeRepository::new();
    repo.script(1, vec![Ok(JobStatus::Completed)]);
    repo.script(2, vec![Ok(JobStatus::Completed)]);
    let gate = repo.gate(2);
    let reconciler = reconciler(&repo);

    reconciler.seed(vec![job(1, JobStatus::Running), job(2, JobStatus::Running)]);

    let cycle = {
        let reconciler = reconciler.clone();
        tokio::spawn(async move { reconciler.tick().await })
    };
    gate.started.notified().await;

    reconciler.dispose();
    gate.release.notify_one();
    let report = cycle.await.unwrap();

    assert_eq!(report.outcome, TickOutcome::Disposed);
    assert!(reconciler.is_disposed());
    assert!(!reconciler.is_polling());
    assert_eq!(
        statuses(&reconciler),
        vec![(1, JobStatus::Running), (2, JobStatus::Running)]
    );
}

#[tokio::test(start_paused = true)]
async fn reseed_mid_cycle_discards_results() {
    let repo = FakeRepository::new();
    repo.script(1, vec![Ok(JobStatus::Completed)]);
    let gate = repo.gate(1);
    let reconciler = reconciler(&repo);

    reconciler.seed(vec![job(1, JobStatus::Running)]);

    let cycle = {
        let reconciler = reconciler.clone();
        tokio::spawn(async move { reconciler.tick().await })
    };
    gate.started.notified().await;

    reconciler.seed(vec![job(1, JobStatus::Running), job(4, JobStatus::Pending)]);
    gate.release.notify_one();
    let report = cycle.await.unwrap();

    assert_eq!(report.outcome, TickOutcome::Discarded);
    assert_eq!(
        statuses(&reconciler),
        vec![(1, JobStatus::Running), (4, JobStatus::Pending)]
    );
    assert!(reconciler.is_polling());
}

#[tokio::test(start_paused = true)]
async fn overlapping_tick_is_skipped() {
    let repo = FakeRepository::new();
    repo.script(1, vec![Ok(JobStatus::Completed)]);
    let gate = repo.gate(1);
    let reconciler = reconciler(&repo);

    reconciler.seed(vec![job(1, JobStatus::Running)]);

    let first = {
        let reconciler = reconciler.clone();
        tokio::spawn(async move { reconciler.tick().await })
    };
    gate.started.notified().await;

    let second = reconciler.tick().await;
    assert_eq!(second.outcome, TickOutcome::Skipped);
    assert_eq!(second.active, 1);

    gate.release.notify_one();
    let first = first.await.unwrap();

    assert_eq!(first.outcome, TickOutcome::Merged);
    assert_eq!(repo.calls(), vec![JobId(1)]);
}

#[tokio::test(start_paused = true)]
async fn timer_polls_until_every_job_settles() {
    let repo = FakeRepository::new();
    repo.script(
        1,
        vec![
            Ok(JobStatus::Running),
            Ok(JobStatus::Running),
            Ok(JobStatus::Completed),
        ],
    );
    let reconciler = reconciler(&repo);
    let start = Instant::now();

    reconciler.seed(vec![job(1, JobStatus::Pending)]);
    let mut views = reconciler.subscribe();

    loop {
        views.changed().await.unwrap();
        if views.borrow_and_update().active.is_empty() {
            break;
        }
    }

    assert_eq!(repo.calls().len(), 3);
    assert!(start.elapsed() >= INTERVAL * 3);
    assert!(!reconciler.is_polling());
    assert_eq!(statuses(&reconciler), vec![(1, JobStatus::Completed)]);

    tokio::time::sleep(INTERVAL * 5).await;
    assert_eq!(repo.calls().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn timer_follows_active_set_across_seeds() {
    let repo = FakeRepository::new();
    let reconciler = reconciler(&repo);
    assert!(!reconciler.is_polling());

    reconciler.seed(vec![job(1, JobStatus::Running)]);
    assert!(reconciler.is_polling());

    reconciler.seed(vec![job(1, JobStatus::Completed)]);
    assert!(!reconciler.is_polling());

    reconciler.seed(Vec::new());
    assert!(!reconciler.is_polling());

    reconciler.seed(vec![job(2, JobStatus::Pending)]);
    reconciler.seed(vec![job(2, JobStatus::Pending), job(3, JobStatus::Running)]);
    assert!(reconciler.is_polling());

    reconciler.dispose();
    assert!(!reconciler.is_polling());
}

#[tokio::test(start_paused = true)]
async fn tick_with_nothing_active_is_idle() {
    let repo = FakeRepository::new();
    let reconciler = reconciler(&repo);

    reconciler.seed(vec![job(1, JobStatus::Failed)]);
    let report = reconciler.tick().await;

    assert_eq!(report.outcome, TickOutcome::Idle);
    assert!(repo.calls().is_empty());
    assert!(!reconciler.is_polling());
}

#[tokio::test(start_paused = true)]
async fn seeding_twice_is_idempotent() {
    let repo = FakeRepository::new();
    let reconciler = reconciler(&repo);
    let jobs = vec![
        job(5, JobStatus::Running),
        job(6, JobStatus::Completed),
        job(7, JobStatus::Pending),
    ];

    reconciler.seed(jobs.clone());
    let first = (reconciler.snapshot(), reconciler.active_ids());
    reconciler.seed(jobs);
    let second = (reconciler.snapshot(), reconciler.active_ids());

    assert_eq!(first, second);
    assert_eq!(second.1, vec![JobId(5), JobId(7)]);
}

#[tokio::test(start_paused = true)]
async fn observers_see_one_view_per_cycle() {
    let repo = FakeRepository::new();
    repo.script(1, vec![Ok(JobStatus::Completed)]);
    repo.script(2, vec![Ok(JobStatus::Failed)]);
    let reconciler = reconciler(&repo);

    reconciler.seed(vec![job(1, JobStatus::Running), job(2, JobStatus::Running)]);
    let mut views = reconciler.subscribe();
    let seeded = views.borrow_and_update().revision;

    reconciler.tick().await;

    let view = views.borrow_and_update().clone();
    assert_eq!(view.revision, seeded + 1);
    assert!(view.active.is_empty());
    assert!(view.jobs.iter().all(|job| job.status.is_terminal()));
    let report = view.last_tick.as_ref().unwrap();
    assert_eq!(report.fetched, vec![JobId(1), JobId(2)]);
}

#[tokio::test(start_paused = true)]
async fn systemic_auth_failure_is_reported() {
    let repo = FakeRepository::new();
    repo.script(1, vec![Err(FailureKind::Auth)]);
    repo.script(2, vec![Err(FailureKind::Auth)]);
    let reconciler = reconciler(&repo);

    reconciler.seed(vec![job(1, JobStatus::Running), job(2, JobStatus::Pending)]);
    let report = reconciler.tick().await;

    assert!(report.all_unauthorized());
    assert_eq!(reconciler.active_ids(), vec![JobId(1), JobId(2)]);
}

#[tokio::test(start_paused = true)]
async fn disposed_reconciler_ignores_further_work() {
    let repo = FakeRepository::new();
    repo.script(1, vec![Ok(JobStatus::Completed)]);
    let reconciler = reconciler(&repo);

    reconciler.seed(vec![job(1, JobStatus::Running)]);
    reconciler.dispose();

    reconciler.seed(vec![job(9, JobStatus::Running)]);
    let report = reconciler.tick().await;

    assert_eq!(report.outcome, TickOutcome::Disposed);
    assert!(repo.calls().is_empty());
    assert!(!reconciler.is_polling());
    assert_eq!(statuses(&reconciler), vec![(1, JobStatus::Running)]);
}

#[tokio::test(start_paused = true)]
async fn admitted_job_starts_polling() {
    let repo = FakeRepository::new();
    repo.script(5, vec![Ok(JobStatus::Completed)]);
    let reconciler = reconciler(&repo);

    reconciler.seed(vec![job(1, JobStatus::Completed)]);
    assert!(!reconciler.is_polling());

    reconciler.admit(job(5, JobStatus::Pending));
    assert!(reconciler.is_polling());
    assert_eq!(
        statuses(&reconciler),
        vec![(1, JobStatus::Completed), (5, JobStatus::Pending)]
    );

    reconciler.tick().await;
    reconciler.admit(job(5, JobStatus::Running));

    assert_eq!(statuses(&reconciler)[1], (5, JobStatus::Completed));
    assert!(!reconciler.is_polling());
}

#[tokio::test(start_paused = true)]
async fn terminal_status_is_final_for_admitted_snapshots() {
    let repo = FakeRepository::new();
    let reconciler = reconciler(&repo);

    reconciler.seed(vec![job(1, JobStatus::Completed), job(2, JobStatus::Failed)]);
    reconciler.admit(job(1, JobStatus::Failed));
    reconciler.admit(job(2, JobStatus::Completed));

    assert_eq!(
        statuses(&reconciler),
        vec![(1, JobStatus::Completed), (2, JobStatus::Failed)]
    );
    assert!(!reconciler.is_polling());
}
