//! Dispatcher and worker-pool behaviour: fan-out, exclusivity, shutdown.

mod common;

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use boltzq_core::types::DbId;
use boltzq_db::models::job::JobStatus;
use boltzq_db::store::{JobStore, MemoryJobStore};
use boltzq_worker::dispatcher::{DispatchError, Dispatcher, JobHandler};
use common::{config, executor, submit, wait_until_terminal, write_tool, SUCCESS_TOOL};
use serde_json::json;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Handler that records which identifiers are in flight so the tests can
/// detect a job ever being handled by two workers at once.
#[derive(Default)]
struct Probe {
    in_flight: Mutex<HashSet<DbId>>,
    handled: Mutex<Vec<DbId>>,
    overlap: AtomicBool,
}

#[async_trait]
impl JobHandler for Probe {
    async fn run(&self, job_id: DbId) {
        {
            let mut in_flight = self.in_flight.lock().await;
            if !in_flight.insert(job_id) {
                self.overlap.store(true, Ordering::SeqCst);
            }
        }
        tokio::time::sleep(Duration::from_millis(15)).await;
        self.in_flight.lock().await.remove(&job_id);
        self.handled.lock().await.push(job_id);
    }
}

// ---------------------------------------------------------------------------
// Exclusivity and delivery
// ---------------------------------------------------------------------------

#[tokio::test]
async fn every_identifier_is_handled_exactly_once() {
    let (dispatcher, queue) = Dispatcher::channel();
    let probe = Arc::new(Probe::default());
    let cancel = CancellationToken::new();
    let handles = queue.spawn_workers(8, probe.clone(), cancel.clone());

    let ids: Vec<DbId> = (1..=64).collect();
    for id in &ids {
        dispatcher.enqueue(*id).unwrap();
    }

    // Wait for all work to drain.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        if probe.handled.lock().await.len() == ids.len() {
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "queue did not drain");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert!(!probe.overlap.load(Ordering::SeqCst), "a job ran on two workers");
    let handled = probe.handled.lock().await;
    let unique: HashSet<_> = handled.iter().copied().collect();
    assert_eq!(unique.len(), ids.len(), "duplicate deliveries: {handled:?}");

    cancel.cancel();
    for handle in handles {
        handle.await.unwrap();
    }
}

#[tokio::test]
async fn enqueue_returns_immediately_while_workers_are_busy() {
    let (dispatcher, queue) = Dispatcher::channel();
    let probe = Arc::new(Probe::default());
    let cancel = CancellationToken::new();
    let _handles = queue.spawn_workers(1, probe.clone(), cancel.clone());

    // Saturate the single worker, then keep enqueueing; the calls must not
    // block on execution.
    for id in 1..=50 {
        dispatcher.enqueue(id).unwrap();
    }
    cancel.cancel();
}

// ---------------------------------------------------------------------------
// Shutdown
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cancellation_stops_idle_workers() {
    let (dispatcher, queue) = Dispatcher::channel();
    let probe = Arc::new(Probe::default());
    let cancel = CancellationToken::new();
    let handles = queue.spawn_workers(4, probe, cancel.clone());

    cancel.cancel();
    for handle in handles {
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("worker did not stop after cancellation")
            .unwrap();
    }

    // With every worker gone the receiver is dropped and the queue closes.
    assert!(matches!(dispatcher.enqueue(1), Err(DispatchError::Closed)));
}

// ---------------------------------------------------------------------------
// Full pipeline fan-out
// ---------------------------------------------------------------------------

#[tokio::test]
async fn concurrent_submissions_all_reach_a_terminal_state() {
    let tmp = tempfile::tempdir().unwrap();
    let tool = write_tool(tmp.path(), SUCCESS_TOOL);
    let store = Arc::new(MemoryJobStore::new());
    let exec = executor(store.clone(), config(tmp.path(), &tool));

    let (dispatcher, queue) = Dispatcher::channel();
    let cancel = CancellationToken::new();
    let _handles = queue.spawn_workers(4, exec, cancel.clone());

    let mut ids = Vec::new();
    for i in 0..12 {
        let job = submit(&store, &format!("job-{i}"), json!({})).await;
        dispatcher.enqueue(job.id).unwrap();
        ids.push(job.id);
    }

    wait_until_terminal(&store, &ids).await;

    for id in ids {
        let job = store.get(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed, "job {id} not completed");
        assert!(job.metrics.is_some());
    }
    cancel.cancel();
}

#[tokio::test]
async fn double_enqueue_of_one_identifier_executes_at_most_once() {
    let tmp = tempfile::tempdir().unwrap();
    let tool = write_tool(tmp.path(), SUCCESS_TOOL);
    let store = Arc::new(MemoryJobStore::new());
    let exec = executor(store.clone(), config(tmp.path(), &tool));

    let (dispatcher, queue) = Dispatcher::channel();
    let cancel = CancellationToken::new();
    let _handles = queue.spawn_workers(4, exec, cancel.clone());

    let job = submit(&store, "dup", json!({})).await;
    // Re-dispatch is not supported, but must be harmless: the CAS on
    // `pending -> running` makes the second delivery a no-op.
    dispatcher.enqueue(job.id).unwrap();
    dispatcher.enqueue(job.id).unwrap();

    wait_until_terminal(&store, &[job.id]).await;

    let job = store.get(job.id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    cancel.cancel();
}
