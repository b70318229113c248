// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Transfer queue and worker behaviour against a scripted recorder.

mod common;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::Semaphore;
use tokio::time::timeout;

use common::{Body, RecordingSurface, ScriptedRemote, CHUNK};
use ocs_remote::display::{DisplaySurface, TransferEvent};
use ocs_remote::{
    transfer_queue, RemoteApi, Runtime, RuntimeOptions, Shutdown, TransferJob, TransferWorker,
};

const TEST_TIMEOUT: Duration = Duration::from_secs(10);

fn job(remote: &ScriptedRemote, name: &str, size: u64) -> TransferJob {
    TransferJob::new(remote.download_url(name), name, size)
}

fn worker(
    remote: &Arc<ScriptedRemote>,
    surface: &Arc<RecordingSurface>,
    dir: &TempDir,
    queue: &ocs_remote::TransferQueue,
) -> TransferWorker {
    let api: Arc<dyn RemoteApi> = remote.clone();
    let display: Arc<dyn DisplaySurface> = surface.clone();
    TransferWorker::new(api, display, dir.path().to_path_buf(), queue.depth_gauge())
}

// =============================================================================
// Ordering
// =============================================================================

#[tokio::test]
async fn test_jobs_run_in_fifo_order() {
    let dir = TempDir::new().unwrap();
    let remote = Arc::new(ScriptedRemote::new());
    let surface = RecordingSurface::new();
    for name in ["a.mp4", "b.mp4", "c.mp4"] {
        remote.add_file(name, 2 * CHUNK as u64, Body::Chunks(2));
    }

    let (queue, jobs) = transfer_queue(8);
    let shutdown = Shutdown::new();
    let handle = worker(&remote, &surface, &dir, &queue).spawn(jobs, shutdown.signal());

    for name in ["a.mp4", "b.mp4", "c.mp4"] {
        queue.enqueue(job(&remote, name, 2 * CHUNK as u64)).await.unwrap();
    }
    drop(queue);
    timeout(TEST_TIMEOUT, handle).await.unwrap().unwrap();

    assert_eq!(remote.fetched(), vec!["a.mp4", "b.mp4", "c.mp4"]);
    assert_eq!(surface.started_labels(), vec!["a.mp4", "b.mp4", "c.mp4"]);
    for name in ["a.mp4", "b.mp4", "c.mp4"] {
        let written = std::fs::read(dir.path().join(name)).unwrap();
        assert_eq!(written.len(), 2 * CHUNK);
    }
}

#[tokio::test]
async fn test_one_job_at_a_time() {
    let dir = TempDir::new().unwrap();
    let remote = Arc::new(ScriptedRemote::new());
    let surface = RecordingSurface::new();
    remote.add_file("a.mp4", CHUNK as u64, Body::Chunks(1));
    remote.add_file("b.mp4", CHUNK as u64, Body::Chunks(1));

    let (queue, jobs) = transfer_queue(8);
    let shutdown = Shutdown::new();
    let handle = worker(&remote, &surface, &dir, &queue).spawn(jobs, shutdown.signal());
    queue.enqueue(job(&remote, "a.mp4", CHUNK as u64)).await.unwrap();
    queue.enqueue(job(&remote, "b.mp4", CHUNK as u64)).await.unwrap();
    drop(queue);
    timeout(TEST_TIMEOUT, handle).await.unwrap().unwrap();

    // Started(a) Finished(a) Started(b) Finished(b), never interleaved.
    let kinds: Vec<(&str, String)> = surface
        .transfers()
        .into_iter()
        .map(|e| match e {
            TransferEvent::Started { label, .. } => ("started", label),
            TransferEvent::Finished { label, .. } => ("finished", label),
            TransferEvent::Failed { label, .. } => ("failed", label),
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            ("started", "a.mp4".to_string()),
            ("finished", "a.mp4".to_string()),
            ("started", "b.mp4".to_string()),
            ("finished", "b.mp4".to_string()),
        ]
    );
}

// =============================================================================
// Capacity
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_full_queue_blocks_producer_until_slot_frees() {
    let dir = TempDir::new().unwrap();
    let gate = Arc::new(Semaphore::new(0));
    let remote = Arc::new(ScriptedRemote::with_gate(gate.clone()));
    let surface = RecordingSurface::new();
    for name in ["a.mp4", "b.mp4", "c.mp4", "d.mp4"] {
        remote.add_file(name, 1, Body::Bytes(vec![1]));
    }

    let (queue, jobs) = transfer_queue(2);
    let shutdown = Shutdown::new();
    let handle = worker(&remote, &surface, &dir, &queue).spawn(jobs, shutdown.signal());

    // The worker takes "a" and waits at the gate, "b" and "c" fill the queue.
    queue.enqueue(job(&remote, "a.mp4", 1)).await.unwrap();
    timeout(TEST_TIMEOUT, async {
        while surface.started_labels().is_empty() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();
    queue.enqueue(job(&remote, "b.mp4", 1)).await.unwrap();
    queue.enqueue(job(&remote, "c.mp4", 1)).await.unwrap();

    let producer = {
        let queue = queue.clone();
        let next = job(&remote, "d.mp4", 1);
        tokio::spawn(async move { queue.enqueue(next).await })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!producer.is_finished(), "producer must wait for a free slot");
    assert_eq!(queue.depth(), 3);

    gate.add_permits(4);
    timeout(TEST_TIMEOUT, producer).await.unwrap().unwrap().unwrap();
    drop(queue);
    timeout(TEST_TIMEOUT, handle).await.unwrap().unwrap();

    assert_eq!(remote.fetched(), vec!["a.mp4", "b.mp4", "c.mp4", "d.mp4"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_producers_on_full_queue_lose_nothing() {
    const PRODUCERS: usize = 3;
    const PER_PRODUCER: usize = 4;

    let dir = TempDir::new().unwrap();
    let gate = Arc::new(Semaphore::new(0));
    let remote = Arc::new(ScriptedRemote::with_gate(gate.clone()));
    let surface = RecordingSurface::new();
    let names: Vec<Vec<String>> = (0..PRODUCERS)
        .map(|p| (0..PER_PRODUCER).map(|j| format!("p{}-{}.mp4", p, j)).collect())
        .collect();
    for name in names.iter().flatten() {
        remote.add_file(name, 1, Body::Bytes(vec![1]));
    }

    let (queue, jobs) = transfer_queue(2);
    let shutdown = Shutdown::new();
    let handle = worker(&remote, &surface, &dir, &queue).spawn(jobs, shutdown.signal());

    let producers: Vec<_> = names
        .iter()
        .map(|batch| {
            let queue = queue.clone();
            let batch: Vec<TransferJob> = batch.iter().map(|n| job(&remote, n, 1)).collect();
            tokio::spawn(async move {
                for next in batch {
                    queue.enqueue(next).await.unwrap();
                }
            })
        })
        .collect();

    // One job at the gate and two queued: every producer still has work left.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let blocked = producers.iter().filter(|p| !p.is_finished()).count();
    assert!(blocked >= 1, "a producer must wait while the queue is full");
    assert!(remote.fetched().is_empty());

    gate.add_permits(PRODUCERS * PER_PRODUCER);
    for producer in producers {
        timeout(TEST_TIMEOUT, producer).await.unwrap().unwrap();
    }
    drop(queue);
    timeout(TEST_TIMEOUT, handle).await.unwrap().unwrap();

    let fetched = remote.fetched();
    assert_eq!(fetched.len(), PRODUCERS * PER_PRODUCER);
    assert_eq!(fetched.iter().collect::<HashSet<_>>().len(), fetched.len());

    let mut expected: Vec<String> = names.iter().flatten().cloned().collect();
    let mut sorted = fetched.clone();
    expected.sort();
    sorted.sort();
    assert_eq!(sorted, expected);

    for batch in &names {
        let seen: Vec<&String> = fetched.iter().filter(|n| batch.contains(*n)).collect();
        assert_eq!(seen, batch.iter().collect::<Vec<_>>());
    }
}

// =============================================================================
// Progress
// =============================================================================

#[tokio::test]
async fn test_exact_size_download_reaches_100_once() {
    let dir = TempDir::new().unwrap();
    let remote = Arc::new(ScriptedRemote::new());
    let surface = RecordingSurface::new();
    remote.add_file("a.mp4", 1_048_576, Body::Chunks(256));

    let (queue, _jobs) = transfer_queue(1);
    let bytes = worker(&remote, &surface, &dir, &queue)
        .process_job(job(&remote, "a.mp4", 1_048_576))
        .await
        .unwrap();
    assert_eq!(bytes, 1_048_576);

    let progress = surface.progress();
    assert!(progress.windows(2).all(|w| w[0].bytes_so_far <= w[1].bytes_so_far));
    assert_eq!(progress.iter().filter(|u| u.percent == 100).count(), 1);
    assert_eq!(progress.last().unwrap().percent, 100);
    assert_eq!(progress.last().unwrap().label, "a.mp4");
}

#[tokio::test]
async fn test_short_download_gets_final_update() {
    let dir = TempDir::new().unwrap();
    let remote = Arc::new(ScriptedRemote::new());
    let surface = RecordingSurface::new();
    remote.add_file("a.mp4", 1_048_576, Body::Chunks(250));

    let (queue, _jobs) = transfer_queue(1);
    worker(&remote, &surface, &dir, &queue)
        .process_job(job(&remote, "a.mp4", 1_048_576))
        .await
        .unwrap();

    let progress = surface.progress();
    assert!(progress.len() <= 4);
    assert_eq!(progress.last().unwrap().bytes_so_far, 250 * CHUNK as u64);
    assert!(progress.last().unwrap().percent < 100);
}

#[tokio::test]
async fn test_zero_size_file() {
    let dir = TempDir::new().unwrap();
    let remote = Arc::new(ScriptedRemote::new());
    let surface = RecordingSurface::new();
    remote.add_file("empty.mp4", 0, Body::Chunks(0));

    let (queue, _jobs) = transfer_queue(1);
    let bytes = worker(&remote, &surface, &dir, &queue)
        .process_job(job(&remote, "empty.mp4", 0))
        .await
        .unwrap();

    assert_eq!(bytes, 0);
    assert_eq!(std::fs::metadata(dir.path().join("empty.mp4")).unwrap().len(), 0);
    assert_eq!(surface.progress().last().unwrap().percent, 100);
}

#[tokio::test]
async fn test_queue_depth_in_progress_updates() {
    let dir = TempDir::new().unwrap();
    let remote = Arc::new(ScriptedRemote::new());
    let surface = RecordingSurface::new();
    remote.add_file("a.mp4", 10, Body::Bytes(vec![0; 10]));

    let (queue, _jobs) = transfer_queue(4);
    queue.enqueue(job(&remote, "x.mp4", 1)).await.unwrap();
    queue.enqueue(job(&remote, "y.mp4", 1)).await.unwrap();

    worker(&remote, &surface, &dir, &queue)
        .process_job(job(&remote, "a.mp4", 10))
        .await
        .unwrap();

    let last = surface.progress().pop().unwrap();
    assert_eq!(last.queue_depth, 2);
    assert!(last.message().ends_with("[ 2 remaining ]"));
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_broken_stream_fails_job_and_worker_continues() {
    let dir = TempDir::new().unwrap();
    let remote = Arc::new(ScriptedRemote::new());
    let surface = RecordingSurface::new();
    remote.add_file("broken.mp4", 10 * CHUNK as u64, Body::BreakAfter(3));
    remote.add_file("good.mp4", CHUNK as u64, Body::Chunks(1));

    let (queue, jobs) = transfer_queue(4);
    let shutdown = Shutdown::new();
    let handle = worker(&remote, &surface, &dir, &queue).spawn(jobs, shutdown.signal());
    queue
        .enqueue(job(&remote, "broken.mp4", 10 * CHUNK as u64))
        .await
        .unwrap();
    queue.enqueue(job(&remote, "good.mp4", CHUNK as u64)).await.unwrap();
    drop(queue);
    timeout(TEST_TIMEOUT, handle).await.unwrap().unwrap();

    let transfers = surface.transfers();
    assert!(transfers.iter().any(|e| matches!(
        e,
        TransferEvent::Failed { label, error } if label == "broken.mp4" && error.contains("transport")
    )));
    assert!(transfers
        .iter()
        .any(|e| matches!(e, TransferEvent::Finished { label, .. } if label == "good.mp4")));

    assert!(!dir.path().join("broken.mp4").exists());
    assert!(!dir.path().join("broken.mp4.part").exists());
    assert!(dir.path().join("good.mp4").exists());
}

#[tokio::test]
async fn test_missing_remote_file_is_protocol_failure() {
    let dir = TempDir::new().unwrap();
    let remote = Arc::new(ScriptedRemote::new());
    let surface = RecordingSurface::new();

    let (queue, _jobs) = transfer_queue(1);
    let result = worker(&remote, &surface, &dir, &queue)
        .process_job(job(&remote, "gone.mp4", 5))
        .await;

    assert!(matches!(result, Err(ocs_remote::Error::Protocol(_))));
    assert!(!dir.path().join("gone.mp4").exists());
    assert!(!dir.path().join("gone.mp4.part").exists());
}

#[tokio::test]
async fn test_unwritable_destination_is_local_io_failure() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"file in the way").unwrap();

    let remote = Arc::new(ScriptedRemote::new());
    let surface = RecordingSurface::new();
    remote.add_file("a.mp4", 1, Body::Bytes(vec![1]));

    let (queue, _jobs) = transfer_queue(1);
    let api: Arc<dyn RemoteApi> = remote.clone();
    let display: Arc<dyn DisplaySurface> = surface.clone();
    let result = TransferWorker::new(api, display, blocker.join("videos"), queue.depth_gauge())
        .process_job(job(&remote, "a.mp4", 1))
        .await;

    assert!(matches!(result, Err(ocs_remote::Error::LocalIo { .. })));
    assert!(remote.fetched().is_empty(), "nothing is fetched without a sink");
}

#[tokio::test]
async fn test_failed_rename_removes_partial_file() {
    let dir = TempDir::new().unwrap();
    let occupied = dir.path().join("a.mp4");
    std::fs::create_dir(&occupied).unwrap();
    std::fs::write(occupied.join("keep"), b"x").unwrap();

    let remote = Arc::new(ScriptedRemote::new());
    let surface = RecordingSurface::new();
    remote.add_file("a.mp4", 1, Body::Bytes(vec![1]));

    let (queue, _jobs) = transfer_queue(1);
    let result = worker(&remote, &surface, &dir, &queue)
        .process_job(job(&remote, "a.mp4", 1))
        .await;

    assert!(matches!(result, Err(ocs_remote::Error::LocalIo { .. })));
    assert!(!dir.path().join("a.mp4.part").exists());
    assert!(occupied.join("keep").exists());
    assert!(surface
        .transfers()
        .iter()
        .any(|e| matches!(e, TransferEvent::Failed { label, .. } if label == "a.mp4")));
}

#[tokio::test]
async fn test_remote_names_cannot_escape_download_dir() {
    let dir = TempDir::new().unwrap();
    let remote = Arc::new(ScriptedRemote::new());
    let surface = RecordingSurface::new();
    remote.add_file("../evil.mp4", 1, Body::Bytes(vec![1]));

    let (queue, _jobs) = transfer_queue(1);
    worker(&remote, &surface, &dir, &queue)
        .process_job(job(&remote, "../evil.mp4", 1))
        .await
        .unwrap();

    assert!(dir.path().join("evil.mp4").exists());
    assert!(!dir.path().parent().unwrap().join("evil.mp4").exists());
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn test_shutdown_before_jobs_stops_worker() {
    let dir = TempDir::new().unwrap();
    let remote = Arc::new(ScriptedRemote::new());
    let surface = RecordingSurface::new();
    remote.add_file("a.mp4", 1, Body::Bytes(vec![1]));

    let (queue, jobs) = transfer_queue(4);
    queue.enqueue(job(&remote, "a.mp4", 1)).await.unwrap();

    let shutdown = Shutdown::new();
    shutdown.trigger();
    let handle = worker(&remote, &surface, &dir, &queue).spawn(jobs, shutdown.signal());
    timeout(TEST_TIMEOUT, handle).await.unwrap().unwrap();

    assert!(remote.fetched().is_empty());
}

#[tokio::test]
async fn test_runtime_drain_finishes_queued_downloads() {
    let dir = TempDir::new().unwrap();
    let remote = Arc::new(ScriptedRemote::new());
    let surface = RecordingSurface::new();
    remote.add_file("a.mp4", CHUNK as u64, Body::Chunks(1));
    remote.add_file("b.mp4", CHUNK as u64, Body::Chunks(1));

    let runtime = Runtime::start(
        remote.clone(),
        surface.clone(),
        RuntimeOptions {
            download_dir: dir.path().to_path_buf(),
            queue_capacity: 200,
            poll_interval: None,
        },
    );
    {
        let controller = runtime.controller();
        controller.refresh_listing().await.unwrap();
        assert_eq!(controller.download_all().await, 2);
    }
    timeout(TEST_TIMEOUT, runtime.drain()).await.unwrap();

    assert_eq!(remote.fetched(), vec!["a.mp4", "b.mp4"]);
    assert!(dir.path().join("a.mp4").exists());
    assert!(dir.path().join("b.mp4").exists());
}
