// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Bounded FIFO between user actions and the transfer worker.
//!
//! Any number of producers may enqueue concurrently; exactly one
//! [`JobReceiver`] drains the queue. A full queue makes `enqueue` wait for a
//! free slot instead of dropping the job.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use super::types::TransferJob;
use crate::error::{Error, Result};

/// Build a queue holding at most `capacity` jobs.
///
/// # Panics
///
/// Panics if `capacity` is zero.
pub fn transfer_queue(capacity: usize) -> (TransferQueue, JobReceiver) {
    let (sender, receiver) = mpsc::channel(capacity);
    let depth = DepthGauge::default();
    (
        TransferQueue {
            sender,
            depth: depth.clone(),
        },
        JobReceiver { receiver, depth },
    )
}

/// Number of jobs not yet picked up by the worker, including producers
/// currently waiting for a free slot.
#[derive(Debug, Clone, Default)]
pub struct DepthGauge(Arc<AtomicUsize>);

impl DepthGauge {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }

    fn increment(&self) {
        self.0.fetch_add(1, Ordering::AcqRel);
    }

    fn decrement(&self) {
        let _ = self
            .0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| Some(n.saturating_sub(1)));
    }
}

/// Counts a job from the moment a producer starts waiting. Undone if the
/// send never completes.
struct PendingJob<'a> {
    depth: &'a DepthGauge,
    sent: bool,
}

impl<'a> PendingJob<'a> {
    fn new(depth: &'a DepthGauge) -> Self {
        depth.increment();
        Self { depth, sent: false }
    }
}

impl Drop for PendingJob<'_> {
    fn drop(&mut self) {
        if !self.sent {
            self.depth.decrement();
        }
    }
}

/// Producer handle. Cheap to clone; the queue closes when every clone is
/// dropped.
#[derive(Debug, Clone)]
pub struct TransferQueue {
    sender: mpsc::Sender<TransferJob>,
    depth: DepthGauge,
}

impl TransferQueue {
    /// Append `job`, waiting while the queue is full.
    pub async fn enqueue(&self, job: TransferJob) -> Result<()> {
        let mut pending = PendingJob::new(&self.depth);
        let name = job.display_name.clone();
        self.sender.send(job).await.map_err(|_| Error::QueueClosed)?;
        pending.sent = true;
        debug!(name = %name, depth = self.depth.get(), "Job enqueued");
        Ok(())
    }

    /// [`TransferQueue::enqueue`] for callers outside the async runtime.
    ///
    /// # Panics
    ///
    /// Panics when called from within an async execution context.
    pub fn blocking_enqueue(&self, job: TransferJob) -> Result<()> {
        let mut pending = PendingJob::new(&self.depth);
        self.sender.blocking_send(job).map_err(|_| Error::QueueClosed)?;
        pending.sent = true;
        Ok(())
    }

    pub fn depth(&self) -> usize {
        self.depth.get()
    }

    pub fn depth_gauge(&self) -> DepthGauge {
        self.depth.clone()
    }

    pub fn capacity(&self) -> usize {
        self.sender.max_capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Consumer handle, owned by the worker.
#[derive(Debug)]
pub struct JobReceiver {
    receiver: mpsc::Receiver<TransferJob>,
    depth: DepthGauge,
}

impl JobReceiver {
    /// Next job in FIFO order, or `None` once every producer is gone and the
    /// queue is empty. Cancel safe.
    pub async fn next(&mut self) -> Option<TransferJob> {
        let job = self.receiver.recv().await?;
        self.depth.decrement();
        Some(job)
    }

    pub fn depth_gauge(&self) -> DepthGauge {
        self.depth.clone()
    }
}
