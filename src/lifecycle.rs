// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Start/stop plumbing for the background loops.
//!
//! [`Runtime`] owns the transfer worker and the poll daemon. Both run until
//! [`Shutdown::trigger`] is called; the worker additionally stops on its own
//! once every queue producer is gone and the queue is drained.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::controller::RemoteController;
use crate::display::DisplaySurface;
use crate::monitor::ConnectionMonitor;
use crate::remote::RemoteApi;
use crate::transfer::{transfer_queue, TransferWorker};

/// Owner side of the cancellation signal.
#[derive(Debug)]
pub struct Shutdown {
    sender: watch::Sender<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self { sender }
    }

    /// A receiver for one loop.
    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            receiver: self.sender.subscribe(),
        }
    }

    /// Ask every loop holding a signal to stop.
    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.sender.borrow()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Loop side of the cancellation signal. Dropping the [`Shutdown`] counts as
/// a trigger.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    receiver: watch::Receiver<bool>,
}

impl ShutdownSignal {
    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolve once shutdown was requested.
    pub async fn wait(&mut self) {
        while !*self.receiver.borrow_and_update() {
            if self.receiver.changed().await.is_err() {
                return;
            }
        }
    }
}

/// Settings for [`Runtime::start`].
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    pub download_dir: PathBuf,
    pub queue_capacity: usize,
    /// `None` leaves the poll daemon off.
    pub poll_interval: Option<Duration>,
}

/// Running engine: controller for user actions plus the background loops.
pub struct Runtime {
    controller: Arc<RemoteController>,
    shutdown: Shutdown,
    worker: JoinHandle<()>,
    monitor: Option<JoinHandle<()>>,
}

impl Runtime {
    /// Spawn the worker (and the poll daemon when an interval is given).
    /// Must be called inside a tokio runtime.
    pub fn start(
        api: Arc<dyn RemoteApi>,
        surface: Arc<dyn DisplaySurface>,
        options: RuntimeOptions,
    ) -> Self {
        let shutdown = Shutdown::new();
        let (queue, jobs) = transfer_queue(options.queue_capacity);

        let worker = TransferWorker::new(
            Arc::clone(&api),
            Arc::clone(&surface),
            options.download_dir,
            queue.depth_gauge(),
        )
        .spawn(jobs, shutdown.signal());

        let monitor = options.poll_interval.map(|interval| {
            ConnectionMonitor::new(Arc::clone(&api), Arc::clone(&surface), interval)
                .spawn(shutdown.signal())
        });

        let controller = Arc::new(RemoteController::new(api, surface, queue));

        info!(
            capacity = options.queue_capacity,
            polling = monitor.is_some(),
            "Runtime started"
        );

        Self {
            controller,
            shutdown,
            worker,
            monitor,
        }
    }

    pub fn controller(&self) -> Arc<RemoteController> {
        Arc::clone(&self.controller)
    }

    /// Close the queue, let the worker finish everything already queued, then
    /// stop the poll daemon.
    ///
    /// Waits for every outstanding clone of the controller to be dropped.
    pub async fn drain(self) {
        let Runtime {
            controller,
            shutdown,
            worker,
            monitor,
        } = self;

        drop(controller);
        if let Err(e) = worker.await {
            warn!(error = %e, "Transfer worker task ended abnormally");
        }

        shutdown.trigger();
        if let Some(monitor) = monitor {
            if let Err(e) = monitor.await {
                warn!(error = %e, "Poll daemon task ended abnormally");
            }
        }
        info!("Runtime drained");
    }

    /// Stop both loops. The worker finishes the job in flight first; queued
    /// jobs are discarded.
    pub async fn shutdown(self) {
        let Runtime {
            controller,
            shutdown,
            worker,
            monitor,
        } = self;

        shutdown.trigger();
        drop(controller);
        if let Err(e) = worker.await {
            warn!(error = %e, "Transfer worker task ended abnormally");
        }
        if let Some(monitor) = monitor {
            if let Err(e) = monitor.await {
                warn!(error = %e, "Poll daemon task ended abnormally");
            }
        }
        info!("Runtime stopped");
    }
}
