// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Connection poll daemon.
//!
//! Every cycle checks the recorder once, posts the result, then sleeps for a
//! fixed interval. No backoff, no jitter. An unreachable recorder and one
//! that answers something other than `OK` both read as [`ConnectionStatus::Offline`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::display::DisplaySurface;
use crate::lifecycle::ShutdownSignal;
use crate::remote::RemoteApi;

/// Reachability of the recorder as last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionStatus {
    /// No check has completed yet.
    #[default]
    Unknown,
    Online,
    Offline,
}

impl ConnectionStatus {
    pub fn is_online(&self) -> bool {
        matches!(self, ConnectionStatus::Online)
    }
}

impl From<bool> for ConnectionStatus {
    fn from(online: bool) -> Self {
        if online {
            ConnectionStatus::Online
        } else {
            ConnectionStatus::Offline
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Unknown => write!(f, "Not connected"),
            ConnectionStatus::Online => write!(f, "Connected!"),
            ConnectionStatus::Offline => write!(f, "Offline"),
        }
    }
}

/// Periodic reachability check feeding the display.
pub struct ConnectionMonitor {
    api: Arc<dyn RemoteApi>,
    surface: Arc<dyn DisplaySurface>,
    interval: Duration,
}

impl ConnectionMonitor {
    pub fn new(api: Arc<dyn RemoteApi>, surface: Arc<dyn DisplaySurface>, interval: Duration) -> Self {
        Self {
            api,
            surface,
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// One liveness check, errors folded into `Offline`.
    pub async fn check_once(&self) -> ConnectionStatus {
        match self.api.check_status().await {
            Ok(()) => ConnectionStatus::Online,
            Err(e) => {
                debug!(error = %e, "Status check failed");
                ConnectionStatus::Offline
            }
        }
    }

    /// Poll until shutdown. Posts exactly one status per cycle.
    pub async fn run(self, mut shutdown: ShutdownSignal) {
        info!(interval_ms = self.interval.as_millis() as u64, "Poll daemon started");
        let mut last = ConnectionStatus::Unknown;

        loop {
            let status = tokio::select! {
                status = self.check_once() => status,
                _ = shutdown.wait() => break,
            };

            if status != last {
                info!(%status, "Connection status changed");
                last = status;
            } else {
                debug!(%status, "Poll cycle");
            }
            self.surface.post_status(status);

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.wait() => break,
            }
        }

        info!("Poll daemon stopped");
    }

    pub fn spawn(self, shutdown: ShutdownSignal) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
