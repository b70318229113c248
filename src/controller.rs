// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! User actions against the recorder.
//!
//! Each action reports its outcome twice: a log line and, on failure, a
//! [`Notice`] on the display. Nothing here panics or retries.

use std::sync::Arc;

use tracing::{info, warn};

use crate::display::{DisplaySurface, Notice};
use crate::error::Result;
use crate::listing::{FileListing, ListingCache};
use crate::monitor::ConnectionStatus;
use crate::remote::{RemoteApi, RemoteFile};
use crate::transfer::{TransferJob, TransferQueue};

/// Outcome of queueing a user selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    pub queued: usize,
    /// Names not listed, positions out of range, or jobs the queue refused.
    pub rejected: usize,
}

pub struct RemoteController {
    api: Arc<dyn RemoteApi>,
    surface: Arc<dyn DisplaySurface>,
    queue: TransferQueue,
    listing: ListingCache,
}

impl RemoteController {
    pub fn new(api: Arc<dyn RemoteApi>, surface: Arc<dyn DisplaySurface>, queue: TransferQueue) -> Self {
        Self {
            api,
            surface,
            queue,
            listing: ListingCache::new(),
        }
    }

    /// Last listing fetched successfully.
    pub fn listing(&self) -> FileListing {
        self.listing.current()
    }

    pub fn queue(&self) -> &TransferQueue {
        &self.queue
    }

    pub async fn refresh_listing(&self) -> Result<FileListing> {
        self.listing.refresh(self.api.as_ref(), self.surface.as_ref()).await
    }

    /// One-shot liveness check. The result is posted like a poll cycle.
    pub async fn check_status(&self) -> ConnectionStatus {
        let status = match self.api.check_status().await {
            Ok(()) => ConnectionStatus::Online,
            Err(e) => {
                warn!(error = %e, "Recorder did not answer the status check");
                ConnectionStatus::Offline
            }
        };
        self.surface.post_status(status);
        status
    }

    fn job_for(&self, file: &RemoteFile) -> TransferJob {
        TransferJob::new(self.api.download_url(&file.name), file.name.clone(), file.size)
    }

    async fn enqueue(&self, file: &RemoteFile) -> bool {
        match self.queue.enqueue(self.job_for(file)).await {
            Ok(()) => {
                info!(name = %file.name, depth = self.queue.depth(), "Download queued");
                true
            }
            Err(e) => {
                warn!(name = %file.name, error = %e, "Could not queue download");
                self.surface
                    .post_notice(Notice::error(format!("Could not queue {}: {}", file.name, e)));
                false
            }
        }
    }

    /// Queue the listed file called `name`. `false` if it is not listed.
    pub async fn download(&self, name: &str) -> bool {
        let listing = self.listing();
        match listing.find(name) {
            Some(file) => self.enqueue(file).await,
            None => {
                warn!(name, "Not in the current listing");
                self.surface
                    .post_notice(Notice::error(format!("{} is not in the file list", name)));
                false
            }
        }
    }

    /// Queue the file at `index` of the current listing.
    pub async fn download_index(&self, index: usize) -> bool {
        let listing = self.listing();
        match listing.get(index) {
            Some(file) => self.enqueue(file).await,
            None => false,
        }
    }

    /// Queue files by name, then by 1-based position as rendered in the
    /// listing.
    pub async fn download_selection(&self, names: &[String], positions: &[usize]) -> Selection {
        let mut selection = Selection::default();
        for name in names {
            if self.download(name).await {
                selection.queued += 1;
            } else {
                selection.rejected += 1;
            }
        }
        for &position in positions {
            let queued = match position.checked_sub(1) {
                Some(index) => self.download_index(index).await,
                None => false,
            };
            if queued {
                selection.queued += 1;
            } else {
                self.surface
                    .post_notice(Notice::error(format!("No file at position {}", position)));
                selection.rejected += 1;
            }
        }
        selection
    }

    /// Queue every listed file in listing order. Returns how many were
    /// queued. Waits for free slots when the listing exceeds the capacity.
    pub async fn download_all(&self) -> usize {
        let listing = self.listing();
        let mut queued = 0;
        for file in listing.iter() {
            if self.enqueue(file).await {
                queued += 1;
            }
        }
        info!(queued, listed = listing.len(), "Queued all listed files");
        queued
    }

    /// Delete one file on the recorder, then refresh the listing.
    pub async fn delete(&self, name: &str) -> bool {
        let deleted = match self.api.delete_file(name).await {
            Ok(()) => {
                info!(name, "Deleted on recorder");
                self.surface.post_notice(Notice::info(format!("Deleted {}", name)));
                true
            }
            Err(e) => {
                warn!(name, error = %e, "Delete failed");
                self.surface
                    .post_notice(Notice::error(format!("Could not delete {}: {}", name, e)));
                false
            }
        };
        let _ = self.refresh_listing().await;
        deleted
    }

    /// Delete every listed file. Returns `(deleted, failed)`.
    pub async fn delete_all(&self) -> (usize, usize) {
        let listing = self.listing();
        let mut deleted = 0;
        let mut failed = 0;
        for file in listing.iter() {
            match self.api.delete_file(&file.name).await {
                Ok(()) => deleted += 1,
                Err(e) => {
                    warn!(name = %file.name, error = %e, "Delete failed");
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            self.surface.post_notice(Notice::error(format!(
                "Deleted {} file(s), {} could not be deleted",
                deleted, failed
            )));
        } else {
            self.surface
                .post_notice(Notice::info(format!("Deleted {} file(s)", deleted)));
        }
        info!(deleted, failed, "Delete all finished");

        let _ = self.refresh_listing().await;
        (deleted, failed)
    }

    async fn send_start(&self, name: &str) -> bool {
        match self.api.start_recording(name).await {
            Ok(()) => {
                info!(name, "Recording started");
                self.surface
                    .post_notice(Notice::info(format!("Recording {}", name)));
                true
            }
            Err(e) => {
                warn!(name, error = %e, "Start recording failed");
                self.surface
                    .post_notice(Notice::error(format!("Could not start recording: {}", e)));
                false
            }
        }
    }

    async fn send_stop(&self) -> bool {
        match self.api.stop_recording().await {
            Ok(()) => {
                info!("Recording stopped");
                self.surface.post_notice(Notice::info("Recording stopped"));
                true
            }
            Err(e) => {
                warn!(error = %e, "Stop recording failed");
                self.surface
                    .post_notice(Notice::error(format!("Could not stop recording: {}", e)));
                false
            }
        }
    }

    pub async fn start_recording(&self, name: &str) -> bool {
        let started = self.send_start(name).await;
        let _ = self.refresh_listing().await;
        started
    }

    pub async fn stop_recording(&self) -> bool {
        let stopped = self.send_stop().await;
        let _ = self.refresh_listing().await;
        stopped
    }

    /// Stop, then start again under `name`, then refresh once. The start is
    /// sent even when the stop is refused.
    pub async fn restart_recording(&self, name: &str) -> bool {
        let stopped = self.send_stop().await;
        let started = self.send_start(name).await;
        let _ = self.refresh_listing().await;
        stopped && started
    }
}
