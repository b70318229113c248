// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! The single transfer worker.
//!
//! Jobs are processed strictly one at a time in queue order. A failed job is
//! logged and reported, then the worker moves on; nothing here can take the
//! worker down.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::progress::ProgressReporter;
use super::queue::{DepthGauge, JobReceiver};
use super::types::{ProgressState, TransferJob};
use crate::display::{DisplaySurface, TransferEvent};
use crate::error::{Error, Result};
use crate::lifecycle::ShutdownSignal;
use crate::remote::RemoteApi;
use crate::utils::sanitize_file_name;

pub struct TransferWorker {
    api: Arc<dyn RemoteApi>,
    surface: Arc<dyn DisplaySurface>,
    download_dir: PathBuf,
    depth: DepthGauge,
}

impl TransferWorker {
    pub fn new(
        api: Arc<dyn RemoteApi>,
        surface: Arc<dyn DisplaySurface>,
        download_dir: PathBuf,
        depth: DepthGauge,
    ) -> Self {
        Self {
            api,
            surface,
            download_dir,
            depth,
        }
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    pub fn spawn(self, jobs: JobReceiver, shutdown: ShutdownSignal) -> JoinHandle<()> {
        tokio::spawn(self.run(jobs, shutdown))
    }

    /// Consume jobs until shutdown is requested or every producer is gone
    /// and the queue is empty. Shutdown is only observed between jobs.
    pub async fn run(self, mut jobs: JobReceiver, mut shutdown: ShutdownSignal) {
        info!(dir = %self.download_dir.display(), "Transfer worker started");

        loop {
            let job = tokio::select! {
                biased;
                _ = shutdown.wait() => break,
                job = jobs.next() => match job {
                    Some(job) => job,
                    None => break,
                },
            };
            // Errors are already reported by process_job.
            let _ = self.process_job(job).await;
        }

        info!("Transfer worker stopped");
    }

    /// Download one job into the download directory. Returns the number of
    /// bytes written.
    pub async fn process_job(&self, job: TransferJob) -> Result<u64> {
        info!(
            name = %job.display_name,
            expected = job.expected_size_bytes,
            remaining = self.depth.get(),
            "Transfer started"
        );
        self.surface.post_transfer(TransferEvent::Started {
            label: job.display_name.clone(),
            expected_bytes: job.expected_size_bytes,
        });

        match self.transfer(&job).await {
            Ok((bytes, path)) => {
                info!(name = %job.display_name, bytes, path = %path.display(), "Transfer finished");
                self.surface.post_transfer(TransferEvent::Finished {
                    label: job.display_name,
                    bytes,
                    path,
                });
                Ok(bytes)
            }
            Err(e) => {
                warn!(name = %job.display_name, kind = %e.kind(), error = %e, "Transfer failed");
                self.surface.post_transfer(TransferEvent::Failed {
                    label: job.display_name,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn transfer(&self, job: &TransferJob) -> Result<(u64, PathBuf)> {
        let file_name = sanitize_file_name(&job.display_name).ok_or_else(|| {
            Error::local_io(
                self.download_dir.join(&job.display_name),
                io::Error::new(io::ErrorKind::InvalidInput, "not a usable file name"),
            )
        })?;

        let dir = self.download_dir.clone();
        let final_path = dir.join(&file_name);
        let partial_path = dir.join(format!("{}.part", file_name));

        let partial = partial_path.clone();
        let file = blocking(&partial_path, move || {
            fs::create_dir_all(&dir).map_err(|e| Error::local_io(&dir, e))?;
            File::create(&partial).map_err(|e| Error::local_io(&partial, e))
        })
        .await?;

        let result = match self.stream_into(job, file, &partial_path).await {
            Ok((file, bytes)) => {
                let (partial, target) = (partial_path.clone(), final_path.clone());
                blocking(&partial_path, move || {
                    file.sync_all().map_err(|e| Error::local_io(&partial, e))?;
                    fs::rename(&partial, &target).map_err(|e| Error::local_io(&target, e))?;
                    Ok(bytes)
                })
                .await
            }
            Err(e) => Err(e),
        };

        if result.is_err() {
            if let Err(e) = tokio::fs::remove_file(&partial_path).await {
                debug!(path = %partial_path.display(), error = %e, "Could not remove partial file");
            }
        }

        result.map(|bytes| (bytes, final_path))
    }

    /// Stream the body through the progress reporter. Returns the flushed
    /// file and the byte count.
    async fn stream_into(
        &self,
        job: &TransferJob,
        file: File,
        partial_path: &Path,
    ) -> Result<(File, u64)> {
        let mut stream = self.api.fetch(&job.source_url).await?;
        let mut reporter = ProgressReporter::new(
            BufWriter::new(file),
            ProgressState::new(job.display_name.clone(), job.expected_size_bytes),
            Arc::clone(&self.surface),
            self.depth.clone(),
        );

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            reporter
                .write_all(&chunk)
                .map_err(|e| Error::local_io(partial_path, e))?;
        }

        let (writer, state) = reporter
            .finish()
            .map_err(|e| Error::local_io(partial_path, e))?;
        let file = writer
            .into_inner()
            .map_err(|e| Error::local_io(partial_path, e.into_error()))?;

        if state.bytes_written_so_far != job.expected_size_bytes {
            debug!(
                name = %job.display_name,
                expected = job.expected_size_bytes,
                received = state.bytes_written_so_far,
                "Received size differs from the listing"
            );
        }
        Ok((file, state.bytes_written_so_far))
    }
}

/// Run file system work off the runtime threads.
async fn blocking<T, F>(path: &Path, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::local_io(path, io::Error::new(io::ErrorKind::Other, e)))?
}
