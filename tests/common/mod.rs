// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Scripted recorder and recording display shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use tokio::sync::Semaphore;
use tokio::time::Instant;

use ocs_remote::display::{DisplaySurface, Notice, TransferEvent, UiEvent};
use ocs_remote::remote::ByteStream;
use ocs_remote::{ConnectionStatus, Error, ProgressUpdate, RemoteApi, RemoteFile, Result};

pub const CHUNK: usize = 4096;

/// What `fetch` serves for one file.
#[derive(Clone)]
pub enum Body {
    /// `chunks` chunks of `CHUNK` bytes each.
    Chunks(usize),
    /// Exact bytes, in one chunk.
    Bytes(Vec<u8>),
    /// `chunks` good chunks, then a transport error.
    BreakAfter(usize),
}

#[derive(Default)]
pub struct ScriptedRemote {
    /// Successive answers to the status check; the last one repeats.
    pub status_script: Mutex<VecDeque<bool>>,
    pub status_checks: Mutex<Vec<Instant>>,
    pub files: Mutex<Vec<RemoteFile>>,
    pub malformed_listing: AtomicBool,
    pub list_calls: AtomicUsize,
    pub bodies: Mutex<HashMap<String, Body>>,
    pub fetched: Mutex<Vec<String>>,
    /// When set, every fetch waits for a permit.
    pub fetch_gate: Option<Arc<Semaphore>>,
    pub refuse_control: AtomicBool,
    pub deleted: Mutex<Vec<String>>,
    pub started: Mutex<Vec<String>>,
    /// Record-control calls in arrival order, refused ones included.
    pub control_calls: Mutex<Vec<String>>,
}

impl ScriptedRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(script: &[bool]) -> Self {
        let remote = Self::new();
        *remote.status_script.lock().unwrap() = script.iter().copied().collect();
        remote
    }

    pub fn with_gate(gate: Arc<Semaphore>) -> Self {
        Self {
            fetch_gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn add_file(&self, name: &str, size: u64, body: Body) {
        self.files.lock().unwrap().push(RemoteFile::new(name, size));
        self.bodies.lock().unwrap().insert(name.to_string(), body);
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

fn name_from_url(url: &str) -> String {
    url.rsplit_once("file=")
        .map(|(_, name)| name.to_string())
        .unwrap_or_default()
}

#[async_trait]
impl RemoteApi for ScriptedRemote {
    async fn check_status(&self) -> Result<()> {
        self.status_checks.lock().unwrap().push(Instant::now());
        let online = {
            let mut script = self.status_script.lock().unwrap();
            if script.len() > 1 {
                script.pop_front().unwrap_or(false)
            } else {
                script.front().copied().unwrap_or(false)
            }
        };
        if online {
            Ok(())
        } else {
            Err(Error::Transport("connection refused".into()))
        }
    }

    async fn list_files(&self) -> Result<Vec<RemoteFile>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.malformed_listing.load(Ordering::SeqCst) {
            return Err(Error::Protocol("malformed file list".into()));
        }
        Ok(self.files.lock().unwrap().clone())
    }

    async fn start_recording(&self, name: &str) -> Result<()> {
        self.control_calls.lock().unwrap().push(format!("start {}", name));
        if self.refuse_control.load(Ordering::SeqCst) {
            return Err(Error::Protocol("start answered 'ERROR' instead of OK".into()));
        }
        self.started.lock().unwrap().push(name.to_string());
        Ok(())
    }

    async fn stop_recording(&self) -> Result<()> {
        self.control_calls.lock().unwrap().push("stop".to_string());
        if self.refuse_control.load(Ordering::SeqCst) {
            return Err(Error::Protocol("stop answered 'ERROR' instead of OK".into()));
        }
        Ok(())
    }

    async fn delete_file(&self, name: &str) -> Result<()> {
        if self.refuse_control.load(Ordering::SeqCst) {
            return Err(Error::Protocol("delete answered 'ERROR' instead of OK".into()));
        }
        self.deleted.lock().unwrap().push(name.to_string());
        self.files.lock().unwrap().retain(|f| f.name != name);
        Ok(())
    }

    fn download_url(&self, name: &str) -> String {
        format!("http://recorder.test/download?file={}", name)
    }

    async fn fetch(&self, url: &str) -> Result<ByteStream> {
        if let Some(gate) = &self.fetch_gate {
            gate.acquire()
                .await
                .map_err(|_| Error::Transport("gate closed".into()))?
                .forget();
        }

        let name = name_from_url(url);
        self.fetched.lock().unwrap().push(name.clone());

        let body = self.bodies.lock().unwrap().get(&name).cloned();
        match body {
            None => Err(Error::Protocol("download answered HTTP 404 Not Found".into())),
            Some(Body::Chunks(n)) => {
                Ok(stream::iter((0..n).map(|_| Ok(vec![7u8; CHUNK]))).boxed())
            }
            Some(Body::Bytes(bytes)) => Ok(stream::iter(vec![Ok(bytes)]).boxed()),
            Some(Body::BreakAfter(n)) => {
                let good = (0..n).map(|_| Ok(vec![7u8; CHUNK]));
                let broken = std::iter::once(Err(Error::Transport("connection reset".into())));
                Ok(stream::iter(good.chain(broken)).boxed())
            }
        }
    }
}

/// Display surface that keeps every event.
#[derive(Default)]
pub struct RecordingSurface {
    events: Mutex<Vec<UiEvent>>,
}

impl RecordingSurface {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<UiEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn progress(&self) -> Vec<ProgressUpdate> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                UiEvent::Progress(update) => Some(update),
                _ => None,
            })
            .collect()
    }

    pub fn transfers(&self) -> Vec<TransferEvent> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                UiEvent::Transfer(event) => Some(event),
                _ => None,
            })
            .collect()
    }

    pub fn started_labels(&self) -> Vec<String> {
        self.transfers()
            .into_iter()
            .filter_map(|e| match e {
                TransferEvent::Started { label, .. } => Some(label),
                _ => None,
            })
            .collect()
    }

    pub fn statuses(&self) -> Vec<ConnectionStatus> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                UiEvent::Status(status) => Some(status),
                _ => None,
            })
            .collect()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                UiEvent::Notice(notice) => Some(notice),
                _ => None,
            })
            .collect()
    }
}

impl DisplaySurface for RecordingSurface {
    fn post(&self, event: UiEvent) {
        self.events.lock().unwrap().push(event);
    }
}
