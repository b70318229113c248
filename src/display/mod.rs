// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Display surface: the only way background work talks to the user.
//!
//! Background loops never touch presentation state. They hold a
//! [`DisplaySurface`] and post immutable [`UiEvent`] snapshots to it; posting
//! never blocks and never fails from the caller's point of view. A single
//! UI-owned loop receives the events and applies them to a [`DisplayState`].
//!
//! ```text
//! ┌──────────────┐  post   ┌──────────────┐  recv   ┌──────────────┐
//! │ Worker       │────────▶│ ChannelSurface│───────▶│ DisplayState │
//! │ Poll daemon  │         │ (unbounded)   │        │ + renderer   │
//! │ Controller   │         └──────────────┘        └──────────────┘
//! └──────────────┘
//! ```
//!
//! Events from one source arrive in the order they were posted; there is no
//! ordering between sources.

pub mod terminal;

use std::collections::VecDeque;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use tokio::sync::mpsc;
use tracing::trace;

use crate::listing::FileListing;
use crate::monitor::ConnectionStatus;
use crate::transfer::ProgressUpdate;

/// Notices kept by [`DisplayState`].
const MAX_NOTICES: usize = 50;

/// Severity of a [`Notice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A user-visible outcome of an action.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub at: DateTime<Local>,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
            at: Local::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
            at: Local::now(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

/// Lifecycle of one queued download.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferEvent {
    /// The worker dequeued the job.
    Started { label: String, expected_bytes: u64 },
    Finished {
        label: String,
        bytes: u64,
        path: PathBuf,
    },
    Failed { label: String, error: String },
}

/// Everything a display can be told.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    Status(ConnectionStatus),
    Listing(FileListing),
    Progress(ProgressUpdate),
    Transfer(TransferEvent),
    Notice(Notice),
}

/// Post-only, non-blocking handle to the display.
pub trait DisplaySurface: Send + Sync {
    /// Hand an event to the display and return immediately.
    fn post(&self, event: UiEvent);

    fn post_status(&self, status: ConnectionStatus) {
        self.post(UiEvent::Status(status));
    }

    fn post_listing(&self, listing: FileListing) {
        self.post(UiEvent::Listing(listing));
    }

    fn post_progress(&self, update: ProgressUpdate) {
        self.post(UiEvent::Progress(update));
    }

    fn post_transfer(&self, event: TransferEvent) {
        self.post(UiEvent::Transfer(event));
    }

    fn post_notice(&self, notice: Notice) {
        self.post(UiEvent::Notice(notice));
    }
}

/// [`DisplaySurface`] backed by an unbounded channel to the UI loop.
#[derive(Debug, Clone)]
pub struct ChannelSurface {
    sender: mpsc::UnboundedSender<UiEvent>,
}

impl ChannelSurface {
    /// Surface plus the receiving end the UI loop drains.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<UiEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl DisplaySurface for ChannelSurface {
    fn post(&self, event: UiEvent) {
        if self.sender.send(event).is_err() {
            trace!("Display loop is gone, dropping event");
        }
    }
}

/// Presentation state owned by the UI loop.
#[derive(Debug, Clone, Default)]
pub struct DisplayState {
    pub status: ConnectionStatus,
    pub listing: FileListing,
    /// Latest update of the transfer in flight.
    pub progress: Option<ProgressUpdate>,
    pub active_transfer: Option<String>,
    pub completed: usize,
    pub failed: usize,
    pub notices: VecDeque<Notice>,
}

impl DisplayState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event. Returns `true` when something visible changed.
    pub fn apply(&mut self, event: UiEvent) -> bool {
        match event {
            UiEvent::Status(status) => {
                let changed = self.status != status;
                self.status = status;
                changed
            }
            UiEvent::Listing(listing) => {
                self.listing = listing;
                true
            }
            UiEvent::Progress(update) => {
                self.progress = Some(update);
                true
            }
            UiEvent::Transfer(TransferEvent::Started { label, .. }) => {
                self.active_transfer = Some(label);
                self.progress = None;
                true
            }
            UiEvent::Transfer(TransferEvent::Finished { .. }) => {
                self.completed += 1;
                self.active_transfer = None;
                true
            }
            UiEvent::Transfer(TransferEvent::Failed { .. }) => {
                self.failed += 1;
                self.active_transfer = None;
                true
            }
            UiEvent::Notice(notice) => {
                if self.notices.len() == MAX_NOTICES {
                    self.notices.pop_front();
                }
                self.notices.push_back(notice);
                true
            }
        }
    }
}
