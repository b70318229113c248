// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! ocs-remote - remote control for a phone-based recording app
//!
//! The recorder runs a small HTTP server on the phone. This crate checks that
//! it is reachable, lists its recordings, starts and stops recording, deletes
//! files and downloads them one at a time through a bounded queue.
//!
//! **User action** -> **TransferQueue** -> **TransferWorker** -> **DisplaySurface**
//!
//! # Core Modules
//!
//! - [`remote`] - Recorder HTTP API ([`RemoteApi`], [`HttpRemote`])
//! - [`transfer`] - Bounded download queue, single worker, progress reporting
//! - [`monitor`] - Poll daemon for the connection status
//! - [`listing`] - File listing snapshots
//! - [`controller`] - User actions
//! - [`display`] - Event contract between background work and the UI
//! - [`lifecycle`] - Starting and stopping the background loops
//! - [`config`] - Persistent settings
//! - [`error`] - Error taxonomy and user-facing messages

pub mod config;
pub mod controller;
pub mod display;
pub mod error;
pub mod lifecycle;
pub mod listing;
pub mod monitor;
pub mod remote;
pub mod transfer;
pub mod utils;

pub use config::Config;
pub use controller::{RemoteController, Selection};
pub use display::{ChannelSurface, DisplayState, DisplaySurface, Notice, TransferEvent, UiEvent};
pub use error::{Error, ErrorKind, Result};
pub use lifecycle::{Runtime, RuntimeOptions, Shutdown, ShutdownSignal};
pub use listing::{FileListing, ListingCache};
pub use monitor::{ConnectionMonitor, ConnectionStatus};
pub use remote::{HttpRemote, RemoteApi, RemoteFile};
pub use transfer::{
    transfer_queue, ProgressReporter, ProgressState, ProgressUpdate, TransferJob, TransferQueue,
    TransferWorker,
};
