// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Download queue and the worker that drains it.
//!
//! ```text
//! controller ──enqueue──▶ TransferQueue (bounded) ──▶ TransferWorker
//!                                                          │
//!                                     ProgressReporter ◀───┘ chunks
//!                                            │
//!                                            ▼
//!                                     DisplaySurface
//! ```

mod progress;
mod queue;
mod types;
mod worker;

pub use progress::ProgressReporter;
pub use queue::{transfer_queue, DepthGauge, JobReceiver, TransferQueue};
pub use types::{ProgressState, ProgressUpdate, TransferJob, REPORT_EVERY_WRITES};
pub use worker::TransferWorker;
