// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Transfer data model.

use serde::{Deserialize, Serialize};

use crate::utils::format_size;

/// A progress update is due once more than this many writes happened since
/// the previous one.
pub const REPORT_EVERY_WRITES: u32 = 100;

/// One requested download. Immutable once queued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferJob {
    /// URL the worker fetches.
    pub source_url: String,
    /// Name of the local file, also used as progress label.
    pub display_name: String,
    /// Size announced by the recorder's listing.
    pub expected_size_bytes: u64,
}

impl TransferJob {
    pub fn new(
        source_url: impl Into<String>,
        display_name: impl Into<String>,
        expected_size_bytes: u64,
    ) -> Self {
        Self {
            source_url: source_url.into(),
            display_name: display_name.into(),
            expected_size_bytes,
        }
    }
}

/// Byte accounting for the transfer in flight. Recreated for every job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressState {
    pub total_bytes_expected: u64,
    /// Never decreases. May exceed the expected total when the recorder sends
    /// more than it announced; nothing is truncated.
    pub bytes_written_so_far: u64,
    pub writes_since_last_report: u32,
    pub label: String,
}

impl ProgressState {
    pub fn new(label: impl Into<String>, total_bytes_expected: u64) -> Self {
        Self {
            total_bytes_expected,
            bytes_written_so_far: 0,
            writes_since_last_report: 0,
            label: label.into(),
        }
    }

    /// Account for one write of `n` bytes. Returns whether an update is due.
    pub fn record_write(&mut self, n: usize) -> bool {
        self.bytes_written_so_far = self.bytes_written_so_far.saturating_add(n as u64);
        self.writes_since_last_report = self.writes_since_last_report.saturating_add(1);

        self.writes_since_last_report > REPORT_EVERY_WRITES
            || self.bytes_written_so_far == self.total_bytes_expected
    }

    /// Whole percent complete, `0..=100`.
    ///
    /// Integer arithmetic in `u128` so multi-gigabyte files never saturate
    /// early. An expected size of zero counts as complete.
    pub fn percent(&self) -> u8 {
        if self.total_bytes_expected == 0 {
            return 100;
        }
        let ratio = u128::from(self.bytes_written_so_far) * 100
            / u128::from(self.total_bytes_expected);
        ratio.min(100) as u8
    }

    /// Build the event for the display and restart the write batch.
    pub fn take_update(&mut self, queue_depth: usize) -> ProgressUpdate {
        self.writes_since_last_report = 0;
        ProgressUpdate {
            label: self.label.clone(),
            bytes_so_far: self.bytes_written_so_far,
            total_bytes: self.total_bytes_expected,
            percent: self.percent(),
            queue_depth,
        }
    }
}

/// Snapshot posted to the display surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub label: String,
    pub bytes_so_far: u64,
    pub total_bytes: u64,
    pub percent: u8,
    /// Jobs still waiting behind this one.
    pub queue_depth: usize,
}

impl ProgressUpdate {
    /// `Downloading a.mp4: 524.29 kB / 1.05 MB, [ 3 remaining ]`
    pub fn message(&self) -> String {
        format!(
            "Downloading {}: {} / {}, [ {} remaining ]",
            self.label,
            format_size(self.bytes_so_far),
            format_size(self.total_bytes),
            self.queue_depth
        )
    }
}
