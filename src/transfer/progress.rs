// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Byte sink wrapper that reports progress to the display.

use std::io::{self, Write};
use std::sync::Arc;

use super::queue::DepthGauge;
use super::types::ProgressState;
use crate::display::DisplaySurface;

/// Forwards every write to `inner` and posts a [`super::ProgressUpdate`]
/// whenever one is due. Posting never blocks the write path.
pub struct ProgressReporter<W: Write> {
    inner: W,
    state: ProgressState,
    surface: Arc<dyn DisplaySurface>,
    depth: DepthGauge,
    updates_posted: usize,
}

impl<W: Write> ProgressReporter<W> {
    pub fn new(
        inner: W,
        state: ProgressState,
        surface: Arc<dyn DisplaySurface>,
        depth: DepthGauge,
    ) -> Self {
        Self {
            inner,
            state,
            surface,
            depth,
            updates_posted: 0,
        }
    }

    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    pub fn bytes_written(&self) -> u64 {
        self.state.bytes_written_so_far
    }

    pub fn updates_posted(&self) -> usize {
        self.updates_posted
    }

    fn post_update(&mut self) {
        let update = self.state.take_update(self.depth.get());
        self.surface.post_progress(update);
        self.updates_posted += 1;
    }

    /// Flush the sink and post the final state if the last batch was never
    /// reported. Returns the sink and the final accounting.
    pub fn finish(mut self) -> io::Result<(W, ProgressState)> {
        self.inner.flush()?;
        if self.state.writes_since_last_report > 0 || self.updates_posted == 0 {
            self.post_update();
        }
        Ok((self.inner, self.state))
    }
}

impl<W: Write> Write for ProgressReporter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        if self.state.record_write(n) {
            self.post_update();
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
