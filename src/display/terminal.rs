// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Terminal renderer for [`UiEvent`]s.
//!
//! Owns the [`DisplayState`] and the progress bar. Lines printed while a
//! transfer is running go through the bar so they do not tear it.

use chrono::Local;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc::UnboundedReceiver;

use super::{DisplayState, Notice, NoticeLevel, TransferEvent, UiEvent};
use crate::listing::FileListing;
use crate::monitor::ConnectionStatus;
use crate::utils::format_size;

/// Numbered listing, one file per line.
pub fn render_listing(listing: &FileListing) -> String {
    if listing.is_empty() {
        return "  (no files on the recorder)".to_string();
    }
    let width = listing.len().to_string().len();
    let mut out = String::new();
    for (i, file) in listing.iter().enumerate() {
        out.push_str(&format!("  {:>width$}. {}\n", i + 1, file, width = width));
    }
    out.push_str(&format!(
        "  {} file(s), {} total",
        listing.len(),
        format_size(listing.total_bytes())
    ));
    out
}

pub fn render_status(status: ConnectionStatus) -> String {
    let text = status.to_string();
    match status {
        ConnectionStatus::Online => text.green().bold().to_string(),
        ConnectionStatus::Offline => text.red().bold().to_string(),
        ConnectionStatus::Unknown => text.dimmed().to_string(),
    }
}

pub fn render_notice(notice: &Notice) -> String {
    let stamp = notice.at.format("%H:%M:%S").to_string();
    match notice.level {
        NoticeLevel::Info => format!("{} {} {}", stamp.dimmed(), "[✓]".green(), notice.message),
        NoticeLevel::Error => format!("{} {} {}", stamp.dimmed(), "[✗]".red(), notice.message),
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("  {spinner:.green} [{bar:30.cyan/blue}] {pos:>3}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░")
}

/// Event loop side of the display.
pub struct TerminalDisplay {
    state: DisplayState,
    bar: Option<ProgressBar>,
}

impl TerminalDisplay {
    pub fn new() -> Self {
        Self {
            state: DisplayState::new(),
            bar: None,
        }
    }

    pub fn state(&self) -> &DisplayState {
        &self.state
    }

    fn println(&self, line: &str) {
        match &self.bar {
            Some(bar) => bar.suspend(|| println!("{}", line)),
            None => println!("{}", line),
        }
    }

    fn clear_bar(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }

    /// Apply one event and draw whatever changed.
    pub fn handle(&mut self, event: UiEvent) {
        let rendered = match &event {
            UiEvent::Status(status) => Some(format!(
                "{} Recorder: {}",
                Local::now().format("%H:%M:%S").to_string().dimmed(),
                render_status(*status)
            )),
            UiEvent::Listing(listing) => Some(render_listing(listing)),
            UiEvent::Notice(notice) => Some(render_notice(notice)),
            _ => None,
        };

        match &event {
            UiEvent::Transfer(TransferEvent::Started { label, .. }) => {
                self.clear_bar();
                let bar = ProgressBar::new(100);
                bar.set_style(bar_style());
                bar.set_message(format!("Downloading {}", label));
                self.bar = Some(bar);
            }
            UiEvent::Progress(update) => {
                if let Some(bar) = &self.bar {
                    bar.set_position(u64::from(update.percent));
                    bar.set_message(update.message());
                }
            }
            UiEvent::Transfer(TransferEvent::Finished { label, bytes, path }) => {
                self.clear_bar();
                println!(
                    "  {} {} ({}) -> {}",
                    "[✓]".green(),
                    label,
                    format_size(*bytes),
                    path.display()
                );
            }
            UiEvent::Transfer(TransferEvent::Failed { label, error }) => {
                self.clear_bar();
                println!("  {} {}: {}", "[✗]".red(), label, error);
            }
            _ => {}
        }

        // Status is only printed on transitions.
        if self.state.apply(event) {
            if let Some(line) = rendered {
                self.println(&line);
            }
        }
    }

    /// Drain events until every sender is gone. Returns the final state.
    pub async fn run(mut self, mut events: UnboundedReceiver<UiEvent>) -> DisplayState {
        while let Some(event) = events.recv().await {
            self.handle(event);
        }
        self.clear_bar();
        self.state
    }
}

impl Default for TerminalDisplay {
    fn default() -> Self {
        Self::new()
    }
}
