// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Recorder file listing.
//!
//! A [`FileListing`] is an immutable snapshot. Refreshing replaces the whole
//! snapshot; a failed refresh leaves the previous one in place.

use std::sync::{Arc, RwLock};

use tracing::{info, warn};

use crate::display::{DisplaySurface, Notice};
use crate::error::Result;
use crate::remote::{RemoteApi, RemoteFile};
use crate::utils::{resilient_read, resilient_write};

/// Files in the order the recorder listed them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileListing {
    entries: Arc<[RemoteFile]>,
}

impl Default for FileListing {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl FileListing {
    pub fn new(entries: Vec<RemoteFile>) -> Self {
        Self {
            entries: entries.into(),
        }
    }

    pub fn entries(&self) -> &[RemoteFile] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&RemoteFile> {
        self.entries.get(index)
    }

    pub fn find(&self, name: &str) -> Option<&RemoteFile> {
        self.entries.iter().find(|f| f.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RemoteFile> {
        self.entries.iter()
    }

    /// Sizes come from the recorder, so the sum saturates.
    pub fn total_bytes(&self) -> u64 {
        self.entries
            .iter()
            .fold(0u64, |acc, f| acc.saturating_add(f.size))
    }
}

impl From<Vec<RemoteFile>> for FileListing {
    fn from(entries: Vec<RemoteFile>) -> Self {
        Self::new(entries)
    }
}

/// Last successfully fetched listing, shared by the user actions.
#[derive(Debug, Default)]
pub struct ListingCache {
    current: RwLock<FileListing>,
}

impl ListingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> FileListing {
        resilient_read(&self.current).clone()
    }

    /// Fetch and parse the list once.
    ///
    /// On success the cached snapshot is replaced and posted. On failure the
    /// cached snapshot is kept, a notice is posted and the error returned.
    pub async fn refresh(
        &self,
        api: &dyn RemoteApi,
        surface: &dyn DisplaySurface,
    ) -> Result<FileListing> {
        match api.list_files().await {
            Ok(files) => {
                let listing = FileListing::new(files);
                *resilient_write(&self.current) = listing.clone();
                info!(files = listing.len(), "File listing refreshed");
                surface.post_listing(listing.clone());
                Ok(listing)
            }
            Err(e) => {
                warn!(error = %e, "Failed to refresh the file listing, keeping the previous one");
                surface.post_notice(Notice::error(format!("Could not refresh the file list: {}", e)));
                Err(e)
            }
        }
    }
}
