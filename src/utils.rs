// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Small helpers shared across ocs-remote.

use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use indicatif::DecimalBytes;

/// Acquire a read lock, recovering from poisoning.
///
/// A panic while the listing was being replaced leaves either the old or the
/// new snapshot behind; both are valid to show, so the guard is recovered
/// and the event logged.
#[inline]
pub fn resilient_read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::error!(
                target: "ocs_remote::locks",
                event = "LOCK_POISONED_READ",
                "RwLock was poisoned during read acquisition, recovering"
            );
            poisoned.into_inner()
        }
    }
}

/// Acquire a write lock, recovering from poisoning.
#[inline]
pub fn resilient_write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::error!(
                target: "ocs_remote::locks",
                event = "LOCK_POISONED_WRITE",
                "RwLock was poisoned during write acquisition, recovering"
            );
            poisoned.into_inner()
        }
    }
}

/// Human readable size with SI units ("1.05 MB").
pub fn format_size(bytes: u64) -> String {
    DecimalBytes(bytes).to_string()
}

/// Reduce a name received from the recorder to a bare file name.
///
/// Returns `None` when nothing usable is left (empty, `.`, `..`).
///
/// ```
/// use ocs_remote::utils::sanitize_file_name;
///
/// assert_eq!(sanitize_file_name("clips/take1.mp4").as_deref(), Some("take1.mp4"));
/// assert_eq!(sanitize_file_name(".."), None);
/// ```
pub fn sanitize_file_name(name: &str) -> Option<String> {
    let normalized = name.replace('\\', "/");
    let candidate = Path::new(&normalized).file_name()?.to_str()?.trim();
    if candidate.is_empty() || candidate == "." || candidate == ".." {
        return None;
    }
    Some(candidate.to_string())
}
