// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Error types for ocs-remote.
//!
//! Every failure the engine can meet falls in one of three buckets:
//!
//! - **Transport**: the recorder could not be reached or the connection broke
//!   mid-stream.
//! - **Protocol**: the recorder answered, but not with `OK` or with a body we
//!   could not decode.
//! - **Local I/O**: the destination file could not be created or written.
//!
//! None of them are fatal. They are logged where they happen and the affected
//! operation reports failure; nothing is retried automatically.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the remote client and the transfer engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Network unreachable, connection reset, timeout.
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-`OK` body, unexpected HTTP status or malformed JSON.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Destination file could not be created or written.
    #[error("local I/O error on {}: {source}", path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Every consumer of the transfer queue is gone.
    #[error("transfer queue is closed")]
    QueueClosed,

    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Coarse classification used for display and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Protocol,
    LocalIo,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Transport => write!(f, "transport"),
            ErrorKind::Protocol => write!(f, "protocol"),
            ErrorKind::LocalIo => write!(f, "local-io"),
            ErrorKind::Internal => write!(f, "internal"),
        }
    }
}

impl Error {
    /// Map a reqwest failure. Decode failures count as protocol errors,
    /// everything else never reached a well-formed answer.
    pub fn from_http(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Error::Protocol(err.to_string())
        } else {
            Error::Transport(err.to_string())
        }
    }

    /// Wrap an I/O error with the path it happened on.
    pub fn local_io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Error::LocalIo {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Transport(_) => ErrorKind::Transport,
            Error::Protocol(_) => ErrorKind::Protocol,
            Error::LocalIo { .. } => ErrorKind::LocalIo,
            Error::QueueClosed | Error::Config(_) => ErrorKind::Internal,
        }
    }
}

/// Formats an error message with title, causes and fixes.
///
/// ```
/// use ocs_remote::error::format_error;
///
/// let message = format_error(
///     "Cannot reach the recorder at 192.168.1.68:8000",
///     &["The phone is not on the same network", "The app is not running"],
///     &["Set the address: ocs-remote config set-address HOST:PORT"],
/// );
/// assert!(message.contains("Possible causes:"));
/// ```
pub fn format_error(title: &str, causes: &[&str], fixes: &[&str]) -> String {
    let mut output = format!("[✗] {}\n", title);

    if !causes.is_empty() {
        output.push_str("\nPossible causes:\n");
        for cause in causes {
            output.push_str(&format!("  - {}\n", cause));
        }
    }

    if !fixes.is_empty() {
        output.push_str("\nTry these fixes:\n");
        for (i, fix) in fixes.iter().enumerate() {
            output.push_str(&format!("  {}. {}\n", i + 1, fix));
        }
    }

    output
}

/// The message shown when the recorder does not answer.
pub fn unreachable_message(address: &str) -> String {
    format_error(
        &format!("Cannot reach the recorder at {}", address),
        &[
            "The phone is not on the same network as this computer",
            "The recorder app is not running or its server is stopped",
            "The configured address or port is wrong",
        ],
        &[
            "Check the address: ocs-remote config show",
            "Change it: ocs-remote config set-address HOST:PORT",
            "Watch the connection: ocs-remote watch",
        ],
    )
}
