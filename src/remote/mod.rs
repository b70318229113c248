// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Recorder control API.
//!
//! The recorder exposes a handful of plain `GET` endpoints:
//!
//! | Endpoint | Success |
//! |---|---|
//! | `/checkocs` | body is `OK` |
//! | `/list` | JSON array of `{name, size}` |
//! | `/start?name=..` | body is `OK` |
//! | `/stop` | body is `OK` |
//! | `/delete?file=..` | body is `OK` |
//! | `/download?file=..` | the file bytes |
//!
//! [`RemoteApi`] is the seam the rest of the crate talks to, so the engine can
//! be driven by [`HttpRemote`] in production and by scripted fakes in tests.

mod http;

pub use http::HttpRemote;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::utils::format_size;

/// Streamed body of a download, chunk by chunk.
pub type ByteStream = BoxStream<'static, Result<Vec<u8>>>;

/// One entry of the recorder's file list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    #[serde(alias = "Name")]
    pub name: String,
    #[serde(alias = "Size")]
    pub size: u64,
}

impl RemoteFile {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }
}

impl std::fmt::Display for RemoteFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [ {} ]", self.name, format_size(self.size))
    }
}

/// Operations the recorder supports.
///
/// Every method reports failure as an [`crate::Error`]; callers decide
/// whether to surface or absorb it.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Liveness check. `Ok(())` only when the recorder answered `OK`.
    async fn check_status(&self) -> Result<()>;

    /// Current file list, in the order the recorder returned it.
    async fn list_files(&self) -> Result<Vec<RemoteFile>>;

    async fn start_recording(&self, name: &str) -> Result<()>;

    async fn stop_recording(&self) -> Result<()>;

    async fn delete_file(&self, name: &str) -> Result<()>;

    /// URL a download job for `name` should fetch.
    fn download_url(&self, name: &str) -> String;

    /// Open a download stream for a URL built by [`RemoteApi::download_url`].
    async fn fetch(&self, url: &str) -> Result<ByteStream>;

    /// Boolean view of [`RemoteApi::check_status`].
    async fn is_online(&self) -> bool {
        self.check_status().await.is_ok()
    }
}

/// Interpret a control endpoint body. Anything but an exact `OK` is a refusal.
pub(crate) fn expect_ok(operation: &str, body: &str) -> Result<()> {
    if body == "OK" {
        Ok(())
    } else {
        let shown: String = body.chars().take(80).collect();
        Err(crate::Error::Protocol(format!(
            "{} answered '{}' instead of OK",
            operation, shown
        )))
    }
}

/// Decode the `/list` body.
pub(crate) fn parse_listing(body: &[u8]) -> Result<Vec<RemoteFile>> {
    serde_json::from_slice(body)
        .map_err(|e| crate::Error::Protocol(format!("malformed file list: {}", e)))
}
