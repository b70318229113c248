// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! reqwest implementation of [`RemoteApi`].

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, Url};
use tracing::debug;

use super::{expect_ok, parse_listing, ByteStream, RemoteApi, RemoteFile};
use crate::config::Config;
use crate::error::{Error, Result};

/// HTTP client for the recorder's control surface.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    base_url: Url,
    client: Client,
    /// Applied to every call except downloads.
    request_timeout: Duration,
}

impl HttpRemote {
    /// Client for a recorder listening on `address` (`host:port`).
    pub fn new(address: &str, connect_timeout: Duration, request_timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(&format!("http://{}/", address.trim()))
            .map_err(|e| Error::Config(format!("invalid recorder address '{}': {}", address, e)))?;

        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url,
            client,
            request_timeout,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.address,
            config.connect_timeout(),
            config.request_timeout(),
        )
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `base/<path>?<key>=<value>`, query values form-encoded.
    fn endpoint(&self, path: &str, query: Option<(&str, &str)>) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(path);
        if let Some((key, value)) = query {
            url.query_pairs_mut().append_pair(key, value);
        }
        url
    }

    async fn get_text(&self, url: Url) -> Result<String> {
        debug!(%url, "GET");
        let response = self
            .client
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(Error::from_http)?;

        response.text().await.map_err(Error::from_http)
    }
}

#[async_trait]
impl RemoteApi for HttpRemote {
    async fn check_status(&self) -> Result<()> {
        let body = self.get_text(self.endpoint("checkocs", None)).await?;
        expect_ok("checkocs", &body)
    }

    async fn list_files(&self) -> Result<Vec<RemoteFile>> {
        let url = self.endpoint("list", None);
        debug!(%url, "GET");
        let response = self
            .client
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(Error::from_http)?;

        let body = response.bytes().await.map_err(Error::from_http)?;
        parse_listing(&body)
    }

    async fn start_recording(&self, name: &str) -> Result<()> {
        let body = self
            .get_text(self.endpoint("start", Some(("name", name))))
            .await?;
        expect_ok("start", &body)
    }

    async fn stop_recording(&self) -> Result<()> {
        let body = self.get_text(self.endpoint("stop", None)).await?;
        expect_ok("stop", &body)
    }

    async fn delete_file(&self, name: &str) -> Result<()> {
        let body = self
            .get_text(self.endpoint("delete", Some(("file", name))))
            .await?;
        expect_ok("delete", &body)
    }

    fn download_url(&self, name: &str) -> String {
        self.endpoint("download", Some(("file", name))).to_string()
    }

    async fn fetch(&self, url: &str) -> Result<ByteStream> {
        debug!(%url, "GET (stream)");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(Error::from_http)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Protocol(format!("download answered HTTP {}", status)));
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(Error::from_http));
        Ok(stream.boxed())
    }
}
