//! IPFS HTTP API client
//!
//! Talks to an IPFS node (or pinning gateway) through `api/v0/add` and
//! `api/v0/cat`. An optional token is sent verbatim as the
//! `Authorization` header.

use super::{ContentStore, StorageError, StorageResult};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// IPFS connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpfsConfig {
    /// Base URL of the HTTP API, e.g. `http://127.0.0.1:5001`
    pub api_url: String,
    /// Value of the `Authorization` header, if the node requires one
    #[serde(default)]
    pub token: Option<String>,
    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for IpfsConfig {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:5001".to_string(),
            token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl IpfsConfig {
    /// Build from a host that is either a full URL or a bare hostname
    pub fn from_parts(host: &str, protocol: &str, port: u16, token: Option<String>) -> Self {
        let api_url = if host.contains("http") {
            host.trim_end_matches('/').to_string()
        } else {
            format!("{}://{}:{}", protocol, host, port)
        };

        Self {
            api_url,
            token: token.filter(|t| !t.is_empty()),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AddResponse {
    #[serde(rename = "Hash")]
    hash: String,
}

/// Content store backed by an IPFS node
#[derive(Debug, Clone)]
pub struct IpfsClient {
    config: IpfsConfig,
    http_client: reqwest::Client,
}

impl IpfsClient {
    pub fn new(config: IpfsConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    fn request(&self, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/api/v0/{}", self.config.api_url, path);
        let builder = self
            .http_client
            .post(url)
            .timeout(Duration::from_secs(self.config.timeout_secs));

        match &self.config.token {
            Some(token) => builder.header(reqwest::header::AUTHORIZATION, token),
            None => builder,
        }
    }
}

#[async_trait]
impl ContentStore for IpfsClient {
    async fn put(&self, data: Vec<u8>) -> StorageResult<String> {
        let form = Form::new().part("file", Part::bytes(data).file_name("data"));

        let response = self
            .request("add")
            .multipart(form)
            .send()
            .await
            .map_err(|e| StorageError::Request(format!("add failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(StorageError::Request(format!(
                "add returned HTTP {}",
                response.status()
            )));
        }

        let added: AddResponse = response
            .json()
            .await
            .map_err(|e| StorageError::InvalidResponse(e.to_string()))?;

        debug!("Uploaded blob to IPFS: {}", added.hash);
        Ok(added.hash)
    }

    async fn get(&self, hash: &str) -> StorageResult<Vec<u8>> {
        let response = self
            .request("cat")
            .query(&[("arg", hash)])
            .send()
            .await
            .map_err(|e| StorageError::Request(format!("cat {} failed: {}", hash, e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(hash.to_string()));
        }
        if !response.status().is_success() {
            return Err(StorageError::Request(format!(
                "cat {} returned HTTP {}",
                hash,
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| StorageError::InvalidResponse(e.to_string()))?;

        Ok(bytes.to_vec())
    }
}
