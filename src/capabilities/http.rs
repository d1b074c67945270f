// src/capabilities/http.rs
//! Shared HTTP plumbing: failure classification and the media fetcher.

use super::MediaFetcher;
use crate::error::StepError;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Response, StatusCode};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Rate limits and upstream hiccups are worth another attempt, everything
/// else in the 4xx/5xx range is not.
pub fn is_transient_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 408 | 429 | 500 | 502 | 503 | 504)
}

/// Classify a transport-level failure.
pub fn classify_request_error(capability: &'static str, err: reqwest::Error) -> StepError {
    if err.is_connect() || err.is_timeout() || err.is_request() || err.is_body() {
        StepError::transient(capability, format!("Connection error: {}", err))
    } else {
        StepError::permanent(capability, format!("Request error: {}", err))
    }
}

/// Turn a non-success response into a tagged error, or hand it back untouched.
pub async fn check_status(capability: &'static str, response: Response) -> Result<Response, StepError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = format!("API error ({}): {}", status, body);
    if is_transient_status(status) {
        Err(StepError::transient(capability, message))
    } else {
        Err(StepError::permanent(capability, message))
    }
}

/// Parse a JSON body. A body we can't decode is a contract break, not a blip.
pub async fn json_body<T: serde::de::DeserializeOwned>(
    capability: &'static str,
    response: Response,
) -> Result<T, StepError> {
    let text = response
        .text()
        .await
        .map_err(|e| classify_request_error(capability, e))?;
    serde_json::from_str(&text).map_err(|e| {
        StepError::permanent(
            capability,
            format!("Failed to parse response: {}. Response: {}", e, text),
        )
    })
}

#[derive(Debug, Clone)]
pub struct HttpMediaFetcher {
    client: Client,
}

impl Default for HttpMediaFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpMediaFetcher {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

#[async_trait]
impl MediaFetcher for HttpMediaFetcher {
    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, StepError> {
        debug!("Fetching image {}", url);
        let response = self
            .client
            .get(url)
            .timeout(Duration::from_secs(60))
            .send()
            .await
            .map_err(|e| classify_request_error("image_fetch", e))?;
        let response = check_status("image_fetch", response).await?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !content_type.starts_with("image/") {
            return Err(StepError::permanent(
                "image_fetch",
                format!("URL did not return an image (content-type: {:?})", content_type),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| classify_request_error("image_fetch", e))?;
        Ok(bytes.to_vec())
    }

    async fn download(&self, url: &str, output: &Path) -> Result<PathBuf, StepError> {
        let response = self
            .client
            .get(url)
            .timeout(Duration::from_secs(300))
            .send()
            .await
            .map_err(|e| classify_request_error("download", e))?;
        let response = check_status("download", response).await?;

        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StepError::io("download", "create download dir", e))?;
        }

        let mut file = fs::File::create(output)
            .await
            .map_err(|e| StepError::io("download", "create download file", e))?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| classify_request_error("download", e))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| StepError::io("download", "write download chunk", e))?;
        }
        file.flush()
            .await
            .map_err(|e| StepError::io("download", "flush download", e))?;

        info!("✅ Downloaded {} to {}", url, output.display());
        Ok(output.to_path_buf())
    }
}
