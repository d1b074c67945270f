// src/capabilities/storage.rs
//! Object storage over plain HTTP PUT (R2/S3 presigned gateways, MinIO,
//! anything that accepts a bearer-authenticated upload).

use super::http::{check_status, classify_request_error};
use super::ObjectStorage;
use crate::error::StepError;
use async_trait::async_trait;
use reqwest::{Body, Client};
use std::path::Path;
use std::time::Duration;
use tokio_util::io::ReaderStream;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct HttpObjectStorage {
    client: Client,
    upload_url: String,
    public_url: String,
    token: Option<String>,
}

/// Object key for a local file: its encoded file name.
pub fn object_key(local_path: &Path) -> Option<String> {
    local_path
        .file_name()
        .and_then(|name| name.to_str())
        .map(|name| urlencoding::encode(name).into_owned())
}

impl HttpObjectStorage {
    pub fn new(upload_url: String, public_url: String, token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            upload_url: upload_url.trim_end_matches('/').to_string(),
            public_url: public_url.trim_end_matches('/').to_string(),
            token,
        }
    }
}

#[async_trait]
impl ObjectStorage for HttpObjectStorage {
    async fn upload(&self, local_path: &Path) -> Result<String, StepError> {
        let key = object_key(local_path).ok_or_else(|| {
            StepError::permanent(
                "storage",
                format!("can't derive an object key from {}", local_path.display()),
            )
        })?;

        let file = tokio::fs::File::open(local_path)
            .await
            .map_err(|e| StepError::io("storage", "open upload", e))?;
        let length = file
            .metadata()
            .await
            .map_err(|e| StepError::io("storage", "stat upload", e))?
            .len();

        let mut request = self
            .client
            .put(format!("{}/{}", self.upload_url, key))
            .header(reqwest::header::CONTENT_LENGTH, length)
            .body(Body::wrap_stream(ReaderStream::new(file)))
            .timeout(Duration::from_secs(120));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| classify_request_error("storage", e))?;
        check_status("storage", response).await?;

        let url = format!("{}/{}", self.public_url, key);
        debug!("Uploaded {} to {}", local_path.display(), url);
        Ok(url)
    }
}
