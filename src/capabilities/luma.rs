// src/capabilities/luma.rs
//! Luma Dream Machine client. Generation is two-phase: submit, then poll the
//! generation until it completes or fails.

use super::http::{check_status, classify_request_error, json_body};
use super::{VideoGenerator, VideoRequest};
use crate::error::StepError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const MAX_POLLS: u32 = 30;
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct LumaVideoClient {
    client: Client,
    api_key: String,
    base_url: String,
    max_polls: u32,
    poll_interval: Duration,
}

#[derive(Debug, Deserialize)]
struct GenerationAssets {
    video: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Generation {
    id: String,
    state: Option<String>,
    failure_reason: Option<String>,
    assets: Option<GenerationAssets>,
}

/// Request body for a generation. Keyframes only carry image URLs.
pub fn generation_body(request: &VideoRequest) -> Value {
    let mut keyframes = Map::new();
    if let Some(url) = &request.start_image_url {
        keyframes.insert("frame0".into(), json!({ "type": "image", "url": url }));
    }
    if let Some(url) = &request.end_image_url {
        keyframes.insert("frame1".into(), json!({ "type": "image", "url": url }));
    }

    let mut body = json!({
        "keyframes": keyframes,
        "aspect_ratio": request.aspect_ratio.as_str(),
    });
    if let Some(prompt) = &request.prompt {
        body["prompt"] = json!(prompt);
    }
    body
}

impl LumaVideoClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: "https://api.lumalabs.ai/dream-machine/v1".to_string(),
            max_polls: MAX_POLLS,
            poll_interval: POLL_INTERVAL,
        }
    }

    async fn submit(&self, request: &VideoRequest) -> Result<String, StepError> {
        let response = self
            .client
            .post(format!("{}/generations", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&generation_body(request))
            .timeout(Duration::from_secs(60))
            .send()
            .await
            .map_err(|e| classify_request_error("video_generation", e))?;
        let response = check_status("video_generation", response).await?;
        let generation: Generation = json_body("video_generation", response).await?;
        Ok(generation.id)
    }

    async fn get_generation(&self, generation_id: &str) -> Result<Generation, StepError> {
        let response = self
            .client
            .get(format!("{}/generations/{}", self.base_url, generation_id))
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| classify_request_error("video_generation", e))?;
        let response = check_status("video_generation", response).await?;
        json_body("video_generation", response).await
    }

    async fn poll(&self, generation_id: &str) -> Result<String, StepError> {
        for attempt in 1..=self.max_polls {
            match self.get_generation(generation_id).await {
                Ok(generation) => match generation.state.as_deref() {
                    Some("completed") => {
                        return generation
                            .assets
                            .and_then(|a| a.video)
                            .ok_or_else(|| {
                                StepError::transient("video_generation", "video URL not found")
                            });
                    }
                    Some("failed") => {
                        return Err(StepError::transient(
                            "video_generation",
                            format!(
                                "generation failed: {}",
                                generation.failure_reason.unwrap_or_default()
                            ),
                        ));
                    }
                    state => debug!("⏳ Generation {} is {:?} ({}/{})", generation_id, state, attempt, self.max_polls),
                },
                Err(e) if attempt == self.max_polls => return Err(e),
                Err(e) => warn!("Polling generation {} failed: {}", generation_id, e),
            }
            tokio::time::sleep(self.poll_interval).await;
        }

        Err(StepError::transient(
            "video_generation",
            format!("generation {} did not finish after {} polls", generation_id, self.max_polls),
        ))
    }
}

#[async_trait]
impl VideoGenerator for LumaVideoClient {
    async fn generate_video(&self, request: &VideoRequest) -> Result<String, StepError> {
        debug!("Generating video: {:?}", request);
        let generation_id = self.submit(request).await?;
        info!("🎬 Submitted video generation {}", generation_id);
        let url = self.poll(&generation_id).await?;
        info!("✅ Video generation {} completed", generation_id);
        Ok(url)
    }
}
