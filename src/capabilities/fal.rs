// src/capabilities/fal.rs
use super::http::{check_status, classify_request_error, json_body};
use super::ImageGenerator;
use crate::error::StepError;
use crate::types::AspectRatio;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::info;

const MODEL: &str = "fal-ai/flux/dev";

#[derive(Debug, Clone)]
pub struct FalImageClient {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct FalImage {
    url: String,
}

#[derive(Debug, Deserialize)]
struct FalResponse {
    images: Vec<FalImage>,
}

/// fal has no wide presets beyond 16:9.
pub fn image_size(aspect_ratio: AspectRatio) -> &'static str {
    match aspect_ratio {
        AspectRatio::Square => "square",
        AspectRatio::Landscape | AspectRatio::Wide => "landscape_16_9",
        AspectRatio::Portrait => "portrait_16_9",
    }
}

impl FalImageClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: "https://fal.run".to_string(),
        }
    }
}

#[async_trait]
impl ImageGenerator for FalImageClient {
    async fn generate_image(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<String, StepError> {
        let response = self
            .client
            .post(format!("{}/{}", self.base_url, MODEL))
            .header("Authorization", format!("Key {}", self.api_key))
            .json(&json!({
                "prompt": prompt,
                "image_size": image_size(aspect_ratio),
            }))
            .timeout(Duration::from_secs(180))
            .send()
            .await
            .map_err(|e| classify_request_error("image_generation", e))?;
        let response = check_status("image_generation", response).await?;
        let result: FalResponse = json_body("image_generation", response).await?;

        let url = result
            .images
            .into_iter()
            .next()
            .map(|image| image.url)
            .ok_or_else(|| StepError::permanent("image_generation", "no image in response"))?;
        info!("🖼️ Generated image {}", url);
        Ok(url)
    }
}
