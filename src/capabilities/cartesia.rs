// src/capabilities/cartesia.rs
use super::http::{check_status, classify_request_error};
use super::SpeechSynthesizer;
use crate::error::StepError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::info;

pub const DEFAULT_MODEL_ID: &str = "sonic-english";
pub const DEFAULT_VOICE_ID: &str = "421b3369-f63f-4b03-8980-37a44df1d4e8";
const API_VERSION: &str = "2024-06-10";

#[derive(Debug, Clone)]
pub struct CartesiaTts {
    client: Client,
    api_key: String,
    base_url: String,
    model_id: String,
    voice_id: String,
}

impl CartesiaTts {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: "https://api.cartesia.ai".to_string(),
            model_id: DEFAULT_MODEL_ID.to_string(),
            voice_id: std::env::var("CARTESIA_VOICE_ID")
                .unwrap_or_else(|_| DEFAULT_VOICE_ID.to_string()),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for CartesiaTts {
    async fn synthesize(&self, text: &str, sample_rate: u32) -> Result<Vec<u8>, StepError> {
        let body = json!({
            "model_id": self.model_id,
            "transcript": text,
            "voice": { "mode": "id", "id": self.voice_id },
            "output_format": {
                "container": "raw",
                "encoding": "pcm_f32le",
                "sample_rate": sample_rate,
            },
            "language": "en",
        });

        let response = self
            .client
            .post(format!("{}/tts/bytes", self.base_url))
            .header("X-API-Key", &self.api_key)
            .header("Cartesia-Version", API_VERSION)
            .json(&body)
            .timeout(Duration::from_secs(60))
            .send()
            .await
            .map_err(|e| classify_request_error("tts", e))?;
        let response = check_status("tts", response).await?;

        let audio = response
            .bytes()
            .await
            .map_err(|e| classify_request_error("tts", e))?;
        info!("🎙️ Synthesized {} bytes of narration", audio.len());
        Ok(audio.to_vec())
    }
}
