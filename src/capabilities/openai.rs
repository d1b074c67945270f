// src/capabilities/openai.rs
use super::http::{check_status, classify_request_error, json_body};
use super::prompts::{script_prompt, storyboard_prompt};
use super::{ScriptWriter, StoryboardWriter};
use crate::error::StepError;
use crate::types::{MemeContent, SceneDescriptor, SceneSource};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

const DEFAULT_MODEL: &str = "gpt-4o-2024-08-06";

#[derive(Debug, Clone)]
pub struct OpenAiTextModel {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ScriptSchema {
    text: String,
}

#[derive(Debug, Deserialize)]
struct StoryboardSchema {
    scenes: Vec<SceneDescriptor>,
}

impl OpenAiTextModel {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: "https://api.openai.com/v1".to_string(),
            model: std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
        }
    }

    /// Send one user prompt and decode the JSON object the model returns.
    async fn generate<T: serde::de::DeserializeOwned>(
        &self,
        capability: &'static str,
        prompt: &str,
    ) -> Result<T, StepError> {
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": 1.0,
            "response_format": { "type": "json_object" },
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .timeout(Duration::from_secs(120))
            .send()
            .await
            .map_err(|e| classify_request_error(capability, e))?;
        let response = check_status(capability, response).await?;
        let completion: ChatCompletionResponse = json_body(capability, response).await?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| StepError::permanent(capability, "model returned no content"))?;
        debug!("{} response: {}", capability, content);

        serde_json::from_str(&content).map_err(|e| {
            StepError::permanent(capability, format!("model output did not match schema: {}", e))
        })
    }
}

#[async_trait]
impl ScriptWriter for OpenAiTextModel {
    async fn generate_script(
        &self,
        source_text: &str,
        duration_seconds: u32,
    ) -> Result<String, StepError> {
        let script: ScriptSchema = self
            .generate("script", &script_prompt(source_text, duration_seconds))
            .await?;
        info!("📝 Script generated ({} words)", script.text.split_whitespace().count());
        Ok(script.text)
    }
}

#[async_trait]
impl StoryboardWriter for OpenAiTextModel {
    async fn generate_storyboard(
        &self,
        script: &str,
        duration_seconds: u32,
        reference_material: &str,
        memes: &[MemeContent],
    ) -> Result<Vec<SceneSource>, StepError> {
        let prompt = storyboard_prompt(script, duration_seconds, reference_material, memes);
        let storyboard: StoryboardSchema = self.generate("storyboard", &prompt).await?;
        storyboard
            .scenes
            .into_iter()
            .map(SceneSource::try_from)
            .collect()
    }
}
