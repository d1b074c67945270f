// External capabilities - narrow contracts for every service the pipeline calls
//
// The workflow only sees these traits. Concrete HTTP clients live in the
// sibling modules and are wired together by `Capabilities::from_config`.

pub mod airtable;
pub mod cartesia;
pub mod fal;
pub mod http;
pub mod luma;
pub mod openai;
pub mod prompts;
pub mod storage;
pub mod tweet;

use crate::config::PipelineConfig;
use crate::error::{CaptureError, StepError};
use crate::media::{FfmpegRenderer, MediaRenderer};
use crate::types::{AspectRatio, MemeContent, SceneSource};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[async_trait]
pub trait ScriptWriter: Send + Sync {
    async fn generate_script(
        &self,
        source_text: &str,
        duration_seconds: u32,
    ) -> Result<String, StepError>;
}

#[async_trait]
pub trait StoryboardWriter: Send + Sync {
    /// Ordered scene descriptors for the script.
    async fn generate_storyboard(
        &self,
        script: &str,
        duration_seconds: u32,
        reference_material: &str,
        memes: &[MemeContent],
    ) -> Result<Vec<SceneSource>, StepError>;
}

#[async_trait]
pub trait MemeCatalog: Send + Sync {
    /// Entries without an image URL are excluded.
    async fn list_memes(&self) -> Result<Vec<MemeContent>, StepError>;
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Raw little-endian f32 mono samples at `sample_rate`.
    async fn synthesize(&self, text: &str, sample_rate: u32) -> Result<Vec<u8>, StepError>;
}

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// URL of the generated image.
    async fn generate_image(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<String, StepError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoRequest {
    pub prompt: Option<String>,
    pub start_image_url: Option<String>,
    pub end_image_url: Option<String>,
    pub aspect_ratio: AspectRatio,
}

#[async_trait]
pub trait VideoGenerator: Send + Sync {
    /// Submit, poll until the remote job settles, and return the video URL.
    async fn generate_video(&self, request: &VideoRequest) -> Result<String, StepError>;
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Upload a local file and return its public URL.
    async fn upload(&self, local_path: &Path) -> Result<String, StepError>;
}

#[async_trait]
pub trait TweetCapture: Send + Sync {
    async fn capture(&self, tweet_url: &str, output: &Path) -> Result<PathBuf, CaptureError>;
}

#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Fetch an image and return its encoded bytes.
    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, StepError>;
    /// Stream a remote file to `output`.
    async fn download(&self, url: &str, output: &Path) -> Result<PathBuf, StepError>;
}

/// Every collaborator the scheduler and scene processor need.
#[derive(Clone)]
pub struct Capabilities {
    pub script: Arc<dyn ScriptWriter>,
    pub storyboard: Arc<dyn StoryboardWriter>,
    pub memes: Arc<dyn MemeCatalog>,
    pub speech: Arc<dyn SpeechSynthesizer>,
    pub images: Arc<dyn ImageGenerator>,
    pub videos: Arc<dyn VideoGenerator>,
    pub storage: Arc<dyn ObjectStorage>,
    pub tweets: Arc<dyn TweetCapture>,
    pub fetcher: Arc<dyn MediaFetcher>,
    pub renderer: Arc<dyn MediaRenderer>,
}

fn required_env(name: &str, missing: &mut Vec<String>) -> String {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => {
            missing.push(name.to_string());
            String::new()
        }
    }
}

impl Capabilities {
    /// Build the production clients from environment credentials.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, String> {
        let mut missing = Vec::new();
        let openai_key = required_env("OPENAI_API_KEY", &mut missing);
        let cartesia_key = required_env("CARTESIA_API_KEY", &mut missing);
        let fal_key = required_env("FAL_KEY", &mut missing);
        let luma_key = required_env("LUMAAI_API_KEY", &mut missing);
        let airtable_key = required_env("AIRTABLE_API_KEY", &mut missing);
        let upload_url = required_env("STORAGE_UPLOAD_URL", &mut missing);
        let public_url = required_env("STORAGE_PUBLIC_URL", &mut missing);

        if !missing.is_empty() {
            return Err(format!("Missing credentials: {}", missing.join(", ")));
        }

        let text_model = Arc::new(openai::OpenAiTextModel::new(openai_key));
        let airtable_base =
            std::env::var("AIRTABLE_BASE_ID").unwrap_or_else(|_| "appi0R6F1ckhy8JpZ".to_string());
        let airtable_table = std::env::var("AIRTABLE_TABLE").unwrap_or_else(|_| "table1".to_string());

        Ok(Self {
            script: text_model.clone(),
            storyboard: text_model,
            memes: Arc::new(airtable::AirtableMemeCatalog::new(
                airtable_key,
                airtable_base,
                airtable_table,
            )),
            speech: Arc::new(cartesia::CartesiaTts::new(cartesia_key)),
            images: Arc::new(fal::FalImageClient::new(fal_key)),
            videos: Arc::new(luma::LumaVideoClient::new(luma_key)),
            storage: Arc::new(storage::HttpObjectStorage::new(
                upload_url,
                public_url,
                std::env::var("STORAGE_TOKEN").ok(),
            )),
            tweets: Arc::new(tweet::CommandTweetCapture::new(config.tweet_capture_bin.clone())),
            fetcher: Arc::new(http::HttpMediaFetcher::new()),
            renderer: Arc::new(FfmpegRenderer::new(
                config.ffmpeg_path.clone(),
                config.media_workers,
            )),
        })
    }
}
