// In-memory capabilities for driving the workflow without any network or ffmpeg
#![allow(dead_code)]

use async_trait::async_trait;
use lumagen::capabilities::{
    Capabilities, ImageGenerator, MediaFetcher, MemeCatalog, ObjectStorage, ScriptWriter,
    SpeechSynthesizer, StoryboardWriter, TweetCapture, VideoGenerator, VideoRequest,
};
use lumagen::error::{CaptureError, StepError};
use lumagen::media::{CaptionedClip, MediaRenderer};
use lumagen::types::{
    AspectRatio, GenericContent, MemeContent, SceneContent, SceneSource, TwitterContent,
};
use lumagen::workflow::progress::RecordingProgress;
use lumagen::workflow::retry::RetryPolicy;
use lumagen::workflow::{ExecutorConfig, JobStore, StoreRegistry, WorkflowExecutor};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const SCRIPT: &str = "Rust shipped a new release today and everyone is talking about it";

/// Two seconds of silence at 44.1 kHz, f32 mono.
pub const NARRATION_BYTES: usize = 44_100 * 4 * 2;

pub fn meme_scene() -> SceneSource {
    SceneSource {
        script_chunk: "Everyone reacted the same way".to_string(),
        content: SceneContent::Meme {
            meme: MemeContent {
                name: "drake".to_string(),
                image_url: "https://memes.test/drake.png".to_string(),
                description: "prefers one thing over another".to_string(),
            },
        },
    }
}

pub fn tweet_scene() -> SceneSource {
    SceneSource {
        script_chunk: "The core team announced it here".to_string(),
        content: SceneContent::Twitter {
            twitter: TwitterContent {
                tweet_url: "https://x.com/rustlang/status/1".to_string(),
            },
        },
    }
}

pub fn generic_scene(description: &str) -> SceneSource {
    SceneSource {
        script_chunk: format!("Picture {}", description),
        content: SceneContent::Generic {
            generic: GenericContent {
                image_description: description.to_string(),
            },
        },
    }
}

/// Every capability in one struct. Each call bumps a named counter; prompts
/// listed in `failing_images` fail permanently, and the first
/// `flaky_videos` video generations fail transiently. With `missing_tweets`
/// set, every tweet capture reports the tweet as not found.
#[derive(Default)]
pub struct FakeServices {
    pub storyboard: Mutex<Vec<SceneSource>>,
    pub failing_images: Mutex<HashSet<String>>,
    pub flaky_videos: AtomicUsize,
    pub missing_tweets: AtomicBool,
    pub composed: Mutex<Vec<Vec<CaptionedClip>>>,
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl FakeServices {
    pub fn with_scenes(scenes: Vec<SceneSource>) -> Arc<Self> {
        let fakes = Self::default();
        *fakes.storyboard.lock().unwrap() = scenes;
        Arc::new(fakes)
    }

    pub fn capabilities(self: &Arc<Self>) -> Capabilities {
        Capabilities {
            script: self.clone(),
            storyboard: self.clone(),
            memes: self.clone(),
            speech: self.clone(),
            images: self.clone(),
            videos: self.clone(),
            storage: self.clone(),
            tweets: self.clone(),
            fetcher: self.clone(),
            renderer: self.clone(),
        }
    }

    pub fn fail_image(&self, prompt: &str) {
        self.failing_images.lock().unwrap().insert(prompt.to_string());
    }

    pub fn heal_images(&self) {
        self.failing_images.lock().unwrap().clear();
    }

    pub fn calls(&self, name: &str) -> usize {
        self.calls.lock().unwrap().get(name).copied().unwrap_or(0)
    }

    pub fn snapshot(&self) -> HashMap<&'static str, usize> {
        self.calls.lock().unwrap().clone()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    fn hit(&self, name: &'static str) {
        *self.calls.lock().unwrap().entry(name).or_insert(0) += 1;
    }
}

async fn write_placeholder(path: &Path, contents: &[u8]) -> Result<PathBuf, StepError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StepError::io("fake", "create dir", e))?;
    }
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| StepError::io("fake", "write file", e))?;
    Ok(path.to_path_buf())
}

#[async_trait]
impl ScriptWriter for FakeServices {
    async fn generate_script(&self, _source: &str, _duration: u32) -> Result<String, StepError> {
        self.hit("script");
        Ok(SCRIPT.to_string())
    }
}

#[async_trait]
impl StoryboardWriter for FakeServices {
    async fn generate_storyboard(
        &self,
        _script: &str,
        _duration: u32,
        _reference: &str,
        _memes: &[MemeContent],
    ) -> Result<Vec<SceneSource>, StepError> {
        self.hit("storyboard");
        Ok(self.storyboard.lock().unwrap().clone())
    }
}

#[async_trait]
impl MemeCatalog for FakeServices {
    async fn list_memes(&self) -> Result<Vec<MemeContent>, StepError> {
        self.hit("memes");
        match meme_scene().content {
            SceneContent::Meme { meme } => Ok(vec![meme]),
            _ => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeServices {
    async fn synthesize(&self, _text: &str, _sample_rate: u32) -> Result<Vec<u8>, StepError> {
        self.hit("speech");
        Ok(vec![0u8; NARRATION_BYTES])
    }
}

#[async_trait]
impl ImageGenerator for FakeServices {
    async fn generate_image(&self, prompt: &str, _aspect: AspectRatio) -> Result<String, StepError> {
        self.hit("image");
        if self.failing_images.lock().unwrap().contains(prompt) {
            return Err(StepError::permanent("image_generation", "content policy violation"));
        }
        Ok(format!("https://images.test/{}.png", prompt.replace(' ', "_")))
    }
}

#[async_trait]
impl VideoGenerator for FakeServices {
    async fn generate_video(&self, request: &VideoRequest) -> Result<String, StepError> {
        self.hit("video");
        let flaky = self.flaky_videos.load(Ordering::SeqCst);
        if flaky > 0 {
            self.flaky_videos.store(flaky - 1, Ordering::SeqCst);
            return Err(StepError::transient("video_generation", "503 Service Unavailable"));
        }
        assert!(request.start_image_url.is_some(), "video requested without a start image");
        Ok("https://videos.test/generated.mp4".to_string())
    }
}

#[async_trait]
impl ObjectStorage for FakeServices {
    async fn upload(&self, local_path: &Path) -> Result<String, StepError> {
        self.hit("upload");
        let name = local_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(format!("https://cdn.test/{}", name))
    }
}

#[async_trait]
impl TweetCapture for FakeServices {
    async fn capture(&self, tweet_url: &str, output: &Path) -> Result<PathBuf, CaptureError> {
        self.hit("tweet");
        if self.missing_tweets.load(Ordering::SeqCst) {
            return Err(CaptureError::NotFound(tweet_url.to_string()));
        }
        write_placeholder(output, b"tweet screenshot")
            .await
            .map_err(|e| CaptureError::Failed(e.to_string()))
    }
}

#[async_trait]
impl MediaFetcher for FakeServices {
    async fn fetch_image(&self, _url: &str) -> Result<Vec<u8>, StepError> {
        self.hit("fetch_image");
        Ok(b"image bytes".to_vec())
    }

    async fn download(&self, _url: &str, output: &Path) -> Result<PathBuf, StepError> {
        self.hit("download");
        write_placeholder(output, b"generated video").await
    }
}

#[async_trait]
impl MediaRenderer for FakeServices {
    async fn normalize_image(
        &self,
        bytes: Vec<u8>,
        _aspect: AspectRatio,
        _padding: f64,
        output: &Path,
    ) -> Result<PathBuf, StepError> {
        self.hit("normalize");
        write_placeholder(output, &bytes).await
    }

    async fn static_video(&self, _image: &Path, _duration: f64, output: &Path) -> Result<PathBuf, StepError> {
        self.hit("static_video");
        write_placeholder(output, b"still clip").await
    }

    async fn clip_video(&self, _input: &Path, _duration: f64, output: &Path) -> Result<PathBuf, StepError> {
        self.hit("clip_video");
        write_placeholder(output, b"trimmed clip").await
    }

    async fn compose(
        &self,
        clips: &[CaptionedClip],
        _audio: &Path,
        _aspect: AspectRatio,
        _work_dir: &Path,
        output: &Path,
    ) -> Result<PathBuf, StepError> {
        self.hit("compose");
        self.composed.lock().unwrap().push(clips.to_vec());
        write_placeholder(output, b"final video").await
    }
}

pub struct Harness {
    pub dir: tempfile::TempDir,
    pub fakes: Arc<FakeServices>,
    pub progress: Arc<RecordingProgress>,
    pub config: ExecutorConfig,
}

impl Harness {
    pub fn new(scenes: Vec<SceneSource>) -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            fakes: FakeServices::with_scenes(scenes),
            progress: Arc::new(RecordingProgress::default()),
            config: ExecutorConfig {
                retry: RetryPolicy::immediate(3),
                ..Default::default()
            },
        }
    }

    pub fn store(&self) -> Arc<JobStore> {
        StoreRegistry::new(self.dir.path().join("state"), self.dir.path().join("output")).open("demo")
    }

    pub fn executor(&self) -> WorkflowExecutor {
        WorkflowExecutor::new(self.store(), self.fakes.capabilities(), self.config.clone())
            .with_sink(self.progress.clone())
    }
}
