// Scene processor - advances one scene through image → upload → video
//
// Every sub-step is skipped when its checkpoint field is already set, and each
// newly set field is written through the job store before the next step runs.

use super::checkpoint::JobStore;
use super::progress::ProgressSink;
use super::retry::RetryPolicy;
use super::state::SceneState;
use crate::capabilities::{Capabilities, VideoRequest};
use crate::error::{SceneError, StepError};
use crate::media::imaging::DEFAULT_PADDING;
use crate::types::{AspectRatio, SceneContent, SceneSource};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info_span, Instrument, Level};

const STEPS: usize = 3;

/// Stable, filesystem-safe name fragment for a URL or description.
pub fn content_hash(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    hex::encode(&digest[..8])
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

pub struct SceneProcessor {
    store: Arc<JobStore>,
    caps: Capabilities,
    retry: RetryPolicy,
    aspect_ratio: AspectRatio,
    sink: Arc<dyn ProgressSink>,
}

impl SceneProcessor {
    pub fn new(
        store: Arc<JobStore>,
        caps: Capabilities,
        retry: RetryPolicy,
        aspect_ratio: AspectRatio,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            store,
            caps,
            retry,
            aspect_ratio,
            sink,
        }
    }

    /// Drive `scene` to DONE. A scene that is already DONE is left untouched
    /// and no capability is called. Failures are scoped to this scene.
    pub async fn process(&self, scene: &mut SceneState) -> Result<(), SceneError> {
        let span = info_span!(
            "scene",
            index = scene.scene_index + 1,
            kind = scene.source_scene.content.kind(),
            id = %scene.short_id(),
        );

        match self.run_steps(scene).instrument(span).await {
            Ok(()) => Ok(()),
            Err(cause) => {
                self.sink.log(
                    Level::ERROR,
                    &format!("❌ Error processing scene {}: {}", scene.id, cause),
                );
                Err(SceneError::new(&scene.id, cause))
            }
        }
    }

    async fn run_steps(&self, scene: &mut SceneState) -> Result<(), StepError> {
        if scene.is_done() {
            debug!("Scene {} already done, skipping", scene.id);
            return Ok(());
        }

        let task = format!("scene {}", scene.scene_index + 1);
        let scene_dir = self.store.scene_dir(&scene.id);
        tokio::fs::create_dir_all(&scene_dir)
            .await
            .map_err(|e| StepError::io("scene", "create scene dir", e))?;
        self.sink.progress(&task, 0, STEPS);

        if scene.image_path.is_none() {
            let source = &scene.source_scene;
            let dir = scene_dir.as_path();
            let image = self
                .retry
                .run("image", || self.acquire_image(source, dir))
                .await?;
            scene.image_path = Some(path_string(&image));
            self.persist(scene).await;
        }
        self.sink.progress(&task, 1, STEPS);

        if scene.image_url.is_none() {
            let image = self.local_image(scene)?;
            let url = self
                .retry
                .run("upload", || self.caps.storage.upload(&image))
                .await?;
            scene.image_url = Some(url);
            self.persist(scene).await;
        }
        self.sink.progress(&task, 2, STEPS);

        let clip = self.synthesize(scene, &scene_dir).await?;
        scene.final_video_path = Some(path_string(&clip));
        self.persist(scene).await;
        self.sink.progress(&task, STEPS, STEPS);
        self.sink.log(Level::INFO, &format!("✅ Scene {} done", scene.scene_index + 1));
        Ok(())
    }

    async fn acquire_image(&self, source: &SceneSource, dir: &Path) -> Result<PathBuf, StepError> {
        match &source.content {
            SceneContent::Meme { meme } => {
                let bytes = self.caps.fetcher.fetch_image(&meme.image_url).await?;
                let output = dir.join(format!("meme_{}.png", content_hash(&meme.image_url)));
                self.caps
                    .renderer
                    .normalize_image(bytes, self.aspect_ratio, DEFAULT_PADDING, &output)
                    .await
            }
            SceneContent::Twitter { twitter } => {
                let hash = content_hash(&twitter.tweet_url);
                let raw = dir.join(format!("tweet_{}_raw.png", hash));
                let captured = self.caps.tweets.capture(&twitter.tweet_url, &raw).await?;
                let bytes = tokio::fs::read(&captured)
                    .await
                    .map_err(|e| StepError::io("tweet_capture", "read screenshot", e))?;
                let output = dir.join(format!("tweet_{}.png", hash));
                self.caps
                    .renderer
                    .normalize_image(bytes, self.aspect_ratio, DEFAULT_PADDING, &output)
                    .await
            }
            SceneContent::Generic { generic } => {
                let url = self
                    .caps
                    .images
                    .generate_image(&generic.image_description, self.aspect_ratio)
                    .await?;
                let bytes = self.caps.fetcher.fetch_image(&url).await?;
                let output = dir.join(format!(
                    "generic_{}.png",
                    content_hash(&generic.image_description)
                ));
                self.caps
                    .renderer
                    .normalize_image(bytes, self.aspect_ratio, 0.0, &output)
                    .await
            }
        }
    }

    /// Tweets become a still held for the scene duration. Everything else is
    /// animated from the uploaded image, downloaded, then trimmed.
    async fn synthesize(&self, scene: &mut SceneState, dir: &Path) -> Result<PathBuf, StepError> {
        let duration = scene.duration;

        if matches!(scene.source_scene.content, SceneContent::Twitter { .. }) {
            let image = self.local_image(scene)?;
            let output = dir.join("scene_video.mp4");
            return self
                .retry
                .run("static video", || {
                    self.caps.renderer.static_video(&image, duration, &output)
                })
                .await;
        }

        if scene.video_path.is_none() {
            let image_url = scene.image_url.clone().ok_or_else(|| {
                StepError::permanent("video_generation", "image URL is required to generate a video")
            })?;
            let request = VideoRequest {
                prompt: None,
                start_image_url: Some(image_url),
                end_image_url: None,
                aspect_ratio: self.aspect_ratio,
            };
            let raw = dir.join("generated_video.mp4");
            let (request, raw_path) = (&request, raw.as_path());
            let downloaded = self
                .retry
                .run("video", || async move {
                    let url = self.caps.videos.generate_video(request).await?;
                    self.caps.fetcher.download(&url, raw_path).await
                })
                .await?;
            scene.video_path = Some(path_string(&downloaded));
            self.persist(scene).await;
        }

        let raw = scene
            .video_path
            .as_deref()
            .map(PathBuf::from)
            .ok_or_else(|| StepError::permanent("clip", "no generated video to clip"))?;
        let output = dir.join("scene_clip.mp4");
        self.retry
            .run("clip", || self.caps.renderer.clip_video(&raw, duration, &output))
            .await
    }

    fn local_image(&self, scene: &SceneState) -> Result<PathBuf, StepError> {
        scene
            .image_path
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| StepError::permanent("scene", "image is required for this step"))
    }

    /// Write the scene through the store. A failed write is reported and the
    /// in-memory scene stays authoritative.
    async fn persist(&self, scene: &SceneState) {
        if let Err(e) = self.store.save_scene_state(scene).await {
            self.sink.log(
                Level::WARN,
                &format!("⚠️ Failed to checkpoint scene {}: {}", scene.id, e),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_is_stable_and_short() {
        let a = content_hash("https://memes/drake.png");
        assert_eq!(a, content_hash("https://memes/drake.png"));
        assert_ne!(a, content_hash("https://memes/other.png"));
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
