// Media rendering - local CPU-bound steps behind an async seam
//
// Image decoding and ffmpeg invocations block, so `FfmpegRenderer` runs each
// one on the blocking pool, gated by a semaphore sized from configuration.

pub mod audio;
pub mod imaging;
pub mod video;

use crate::error::StepError;
use crate::types::AspectRatio;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::info;

/// A finished scene clip and the caption burned into it.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionedClip {
    pub path: PathBuf,
    pub caption: String,
}

#[async_trait]
pub trait MediaRenderer: Send + Sync {
    /// Decode `bytes`, fit them into the frame with `padding`, and write a PNG.
    async fn normalize_image(
        &self,
        bytes: Vec<u8>,
        aspect_ratio: AspectRatio,
        padding: f64,
        output: &Path,
    ) -> Result<PathBuf, StepError>;

    async fn static_video(&self, image: &Path, duration: f64, output: &Path)
        -> Result<PathBuf, StepError>;

    async fn clip_video(&self, input: &Path, duration: f64, output: &Path)
        -> Result<PathBuf, StepError>;

    /// Caption every clip, concatenate them in order, and add the narration.
    async fn compose(
        &self,
        clips: &[CaptionedClip],
        audio: &Path,
        aspect_ratio: AspectRatio,
        work_dir: &Path,
        output: &Path,
    ) -> Result<PathBuf, StepError>;
}

#[derive(Debug, Clone)]
pub struct FfmpegRenderer {
    ffmpeg: String,
    permits: Arc<Semaphore>,
}

impl FfmpegRenderer {
    pub fn new(ffmpeg: String, workers: usize) -> Self {
        Self {
            ffmpeg,
            permits: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    async fn blocking<T, F>(&self, job: F) -> Result<T, StepError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, StepError> + Send + 'static,
    {
        let _permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| StepError::permanent("media", format!("media pool closed: {}", e)))?;
        tokio::task::spawn_blocking(job)
            .await
            .map_err(|e| StepError::transient("media", format!("media worker panicked: {}", e)))?
    }
}

#[async_trait]
impl MediaRenderer for FfmpegRenderer {
    async fn normalize_image(
        &self,
        bytes: Vec<u8>,
        aspect_ratio: AspectRatio,
        padding: f64,
        output: &Path,
    ) -> Result<PathBuf, StepError> {
        let output = output.to_path_buf();
        self.blocking(move || {
            imaging::normalize_to_file(&bytes, aspect_ratio, padding, &output)?;
            Ok(output)
        })
        .await
    }

    async fn static_video(
        &self,
        image: &Path,
        duration: f64,
        output: &Path,
    ) -> Result<PathBuf, StepError> {
        let args = video::static_video_args(image, duration, output);
        let ffmpeg = self.ffmpeg.clone();
        let output = output.to_path_buf();
        self.blocking(move || {
            video::run_ffmpeg(&ffmpeg, &args)?;
            Ok(output)
        })
        .await
    }

    async fn clip_video(
        &self,
        input: &Path,
        duration: f64,
        output: &Path,
    ) -> Result<PathBuf, StepError> {
        let args = video::clip_video_args(input, duration, output);
        let ffmpeg = self.ffmpeg.clone();
        let output = output.to_path_buf();
        self.blocking(move || {
            video::run_ffmpeg(&ffmpeg, &args)?;
            Ok(output)
        })
        .await
    }

    async fn compose(
        &self,
        clips: &[CaptionedClip],
        audio: &Path,
        aspect_ratio: AspectRatio,
        work_dir: &Path,
        output: &Path,
    ) -> Result<PathBuf, StepError> {
        if clips.is_empty() {
            return Err(StepError::permanent("compose", "no clips to compose"));
        }

        let clips = clips.to_vec();
        let audio = audio.to_path_buf();
        let work_dir = work_dir.to_path_buf();
        let output = output.to_path_buf();
        let ffmpeg = self.ffmpeg.clone();
        let frame = aspect_ratio.target_resolution();
        info!("🎞️ Composing {} clips into {}", clips.len(), output.display());

        self.blocking(move || {
            std::fs::create_dir_all(&work_dir)
                .map_err(|e| StepError::io("compose", "create work dir", e))?;
            let line_chars = video::caption_line_chars(frame.0);

            let mut captioned = Vec::with_capacity(clips.len());
            for (i, clip) in clips.iter().enumerate() {
                let caption_file = work_dir.join(format!("caption_{:03}.txt", i));
                std::fs::write(&caption_file, video::wrap_caption(&clip.caption, line_chars))
                    .map_err(|e| StepError::io("compose", "write caption", e))?;
                let target = work_dir.join(format!("captioned_{:03}.mp4", i));
                video::run_ffmpeg(
                    &ffmpeg,
                    &video::caption_clip_args(&clip.path, &caption_file, frame, &target),
                )?;
                captioned.push(target);
            }

            let list_file = work_dir.join("concat.txt");
            std::fs::write(&list_file, video::concat_list(&captioned))
                .map_err(|e| StepError::io("compose", "write concat list", e))?;
            if let Some(parent) = output.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StepError::io("compose", "create output dir", e))?;
            }
            video::run_ffmpeg(&ffmpeg, &video::concat_with_audio_args(&list_file, &audio, &output))?;
            Ok(output)
        })
        .await
    }
}
