// Executor - Runs the fixed stage graph with checkpointing and resumption
//
//   script → { storyboard, audio } → scene fan-out → compose
//
// A stage whose output is already present in the loaded state is skipped.
// Every stage failure is recorded in the run report instead of aborting the
// stages that don't depend on it.

use super::checkpoint::JobStore;
use super::progress::{ProgressSink, TracingProgress};
use super::retry::RetryPolicy;
use super::scene::SceneProcessor;
use super::state::{AudioTrack, JobState, SceneState, StoryboardState};
use crate::capabilities::Capabilities;
use crate::error::{PipelineError, SceneError, StageError, StepError};
use crate::media::audio::{write_wav, SAMPLE_RATE};
use crate::media::CaptionedClip;
use crate::types::AspectRatio;
use futures::future::join_all;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tracing::{info_span, Instrument, Level};

pub const DEFAULT_DURATION_SECS: u32 = 40;

/// Workflow executor config
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub scene_concurrency: usize,
    pub scene_batch_size: Option<usize>,
    pub aspect_ratio: AspectRatio,
    pub retry: RetryPolicy,
    /// Keep the scratch directory after a successful compose.
    pub debug: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            scene_concurrency: 4,
            scene_batch_size: None,
            aspect_ratio: AspectRatio::Portrait,
            retry: RetryPolicy::default(),
            debug: false,
        }
    }
}

/// Inputs for a full run.
#[derive(Debug, Clone)]
pub struct JobInput {
    pub source_text: String,
    pub duration_seconds: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StageStatus {
    /// Output already present in the loaded state.
    Skipped,
    Completed,
    Failed(String),
    /// An upstream output is missing.
    Blocked(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Ran {
    Skipped,
    Completed,
}

impl From<Result<Ran, StageError>> for StageStatus {
    fn from(result: Result<Ran, StageError>) -> Self {
        match result {
            Ok(Ran::Skipped) => StageStatus::Skipped,
            Ok(Ran::Completed) => StageStatus::Completed,
            Err(e) if e.is_blocked() => StageStatus::Blocked(e.to_string()),
            Err(e) => StageStatus::Failed(e.to_string()),
        }
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageStatus::Skipped => write!(f, "skipped (already done)"),
            StageStatus::Completed => write!(f, "completed"),
            StageStatus::Failed(reason) => write!(f, "failed: {}", reason),
            StageStatus::Blocked(reason) => write!(f, "blocked: {}", reason),
        }
    }
}

/// Stage-by-stage outcome of one run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub stages: Vec<(&'static str, StageStatus)>,
    pub scenes_total: usize,
    pub scenes_succeeded: usize,
    pub scene_failures: Vec<SceneError>,
    pub final_video_path: Option<String>,
}

impl RunReport {
    fn record(&mut self, stage: &'static str, status: StageStatus) {
        self.stages.push((stage, status));
    }

    pub fn stage(&self, name: &str) -> Option<&StageStatus> {
        self.stages.iter().find(|(s, _)| *s == name).map(|(_, status)| status)
    }

    pub fn is_success(&self) -> bool {
        self.final_video_path.is_some()
            && self
                .stages
                .iter()
                .all(|(_, s)| matches!(s, StageStatus::Skipped | StageStatus::Completed))
    }

    pub fn summary(&self) -> String {
        let mut lines: Vec<String> = self
            .stages
            .iter()
            .map(|(stage, status)| format!("  {:<10} {}", stage, status))
            .collect();
        lines.push(format!(
            "  scenes     {}/{} done, {} failed",
            self.scenes_succeeded,
            self.scenes_total,
            self.scene_failures.len()
        ));
        for failure in &self.scene_failures {
            lines.push(format!("    - {}", failure));
        }
        if let Some(path) = &self.final_video_path {
            lines.push(format!("  final video {}", path));
        }
        lines.join("\n")
    }
}

/// Workflow executor
pub struct WorkflowExecutor {
    store: Arc<JobStore>,
    caps: Capabilities,
    config: ExecutorConfig,
    sink: Arc<dyn ProgressSink>,
}

impl WorkflowExecutor {
    pub fn new(store: Arc<JobStore>, caps: Capabilities, config: ExecutorConfig) -> Self {
        Self {
            store,
            caps,
            config,
            sink: Arc::new(TracingProgress),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    fn processor(&self) -> SceneProcessor {
        SceneProcessor::new(
            self.store.clone(),
            self.caps.clone(),
            self.config.retry.clone(),
            self.config.aspect_ratio,
            self.sink.clone(),
        )
    }

    fn log(&self, level: Level, message: String) {
        self.sink.log(level, &message);
    }

    /// Save the whole document. A failed save is reported and the in-memory
    /// state stays authoritative until the next successful save.
    async fn checkpoint(&self, state: &JobState, step: &str) {
        match self.store.save(state).await {
            Ok(()) => {
                tracing::info!("💾 State saved for project {} on step {}", self.store.job_id(), step)
            }
            Err(e) => self.log(
                Level::WARN,
                format!(
                    "⚠️ Failed to save state for project {} on step {}: {}",
                    self.store.job_id(),
                    step,
                    e
                ),
            ),
        }
    }

    /// Run workflow to completion, or as far as it can get.
    pub async fn run(&self, input: &JobInput) -> RunReport {
        let span = info_span!("job", project = %self.store.job_id());
        async {
            self.log(Level::INFO, format!("🚀 Starting workflow for project {}", self.store.job_id()));
            let mut report = RunReport::default();
            let state = Mutex::new(self.store.load().await);

            let script = self
                .script_stage(&state, input)
                .instrument(info_span!("stage", name = "script"))
                .await;
            report.record("script", script.into());

            let (storyboard, audio) = tokio::join!(
                self.storyboard_stage(&state, input)
                    .instrument(info_span!("stage", name = "storyboard")),
                self.audio_stage(&state)
                    .instrument(info_span!("stage", name = "audio")),
            );
            report.record("storyboard", storyboard.into());
            report.record("audio", audio.into());

            let mut state = state.into_inner();
            let scenes = self
                .scene_stage(&mut state, &mut report)
                .instrument(info_span!("stage", name = "scenes"))
                .await;
            report.record("scenes", scenes.into());

            let compose = self
                .compose_stage(&mut state, false)
                .instrument(info_span!("stage", name = "compose"))
                .await;
            report.record("compose", compose.into());
            report.final_video_path = state.final_video_path.clone();

            let level = if report.is_success() { Level::INFO } else { Level::WARN };
            self.log(level, format!("🏁 Workflow finished\n{}", report.summary()));
            report
        }
        .instrument(span)
        .await
    }

    async fn script_stage(&self, state: &Mutex<JobState>, input: &JobInput) -> Result<Ran, StageError> {
        if state.lock().await.script.is_some() {
            self.log(Level::INFO, "⏭️ Script already generated".into());
            return Ok(Ran::Skipped);
        }
        if input.source_text.trim().is_empty() {
            return Err(StageError::MissingInput {
                stage: "script",
                missing: "source material",
            });
        }

        self.log(Level::INFO, "📝 Generating script".into());
        let script = self
            .config
            .retry
            .run("script", || {
                self.caps
                    .script
                    .generate_script(&input.source_text, input.duration_seconds)
            })
            .await
            .map_err(|source| StageError::Step { stage: "script", source })?;

        let mut guard = state.lock().await;
        guard.script = Some(script);
        self.checkpoint(&guard, "script").await;
        Ok(Ran::Completed)
    }

    async fn storyboard_stage(
        &self,
        state: &Mutex<JobState>,
        input: &JobInput,
    ) -> Result<Ran, StageError> {
        let script = {
            let guard = state.lock().await;
            if guard.storyboard.is_some() {
                self.log(Level::INFO, "⏭️ Storyboard already generated".into());
                return Ok(Ran::Skipped);
            }
            guard.script.clone()
        };
        let script = script.ok_or(StageError::MissingInput {
            stage: "storyboard",
            missing: "script",
        })?;
        if input.source_text.trim().is_empty() {
            return Err(StageError::MissingInput {
                stage: "storyboard",
                missing: "source material",
            });
        }

        self.log(Level::INFO, "🎬 Generating storyboard".into());
        let step = |source| StageError::Step { stage: "storyboard", source };
        let memes = self
            .config
            .retry
            .run("meme catalog", || self.caps.memes.list_memes())
            .await
            .map_err(step)?;
        tracing::debug!("Retrieved {} memes", memes.len());

        let sources = self
            .config
            .retry
            .run("storyboard", || {
                self.caps.storyboard.generate_storyboard(
                    &script,
                    input.duration_seconds,
                    &input.source_text,
                    &memes,
                )
            })
            .await
            .map_err(step)?;
        if sources.is_empty() {
            return Err(StageError::EmptyStoryboard);
        }

        let scenes: Vec<SceneState> = sources
            .into_iter()
            .enumerate()
            .map(|(index, source)| SceneState::new(index, source))
            .collect();
        self.log(Level::INFO, format!("🎬 Storyboard has {} scenes", scenes.len()));

        let mut guard = state.lock().await;
        guard.storyboard = Some(StoryboardState { scenes });
        self.checkpoint(&guard, "storyboard").await;
        Ok(Ran::Completed)
    }

    async fn audio_stage(&self, state: &Mutex<JobState>) -> Result<Ran, StageError> {
        let script = {
            let guard = state.lock().await;
            if guard.audio.is_some() {
                self.log(Level::INFO, "⏭️ Audio already generated".into());
                return Ok(Ran::Skipped);
            }
            guard.script.clone()
        };
        let script = script.ok_or(StageError::MissingInput {
            stage: "audio",
            missing: "script",
        })?;

        self.log(Level::INFO, "🎙️ Generating narration".into());
        let output = self.store.data_dir().join("full_audio.wav");
        let (text, path) = (script.as_str(), output.as_path());
        let duration = self
            .config
            .retry
            .run("audio", || async move {
                let raw = self.caps.speech.synthesize(text, SAMPLE_RATE).await?;
                save_waveform(raw, path).await
            })
            .await
            .map_err(|source| StageError::Step { stage: "audio", source })?;
        self.log(Level::INFO, format!("🎙️ Narration is {:.2}s", duration));

        let mut guard = state.lock().await;
        guard.audio = Some(AudioTrack {
            path: output.to_string_lossy().into_owned(),
            duration,
        });
        self.checkpoint(&guard, "audio").await;
        Ok(Ran::Completed)
    }

    async fn scene_stage(&self, state: &mut JobState, report: &mut RunReport) -> Result<Ran, StageError> {
        let storyboard = state.storyboard.as_mut().ok_or(StageError::MissingInput {
            stage: "scenes",
            missing: "storyboard",
        })?;

        let total = storyboard.scenes.len();
        report.scenes_total = total;
        let mut pending: Vec<&mut SceneState> =
            storyboard.scenes.iter_mut().filter(|s| !s.is_done()).collect();
        let mut succeeded = total - pending.len();
        report.scenes_succeeded = succeeded;
        if pending.is_empty() {
            self.log(Level::INFO, "⏭️ All scenes already processed".into());
            return Ok(Ran::Skipped);
        }

        self.log(
            Level::INFO,
            format!("🎞️ Processing {} of {} scenes", pending.len(), total),
        );
        self.sink.progress("scenes", succeeded, total);

        let processor = self.processor();
        let permits = Semaphore::new(self.config.scene_concurrency.max(1));
        let batch_size = self.config.scene_batch_size.unwrap_or(pending.len()).max(1);
        let mut failures = Vec::new();

        for batch in pending.chunks_mut(batch_size) {
            let outcomes = join_all(batch.iter_mut().map(|scene| {
                let (processor, permits) = (&processor, &permits);
                async move {
                    let _permit = permits.acquire().await.ok();
                    processor.process(scene).await
                }
            }))
            .await;

            for outcome in outcomes {
                match outcome {
                    Ok(()) => succeeded += 1,
                    Err(e) => failures.push(e),
                }
            }
            self.sink.progress("scenes", succeeded, total);
        }

        self.checkpoint(state, "scenes").await;
        report.scenes_succeeded = succeeded;
        let failed = failures.len();
        report.scene_failures = failures;

        if failed > 0 {
            self.log(
                Level::WARN,
                format!("⚠️ {} scene(s) succeeded, {} failed. Rerun to retry the failed ones.", succeeded, failed),
            );
            return Err(StageError::ScenesFailed { failed, total });
        }
        Ok(Ran::Completed)
    }

    async fn compose_stage(&self, state: &mut JobState, force: bool) -> Result<Ran, StageError> {
        if state.final_video_path.is_some() && !force {
            self.log(Level::INFO, "⏭️ Final video already created".into());
            return Ok(Ran::Skipped);
        }
        let missing = |missing| StageError::MissingInput { stage: "compose", missing };
        let storyboard = state.storyboard.as_ref().ok_or(missing("storyboard"))?;
        if state.script.is_none() {
            return Err(missing("script"));
        }
        let audio = state.audio.clone().ok_or(missing("audio"))?;
        if storyboard.scenes.is_empty() {
            return Err(StageError::EmptyStoryboard);
        }
        let pending = storyboard.pending_count();
        if pending > 0 {
            return Err(StageError::ScenesIncomplete(pending));
        }

        let clips: Vec<CaptionedClip> = storyboard
            .ordered()
            .into_iter()
            .filter_map(|scene| {
                scene.final_video_path.as_ref().map(|path| CaptionedClip {
                    path: path.into(),
                    caption: scene.source_scene.script_chunk.clone(),
                })
            })
            .collect();

        self.log(Level::INFO, format!("🎞️ Composing final video from {} clips", clips.len()));
        let output = self.store.data_dir().join("final_video.mp4");
        let work_dir = self.store.temp_dir().join("compose");
        let audio_path = Path::new(&audio.path);
        let final_path = self
            .config
            .retry
            .run("compose", || {
                self.caps.renderer.compose(
                    &clips,
                    audio_path,
                    self.config.aspect_ratio,
                    &work_dir,
                    &output,
                )
            })
            .await
            .map_err(|source| StageError::Step { stage: "compose", source })?;

        state.final_video_path = Some(final_path.to_string_lossy().into_owned());
        self.checkpoint(state, "final video").await;
        self.log(Level::INFO, format!("✅ Final video created at {}", final_path.display()));

        if !self.config.debug {
            if let Err(e) = self.store.clear_temp_dir().await {
                self.log(Level::WARN, format!("⚠️ Failed to clear temp dir: {}", e));
            }
        }
        Ok(Ran::Completed)
    }

    /// Reprocess one scene by id, then recompose when every scene is done and
    /// either this scene changed or no final video exists yet.
    pub async fn process_scene_by_id(&self, scene_id: &str) -> Result<SceneState, PipelineError> {
        let span = info_span!("process_scene", project = %self.store.job_id(), scene = %scene_id);
        async {
            let mut state = self.store.load().await;
            let storyboard = state.storyboard.as_mut().ok_or(PipelineError::NoStoryboard)?;
            let scene = storyboard
                .scenes
                .iter_mut()
                .find(|s| s.id == scene_id)
                .ok_or_else(|| PipelineError::SceneNotFound(scene_id.to_string()))?;

            let before = scene.clone();
            self.processor().process(scene).await?;
            let updated = scene.clone();
            let changed = updated != before;

            if changed {
                self.checkpoint(&state, "scene").await;
            } else {
                self.log(Level::INFO, format!("⏭️ Scene {} already done", scene_id));
            }

            if state.all_scenes_completed() && (changed || state.final_video_path.is_none()) {
                self.compose_stage(&mut state, true).await?;
            }
            Ok(updated)
        }
        .instrument(span)
        .await
    }
}

/// Wrap raw narration samples in a WAV container on the blocking pool.
async fn save_waveform(raw: Vec<u8>, path: &Path) -> Result<f64, StepError> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StepError::io("audio", "create audio dir", e))?;
        }
        write_wav(&raw, SAMPLE_RATE, &path)
    })
    .await
    .map_err(|e| StepError::transient("audio", format!("audio worker panicked: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_status_from_result() {
        assert_eq!(StageStatus::from(Ok(Ran::Skipped)), StageStatus::Skipped);
        assert!(matches!(
            StageStatus::from(Err(StageError::ScenesIncomplete(2))),
            StageStatus::Blocked(_)
        ));
        assert!(matches!(
            StageStatus::from(Err(StageError::EmptyStoryboard)),
            StageStatus::Failed(_)
        ));
    }

    #[test]
    fn test_report_success_requires_final_video() {
        let mut report = RunReport::default();
        report.record("script", StageStatus::Skipped);
        report.record("compose", StageStatus::Completed);
        assert!(!report.is_success());
        report.final_video_path = Some("final_video.mp4".into());
        assert!(report.is_success());
        report.record("scenes", StageStatus::Failed("1 of 3 scene(s) failed".into()));
        assert!(!report.is_success());
        assert!(report.summary().contains("failed"));
    }
}
