// JobState - The persisted progress document for one job
use crate::types::{words_to_duration, SceneSource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current layout of the state document.
pub const STATE_VERSION: u32 = 1;

/// Full narration track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioTrack {
    pub path: String,
    pub duration: f64,
}

/// One scene and its checkpoints. Each `Option` field, once set, is proof that
/// the matching sub-step finished and must not be redone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneState {
    pub id: String,
    pub scene_index: usize,
    /// Target clip length in seconds.
    pub duration: f64,
    pub source_scene: SceneSource,
    #[serde(default)]
    pub image_path: Option<String>,
    /// Publicly fetchable copy of `image_path`.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Downloaded, not yet clipped, generated video.
    #[serde(default)]
    pub video_path: Option<String>,
    #[serde(default)]
    pub final_video_path: Option<String>,
}

impl SceneState {
    /// Build a fresh scene with a new id and a duration estimated from the
    /// narration word count.
    pub fn new(scene_index: usize, source_scene: SceneSource) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            scene_index,
            duration: words_to_duration(source_scene.word_count()),
            source_scene,
            image_path: None,
            image_url: None,
            video_path: None,
            final_video_path: None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.final_video_path.is_some()
    }

    pub fn short_id(&self) -> &str {
        self.id.get(..8).unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryboardState {
    pub scenes: Vec<SceneState>,
}

impl StoryboardState {
    /// An empty storyboard is never complete.
    pub fn all_scenes_completed(&self) -> bool {
        !self.scenes.is_empty() && self.scenes.iter().all(SceneState::is_done)
    }

    pub fn pending_count(&self) -> usize {
        self.scenes.iter().filter(|s| !s.is_done()).count()
    }

    pub fn find(&self, scene_id: &str) -> Option<&SceneState> {
        self.scenes.iter().find(|s| s.id == scene_id)
    }

    /// Replace the scene with the same id, or append it if absent.
    pub fn upsert(&mut self, scene: SceneState) {
        match self.scenes.iter_mut().find(|s| s.id == scene.id) {
            Some(existing) => *existing = scene,
            None => self.scenes.push(scene),
        }
    }

    /// Scenes sorted by their ordinal index.
    pub fn ordered(&self) -> Vec<&SceneState> {
        let mut scenes: Vec<&SceneState> = self.scenes.iter().collect();
        scenes.sort_by_key(|s| s.scene_index);
        scenes
    }
}

/// Root document, one per job id. Fields only move from unset to set, except
/// through an explicit job clear.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobState {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub script: Option<String>,
    #[serde(default)]
    pub storyboard: Option<StoryboardState>,
    #[serde(default)]
    pub audio: Option<AudioTrack>,
    #[serde(default)]
    pub final_video_path: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_version() -> u32 {
    STATE_VERSION
}

impl Default for JobState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            script: None,
            storyboard: None,
            audio: None,
            final_video_path: None,
            updated_at: None,
        }
    }
}

impl JobState {
    pub fn all_scenes_completed(&self) -> bool {
        self.storyboard
            .as_ref()
            .map(StoryboardState::all_scenes_completed)
            .unwrap_or(false)
    }

    /// Names of the stages this document already satisfies.
    pub fn completed_steps(&self) -> Vec<&'static str> {
        let mut steps = Vec::new();
        if self.script.is_some() {
            steps.push("script");
        }
        if self.storyboard.is_some() {
            steps.push("storyboard");
        }
        if self.audio.is_some() {
            steps.push("audio");
        }
        if self.all_scenes_completed() {
            steps.push("scenes");
        }
        if self.final_video_path.is_some() {
            steps.push("final video");
        }
        steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MemeContent, SceneContent, TwitterContent};

    fn meme_source() -> SceneSource {
        SceneSource {
            script_chunk: "one two three".to_string(),
            content: SceneContent::Meme {
                meme: MemeContent {
                    name: "distracted".into(),
                    image_url: "https://memes/distracted.png".into(),
                    description: "looking elsewhere".into(),
                },
            },
        }
    }

    fn full_state() -> JobState {
        let mut scene = SceneState::new(0, meme_source());
        scene.image_path = Some("temp/scene/meme.png".into());
        scene.image_url = Some("https://cdn/meme.png".into());
        scene.video_path = Some("temp/scene/generated_video.mp4".into());
        scene.final_video_path = Some("temp/scene/scene_clip.mp4".into());

        let mut tweet = SceneState::new(
            1,
            SceneSource {
                script_chunk: "a tweet".into(),
                content: SceneContent::Twitter {
                    twitter: TwitterContent {
                        tweet_url: "https://x.com/a/status/1".into(),
                    },
                },
            },
        );
        tweet.image_path = Some(String::new());
        tweet.final_video_path = Some("temp/tweet/scene_video.mp4".into());

        JobState {
            version: STATE_VERSION,
            script: Some("the script".into()),
            storyboard: Some(StoryboardState {
                scenes: vec![scene, tweet],
            }),
            audio: Some(AudioTrack {
                path: "temp/full_audio.wav".into(),
                duration: 12.5,
            }),
            final_video_path: Some("final_video.mp4".into()),
            updated_at: Some(Utc::now()),
        }
    }

    #[test]
    fn test_round_trip_keeps_every_field() {
        let state = full_state();
        let json = serde_json::to_string_pretty(&state).unwrap();
        let decoded: JobState = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, state);
    }

    #[test]
    fn test_absent_and_empty_are_distinct() {
        let state = full_state();
        let json = serde_json::to_value(&state).unwrap();
        let tweet = &json["storyboard"]["scenes"][1];
        assert_eq!(tweet["image_path"], serde_json::json!(""));
        assert!(tweet["image_url"].is_null());

        let decoded: JobState = serde_json::from_value(json).unwrap();
        let scenes = &decoded.storyboard.unwrap().scenes;
        assert_eq!(scenes[1].image_path.as_deref(), Some(""));
        assert_eq!(scenes[1].image_url, None);
    }

    #[test]
    fn test_empty_document_loads_as_default() {
        let decoded: JobState = serde_json::from_str("{}").unwrap();
        assert_eq!(decoded, JobState::default());
        assert!(decoded.completed_steps().is_empty());
    }

    #[test]
    fn test_new_scene_duration_follows_word_count() {
        let scene = SceneState::new(3, meme_source());
        assert_eq!(scene.scene_index, 3);
        assert!((scene.duration - 3.0 / 2.7).abs() < 1e-9);
        assert!(!scene.is_done());
        assert_eq!(scene.short_id().len(), 8);
    }

    #[test]
    fn test_upsert_replaces_by_id_or_appends() {
        let mut board = StoryboardState {
            scenes: vec![SceneState::new(0, meme_source())],
        };
        let mut updated = board.scenes[0].clone();
        updated.image_path = Some("img.png".into());
        board.upsert(updated);
        assert_eq!(board.scenes.len(), 1);
        assert_eq!(board.scenes[0].image_path.as_deref(), Some("img.png"));

        board.upsert(SceneState::new(1, meme_source()));
        assert_eq!(board.scenes.len(), 2);
    }

    #[test]
    fn test_empty_storyboard_is_not_completed() {
        let mut board = StoryboardState { scenes: Vec::new() };
        assert!(!board.all_scenes_completed());

        let mut scene = SceneState::new(0, meme_source());
        scene.final_video_path = Some("clip.mp4".into());
        board.upsert(scene);
        assert!(board.all_scenes_completed());
    }

    #[test]
    fn test_ordered_sorts_by_index() {
        let board = StoryboardState {
            scenes: vec![SceneState::new(2, meme_source()), SceneState::new(0, meme_source())],
        };
        let indices: Vec<usize> = board.ordered().iter().map(|s| s.scene_index).collect();
        assert_eq!(indices, vec![0, 2]);
    }
}
