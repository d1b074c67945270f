// types.rs - Content descriptors shared by the capabilities and the workflow
use crate::error::StepError;
use serde::{Deserialize, Serialize};

/// Average narration speed used to size scripts and scenes.
pub const WORDS_PER_SECOND: f64 = 2.7;

/// Target frame width; height follows from the aspect ratio.
pub const TARGET_WIDTH: u32 = 720;

/// Convert a duration into an estimated narration word count.
pub fn duration_to_words(duration_seconds: u32) -> usize {
    (duration_seconds as f64 * WORDS_PER_SECOND) as usize
}

/// Convert a narration word count into an estimated duration in seconds.
pub fn words_to_duration(num_words: usize) -> f64 {
    num_words as f64 / WORDS_PER_SECOND
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "21:9")]
    Wide,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
            AspectRatio::Wide => "21:9",
        }
    }

    /// Output frame for this ratio at [`TARGET_WIDTH`].
    pub fn target_resolution(&self) -> (u32, u32) {
        let (w, h) = match self {
            AspectRatio::Square => (1, 1),
            AspectRatio::Landscape => (16, 9),
            AspectRatio::Portrait => (9, 16),
            AspectRatio::Wide => (21, 9),
        };
        (TARGET_WIDTH, TARGET_WIDTH * h / w)
    }
}

/// Meme catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemeContent {
    pub name: String,
    pub image_url: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwitterContent {
    pub tweet_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericContent {
    pub image_description: String,
}

/// Visual content of a scene. The `type` tag and its payload travel together,
/// so a twitter scene can never carry a meme payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SceneContent {
    Meme { meme: MemeContent },
    Twitter { twitter: TwitterContent },
    Generic { generic: GenericContent },
}

impl SceneContent {
    pub fn kind(&self) -> &'static str {
        match self {
            SceneContent::Meme { .. } => "meme",
            SceneContent::Twitter { .. } => "twitter",
            SceneContent::Generic { .. } => "generic",
        }
    }
}

/// One storyboard entry: narration chunk plus its visual content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSource {
    pub script_chunk: String,
    #[serde(flatten)]
    pub content: SceneContent,
}

impl SceneSource {
    pub fn word_count(&self) -> usize {
        self.script_chunk.split_whitespace().count()
    }
}

/// Scene as emitted by the storyboard model: every payload optional, with a
/// free-form `type` string. Converted into [`SceneSource`] before use.
#[derive(Debug, Clone, Deserialize)]
pub struct SceneDescriptor {
    #[serde(rename = "type")]
    pub kind: String,
    pub script_chunk: String,
    #[serde(default)]
    pub meme: Option<MemeContent>,
    #[serde(default)]
    pub twitter: Option<TwitterContent>,
    #[serde(default)]
    pub generic: Option<GenericContent>,
}

impl TryFrom<SceneDescriptor> for SceneSource {
    type Error = StepError;

    fn try_from(descriptor: SceneDescriptor) -> Result<Self, Self::Error> {
        let content = match descriptor.kind.as_str() {
            "meme" => descriptor.meme.map(|meme| SceneContent::Meme { meme }),
            "twitter" => descriptor
                .twitter
                .map(|twitter| SceneContent::Twitter { twitter }),
            "generic" => descriptor
                .generic
                .map(|generic| SceneContent::Generic { generic }),
            other => {
                return Err(StepError::permanent(
                    "storyboard",
                    format!("unknown scene type '{}'", other),
                ))
            }
        };

        let content = content.ok_or_else(|| {
            StepError::permanent(
                "storyboard",
                format!("{} scene has no {} content", descriptor.kind, descriptor.kind),
            )
        })?;

        Ok(SceneSource {
            script_chunk: descriptor.script_chunk,
            content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(kind: &str) -> SceneDescriptor {
        SceneDescriptor {
            kind: kind.to_string(),
            script_chunk: "four words right here".to_string(),
            meme: None,
            twitter: None,
            generic: None,
        }
    }

    #[test]
    fn test_descriptor_with_matching_payload_converts() {
        let mut d = descriptor("twitter");
        d.twitter = Some(TwitterContent {
            tweet_url: "https://x.com/a/status/1".into(),
        });
        let source = SceneSource::try_from(d).unwrap();
        assert_eq!(source.content.kind(), "twitter");
        assert_eq!(source.word_count(), 4);
    }

    #[test]
    fn test_descriptor_with_mismatched_payload_is_rejected() {
        let mut d = descriptor("twitter");
        d.meme = Some(MemeContent {
            name: "drake".into(),
            image_url: "https://img/drake.png".into(),
            description: "prefers".into(),
        });
        let err = SceneSource::try_from(d).unwrap_err();
        assert!(!err.is_transient());
    }

    #[test]
    fn test_unknown_scene_type_is_rejected() {
        assert!(SceneSource::try_from(descriptor("podcast")).is_err());
    }

    #[test]
    fn test_scene_source_json_binds_type_to_payload() {
        let json = r#"{"type":"generic","script_chunk":"hi","generic":{"image_description":"a cat"}}"#;
        let source: SceneSource = serde_json::from_str(json).unwrap();
        assert_eq!(source.content.kind(), "generic");

        let wrong = r#"{"type":"twitter","script_chunk":"hi","meme":{"name":"a","image_url":"b","description":"c"}}"#;
        assert!(serde_json::from_str::<SceneSource>(wrong).is_err());
    }

    #[test]
    fn test_word_duration_heuristics() {
        assert_eq!(duration_to_words(40), 108);
        assert!((words_to_duration(27) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_portrait_resolution() {
        assert_eq!(AspectRatio::Portrait.target_resolution(), (720, 1280));
    }
}
