// src/error.rs
//! Error taxonomy for the pipeline.
//!
//! Capabilities report a [`StepError`], which is the tagged outcome the retry
//! policy inspects. Everything above a single step wraps it with scope: a scene
//! ([`SceneError`]), a stage ([`StageError`]) or the state document
//! ([`PersistenceError`]).

use std::path::PathBuf;
use thiserror::Error;

/// Failure of one external call or local media step.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StepError {
    /// Network, timeout or rate-limit failure. Retried within budget.
    #[error("{capability}: {message} (transient)")]
    Transient {
        capability: &'static str,
        message: String,
    },
    /// Invalid input or missing content. Never retried.
    #[error("{capability}: {message} (permanent)")]
    Permanent {
        capability: &'static str,
        message: String,
    },
}

impl StepError {
    pub fn transient(capability: &'static str, message: impl Into<String>) -> Self {
        StepError::Transient {
            capability,
            message: message.into(),
        }
    }

    pub fn permanent(capability: &'static str, message: impl Into<String>) -> Self {
        StepError::Permanent {
            capability,
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, StepError::Transient { .. })
    }

    pub fn capability(&self) -> &'static str {
        match self {
            StepError::Transient { capability, .. } | StepError::Permanent { capability, .. } => {
                capability
            }
        }
    }

    /// Local filesystem failures are treated as transient: a full disk or a
    /// locked file may clear up on the next attempt.
    pub fn io(capability: &'static str, context: &str, err: std::io::Error) -> Self {
        StepError::transient(capability, format!("{}: {}", context, err))
    }
}

/// Outcome of the tweet screenshot capability.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CaptureError {
    #[error("tweet not found: {0}")]
    NotFound(String),
    #[error("invalid tweet URL: {0}")]
    InvalidUrl(String),
    #[error("tweet capture failed: {0}")]
    Failed(String),
}

impl From<CaptureError> for StepError {
    fn from(err: CaptureError) -> Self {
        match err {
            CaptureError::NotFound(_) | CaptureError::InvalidUrl(_) => {
                StepError::permanent("tweet_capture", err.to_string())
            }
            CaptureError::Failed(_) => StepError::transient("tweet_capture", err.to_string()),
        }
    }
}

/// A step error that survived the retry budget, scoped to one scene.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("error processing scene {scene_id}: {cause}")]
pub struct SceneError {
    pub scene_id: String,
    #[source]
    pub cause: StepError,
}

impl SceneError {
    pub fn new(scene_id: &str, cause: StepError) -> Self {
        Self {
            scene_id: scene_id.to_string(),
            cause,
        }
    }
}

/// Failure of one top-level stage. Fatal to that stage only.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StageError {
    #[error("can't run {stage} without {missing}")]
    MissingInput {
        stage: &'static str,
        missing: &'static str,
    },
    #[error("{stage} failed: {source}")]
    Step {
        stage: &'static str,
        #[source]
        source: StepError,
    },
    #[error("storyboard generation returned no scenes")]
    EmptyStoryboard,
    #[error("{0} scene(s) are not done yet")]
    ScenesIncomplete(usize),
    #[error("{failed} of {total} scene(s) failed")]
    ScenesFailed { failed: usize, total: usize },
}

impl StageError {
    /// A stage that could not start because an upstream output is missing.
    pub fn is_blocked(&self) -> bool {
        matches!(
            self,
            StageError::MissingInput { .. } | StageError::ScenesIncomplete(_)
        )
    }
}

/// Failure to read or write the job state document.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("state file I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("state serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("can't save a scene without a storyboard")]
    MissingStoryboard,
}

impl PersistenceError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PersistenceError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors surfaced by the single-scene reprocessing entry point.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("can't process a scene without a storyboard")]
    NoStoryboard,
    #[error("scene with id {0} not found in storyboard")]
    SceneNotFound(String),
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error(transparent)]
    Stage(#[from] StageError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_not_found_and_invalid_url_are_permanent() {
        let not_found: StepError = CaptureError::NotFound("https://x.com/a/status/1".into()).into();
        let invalid: StepError = CaptureError::InvalidUrl("nope".into()).into();
        let other: StepError = CaptureError::Failed("chrome crashed".into()).into();

        assert!(!not_found.is_transient());
        assert!(!invalid.is_transient());
        assert!(other.is_transient());
        assert_eq!(other.capability(), "tweet_capture");
    }

    #[test]
    fn test_scene_error_keeps_scene_id_and_cause() {
        let cause = StepError::permanent("image_fetch", "404");
        let err = SceneError::new("abc", cause.clone());
        assert_eq!(err.scene_id, "abc");
        assert_eq!(err.cause, cause);
        assert!(err.to_string().contains("abc"));
    }
}
