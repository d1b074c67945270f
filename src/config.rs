// src/config.rs - Runtime configuration read from the environment
use crate::workflow::retry::RetryPolicy;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub state_dir: PathBuf,
    pub output_dir: PathBuf,
    pub source_dir: PathBuf,
    /// Upper bound on scenes processed at the same time.
    pub scene_concurrency: usize,
    /// When set, scenes run in fixed-size batches instead of a single fan-out.
    pub scene_batch_size: Option<usize>,
    pub media_workers: usize,
    pub retry: RetryPolicy,
    pub ffmpeg_path: String,
    pub tweet_capture_bin: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from("data/state"),
            output_dir: PathBuf::from("data/output"),
            source_dir: PathBuf::from("data/source"),
            scene_concurrency: 4,
            scene_batch_size: None,
            media_workers: 4,
            retry: RetryPolicy::default(),
            ffmpeg_path: "ffmpeg".to_string(),
            tweet_capture_bin: "tweetcapture".to_string(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    match std::env::var(name).ok() {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid {}={:?}", name, raw);
                None
            }
        },
        None => None,
    }
}

impl PipelineConfig {
    /// Defaults overridden by `LUMAGEN_*`, `FFMPEG_PATH` and
    /// `TWEET_CAPTURE_BIN`. Invalid values are logged and ignored.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let retry = RetryPolicy {
            max_attempts: env_parse("LUMAGEN_RETRY_ATTEMPTS").unwrap_or(defaults.retry.max_attempts),
            initial_interval: env_parse("LUMAGEN_RETRY_INITIAL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.retry.initial_interval),
            max_interval: env_parse("LUMAGEN_RETRY_MAX_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.retry.max_interval),
        };

        Self {
            state_dir: std::env::var("LUMAGEN_STATE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.state_dir),
            output_dir: std::env::var("LUMAGEN_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            source_dir: std::env::var("LUMAGEN_SOURCE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.source_dir),
            scene_concurrency: env_parse::<usize>("LUMAGEN_SCENE_CONCURRENCY")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.scene_concurrency),
            scene_batch_size: env_parse::<usize>("LUMAGEN_SCENE_BATCH_SIZE").filter(|n| *n > 0),
            media_workers: env_parse::<usize>("LUMAGEN_MEDIA_WORKERS")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.media_workers),
            retry,
            ffmpeg_path: std::env::var("FFMPEG_PATH").unwrap_or(defaults.ffmpeg_path),
            tweet_capture_bin: std::env::var("TWEET_CAPTURE_BIN")
                .unwrap_or(defaults.tweet_capture_bin),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.state_dir, PathBuf::from("data/state"));
        assert_eq!(config.scene_concurrency, 4);
        assert_eq!(config.scene_batch_size, None);
        assert_eq!(config.retry.max_attempts, 3);
    }
}
