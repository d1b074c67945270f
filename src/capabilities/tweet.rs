// Tweet screenshot capture using the tweetcapture command-line tool
use super::TweetCapture;
use crate::error::CaptureError;
use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;
use tokio::process::Command;

fn tweet_url_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"^https?://(www\.|mobile\.)?(twitter|x)\.com/[A-Za-z0-9_]{1,15}/status/\d+").ok()
        })
        .as_ref()
}

pub fn is_tweet_url(url: &str) -> bool {
    tweet_url_pattern().is_some_and(|pattern| pattern.is_match(url.trim()))
}

/// Map tool output onto a capture outcome.
pub fn classify_failure(tweet_url: &str, output: &str) -> CaptureError {
    let lowered = output.to_lowercase();
    if lowered.contains("tweets not found") || lowered.contains("tweet not found") {
        CaptureError::NotFound(tweet_url.to_string())
    } else {
        CaptureError::Failed(output.trim().to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CommandTweetCapture {
    binary: String,
}

impl CommandTweetCapture {
    pub fn new(binary: String) -> Self {
        Self { binary }
    }
}

#[async_trait]
impl TweetCapture for CommandTweetCapture {
    async fn capture(&self, tweet_url: &str, output: &Path) -> Result<PathBuf, CaptureError> {
        if !is_tweet_url(tweet_url) {
            return Err(CaptureError::InvalidUrl(tweet_url.to_string()));
        }
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CaptureError::Failed(format!("create output dir: {}", e)))?;
        }

        tracing::debug!("📸 Capturing tweet {}", tweet_url);
        let result = Command::new(&self.binary)
            .arg(tweet_url)
            .arg("-o")
            .arg(output)
            .arg("--overwrite")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                CaptureError::Failed(format!(
                    "Failed to execute {}: {}. Make sure it is installed.",
                    self.binary, e
                ))
            })?;

        let combined = format!(
            "{}\n{}",
            String::from_utf8_lossy(&result.stdout),
            String::from_utf8_lossy(&result.stderr)
        );
        if !result.status.success() {
            tracing::error!("tweet capture error: {}", combined.trim());
            return Err(classify_failure(tweet_url, &combined));
        }
        if !tokio::fs::try_exists(output).await.unwrap_or(false) {
            return Err(classify_failure(tweet_url, &combined));
        }

        Ok(output.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tweet_url_validation() {
        assert!(is_tweet_url("https://x.com/elonmusk/status/1234567890"));
        assert!(is_tweet_url("https://twitter.com/some_user/status/42?s=20"));
        assert!(!is_tweet_url("https://example.com/some_user/status/42"));
        assert!(!is_tweet_url("https://x.com/some_user"));
    }

    #[test]
    fn test_not_found_output_is_classified() {
        assert_eq!(
            classify_failure("u", "Error: Tweets not found"),
            CaptureError::NotFound("u".into())
        );
        assert!(matches!(classify_failure("u", "chrome crashed"), CaptureError::Failed(_)));
    }
}
