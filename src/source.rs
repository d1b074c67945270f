// src/source.rs - Source material loading and caching
//! Resolves the `--source` argument (URL, file path or inline text) into
//! markdown-ish text and caches it per project so reruns see the same input.

use regex::Regex;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("error loading content from URL {url}: {message}")]
    Fetch { url: String, message: String },
    #[error("error reading source file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("error caching source at {path}: {source}")]
    Cache {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

struct HtmlPatterns {
    hidden: Regex,
    link: Regex,
    breaks: Regex,
    tags: Regex,
    blank_lines: Regex,
}

fn patterns() -> Option<&'static HtmlPatterns> {
    static PATTERNS: OnceLock<Option<HtmlPatterns>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| {
            Some(HtmlPatterns {
                hidden: Regex::new(r"(?is)<(script|style|noscript|head)[^>]*>.*?</(script|style|noscript|head)>").ok()?,
                link: Regex::new(r#"(?is)<a\s[^>]*href\s*=\s*["']([^"']+)["'][^>]*>(.*?)</a>"#).ok()?,
                breaks: Regex::new(r"(?i)<br\s*/?>|</(p|div|li|h[1-6]|tr|blockquote|section|article)>").ok()?,
                tags: Regex::new(r"(?s)<[^>]+>").ok()?,
                blank_lines: Regex::new(r"\n[ \t]*(\n[ \t]*)+").ok()?,
            })
        })
        .as_ref()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

/// Reduce an HTML page to readable text, keeping link targets inline so URLs
/// (tweets in particular) survive.
pub fn html_to_text(html: &str) -> String {
    let Some(p) = patterns() else {
        return html.to_string();
    };
    let text = p.hidden.replace_all(html, "");
    let text = p.link.replace_all(&text, "[$2]($1)");
    let text = p.breaks.replace_all(&text, "\n");
    let text = p.tags.replace_all(&text, "");
    let text = decode_entities(&text);
    let text = p.blank_lines.replace_all(&text, "\n\n");
    text.trim().to_string()
}

#[derive(Debug, Clone)]
pub struct SourceLoader {
    client: Client,
    source_dir: PathBuf,
}

impl SourceLoader {
    pub fn new(source_dir: impl Into<PathBuf>) -> Self {
        Self {
            client: Client::new(),
            source_dir: source_dir.into(),
        }
    }

    pub fn cache_path(&self, project: &str) -> PathBuf {
        self.source_dir.join(format!("{}.md", project))
    }

    /// Load `source` for `project`. A cached copy wins unless `overwrite`.
    pub async fn load(
        &self,
        project: &str,
        source: &str,
        overwrite: bool,
    ) -> Result<(String, PathBuf), SourceError> {
        let cache = self.cache_path(project);
        if !overwrite {
            if let Ok(content) = tokio::fs::read_to_string(&cache).await {
                info!("📄 Content already exists at {}, loading from cache", cache.display());
                return Ok((content, cache));
            }
        }

        let content = if source.starts_with("http://") || source.starts_with("https://") {
            self.load_url(source).await?
        } else if tokio::fs::metadata(source).await.map(|m| m.is_file()).unwrap_or(false) {
            tokio::fs::read_to_string(source)
                .await
                .map_err(|e| SourceError::Read {
                    path: PathBuf::from(source),
                    source: e,
                })?
        } else {
            source.to_string()
        };

        self.write_cache(&cache, &content).await?;
        info!("📄 Loaded source and saved to {}", cache.display());
        Ok((content, cache))
    }

    async fn load_url(&self, url: &str) -> Result<String, SourceError> {
        let fetch_err = |message: String| SourceError::Fetch {
            url: url.to_string(),
            message,
        };
        let response = self
            .client
            .get(url)
            .timeout(Duration::from_secs(60))
            .send()
            .await
            .map_err(|e| fetch_err(e.to_string()))?;
        if !response.status().is_success() {
            return Err(fetch_err(format!("HTTP {}", response.status())));
        }
        let html = response.text().await.map_err(|e| fetch_err(e.to_string()))?;
        Ok(html_to_text(&html))
    }

    async fn write_cache(&self, cache: &Path, content: &str) -> Result<(), SourceError> {
        let cache_err = |e| SourceError::Cache {
            path: cache.to_path_buf(),
            source: e,
        };
        if let Some(parent) = cache.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(cache_err)?;
        }
        tokio::fs::write(cache, content).await.map_err(cache_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_to_text_keeps_links_and_drops_scripts() {
        let html = r#"<html><head><title>x</title></head><body>
            <script>var a = 1;</script>
            <h1>Big &amp; news</h1>
            <p>See <a href="https://x.com/user/status/1">this tweet</a>.</p>
        </body></html>"#;
        let text = html_to_text(html);
        assert!(text.contains("Big & news"));
        assert!(text.contains("[this tweet](https://x.com/user/status/1)"));
        assert!(!text.contains("var a"));
        assert!(!text.contains('<'));
    }

    #[tokio::test]
    async fn test_inline_text_is_cached_and_reused() {
        let dir = tempfile::tempdir().unwrap();
        let loader = SourceLoader::new(dir.path());

        let (content, path) = loader.load("demo", "# Inline notes", false).await.unwrap();
        assert_eq!(content, "# Inline notes");
        assert_eq!(path, dir.path().join("demo.md"));

        let (cached, _) = loader.load("demo", "something else", false).await.unwrap();
        assert_eq!(cached, "# Inline notes");

        let (fresh, _) = loader.load("demo", "something else", true).await.unwrap();
        assert_eq!(fresh, "something else");
    }

    #[tokio::test]
    async fn test_file_source_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.md");
        tokio::fs::write(&file, "from a file").await.unwrap();

        let loader = SourceLoader::new(dir.path().join("cache"));
        let (content, _) = loader
            .load("proj", file.to_str().unwrap(), false)
            .await
            .unwrap();
        assert_eq!(content, "from a file");
    }
}
