//! Topic and style pools
//!
//! Each pool is loaded from an optional JSON array file. A missing file,
//! a file that does not parse, or one with no usable entries silently
//! falls back to the builtin defaults.

use crate::config::PoolsConfig;
use crate::error::Result;
use rand::seq::SliceRandom;
use std::path::Path;

/// Builtin topics
pub const DEFAULT_TOPICS: [&str; 4] = ["technology", "science", "history", "creative writing"];

/// Builtin styles
pub const DEFAULT_STYLES: [&str; 4] = [
    "newspaper article",
    "blog post",
    "short story",
    "research summary",
];

/// Topic and style pools sampled for each generation cycle
#[derive(Debug, Clone)]
pub struct ContentPools {
    topics: Vec<String>,
    styles: Vec<String>,
}

impl ContentPools {
    /// Build pools from explicit lists (no fallback applied)
    pub fn new(topics: Vec<String>, styles: Vec<String>) -> Self {
        Self { topics, styles }
    }

    /// Load pools from the configured files, falling back to defaults
    pub fn load(config: &PoolsConfig) -> Self {
        let topics = load_list(&config.topics_file).unwrap_or_else(|| owned(&DEFAULT_TOPICS));
        let styles = load_list(&config.styles_file).unwrap_or_else(|| owned(&DEFAULT_STYLES));
        tracing::debug!(
            topics = topics.len(),
            styles = styles.len(),
            "Content pools loaded"
        );
        Self { topics, styles }
    }

    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    pub fn styles(&self) -> &[String] {
        &self.styles
    }

    /// Pick a uniformly random topic
    pub fn random_topic(&self) -> Option<&str> {
        self.topics
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
    }

    /// Pick a uniformly random style
    pub fn random_style(&self) -> Option<&str> {
        self.styles
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
    }
}

impl Default for ContentPools {
    fn default() -> Self {
        Self::new(owned(&DEFAULT_TOPICS), owned(&DEFAULT_STYLES))
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Read a JSON string array; `None` when absent, malformed or empty
fn load_list(path: &Path) -> Option<Vec<String>> {
    if !path.exists() {
        return None;
    }
    match read_list(path) {
        Ok(items) if !items.is_empty() => Some(items),
        Ok(_) => {
            tracing::debug!(path = %path.display(), "Pool file is empty, using defaults");
            None
        }
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Ignoring pool file");
            None
        }
    }
}

/// Read a JSON array of strings, dropping blank entries
fn read_list(path: &Path) -> Result<Vec<String>> {
    let data = std::fs::read_to_string(path)?;
    let items: Vec<String> = serde_json::from_str(&data)?;
    Ok(items
        .into_iter()
        .filter(|s| !s.trim().is_empty())
        .collect())
}
