//! Article generation
//!
//! [`ContentGenerator`] runs research → prompt → completion for one
//! `(topic, style)` pair. Generation is total: any backend failure is
//! logged and replaced by a deterministic fallback article, tagged
//! [`Provenance::Fallback`] so callers can tell the two apart.

mod openai;

pub use openai::{CompletionBackend, OpenAiBackend};

use crate::error::Error;
use crate::prompt::build_prompt;
use crate::research::ContextSource;
use serde::Serialize;
use std::sync::Arc;

/// Label stripped from the first line when deriving a title
pub const TITLE_PREFIX: &str = "Title: ";

/// Which producer created an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Text returned by the completion backend
    Generated,
    /// Deterministic fallback text
    Fallback,
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Generated => write!(f, "generated"),
            Self::Fallback => write!(f, "fallback"),
        }
    }
}

/// One generated article
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArtifact {
    /// Full text exactly as produced; this is what gets persisted
    pub raw: String,
    /// First line with the title label stripped
    pub title: String,
    /// Remaining lines joined with `\n`
    pub body: String,
    pub provenance: Provenance,
}

impl GeneratedArtifact {
    /// Parse raw text into title and body
    pub fn new(raw: impl Into<String>, provenance: Provenance) -> Self {
        let raw = raw.into();
        let (title, body) = if raw.is_empty() {
            ("Untitled".to_string(), "No content generated".to_string())
        } else {
            let mut lines = raw.split('\n');
            let first = lines.next().unwrap_or_default();
            let title = first.strip_prefix(TITLE_PREFIX).unwrap_or(first).to_string();
            (title, lines.collect::<Vec<_>>().join("\n"))
        };
        Self {
            raw,
            title,
            body,
            provenance,
        }
    }

    /// The fallback article for `topic`
    pub fn fallback(topic: &str) -> Self {
        Self::new(fallback_content(topic), Provenance::Fallback)
    }

    pub fn is_fallback(&self) -> bool {
        self.provenance == Provenance::Fallback
    }
}

/// Fixed fallback text, parameterized only by topic
pub fn fallback_content(topic: &str) -> String {
    format!(
        "Title: Sample Article About {}\n\nThis is a sample fallback content about {}.",
        topic, topic
    )
}

/// Research + prompt + completion, with fallback on failure
pub struct ContentGenerator {
    research: Arc<dyn ContextSource>,
    backend: Arc<dyn CompletionBackend>,
    word_range: (u32, u32),
}

impl ContentGenerator {
    pub fn new(
        research: Arc<dyn ContextSource>,
        backend: Arc<dyn CompletionBackend>,
        word_range: (u32, u32),
    ) -> Self {
        Self {
            research,
            backend,
            word_range,
        }
    }

    /// Generate an article. Never fails.
    pub async fn generate(&self, topic: &str, style: &str) -> GeneratedArtifact {
        let research = self.research.research(topic).await;
        let prompt = build_prompt(topic, style, &research, self.word_range);

        match self.backend.complete(&prompt).await {
            Ok(raw) => GeneratedArtifact::new(raw, Provenance::Generated),
            Err(e) => {
                let reason = match &e {
                    Error::Api(_) => "API error",
                    Error::Timeout(_) => "timeout",
                    Error::ServiceUnavailable(_) => "service unavailable",
                    _ => "unexpected generation error",
                };
                tracing::error!(
                    topic = %topic,
                    backend = self.backend.name(),
                    error = %e,
                    "Generation failed ({}), using fallback content",
                    reason
                );
                GeneratedArtifact::fallback(topic)
            }
        }
    }
}
