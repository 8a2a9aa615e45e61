//! Research lookup
//!
//! Fetches a short context snippet for a topic from an encyclopedia
//! article. The lookup is total: every failure degrades to a templated
//! snippet, so callers always get a non-empty string.
//!
//! ```text
//! GET <base_url>/<Topic_With_Underscores>
//!   ├─ 2xx, container found   → "Wikipedia Context: <text…>"    (LiveExtract)
//!   ├─ 2xx, no container      → "Basic information about <t>"   (BasicInfo)
//!   ├─ network / non-2xx      → "General knowledge about <t>"   (GeneralKnowledge)
//!   └─ anything else          → "Background information about <t>" (BackgroundInfo)
//! ```

use crate::config::ResearchConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE};
use scraper::{Html, Selector};
use std::time::Duration;

/// Tag prepended to live extracts
pub const CONTEXT_TAG: &str = "Wikipedia Context: ";

/// Source of research context for a topic.
#[async_trait]
pub trait ContextSource: Send + Sync {
    /// Produce a context snippet. Never fails.
    async fn research(&self, topic: &str) -> String;
}

/// Which fallback tier produced a snippet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResearchTier {
    /// Text extracted from the live article
    LiveExtract,
    /// Article fetched but the content container was missing
    BasicInfo,
    /// Network-level failure (timeout, connection, non-2xx)
    GeneralKnowledge,
    /// Any other failure (parse, encoding)
    BackgroundInfo,
}

impl std::fmt::Display for ResearchTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LiveExtract => write!(f, "live_extract"),
            Self::BasicInfo => write!(f, "basic_info"),
            Self::GeneralKnowledge => write!(f, "general_knowledge"),
            Self::BackgroundInfo => write!(f, "background_info"),
        }
    }
}

/// A research result together with the tier that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchSnippet {
    pub tier: ResearchTier,
    pub text: String,
}

impl ResearchSnippet {
    fn fallback(tier: ResearchTier, topic: &str) -> Self {
        let text = match tier {
            ResearchTier::BasicInfo => format!("Basic information about {}", topic),
            ResearchTier::GeneralKnowledge => format!("General knowledge about {}", topic),
            ResearchTier::BackgroundInfo | ResearchTier::LiveExtract => {
                format!("Background information about {}", topic)
            }
        };
        Self { tier, text }
    }
}

/// Encyclopedia-backed research lookup
pub struct WikipediaResearcher {
    client: reqwest::Client,
    config: ResearchConfig,
}

impl WikipediaResearcher {
    /// Create a researcher with the configured headers and timeout
    pub fn new(config: ResearchConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let language = HeaderValue::from_str(&config.accept_language).map_err(|e| {
            Error::Config(format!("Invalid research.accept_language: {}", e))
        })?;
        headers.insert(ACCEPT_LANGUAGE, language);

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    /// Article URL for a topic (spaces become underscores)
    pub fn article_url(&self, topic: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            topic.replace(' ', "_")
        )
    }

    /// Run the lookup and report which tier answered
    pub async fn lookup(&self, topic: &str) -> ResearchSnippet {
        let html = match self.fetch(topic).await {
            Ok(html) => html,
            Err(e) => {
                tracing::error!(topic = %topic, error = %e, "Research request failed");
                return ResearchSnippet::fallback(ResearchTier::GeneralKnowledge, topic);
            }
        };

        match extract_context(&html, &self.config.container_id, self.config.max_length) {
            Ok(Some(context)) => ResearchSnippet {
                tier: ResearchTier::LiveExtract,
                text: format!("{}{}", CONTEXT_TAG, context),
            },
            Ok(None) => ResearchSnippet::fallback(ResearchTier::BasicInfo, topic),
            Err(e) => {
                tracing::error!(topic = %topic, error = %e, "Research error");
                ResearchSnippet::fallback(ResearchTier::BackgroundInfo, topic)
            }
        }
    }

    async fn fetch(&self, topic: &str) -> Result<String> {
        let response = self
            .client
            .get(self.article_url(topic))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.text().await?)
    }
}

#[async_trait]
impl ContextSource for WikipediaResearcher {
    async fn research(&self, topic: &str) -> String {
        let snippet = self.lookup(topic).await;
        tracing::debug!(topic = %topic, tier = %snippet.tier, "Research lookup finished");
        snippet.text
    }
}

/// Extract the visible text of the element with `id = container_id`.
///
/// Whitespace runs collapse to single spaces and the result is cut to
/// `max_length` characters. Returns `Ok(None)` when the container is absent.
pub fn extract_context(html: &str, container_id: &str, max_length: usize) -> Result<Option<String>> {
    let selector = Selector::parse(&format!("[id=\"{}\"]", container_id))
        .map_err(|e| Error::Research(format!("Invalid container selector: {:?}", e)))?;
    let document = Html::parse_document(html);

    let Some(container) = document.select(&selector).next() else {
        return Ok(None);
    };

    let raw: String = container.text().collect();
    let text = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    Ok(Some(text.chars().take(max_length).collect()))
}
