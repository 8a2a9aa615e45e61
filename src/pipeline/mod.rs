//! Generation cycle
//!
//! One cycle = pick (topic, style) → research → prompt → generate → save.
//! [`Pipeline`] holds no mutable state, so the scheduler and any number of
//! request handlers may run cycles concurrently; the only shared resource
//! is the append-only content directory.

pub mod handler;

pub use handler::{generate_router, GenerateState};

use crate::config::ScribeConfig;
use crate::error::{Error, Result};
use crate::generation::{ContentGenerator, GeneratedArtifact, OpenAiBackend};
use crate::pools::ContentPools;
use crate::research::WikipediaResearcher;
use crate::store::ArtifactStore;
use chrono::{DateTime, Local};
use std::path::PathBuf;
use std::sync::Arc;

/// Result of one generation cycle
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub topic: String,
    pub style: String,
    pub artifact: GeneratedArtifact,
    /// Path of the stored file; `None` when saving failed
    pub saved: Option<PathBuf>,
    pub completed_at: DateTime<Local>,
}

impl CycleOutcome {
    /// File name of the stored artifact, if it was saved
    pub fn filename(&self) -> Option<String> {
        self.saved
            .as_ref()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .map(str::to_string)
    }
}

/// The content generation and persistence pipeline
pub struct Pipeline {
    generator: ContentGenerator,
    store: Arc<ArtifactStore>,
    pools: ContentPools,
}

impl Pipeline {
    pub fn new(generator: ContentGenerator, store: Arc<ArtifactStore>, pools: ContentPools) -> Self {
        Self {
            generator,
            store,
            pools,
        }
    }

    /// Wire the production components from configuration
    pub fn from_config(config: &ScribeConfig, api_key: String) -> Result<Self> {
        let research = Arc::new(WikipediaResearcher::new(config.research.clone())?);
        let backend = Arc::new(OpenAiBackend::new(config.generation.clone(), api_key)?);
        let generator =
            ContentGenerator::new(research, backend, config.generation.word_range());
        let store = Arc::new(
            ArtifactStore::new(config.content.dir.clone())
                .with_preview_chars(config.content.preview_chars),
        );
        let pools = ContentPools::load(&config.pools);
        Ok(Self::new(generator, store, pools))
    }

    pub fn store(&self) -> &Arc<ArtifactStore> {
        &self.store
    }

    pub fn pools(&self) -> &ContentPools {
        &self.pools
    }

    /// Pick a uniformly random (topic, style) pair
    pub fn pick(&self) -> Result<(String, String)> {
        let topic = self
            .pools
            .random_topic()
            .ok_or_else(|| Error::Config("topic pool is empty".to_string()))?;
        let style = self
            .pools
            .random_style()
            .ok_or_else(|| Error::Config("style pool is empty".to_string()))?;
        Ok((topic.to_string(), style.to_string()))
    }

    /// Run one cycle with a random (topic, style) pair
    pub async fn run_cycle(&self) -> Result<CycleOutcome> {
        let (topic, style) = self.pick()?;
        Ok(self.run_cycle_with(&topic, &style).await)
    }

    /// Run one cycle for a given pair
    pub async fn run_cycle_with(&self, topic: &str, style: &str) -> CycleOutcome {
        tracing::info!(topic = %topic, style = %style, "Generating content");

        let artifact = self.generator.generate(topic, style).await;
        let saved = self.store.save(&artifact, topic).await;

        match &saved {
            Some(path) => tracing::info!(
                path = %path.display(),
                source = %artifact.provenance,
                "Successfully generated content"
            ),
            None => tracing::error!(topic = %topic, "Failed to save generated content"),
        }

        CycleOutcome {
            topic: topic.to_string(),
            style: style.to_string(),
            artifact,
            saved,
            completed_at: Local::now(),
        }
    }
}
