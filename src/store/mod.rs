//! Artifact store backed by a flat content directory
//!
//! Directory layout:
//! ```text
//! content/
//! ├── 2024-05-01_09-00-00_science.txt
//! ├── 2024-05-02_09-00-00_creative_writing.txt
//! └── ...
//! ```
//!
//! Each file starts with a metadata header followed by the raw article:
//! ```text
//! Generated: 2024-05-01_09-00-00
//! Topic: science
//!
//! Title: ...
//! ```
//!
//! Files are created once and never rewritten. Two saves of the same topic
//! within the same second share a filename and the later one wins.
//! Every operation is total: filesystem errors are logged and surface as
//! `None` or an empty list.

pub mod handler;

pub use handler::{content_router, ContentState};

use crate::error::{Error, Result};
use crate::generation::GeneratedArtifact;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Timestamp format shared by filenames and the `Generated:` header
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Extension of stored artifacts
pub const ARTIFACT_EXT: &str = "txt";

const WRITE_PROBE: &str = ".write-probe";

/// Home-page summary of a stored artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactPreview {
    pub filename: String,
    pub title: String,
    pub preview: String,
}

/// Filesystem store for generated artifacts
pub struct ArtifactStore {
    dir: PathBuf,
    preview_chars: usize,
}

impl ArtifactStore {
    /// Create a store over `dir`; see [`Self::verify_writable`] for creating it
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            preview_chars: 200,
        }
    }

    /// Override the preview length used by [`Self::latest_previews`]
    pub fn with_preview_chars(mut self, chars: usize) -> Self {
        self.preview_chars = chars;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist an artifact stamped with the current local time.
    pub async fn save(&self, artifact: &GeneratedArtifact, topic: &str) -> Option<PathBuf> {
        self.save_at(&artifact.raw, topic, Local::now()).await
    }

    /// Persist raw text stamped with `at`. Returns the written path, or
    /// `None` (logged) when the write fails.
    pub async fn save_at(&self, raw: &str, topic: &str, at: DateTime<Local>) -> Option<PathBuf> {
        let timestamp = at.format(TIMESTAMP_FORMAT).to_string();
        let path = self.dir.join(artifact_filename(&timestamp, topic));
        let document = render_document(&timestamp, topic, raw);

        match tokio::fs::write(&path, document).await {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Artifact saved");
                Some(path)
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "File save error");
                None
            }
        }
    }

    /// Up to `count` artifact filenames, most recently modified first.
    pub async fn list_latest(&self, count: usize) -> Vec<String> {
        match self.collect_entries().await {
            Ok(mut entries) => {
                entries.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));
                entries.into_iter().take(count).map(|(_, name)| name).collect()
            }
            Err(e) => {
                tracing::error!(dir = %self.dir.display(), error = %e, "Error listing content files");
                Vec::new()
            }
        }
    }

    async fn collect_entries(&self) -> std::io::Result<Vec<(SystemTime, String)>> {
        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ARTIFACT_EXT) {
                continue;
            }
            let metadata = match entry.metadata().await {
                Ok(m) if m.is_file() => m,
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable entry");
                    continue;
                }
            };
            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            if let Some(name) = entry.file_name().to_str() {
                entries.push((modified, name.to_string()));
            }
        }
        Ok(entries)
    }

    /// Read an artifact as text.
    ///
    /// Invalid UTF-8 is decoded as Latin-1 instead. I/O failures are
    /// logged and yield `None`; callers skip the file.
    pub async fn read(&self, filename: &str) -> Option<String> {
        let path = self.dir.join(filename);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let (text, recovered) = decode_text(bytes);
                if recovered {
                    tracing::warn!(file = %filename, "File is not valid UTF-8, decoded as Latin-1");
                }
                Some(text)
            }
            Err(e) => {
                tracing::error!(file = %filename, error = %e, "Error reading file");
                None
            }
        }
    }

    /// Validated read for untrusted filenames.
    ///
    /// Traversal attempts and missing files are rejected before any read.
    pub async fn fetch(&self, filename: &str) -> Result<String> {
        if !is_safe_filename(filename) {
            return Err(Error::Store(format!("Invalid filename: {}", filename)));
        }
        let is_file = tokio::fs::metadata(self.dir.join(filename))
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !is_file {
            return Err(Error::Store(format!("File not found: {}", filename)));
        }
        self.read(filename)
            .await
            .ok_or_else(|| Error::Store(format!("Unable to read: {}", filename)))
    }

    /// Previews of the `count` latest artifacts; unreadable files are omitted
    pub async fn latest_previews(&self, count: usize) -> Vec<ArtifactPreview> {
        let mut previews = Vec::new();
        for filename in self.list_latest(count).await {
            if let Some(text) = self.read(&filename).await {
                previews.push(build_preview(filename, &text, self.preview_chars));
            }
        }
        previews
    }

    /// True when the directory holds no artifacts (or cannot be listed).
    ///
    /// Only regular `.txt` files count, so a directory holding nothing but
    /// other entries is still empty and gets seeded at startup.
    pub async fn is_empty(&self) -> bool {
        self.list_latest(1).await.is_empty()
    }

    /// Create the directory if needed and prove it is writable by writing
    /// and removing a probe file.
    pub async fn verify_writable(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let probe = self.dir.join(WRITE_PROBE);
        tokio::fs::write(&probe, "test").await?;
        tokio::fs::remove_file(&probe).await?;
        Ok(())
    }
}

/// `{timestamp}_{topic}.txt` with spaces (and path separators) as underscores
pub fn artifact_filename(timestamp: &str, topic: &str) -> String {
    let topic: String = topic
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            other => other,
        })
        .collect();
    format!("{}_{}.{}", timestamp, topic, ARTIFACT_EXT)
}

/// Metadata header followed by the raw article text
pub fn render_document(timestamp: &str, topic: &str, raw: &str) -> String {
    format!("Generated: {}\nTopic: {}\n\n{}", timestamp, topic, raw)
}

/// Reject traversal sequences, separators and absolute names
pub fn is_safe_filename(filename: &str) -> bool {
    !filename.is_empty()
        && !filename.contains("..")
        && !filename.contains(['/', '\\', '\0'])
}

/// Decode bytes as UTF-8, falling back to Latin-1. The flag reports the fallback.
pub fn decode_text(bytes: Vec<u8>) -> (String, bool) {
    match String::from_utf8(bytes) {
        Ok(text) => (text, false),
        Err(e) => (e.into_bytes().iter().map(|&b| char::from(b)).collect(), true),
    }
}

/// Title is the file's first line; the preview is the text from line 3 on,
/// joined with spaces and cut to `max_chars`.
pub fn build_preview(filename: String, text: &str, max_chars: usize) -> ArtifactPreview {
    if text.is_empty() {
        return ArtifactPreview {
            filename,
            title: "Untitled".to_string(),
            preview: String::new(),
        };
    }
    let lines: Vec<&str> = text.split('\n').collect();
    let rest = lines.get(3..).unwrap_or_default().join(" ");
    let mut preview: String = rest.chars().take(max_chars).collect();
    preview.push_str("...");
    ArtifactPreview {
        filename,
        title: lines[0].to_string(),
        preview,
    }
}
