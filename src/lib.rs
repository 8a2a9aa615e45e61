//! Autoscribe - daily article generator
//!
//! Autoscribe picks a topic and a writing style, looks up background
//! context for the topic, asks a completion API for an article and stores
//! the result as a plain text file. A daily scheduler and an HTTP API both
//! trigger the same generation cycle.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────────────────────────────────────┐
//! │  Scheduler   │──▶│                  Pipeline                    │
//! └──────────────┘   │                                              │
//! ┌──────────────┐   │  pools ─▶ research ─▶ prompt ─▶ generation   │
//! │  HTTP API    │──▶│                                   │          │
//! │ (rate limit) │   │                                   ▼          │
//! └──────┬───────┘   │                                 store        │
//!        │           └───────────────────────────────────┬──────────┘
//!        └──────────── list / fetch / home ─────────────▶┘
//! ```
//!
//! ## Degradation
//!
//! Research falls back through progressively vaguer context strings, and
//! a failed completion call is replaced by a fixed fallback article tagged
//! [`generation::Provenance::Fallback`]. A generation cycle only errors
//! when there is nothing to pick from.

pub mod api;
pub mod config;
pub mod error;
pub mod generation;
pub mod limiter;
pub mod pipeline;
pub mod pools;
pub mod prompt;
pub mod research;
pub mod scheduler;
pub mod server;
pub mod store;

pub use config::ScribeConfig;
pub use error::{Error, Result};
