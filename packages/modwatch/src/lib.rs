//! Mod release tracking pipeline.
//!
//! Watches creator feeds (Patreon-style post APIs, community spreadsheets)
//! for mod releases, extracts structured mod/version facts from post text
//! with an LLM, reconciles them against a curated registry, and routes
//! anything uncertain through a human review flow before the registry is
//! mutated.
//!
//! The crate is organized around trait seams so every external system is
//! swappable:
//! - [`traits::feed`] — upstream content sources
//! - [`traits::ai`] — the extraction model
//! - [`traits::store`] — persistence ([`stores::memory`] for tests and
//!   local runs, `stores::postgres` behind the `postgres` feature)
//! - [`traits::notify`] — the chat platform the pipeline talks to
//!
//! The moving parts on top of those seams:
//! - [`ingest::FeedSweeper`] polls feeds on a schedule
//! - [`detect::ModDetector`] runs extraction and matching per post
//! - [`matching`] holds the pure normalization and fuzzy-match functions
//! - [`review`] renders the review surface and applies operator decisions
//! - [`registry::RegistryService`] is the operator management surface

pub mod ai;
pub mod detect;
pub mod error;
pub mod ingest;
pub mod matching;
pub mod registry;
pub mod review;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

pub use ai::GroqAnalyzer;
pub use detect::ModDetector;
pub use error::{AnalysisError, FeedError, NotifyError, PipelineError, Result};
pub use ingest::{FeedSweeper, GoogleSheetsSource, PatreonSource, SweepOutcome};
pub use registry::RegistryService;
pub use review::{BulkDecision, DecisionOutcome, ReviewDecision, ReviewNotifier, ReviewWorkflow};
pub use stores::MemoryStore;
pub use types::config::{AnalyzerConfig, SweepConfig};
