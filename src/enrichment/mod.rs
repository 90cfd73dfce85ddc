//! Concurrent multi-source enrichment of generated tracks.

mod orchestrator;
mod settle;

pub use orchestrator::{Enricher, EnrichmentReport, Sources, TrackLookup};
pub use settle::{settle, Settled};
