//! Mood-based playlist service: model-generated tracklists, recovered from
//! untrusted output and enriched from Spotify and YouTube.

pub mod config;
pub mod enrichment;
pub mod generation;
pub mod llm;
pub mod playlist;
pub mod recovery;
pub mod server;
pub mod upstream;
