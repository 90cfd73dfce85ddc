//! Track records produced by generation and decorated by enrichment.

mod models;

pub use models::{
    current_year, CatalogMatch, EnrichedTrack, TrackDescriptor, VideoMatch, DEFAULT_REASONING,
};
