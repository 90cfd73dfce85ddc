//! Mood-to-tracklist generation: prompt building, the model call and recovery.

mod generator;
pub mod prompt;

pub use generator::{GeneratedPlaylist, GenerationError, PlaylistGenerator};
