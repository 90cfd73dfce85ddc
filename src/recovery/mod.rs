//! Staged, best-effort recovery of a track list from untrusted model output.
//!
//! The stages run in a fixed order: fence stripping, boundary extraction,
//! syntax normalization, truncation repair, a strict parse and finally
//! fragment extraction. Normalization only runs when the extracted text does
//! not already parse.

mod fragments;
mod stages;
mod validate;

pub use stages::{extract_boundaries, normalize_syntax, repair_truncation, strip_fences};
pub use validate::{descriptor_from_object, validate};

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::playlist::TrackDescriptor;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecoveryError {
    #[error("model returned an empty response")]
    EmptyResponse,

    #[error("response was truncated and could not be repaired")]
    TruncationUnrepairable,

    #[error("response could not be parsed: {reason}")]
    UnrecoverableResponse { reason: String },

    #[error("response is not a playlist array")]
    NotAnArray,

    #[error("model generated an empty playlist")]
    EmptyPlaylist,

    #[error("none of the {candidates} generated entries had a title and an artist")]
    NoValidTracks { candidates: usize },
}

/// Which stage produced the parsed array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryPath {
    Direct,
    Normalized,
    TruncationRepaired,
    Fragments,
}

impl RecoveryPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecoveryPath::Direct => "direct",
            RecoveryPath::Normalized => "normalized",
            RecoveryPath::TruncationRepaired => "truncation_repaired",
            RecoveryPath::Fragments => "fragments",
        }
    }
}

impl std::fmt::Display for RecoveryPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Recovered {
    pub tracks: Vec<TrackDescriptor>,
    pub path: RecoveryPath,
}

/// Outcome of a single parse attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Parsed(Value),
    Failed(String),
}

impl ParseOutcome {
    pub fn attempt(text: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(value) => ParseOutcome::Parsed(value),
            Err(err) => ParseOutcome::Failed(err.to_string()),
        }
    }
}

/// Recovers up to `requested` descriptors from `raw`.
pub fn recover(raw: &str, requested: usize) -> Result<Recovered, RecoveryError> {
    let (value, path) = recover_value(raw)?;
    let tracks = validate(value, requested)?;
    debug!("Recovered {} tracks via {}", tracks.len(), path);
    Ok(Recovered { tracks, path })
}

fn recover_value(raw: &str) -> Result<(Value, RecoveryPath), RecoveryError> {
    if raw.trim().is_empty() {
        return Err(RecoveryError::EmptyResponse);
    }

    let unfenced = strip_fences(raw);
    let bounded = extract_boundaries(&unfenced);
    if let ParseOutcome::Parsed(value) = ParseOutcome::attempt(bounded) {
        return Ok((value, RecoveryPath::Direct));
    }

    let normalized = normalize_syntax(bounded);
    let (candidate, path) = if normalized.trim_end().ends_with(']') {
        (normalized.trim().to_string(), RecoveryPath::Normalized)
    } else {
        debug!("Response does not close its array, attempting truncation repair");
        let repaired = repair_truncation(&normalized).ok_or(RecoveryError::TruncationUnrepairable)?;
        (repaired, RecoveryPath::TruncationRepaired)
    };

    let reason = match ParseOutcome::attempt(&candidate) {
        ParseOutcome::Parsed(value) => return Ok((value, path)),
        ParseOutcome::Failed(reason) => reason,
    };
    warn!("Parse failed after repair ({}), scanning for track fragments", reason);

    let from_candidate = fragments::extract(&candidate);
    let from_raw = fragments::extract(raw);
    let found = if from_raw.len() > from_candidate.len() {
        from_raw
    } else {
        from_candidate
    };
    if found.is_empty() {
        return Err(RecoveryError::UnrecoverableResponse { reason });
    }
    Ok((Value::Array(found), RecoveryPath::Fragments))
}
