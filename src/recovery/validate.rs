use serde_json::{Map, Value};

use super::RecoveryError;
use crate::playlist::TrackDescriptor;

/// Turns a parsed value into at most `requested` descriptors, in order.
///
/// Elements without a usable title and artist are dropped before the list is
/// cut to length, so a bad element near the front does not cost a slot.
pub fn validate(value: Value, requested: usize) -> Result<Vec<TrackDescriptor>, RecoveryError> {
    let elements = match value {
        Value::Array(elements) => elements,
        _ => return Err(RecoveryError::NotAnArray),
    };
    if elements.is_empty() {
        return Err(RecoveryError::EmptyPlaylist);
    }

    let candidates = elements.len();
    let tracks: Vec<TrackDescriptor> = elements
        .iter()
        .filter_map(Value::as_object)
        .filter_map(descriptor_from_object)
        .take(requested)
        .collect();

    if tracks.is_empty() {
        return Err(RecoveryError::NoValidTracks { candidates });
    }
    Ok(tracks)
}

pub fn descriptor_from_object(object: &Map<String, Value>) -> Option<TrackDescriptor> {
    let title = text_field(object, "title")?;
    let artist = text_field(object, "artist")?;
    let year = object.get("releaseYear").and_then(year_value);
    let reasoning = object.get("reasoning").and_then(Value::as_str);
    TrackDescriptor::new(&title, &artist, year, reasoning)
}

/// Strings and numbers count as text. Booleans, nulls and containers do not.
fn text_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    match object.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn year_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
