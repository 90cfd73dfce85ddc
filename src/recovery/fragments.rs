//! Degraded-mode extraction of flat track objects from text that would not parse.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use super::validate::descriptor_from_object;

lazy_static! {
    static ref FLAT_OBJECT: Regex = Regex::new(r"\{[^{}]*\}").expect("flat object regex");
}

/// Returns every flat `{...}` fragment that mentions both `"title"` and
/// `"artist"`, parses on its own and carries non-blank values for both.
/// Fragments are never patched up.
pub fn extract(text: &str) -> Vec<Value> {
    FLAT_OBJECT
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|fragment| fragment.contains("\"title\"") && fragment.contains("\"artist\""))
        .filter_map(|fragment| serde_json::from_str::<Value>(fragment).ok())
        .filter(|value| {
            value
                .as_object()
                .and_then(descriptor_from_object)
                .is_some()
        })
        .collect()
}
