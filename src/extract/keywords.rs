// src/extract/keywords.rs
//! Risk keyword membership against the configured vocabulary.

use std::collections::BTreeSet;

/// Case-insensitive substring test. Returns the literal keywords found, not their themes.
pub fn suspicious_keywords(text: &str, vocabulary: &[String]) -> BTreeSet<String> {
    if text.is_empty() {
        return BTreeSet::new();
    }
    let lower = text.to_lowercase();
    vocabulary
        .iter()
        .filter(|k| !k.is_empty() && lower.contains(k.as_str()))
        .cloned()
        .collect()
}
