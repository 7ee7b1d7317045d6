//! Event normalization
//!
//! Exports encode a modifier as a suffix on the behavior label,
//! `"behavior_modifier"`. This module splits each label on its first
//! underscore into the behavior proper and the modifier; a label with no
//! underscore has no modifier.

use crate::schema::RawEvent;
use crate::types::NormalizedEvent;

/// Normalizer for splitting compound behavior labels
pub struct EventNormalizer;

impl EventNormalizer {
    /// Normalize a batch of raw events. Total; order is preserved.
    pub fn normalize(events: &[RawEvent]) -> Vec<NormalizedEvent> {
        events
            .iter()
            .map(|event| {
                let (behavior, modifier) = split_label(&event.behavior_label);
                NormalizedEvent {
                    event: event.clone(),
                    behavior: behavior.to_string(),
                    modifier: modifier.to_string(),
                }
            })
            .collect()
    }
}

/// Split a behavior label on the first underscore.
fn split_label(label: &str) -> (&str, &str) {
    match label.split_once('_') {
        Some((behavior, modifier)) => (behavior, modifier),
        None => (label, ""),
    }
}
