//! Non-fatal degradations recorded during a generation run
//!
//! A warning means the document was still produced, but some operator input
//! did not make it onto the page as entered.

use schemars::JsonSchema;
use serde::Serialize;
use std::fmt;

/// One operator-visible degradation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// Repeating entries beyond the template capacity were left out
    EntriesDropped {
        section: String,
        capacity: usize,
        dropped: usize,
    },
    /// A repeating entry could not be read; its slot was left blank
    MalformedEntry { section: String, index: usize },
    /// Wrapped text exceeded its line cap and was cut
    TextTruncated {
        field: String,
        max_lines: usize,
    },
    /// The signature image could not be embedded; a placeholder was drawn
    SignatureFallback { reason: String },
    /// Characters outside the font encoding were replaced with '?'. Only the
    /// placement is recorded, never the text itself.
    UnmappableText { location: String, replaced: usize },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::EntriesDropped {
                section,
                capacity,
                dropped,
            } => write!(
                f,
                "{} supports at most {} entries; {} dropped and must be added manually",
                section, capacity, dropped
            ),
            Warning::MalformedEntry { section, index } => write!(
                f,
                "{}[{}] could not be read; its slot was left blank, add it manually",
                section, index
            ),
            Warning::TextTruncated { field, max_lines } => write!(
                f,
                "{} exceeds {} lines; text truncated, add the remainder manually",
                field, max_lines
            ),
            Warning::SignatureFallback { reason } => {
                write!(f, "signature not embedded: {}", reason)
            }
            Warning::UnmappableText { location, replaced } => write!(
                f,
                "{} unsupported character(s) replaced with '?' at {}",
                replaced, location
            ),
        }
    }
}

/// Ordered collection of warnings; every push is also logged
#[derive(Debug, Default, Clone)]
pub struct Warnings(Vec<Warning>);

impl Warnings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, warning: Warning) {
        tracing::warn!(warning = %warning, "generation degraded");
        self.0.push(warning);
    }

    /// Move every warning from `other` onto the end of this list. These were
    /// logged when first pushed.
    pub fn append(&mut self, other: Warnings) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Warning> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<Warning> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_dropped_message_names_count() {
        let w = Warning::EntriesDropped {
            section: "employment_history".to_string(),
            capacity: 3,
            dropped: 2,
        };
        let msg = w.to_string();
        assert!(msg.contains("at most 3"));
        assert!(msg.contains("2 dropped"));
    }

    #[test]
    fn test_warning_serializes_with_kind_tag() {
        let w = Warning::TextTruncated {
            field: "work_duties".to_string(),
            max_lines: 4,
        };
        let json = serde_json::to_value(&w).unwrap();
        assert_eq!(json["kind"], "text_truncated");
        assert_eq!(json["max_lines"], 4);
    }

    #[test]
    fn test_malformed_entry_message_names_row() {
        let w = Warning::MalformedEntry {
            section: "diagnoses".to_string(),
            index: 1,
        };
        assert!(w.to_string().starts_with("diagnoses[1] could not be read"));
    }

    #[test]
    fn test_warnings_preserve_order() {
        let mut warnings = Warnings::new();
        warnings.push(Warning::SignatureFallback {
            reason: "bad".to_string(),
        });
        warnings.push(Warning::UnmappableText {
            location: "page 1 at (25, 644)".to_string(),
            replaced: 2,
        });
        let all = warnings.into_vec();
        assert_eq!(all.len(), 2);
        assert!(matches!(all[0], Warning::SignatureFallback { .. }));
    }
}
