//! Per-conversation trait records and their merged form.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Traits extracted from a single conversation source.
///
/// Lives only for the duration of one aggregation run. `traits` is
/// deduplicated and keeps first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraitRecord {
    pub source_id: String,
    pub traits: IndexSet<String>,
}

impl TraitRecord {
    /// Build a record from raw trait strings, trimming and dropping empties.
    pub fn new<I, S>(source_id: impl Into<String>, raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            source_id: source_id.into(),
            traits: normalize_traits(raw),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.traits.is_empty()
    }
}

/// Trim, drop empty strings, and deduplicate preserving order.
pub fn normalize_traits<I, S>(raw: I) -> IndexSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .map(|t| t.as_ref().trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Union of every record's traits, deduplicated across records.
pub fn merge_traits(records: &[TraitRecord]) -> IndexSet<String> {
    records
        .iter()
        .flat_map(|record| record.traits.iter().cloned())
        .collect()
}

/// Render traits as the backend's human-readable descriptor.
pub fn traits_descriptor<I, S>(traits: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    traits
        .into_iter()
        .map(|t| t.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_normalizes_input() {
        let record = TraitRecord::new("conv-1", ["  kind ", "", "kind", "funny", "   "]);
        assert_eq!(record.traits.len(), 2);
        assert_eq!(
            record.traits.iter().collect::<Vec<_>>(),
            vec!["kind", "funny"]
        );
    }

    #[test]
    fn test_merge_overlapping_records() {
        let records = vec![
            TraitRecord::new("a", ["kind", "funny"]),
            TraitRecord::new("b", ["funny", "curious"]),
        ];

        let merged = merge_traits(&records);

        assert_eq!(merged.len(), 3);
        assert!(merged.contains("kind"));
        assert!(merged.contains("funny"));
        assert!(merged.contains("curious"));
    }

    #[test]
    fn test_descriptor_joins_in_order() {
        let merged = merge_traits(&[TraitRecord::new("a", ["warm", "direct"])]);
        assert_eq!(traits_descriptor(&merged), "warm, direct");
    }

    #[test]
    fn test_empty_record() {
        assert!(TraitRecord::new("x", Vec::<String>::new()).is_empty());
    }
}
