//! Display-layer merge of local and external stage outputs.
//!
//! No deduplication happens here: when both sources produced something the
//! merged value simply contains both, local first.

use crate::types::Dual;

/// Marker placed between the local and external blocks.
pub const SEPARATOR: &str = "---";

pub trait Merge: Clone {
    fn merge(local: &Self, external: &Self) -> Self;
}

impl Merge for String {
    fn merge(local: &Self, external: &Self) -> Self {
        format!("{local}\n\n{SEPARATOR}\n\n{external}")
    }
}

impl Merge for Vec<String> {
    fn merge(local: &Self, external: &Self) -> Self {
        let mut merged = Vec::with_capacity(local.len() + external.len() + 1);
        merged.extend(local.iter().cloned());
        merged.push(SEPARATOR.to_string());
        merged.extend(external.iter().cloned());
        merged
    }
}

/// Total over both inputs: both present -> concatenation, one present ->
/// that one, neither -> `None`.
pub fn merge<T: Merge>(local: Option<&T>, external: Option<&T>) -> Option<T> {
    match (local, external) {
        (Some(l), Some(e)) => Some(T::merge(l, e)),
        (Some(only), None) | (None, Some(only)) => Some(only.clone()),
        (None, None) => None,
    }
}

impl<T: Merge> Dual<T> {
    /// Builds the full triple at once so `merged` can never drift from its
    /// inputs.
    pub fn from_sources(local: Option<T>, external: Option<T>) -> Self {
        let merged = merge(local.as_ref(), external.as_ref());
        Self {
            local,
            external,
            merged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_summary_both_sources() {
        let merged = merge(Some(&"A".to_string()), Some(&"B".to_string())).unwrap();
        assert_eq!(merged, "A\n\n---\n\nB");
    }

    #[test]
    fn test_merge_single_source_is_identity() {
        let local = "only local".to_string();
        assert_eq!(merge(Some(&local), None), Some(local.clone()));
        assert_eq!(merge(None, Some(&local)), Some(local));
    }

    #[test]
    fn test_merge_neither_source() {
        assert_eq!(merge::<String>(None, None), None);
        assert_eq!(merge::<Vec<String>>(None, None), None);
    }

    #[test]
    fn test_merge_quiz_blocks_keep_order_and_duplicates() {
        let local = vec!["Q1".to_string(), "Q2".to_string()];
        let external = vec!["Q2".to_string()];
        let merged = merge(Some(&local), Some(&external)).unwrap();
        assert_eq!(merged, vec!["Q1", "Q2", "---", "Q2"]);
    }

    #[test]
    fn test_dual_from_sources_computes_merged() {
        let dual = Dual::from_sources(Some("A".to_string()), None);
        assert_eq!(dual.merged.as_deref(), Some("A"));
        assert!(dual.external.is_none());
    }
}
