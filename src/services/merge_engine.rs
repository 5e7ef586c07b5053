//! Three-tier capability merge.
//!
//! Tiers are merged with name-collision priority native > declarative >
//! inferred. Within one tier the higher confidence wins. After the merge
//! low-confidence entries are dropped and the list is sorted by category
//! for stable presentation.

use std::collections::HashMap;

use tracing::debug;

use crate::domain::models::Capability;

/// Default minimum confidence kept after merge.
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.3;

/// Merges native, declarative, and inferred capabilities.
#[derive(Debug, Clone)]
pub struct MergeEngine {
    min_confidence: f64,
}

impl Default for MergeEngine {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_CONFIDENCE)
    }
}

impl MergeEngine {
    /// Engine dropping capabilities below `min_confidence`, clamped to `[0, 1]`.
    pub fn new(min_confidence: f64) -> Self {
        Self {
            min_confidence: min_confidence.clamp(0.0, 1.0),
        }
    }

    /// The effective threshold.
    pub fn min_confidence(&self) -> f64 {
        self.min_confidence
    }

    /// Merge the three tiers into one list with unique names.
    ///
    /// The result still carries backing handles; call [`strip_transient`]
    /// before it leaves the scan.
    pub fn merge(
        &self,
        native: Vec<Capability>,
        declarative: Vec<Capability>,
        inferred: Vec<Capability>,
    ) -> Vec<Capability> {
        let input_count = native.len() + declarative.len() + inferred.len();
        let mut order: Vec<String> = Vec::new();
        let mut by_name: HashMap<String, Capability> = HashMap::new();

        for tier in [native, declarative, inferred] {
            for tool in dedup_by_name(tier) {
                if by_name.contains_key(&tool.name) {
                    continue;
                }
                order.push(tool.name.clone());
                by_name.insert(tool.name.clone(), tool);
            }
        }

        let merged: Vec<Capability> = order
            .into_iter()
            .filter_map(|name| by_name.remove(&name))
            .collect();

        let mut result: Vec<Capability> = dedup_by_name(merged)
            .into_iter()
            .filter(|tool| tool.confidence >= self.min_confidence)
            .map(|mut tool| {
                tool.sanitize_schema();
                tool
            })
            .collect();

        result.sort_by(|a, b| a.category.cmp(&b.category).then_with(|| a.name.cmp(&b.name)));

        debug!(
            input = input_count,
            output = result.len(),
            min_confidence = self.min_confidence,
            "merged capability tiers"
        );
        result
    }
}

/// Collapse capabilities sharing a name, keeping the highest confidence.
///
/// First-seen order is preserved; on a confidence tie the earlier entry
/// stays.
pub fn dedup_by_name(tools: Vec<Capability>) -> Vec<Capability> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<Capability> = Vec::with_capacity(tools.len());

    for tool in tools {
        match index.get(&tool.name) {
            Some(&i) => {
                if tool.confidence > out[i].confidence {
                    out[i] = tool;
                }
            }
            None => {
                index.insert(tool.name.clone(), out.len());
                out.push(tool);
            }
        }
    }
    out
}

/// Drop scan-scoped references before storage or transport.
pub fn strip_transient(tools: Vec<Capability>) -> Vec<Capability> {
    tools.into_iter().map(Capability::stripped).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{empty_object_schema, Category, ToolSource};
    use serde_json::json;
    use std::collections::HashSet;

    fn tool(name: &str, source: ToolSource, confidence: f64) -> Capability {
        Capability::new(name, Category::Form, source, confidence)
    }

    #[test]
    fn test_native_wins_regardless_of_confidence() {
        let engine = MergeEngine::default();
        let merged = engine.merge(
            vec![tool("form.login", ToolSource::Native, 0.31)],
            vec![tool("form.login", ToolSource::Declarative, 1.0)],
            vec![tool("form.login", ToolSource::Inferred, 0.99)],
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].source, ToolSource::Native);
    }

    #[test]
    fn test_declarative_beats_inferred() {
        let engine = MergeEngine::default();
        let merged = engine.merge(
            vec![],
            vec![tool("form.signup", ToolSource::Declarative, 0.5)],
            vec![tool("form.signup", ToolSource::Inferred, 0.95)],
        );
        assert_eq!(merged[0].source, ToolSource::Declarative);
    }

    #[test]
    fn test_same_tier_keeps_highest_confidence() {
        let engine = MergeEngine::default();
        let merged = engine.merge(
            vec![],
            vec![],
            vec![
                tool("form.search", ToolSource::Inferred, 0.5),
                tool("form.search", ToolSource::Inferred, 0.8),
                tool("form.search", ToolSource::Inferred, 0.6),
            ],
        );
        assert_eq!(merged.len(), 1);
        assert!((merged[0].confidence - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn test_low_confidence_filtered() {
        let engine = MergeEngine::default();
        let merged = engine.merge(
            vec![],
            vec![],
            vec![
                tool("form.a", ToolSource::Inferred, 0.29),
                tool("form.b", ToolSource::Inferred, 0.3),
            ],
        );
        let names: Vec<&str> = merged.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["form.b"]);
    }

    #[test]
    fn test_sorted_by_category_then_name() {
        let engine = MergeEngine::default();
        let merged = engine.merge(
            vec![],
            vec![],
            vec![
                Capability::new("search.q", Category::Search, ToolSource::Inferred, 0.9),
                Capability::new("nav.b", Category::Navigation, ToolSource::Inferred, 0.9),
                Capability::new("form.z", Category::Form, ToolSource::Inferred, 0.9),
                Capability::new("nav.a", Category::Navigation, ToolSource::Inferred, 0.9),
            ],
        );
        let names: Vec<&str> = merged.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["form.z", "nav.a", "nav.b", "search.q"]);
    }

    #[test]
    fn test_names_unique_after_merge() {
        let engine = MergeEngine::default();
        let merged = engine.merge(
            vec![tool("a", ToolSource::Native, 0.9), tool("b", ToolSource::Native, 0.9)],
            vec![tool("b", ToolSource::Declarative, 0.9), tool("c", ToolSource::Declarative, 0.9)],
            vec![tool("c", ToolSource::Inferred, 0.9), tool("a", ToolSource::Inferred, 0.9)],
        );
        let names: HashSet<&str> = merged.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names.len(), merged.len());
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn test_malformed_schema_replaced() {
        let engine = MergeEngine::default();
        let merged = engine.merge(
            vec![tool("form.x", ToolSource::Native, 0.9).with_schema(json!(null))],
            vec![],
            vec![],
        );
        assert_eq!(merged[0].input_schema, empty_object_schema());
    }

    #[test]
    fn test_strip_transient_clears_handles() {
        use crate::domain::models::{Document, DocumentNode, ElementId, ScanArena};
        let doc = Document::from_tree(DocumentNode::new("body"));
        let arena = ScanArena::new(&doc);
        let tools = vec![tool("form.x", ToolSource::Inferred, 0.9).with_backing(arena.handle(ElementId(0)))];
        let stripped = strip_transient(tools);
        assert!(stripped[0].backing.is_none());
    }
}
