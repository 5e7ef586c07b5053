//! Classifier registry.
//!
//! Runs every registered [`Classifier`] in priority order over the primary
//! document root and then over embedded subtrees, breadth-first, up to a
//! fixed depth. One [`ClaimTracker`] is shared by every invocation of a
//! scan so an element is emitted at most once. A failing classifier is
//! logged and skipped; the others still run.

use tracing::{debug, warn};

use crate::adapters::classifiers::default_classifiers;
use crate::domain::models::{Capability, Document, DocumentRoot, ElementId, ScanArena};
use crate::domain::ports::Classifier;
use crate::services::claim_tracker::ClaimTracker;
use crate::services::merge_engine::dedup_by_name;

/// Default number of embedded-subtree levels scanned below the primary root.
pub const DEFAULT_MAX_EMBED_DEPTH: usize = 3;

/// Ordered set of classifiers.
pub struct ClassifierRegistry {
    classifiers: Vec<Box<dyn Classifier>>,
    max_embed_depth: usize,
}

impl std::fmt::Debug for ClassifierRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierRegistry")
            .field("classifiers", &self.classifier_names())
            .field("max_embed_depth", &self.max_embed_depth)
            .finish()
    }
}

impl Default for ClassifierRegistry {
    /// The reference classifier set at the default embed depth.
    fn default() -> Self {
        Self::with_defaults(DEFAULT_MAX_EMBED_DEPTH)
    }
}

impl ClassifierRegistry {
    /// An empty registry.
    pub fn new(max_embed_depth: usize) -> Self {
        Self {
            classifiers: Vec::new(),
            max_embed_depth,
        }
    }

    /// A registry holding the reference classifiers.
    pub fn with_defaults(max_embed_depth: usize) -> Self {
        let mut registry = Self::new(max_embed_depth);
        for classifier in default_classifiers() {
            registry.register(classifier);
        }
        registry
    }

    /// Add a classifier. The run order is re-established by priority;
    /// classifiers with equal priority keep registration order.
    pub fn register(&mut self, classifier: Box<dyn Classifier>) {
        self.classifiers.push(classifier);
        self.classifiers.sort_by_key(|c| c.priority());
    }

    /// Builder form of [`register`](Self::register).
    pub fn with_classifier(mut self, classifier: Box<dyn Classifier>) -> Self {
        self.register(classifier);
        self
    }

    /// Classifier names in run order.
    pub fn classifier_names(&self) -> Vec<&'static str> {
        self.classifiers.iter().map(|c| c.name()).collect()
    }

    /// Deepest embedded root level scanned.
    pub fn max_embed_depth(&self) -> usize {
        self.max_embed_depth
    }

    /// Number of registered classifiers.
    pub fn len(&self) -> usize {
        self.classifiers.len()
    }

    /// Whether no classifier is registered.
    pub fn is_empty(&self) -> bool {
        self.classifiers.is_empty()
    }

    /// Scan a document with a fresh scan arena.
    ///
    /// Handles on the returned capabilities are tied to an arena that no
    /// longer exists; use [`scan_with_arena`](Self::scan_with_arena) when
    /// the caller needs to resolve them.
    pub fn scan_all(&self, document: &Document) -> Vec<Capability> {
        let arena = ScanArena::new(document);
        self.scan_with_arena(&arena)
    }

    /// Scan the arena's document, deduplicated by name.
    pub fn scan_with_arena(&self, arena: &ScanArena<'_>) -> Vec<Capability> {
        let document = arena.document();
        let mut claims = ClaimTracker::new();
        let mut collected = Vec::new();
        let mut frontier: Vec<ElementId> = vec![document.root().id()];

        for depth in 0..=self.max_embed_depth {
            if frontier.is_empty() {
                break;
            }
            let mut next = Vec::new();
            for root_id in frontier {
                let Some(root) = document.root_at(root_id) else {
                    continue;
                };
                self.run_classifiers(root, arena, &mut claims, &mut collected);
                next.extend(root.embedded_roots());
            }
            if depth == self.max_embed_depth && !next.is_empty() {
                debug!(
                    skipped_roots = next.len(),
                    max_depth = self.max_embed_depth,
                    "embedded subtrees beyond depth bound not scanned"
                );
            }
            frontier = next;
        }

        let candidates = collected.len();
        let result = dedup_by_name(collected);
        debug!(
            scan_id = %arena.id(),
            candidates,
            unique = result.len(),
            claimed = claims.len(),
            "classifier scan complete"
        );
        result
    }

    fn run_classifiers(
        &self,
        root: DocumentRoot<'_>,
        arena: &ScanArena<'_>,
        claims: &mut ClaimTracker,
        collected: &mut Vec<Capability>,
    ) {
        for classifier in &self.classifiers {
            match classifier.scan(root, arena, claims) {
                Ok(mut found) => {
                    let cap = classifier.emission_cap();
                    if found.len() > cap {
                        debug!(
                            classifier = classifier.name(),
                            emitted = found.len(),
                            cap,
                            "classifier output truncated to emission cap"
                        );
                        found.truncate(cap);
                    }
                    collected.extend(found);
                }
                Err(e) => {
                    warn!(
                        classifier = classifier.name(),
                        error = %e,
                        "classifier failed; continuing with remaining classifiers"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::{DomainError, DomainResult};
    use crate::domain::models::{Category, DocumentNode, ToolSource};
    use std::collections::HashSet;

    /// Emits one capability per unclaimed `<button>`, prefixed.
    struct ButtonClassifier {
        prefix: &'static str,
        priority: u8,
        confidence: f64,
        cap: usize,
    }

    impl ButtonClassifier {
        fn new(prefix: &'static str, priority: u8) -> Self {
            Self {
                prefix,
                priority,
                confidence: 0.8,
                cap: 50,
            }
        }
    }

    impl Classifier for ButtonClassifier {
        fn category(&self) -> Category {
            Category::Interactive
        }

        fn name(&self) -> &'static str {
            self.prefix
        }

        fn priority(&self) -> u8 {
            self.priority
        }

        fn emission_cap(&self) -> usize {
            self.cap
        }

        fn scan(
            &self,
            root: DocumentRoot<'_>,
            arena: &ScanArena<'_>,
            claims: &mut ClaimTracker,
        ) -> DomainResult<Vec<Capability>> {
            Ok(root
                .select("button")
                .into_iter()
                .filter(|el| claims.claim(el.id))
                .map(|el| {
                    Capability::new(
                        format!("{}.{}", self.prefix, root.text_content(el)),
                        Category::Interactive,
                        ToolSource::Inferred,
                        self.confidence,
                    )
                    .with_backing(arena.handle(el.id))
                })
                .collect())
        }
    }

    struct FailingClassifier;

    impl Classifier for FailingClassifier {
        fn category(&self) -> Category {
            Category::Form
        }

        fn name(&self) -> &'static str {
            "failing"
        }

        fn priority(&self) -> u8 {
            0
        }

        fn scan(
            &self,
            _root: DocumentRoot<'_>,
            _arena: &ScanArena<'_>,
            claims: &mut ClaimTracker,
        ) -> DomainResult<Vec<Capability>> {
            claims.claim(ElementId(0));
            Err(DomainError::classifier("failing", "boom"))
        }
    }

    fn buttons(labels: &[&str]) -> DocumentNode {
        labels.iter().fold(DocumentNode::new("body"), |body, label| {
            body.child(DocumentNode::new("button").text(*label))
        })
    }

    fn names(tools: &[Capability]) -> Vec<String> {
        let mut names: Vec<String> = tools.iter().map(|t| t.name.clone()).collect();
        names.sort();
        names
    }

    #[test]
    fn test_priority_order_with_claims() {
        let registry = ClassifierRegistry::new(0)
            .with_classifier(Box::new(ButtonClassifier::new("generic", 90)))
            .with_classifier(Box::new(ButtonClassifier::new("social", 10)));
        assert_eq!(registry.classifier_names(), vec!["social", "generic"]);

        let doc = Document::from_tree(buttons(&["like", "share"]));
        let tools = registry.scan_all(&doc);
        assert_eq!(names(&tools), vec!["social.like", "social.share"]);
    }

    #[test]
    fn test_failing_classifier_isolated() {
        let registry = ClassifierRegistry::new(0)
            .with_classifier(Box::new(FailingClassifier))
            .with_classifier(Box::new(ButtonClassifier::new("ui", 50)));
        let doc = Document::from_tree(buttons(&["go"]));
        let tools = registry.scan_all(&doc);
        assert_eq!(names(&tools), vec!["ui.go"]);
    }

    #[test]
    fn test_embedded_depth_bound() {
        // body > host(embedded: root > button "one" + host(embedded: root > button "two"))
        let inner = DocumentNode::new("root").child(DocumentNode::new("button").text("two"));
        let middle = DocumentNode::new("root")
            .child(DocumentNode::new("button").text("one"))
            .child(DocumentNode::new("x-inner").embed(inner));
        let doc = Document::from_tree(
            DocumentNode::new("body")
                .child(DocumentNode::new("button").text("zero"))
                .child(DocumentNode::new("x-outer").embed(middle)),
        );

        let shallow = ClassifierRegistry::new(0).with_classifier(Box::new(ButtonClassifier::new("b", 1)));
        assert_eq!(names(&shallow.scan_all(&doc)), vec!["b.zero"]);

        let one = ClassifierRegistry::new(1).with_classifier(Box::new(ButtonClassifier::new("b", 1)));
        assert_eq!(names(&one.scan_all(&doc)), vec!["b.one", "b.zero"]);

        let deep = ClassifierRegistry::new(5).with_classifier(Box::new(ButtonClassifier::new("b", 1)));
        assert_eq!(names(&deep.scan_all(&doc)), vec!["b.one", "b.two", "b.zero"]);
    }

    #[test]
    fn test_emission_cap_enforced() {
        let mut capped = ButtonClassifier::new("b", 1);
        capped.cap = 2;
        let registry = ClassifierRegistry::new(0).with_classifier(Box::new(capped));
        let doc = Document::from_tree(buttons(&["a", "b", "c", "d"]));
        assert_eq!(registry.scan_all(&doc).len(), 2);
    }

    #[test]
    fn test_duplicate_names_keep_highest_confidence() {
        // Two embedded roots each with a button labelled "same".
        let embedded = || DocumentNode::new("root").child(DocumentNode::new("button").text("same"));
        let doc = Document::from_tree(
            DocumentNode::new("body")
                .child(DocumentNode::new("x-a").embed(embedded()))
                .child(DocumentNode::new("x-b").embed(embedded())),
        );
        let registry = ClassifierRegistry::new(1).with_classifier(Box::new(ButtonClassifier::new("b", 1)));
        let tools = registry.scan_all(&doc);
        assert_eq!(tools.len(), 1);
    }

    #[test]
    fn test_scan_is_deterministic() {
        let doc = Document::from_tree(
            DocumentNode::new("body")
                .child(DocumentNode::new("nav").child(DocumentNode::new("a").attr("href", "/").text("Home")))
                .child(
                    DocumentNode::new("form")
                        .attr("role", "search")
                        .child(DocumentNode::new("input").attr("name", "q")),
                )
                .child(DocumentNode::new("button").attr("aria-label", "Like").text("+1"))
                .child(DocumentNode::new("button").text("Subscribe now")),
        );
        let registry = ClassifierRegistry::default();
        let first: HashSet<String> = registry.scan_all(&doc).into_iter().map(|t| t.name).collect();
        let second: HashSet<String> = registry.scan_all(&doc).into_iter().map(|t| t.name).collect();
        assert_eq!(first, second);
        assert!(first.contains("nav.home"));
        assert!(first.contains("search.q"));
        assert!(first.contains("social.like"));
        assert!(first.contains("social.subscribe-now"));
        assert!(!first.iter().any(|n| n.starts_with("ui.")));
    }

    #[test]
    fn test_handles_resolve_within_scan_only() {
        let doc = Document::from_tree(buttons(&["go"]));
        let registry = ClassifierRegistry::new(0).with_classifier(Box::new(ButtonClassifier::new("ui", 1)));
        let arena = ScanArena::new(&doc);
        let tools = registry.scan_with_arena(&arena);
        let handle = tools[0].backing.unwrap();
        assert_eq!(arena.resolve(handle).unwrap().tag, "button");

        let later = ScanArena::new(&doc);
        assert!(later.resolve(handle).is_err());
    }
}
