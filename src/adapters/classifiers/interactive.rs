//! Catch-all for buttons nothing else claimed. Runs last.

use crate::domain::errors::DomainResult;
use crate::domain::models::{Capability, Category, DocumentRoot, Element, ScanArena};
use crate::domain::ports::Classifier;
use crate::services::claim_tracker::ClaimTracker;
use crate::services::confidence::slugify;

use super::{candidate, slug_source};

const MAX_BUTTONS: usize = 25;

/// Detects unclaimed generic buttons.
#[derive(Debug, Clone, Copy, Default)]
pub struct InteractiveClassifier;

impl InteractiveClassifier {
    fn is_button(element: &Element) -> bool {
        element.is("button")
            || element.attr("role") == Some("button")
            || matches!(element.input_type().as_deref(), Some("button" | "submit"))
    }
}

impl Classifier for InteractiveClassifier {
    fn category(&self) -> Category {
        Category::Interactive
    }

    fn name(&self) -> &'static str {
        "interactive"
    }

    fn priority(&self) -> u8 {
        90
    }

    fn emission_cap(&self) -> usize {
        MAX_BUTTONS
    }

    fn scan(
        &self,
        root: DocumentRoot<'_>,
        arena: &ScanArena<'_>,
        claims: &mut ClaimTracker,
    ) -> DomainResult<Vec<Capability>> {
        let mut found = Vec::new();
        for element in root.elements() {
            if found.len() >= MAX_BUTTONS {
                break;
            }
            if !Self::is_button(element) || element.has_attr("disabled") {
                continue;
            }
            let label = slug_source(&root, element);
            if label.is_empty() || !claims.claim(element.id) {
                continue;
            }

            let tool = candidate(&root, arena, element, Category::Interactive, format!("ui.{}", slugify(&label)))
                .with_description(format!("Click '{label}'"));
            found.push(tool);
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::classifiers::test_support::run;
    use crate::domain::models::{Document, DocumentNode};

    #[test]
    fn test_labeled_buttons_only() {
        let doc = Document::from_tree(
            DocumentNode::new("body")
                .child(DocumentNode::new("button").text("Load more"))
                .child(DocumentNode::new("button"))
                .child(DocumentNode::new("button").attr("disabled", "").text("Nope")),
        );
        let tools = run(&InteractiveClassifier, &doc);
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "ui.load-more");
        assert_eq!(tools[0].description, "Click 'Load more'");
    }
}
