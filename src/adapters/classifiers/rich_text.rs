//! Rich-text editing surfaces: contenteditable regions and ARIA textboxes.

use serde_json::json;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Capability, Category, DocumentRoot, Element, ScanArena, ToolAnnotations};
use crate::domain::ports::Classifier;
use crate::services::claim_tracker::ClaimTracker;
use crate::services::confidence::slugify;

use super::{candidate, slug_source};

const MAX_EDITORS: usize = 10;

/// Detects rich-text editors.
#[derive(Debug, Clone, Copy, Default)]
pub struct RichTextClassifier;

impl RichTextClassifier {
    fn is_editor(element: &Element) -> bool {
        let editable = element
            .attr("contenteditable")
            .is_some_and(|v| v.is_empty() || v.eq_ignore_ascii_case("true") || v == "plaintext-only");
        let textbox = element.attr("role") == Some("textbox")
            && !element.is("input")
            && !element.is("textarea");
        editable || textbox
    }
}

impl Classifier for RichTextClassifier {
    fn category(&self) -> Category {
        Category::RichText
    }

    fn name(&self) -> &'static str {
        "rich-text"
    }

    fn priority(&self) -> u8 {
        20
    }

    fn emission_cap(&self) -> usize {
        MAX_EDITORS
    }

    fn scan(
        &self,
        root: DocumentRoot<'_>,
        arena: &ScanArena<'_>,
        claims: &mut ClaimTracker,
    ) -> DomainResult<Vec<Capability>> {
        let mut found = Vec::new();
        for element in root.elements() {
            if found.len() >= MAX_EDITORS {
                break;
            }
            if !Self::is_editor(element) || !claims.claim(element.id) {
                continue;
            }
            // Nested editable children belong to this editor.
            claims.claim_all(root.descendants_of(element).iter().map(|el| el.id));

            let source = slug_source(&root, element);
            let slug = if source.is_empty() { "editor".to_string() } else { slugify(&source) };
            let tool = candidate(&root, arena, element, Category::RichText, format!("richtext.{slug}"))
                .with_description("Write formatted text into an editor")
                .with_schema(json!({
                    "type": "object",
                    "properties": {
                        "text": { "type": "string", "description": "Content to insert" }
                    },
                    "required": ["text"]
                }))
                .with_annotations(ToolAnnotations {
                    read_only_hint: Some(false),
                    destructive_hint: Some(false),
                    idempotent_hint: Some(true),
                    open_world_hint: None,
                });
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
    fn test_contenteditable_detected_once() {
        let doc = Document::from_tree(
            DocumentNode::new("body").child(
                DocumentNode::new("div")
                    .attr("contenteditable", "true")
                    .attr("aria-label", "Message body")
                    .child(DocumentNode::new("p").attr("contenteditable", "true")),
            ),
        );
        let tools = run(&RichTextClassifier, &doc);
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "richtext.message-body");
        assert_eq!(tools[0].input_schema["required"][0], "text");
    }

    #[test]
    fn test_plain_textarea_ignored() {
        let doc = Document::from_tree(
            DocumentNode::new("body").child(DocumentNode::new("textarea").attr("role", "textbox")),
        );
        assert!(run(&RichTextClassifier, &doc).is_empty());
    }
}
