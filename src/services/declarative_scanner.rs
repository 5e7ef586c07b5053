//! Declarative tier: capabilities annotated by the page author.
//!
//! An element carrying a `toolname` attribute declares a capability.
//! Supported attributes:
//!
//! - `toolname` (required): capability name, used verbatim
//! - `tooldescription`: human-readable description
//! - `tooltitle`: title; defaults to the name
//! - `toolcategory`: category; defaults to `form` for forms, else `interactive`
//! - `toolreadonly`: marks the capability side-effect free
//!
//! On a `<form>`, named fields become schema properties. Fields may refine
//! their property with `toolparamdescription`.

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::adapters::classifiers::form::json_type_for_input;
use crate::domain::models::{
    Capability, Category, DocumentRoot, Element, ElementId, ScanArena, ToolAnnotations, ToolSource,
};

const SKIPPED_INPUT_TYPES: &[&str] = &["submit", "button", "reset", "image"];

/// Scans a document for author-declared capabilities.
#[derive(Debug, Clone)]
pub struct DeclarativeScanner {
    max_embed_depth: usize,
}

impl Default for DeclarativeScanner {
    fn default() -> Self {
        Self::new(crate::services::classifier_registry::DEFAULT_MAX_EMBED_DEPTH)
    }
}

impl DeclarativeScanner {
    /// Scanner following embedded roots up to `max_embed_depth` levels.
    pub fn new(max_embed_depth: usize) -> Self {
        Self { max_embed_depth }
    }

    /// Every declared capability in the arena's document, embedded roots
    /// included up to the depth bound.
    pub fn scan(&self, arena: &ScanArena<'_>) -> Vec<Capability> {
        let document = arena.document();
        let mut found = Vec::new();
        let mut frontier: Vec<ElementId> = vec![document.root().id()];

        for _ in 0..=self.max_embed_depth {
            let mut next = Vec::new();
            for root in frontier.into_iter().filter_map(|id| document.root_at(id)) {
                for element in root.elements() {
                    if let Some(tool) = Self::declared(&root, arena, element) {
                        found.push(tool);
                    }
                }
                next.extend(root.embedded_roots());
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }

        debug!(count = found.len(), "declarative scan complete");
        found
    }

    fn declared(root: &DocumentRoot<'_>, arena: &ScanArena<'_>, element: &Element) -> Option<Capability> {
        let name = element.non_empty_attr("toolname")?;
        let is_form = element.is("form");
        let category = element
            .non_empty_attr("toolcategory")
            .and_then(Category::from_str)
            .unwrap_or(if is_form {
                Category::Form
            } else {
                Category::Interactive
            });

        let mut tool = Capability::new(name, category, ToolSource::Declarative, 1.0)
            .with_title(element.non_empty_attr("tooltitle").unwrap_or(name))
            .with_description(element.non_empty_attr("tooldescription").unwrap_or_default())
            .with_backing(arena.handle(element.id));
        if is_form {
            tool = tool.with_schema(Self::form_schema(root, element));
        }
        if element
            .attr("toolreadonly")
            .is_some_and(|v| !v.eq_ignore_ascii_case("false"))
        {
            tool = tool.with_annotations(ToolAnnotations::read_only());
        }
        Some(tool)
    }

    fn form_schema(root: &DocumentRoot<'_>, form: &Element) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for field in root.descendants_of(form) {
            if !(field.is("input") || field.is("select") || field.is("textarea")) {
                continue;
            }
            let kind = field.input_type().unwrap_or_else(|| "text".to_string());
            if SKIPPED_INPUT_TYPES.contains(&kind.as_str()) {
                continue;
            }
            let Some(key) = field.non_empty_attr("name") else {
                continue;
            };

            let (ty, format) = json_type_for_input(&kind);
            let mut property = Map::new();
            property.insert("type".into(), json!(ty));
            if let Some(format) = format {
                property.insert("format".into(), json!(format));
            }
            let description = field
                .non_empty_attr("toolparamdescription")
                .map(str::to_string)
                .or_else(|| root.label_for(field));
            if let Some(description) = description {
                property.insert("description".into(), json!(description));
            }
            properties.insert(key.to_string(), Value::Object(property));
            if field.has_attr("required") {
                required.push(json!(key));
            }
        }

        let mut schema = json!({ "type": "object", "properties": properties });
        if !required.is_empty() {
            schema["required"] = Value::Array(required);
        }
        schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Document, DocumentNode};

    #[test]
    fn test_declared_form_with_schema() {
        let doc = Document::from_tree(
            DocumentNode::new("body").child(
                DocumentNode::new("form")
                    .attr("toolname", "book_table")
                    .attr("tooldescription", "Reserve a table")
                    .child(
                        DocumentNode::new("input")
                            .attr("name", "guests")
                            .attr("type", "number")
                            .attr("required", "")
                            .attr("toolparamdescription", "Party size"),
                    )
                    .child(DocumentNode::new("input").attr("name", "date").attr("type", "date"))
                    .child(DocumentNode::new("button").attr("type", "submit").text("Book")),
            ),
        );
        let arena = ScanArena::new(&doc);
        let tools = DeclarativeScanner::default().scan(&arena);

        assert_eq!(tools.len(), 1);
        let tool = &tools[0];
        assert_eq!(tool.name, "book_table");
        assert_eq!(tool.source, ToolSource::Declarative);
        assert_eq!(tool.category, Category::Form);
        assert!((tool.confidence - 1.0).abs() < f64::EPSILON);
        assert_eq!(tool.input_schema["properties"]["guests"]["type"], "number");
        assert_eq!(tool.input_schema["properties"]["guests"]["description"], "Party size");
        assert_eq!(tool.input_schema["properties"]["date"]["format"], "date");
        assert_eq!(tool.input_schema["required"][0], "guests");
        assert!(tool.backing.is_some());
    }

    #[test]
    fn test_declared_button_category_and_readonly() {
        let doc = Document::from_tree(
            DocumentNode::new("body")
                .child(
                    DocumentNode::new("button")
                        .attr("toolname", "media.refresh_feed")
                        .attr("toolcategory", "media")
                        .attr("toolreadonly", ""),
                )
                .child(DocumentNode::new("button").attr("toolname", "  ")),
        );
        let arena = ScanArena::new(&doc);
        let tools = DeclarativeScanner::default().scan(&arena);
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].category, Category::Media);
        assert_eq!(tools[0].annotations.read_only_hint, Some(true));
        assert_eq!(tools[0].input_schema, crate::domain::models::empty_object_schema());
    }

    #[test]
    fn test_embedded_declarations_found() {
        let doc = Document::from_tree(
            DocumentNode::new("body").child(
                DocumentNode::new("x-widget").embed(
                    DocumentNode::new("root")
                        .child(DocumentNode::new("button").attr("toolname", "widget.open")),
                ),
            ),
        );
        let arena = ScanArena::new(&doc);
        assert_eq!(DeclarativeScanner::new(1).scan(&arena).len(), 1);
        assert!(DeclarativeScanner::new(0).scan(&arena).is_empty());
    }
}
