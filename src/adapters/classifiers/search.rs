//! Search boxes.

use serde_json::json;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Capability, Category, DocumentRoot, Element, ScanArena, ToolAnnotations};
use crate::domain::ports::Classifier;
use crate::services::claim_tracker::ClaimTracker;
use crate::services::confidence::slugify;

use super::candidate;

const MAX_SEARCH: usize = 5;
const QUERY_FIELD_NAMES: &[&str] = &["q", "query", "search", "s", "keyword", "keywords", "term"];

/// Detects site search inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchClassifier;

impl SearchClassifier {
    fn is_text_input(element: &Element) -> bool {
        matches!(element.input_type().as_deref(), Some("text" | "search"))
    }

    fn in_search_container(root: &DocumentRoot<'_>, element: &Element) -> bool {
        if root.closest(element, "search").is_some() {
            return true;
        }
        root.closest(element, "form").is_some_and(|form| {
            form.attr("role") == Some("search")
                || form
                    .attr("action")
                    .is_some_and(|action| action.to_lowercase().contains("search"))
        })
    }

    fn is_search_input(root: &DocumentRoot<'_>, element: &Element) -> bool {
        if element.input_type().as_deref() == Some("search") {
            return true;
        }
        if !Self::is_text_input(element) {
            return false;
        }
        let named = element
            .attr("name")
            .is_some_and(|name| QUERY_FIELD_NAMES.contains(&name.to_lowercase().as_str()));
        let hinted = ["placeholder", "aria-label", "title"].iter().any(|attr| {
            element
                .attr(attr)
                .is_some_and(|v| v.to_lowercase().contains("search"))
        });
        named || hinted || Self::in_search_container(root, element)
    }
}

impl Classifier for SearchClassifier {
    fn category(&self) -> Category {
        Category::Search
    }

    fn name(&self) -> &'static str {
        "search"
    }

    fn priority(&self) -> u8 {
        30
    }

    fn emission_cap(&self) -> usize {
        MAX_SEARCH
    }

    fn scan(
        &self,
        root: DocumentRoot<'_>,
        arena: &ScanArena<'_>,
        claims: &mut ClaimTracker,
    ) -> DomainResult<Vec<Capability>> {
        let mut found = Vec::new();
        for element in root.select("input") {
            if found.len() >= MAX_SEARCH {
                break;
            }
            if claims.is_claimed(element.id) || !Self::is_search_input(&root, element) {
                continue;
            }
            claims.claim(element.id);
            if let Some(form) = root.closest(element, "form") {
                claims.claim(form.id);
                claims.claim_all(root.descendants_of(form).iter().map(|el| el.id));
            }

            let key = element
                .non_empty_attr("name")
                .or_else(|| element.non_empty_attr("id"))
                .unwrap_or("query");
            let tool = candidate(&root, arena, element, Category::Search, format!("search.{}", slugify(key)))
                .with_description("Search this site")
                .with_schema(json!({
                    "type": "object",
                    "properties": {
                        "query": { "type": "string", "description": "Search terms" }
                    },
                    "required": ["query"]
                }))
                .with_annotations(ToolAnnotations::read_only());
            found.push(tool);
        }
        Ok(found)
    }
}
