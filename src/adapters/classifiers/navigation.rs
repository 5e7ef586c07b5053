//! Navigation links inside nav landmarks.

use serde_json::json;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Capability, Category, DocumentRoot, Element, ScanArena, ToolAnnotations};
use crate::domain::ports::Classifier;
use crate::services::claim_tracker::ClaimTracker;
use crate::services::confidence::slugify;

use super::{candidate, slug_source};

const MAX_LINKS: usize = 30;

/// Detects links inside `<nav>` or `role="navigation"` landmarks.
#[derive(Debug, Clone, Copy, Default)]
pub struct NavigationClassifier;

impl NavigationClassifier {
    fn in_landmark(root: &DocumentRoot<'_>, element: &Element) -> bool {
        let mut current = element.parent;
        while let Some(id) = current {
            let Some(el) = root.document().element(id) else {
                return false;
            };
            if el.is("nav") || el.attr("role") == Some("navigation") {
                return true;
            }
            current = el.parent;
        }
        false
    }
}

impl Classifier for NavigationClassifier {
    fn category(&self) -> Category {
        Category::Navigation
    }

    fn name(&self) -> &'static str {
        "navigation"
    }

    fn priority(&self) -> u8 {
        60
    }

    fn emission_cap(&self) -> usize {
        MAX_LINKS
    }

    fn scan(
        &self,
        root: DocumentRoot<'_>,
        arena: &ScanArena<'_>,
        claims: &mut ClaimTracker,
    ) -> DomainResult<Vec<Capability>> {
        let mut found = Vec::new();
        for link in root.select("a") {
            if found.len() >= MAX_LINKS {
                break;
            }
            let Some(href) = link.non_empty_attr("href") else {
                continue;
            };
            if href.starts_with("javascript:") || !Self::in_landmark(&root, link) {
                continue;
            }
            if !claims.claim(link.id) {
                continue;
            }

            let label = slug_source(&root, link);
            let tool = candidate(&root, arena, link, Category::Navigation, format!("nav.{}", slugify(&label)))
                .with_description(format!("Navigate to {href}"))
                .with_schema(json!({ "type": "object", "properties": {} }))
                .with_annotations(ToolAnnotations::read_only());
            found.push(tool);
        }
        Ok(found)
    }
}
