//! Shared confidence scoring.
//!
//! Every classifier scores through [`score`] so confidences from different
//! categories are comparable during merge.

use crate::domain::models::{DocumentRoot, Element};

const BASELINE: f64 = 0.4;
const ACCESSIBLE_LABEL_BONUS: f64 = 0.15;
const RESOLVABLE_LABEL_BONUS: f64 = 0.15;
const STABLE_ID_BONUS: f64 = 0.10;
const EXPLICIT_ROLE_BONUS: f64 = 0.10;
const SEMANTIC_TAG_BONUS: f64 = 0.10;
const HIDDEN_PENALTY: f64 = 0.20;

/// Tags that carry their own interaction semantics.
const SEMANTIC_TAGS: &[&str] = &[
    "a", "audio", "button", "details", "dialog", "form", "input", "nav", "search", "select",
    "summary", "textarea", "video",
];

/// Observable properties of an element that raise or lower confidence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfidenceSignals {
    /// `aria-label` or `aria-labelledby` present.
    pub accessible_label: bool,
    /// A human-readable label can be resolved (label element, title,
    /// placeholder, or visible text).
    pub resolvable_label: bool,
    /// `id` or `name` present.
    pub stable_id: bool,
    /// Explicit `role` attribute present.
    pub explicit_role: bool,
    /// Element uses a semantic tag.
    pub semantic_tag: bool,
    pub visible: bool,
}

/// Score a set of signals into `[0, 1]`.
pub fn score(signals: &ConfidenceSignals) -> f64 {
    let mut value = BASELINE;
    if signals.accessible_label {
        value += ACCESSIBLE_LABEL_BONUS;
    }
    if signals.resolvable_label {
        value += RESOLVABLE_LABEL_BONUS;
    }
    if signals.stable_id {
        value += STABLE_ID_BONUS;
    }
    if signals.explicit_role {
        value += EXPLICIT_ROLE_BONUS;
    }
    if signals.semantic_tag {
        value += SEMANTIC_TAG_BONUS;
    }
    if !signals.visible {
        value -= HIDDEN_PENALTY;
    }
    value.clamp(0.0, 1.0)
}

/// Derive signals for an element.
pub fn signals_for(root: &DocumentRoot<'_>, element: &Element) -> ConfidenceSignals {
    ConfidenceSignals {
        accessible_label: element.non_empty_attr("aria-label").is_some()
            || element.non_empty_attr("aria-labelledby").is_some(),
        resolvable_label: resolve_label(root, element).is_some(),
        stable_id: element.non_empty_attr("id").is_some() || element.non_empty_attr("name").is_some(),
        explicit_role: element.non_empty_attr("role").is_some(),
        semantic_tag: SEMANTIC_TAGS.iter().any(|tag| element.is(tag)),
        visible: root.is_visible(element),
    }
}

/// Shorthand for `score(&signals_for(root, element))`.
pub fn score_element(root: &DocumentRoot<'_>, element: &Element) -> f64 {
    score(&signals_for(root, element))
}

/// Best human-readable label for an element.
///
/// Order: `aria-label`, bound `<label>`, `title`, `placeholder`, own text,
/// `value` of button-like inputs.
pub fn resolve_label(root: &DocumentRoot<'_>, element: &Element) -> Option<String> {
    if let Some(label) = element.non_empty_attr("aria-label") {
        return Some(label.to_string());
    }
    if let Some(label) = root.label_for(element) {
        return Some(label);
    }
    for attr in ["title", "placeholder", "alt"] {
        if let Some(value) = element.non_empty_attr(attr) {
            return Some(value.to_string());
        }
    }
    let text = root.text_content(element);
    if !text.is_empty() {
        return Some(text);
    }
    element.non_empty_attr("value").map(str::to_string)
}

/// Lowercase, hyphen-separated slug for the action part of a name.
///
/// Keeps at most six words so long labels still produce stable names.
pub fn slugify(text: &str) -> String {
    let words: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .take(6)
        .map(str::to_lowercase)
        .collect();
    if words.is_empty() {
        "action".to_string()
    } else {
        words.join("-")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Document, DocumentNode};

    #[test]
    fn test_baseline_only() {
        let signals = ConfidenceSignals {
            visible: true,
            ..Default::default()
        };
        assert!((score(&signals) - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_all_bonuses_clamp_to_one() {
        let signals = ConfidenceSignals {
            accessible_label: true,
            resolvable_label: true,
            stable_id: true,
            explicit_role: true,
            semantic_tag: true,
            visible: true,
        };
        assert!((score(&signals) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_hidden_penalty() {
        let signals = ConfidenceSignals {
            visible: false,
            ..Default::default()
        };
        assert!((score(&signals) - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_signals_from_element() {
        let doc = Document::from_tree(
            DocumentNode::new("body").child(
                DocumentNode::new("button")
                    .attr("id", "play")
                    .attr("aria-label", "Play video")
                    .text("Play"),
            ),
        );
        let root = doc.root();
        let button = root.select("button")[0];
        let signals = signals_for(&root, button);

        assert!(signals.accessible_label);
        assert!(signals.resolvable_label);
        assert!(signals.stable_id);
        assert!(!signals.explicit_role);
        assert!(signals.semantic_tag);
        assert!(signals.visible);
        assert!((score_element(&root, button) - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Add to Cart!"), "add-to-cart");
        assert_eq!(slugify("   "), "action");
        assert_eq!(slugify("one two three four five six seven"), "one-two-three-four-five-six");
    }
}
