//! Reference classifiers.
//!
//! A small, conservative heuristic set that makes the discovery pipeline
//! usable out of the box. Run order (lowest priority value first):
//!
//! | classifier  | priority | category        |
//! |-------------|----------|-----------------|
//! | social      | 10       | social-action   |
//! | rich-text   | 20       | rich-text       |
//! | search      | 30       | search          |
//! | form        | 40       | form / auth     |
//! | media       | 50       | media           |
//! | navigation  | 60       | navigation      |
//! | interactive | 90       | interactive     |
//!
//! Specific surfaces must claim their controls before the generic
//! interactive classifier runs.

pub mod form;
pub mod interactive;
pub mod media;
pub mod navigation;
pub mod rich_text;
pub mod search;
pub mod social;

pub use form::FormClassifier;
pub use interactive::InteractiveClassifier;
pub use media::MediaClassifier;
pub use navigation::NavigationClassifier;
pub use rich_text::RichTextClassifier;
pub use search::SearchClassifier;
pub use social::SocialClassifier;

use crate::domain::models::{Capability, Category, DocumentRoot, Element, ScanArena, ToolSource};
use crate::domain::ports::Classifier;
use crate::services::confidence::{resolve_label, score_element};

/// The reference classifier set.
pub fn default_classifiers() -> Vec<Box<dyn Classifier>> {
    vec![
        Box::new(SocialClassifier),
        Box::new(RichTextClassifier),
        Box::new(SearchClassifier),
        Box::new(FormClassifier),
        Box::new(MediaClassifier),
        Box::new(NavigationClassifier),
        Box::new(InteractiveClassifier),
    ]
}

/// Build an inferred candidate backed by `element`.
pub(crate) fn candidate(
    root: &DocumentRoot<'_>,
    arena: &ScanArena<'_>,
    element: &Element,
    category: Category,
    name: String,
) -> Capability {
    let title = resolve_label(root, element).unwrap_or_else(|| name.clone());
    Capability::new(name, category, ToolSource::Inferred, score_element(root, element))
        .with_title(title)
        .with_backing(arena.handle(element.id))
}

/// Text used to derive an action slug: label, then id, then name.
pub(crate) fn slug_source(root: &DocumentRoot<'_>, element: &Element) -> String {
    resolve_label(root, element)
        .or_else(|| element.non_empty_attr("id").map(str::to_string))
        .or_else(|| element.non_empty_attr("name").map(str::to_string))
        .unwrap_or_default()
}
