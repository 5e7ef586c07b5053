//! Social-action controls: like, share, follow, comment.

use crate::domain::errors::DomainResult;
use crate::domain::models::{Capability, Category, DocumentRoot, Element, ScanArena, ToolAnnotations};
use crate::domain::ports::Classifier;
use crate::services::claim_tracker::ClaimTracker;
use crate::services::confidence::slugify;

use super::{candidate, slug_source};

const MAX_SOCIAL: usize = 20;

const SOCIAL_VERBS: &[&str] = &[
    "like", "unlike", "share", "follow", "unfollow", "comment", "reply", "repost", "retweet",
    "subscribe", "upvote", "downvote", "react", "bookmark",
];

/// Detects social interaction buttons.
#[derive(Debug, Clone, Copy, Default)]
pub struct SocialClassifier;

impl SocialClassifier {
    fn verb(root: &DocumentRoot<'_>, element: &Element) -> Option<&'static str> {
        let haystack = [
            element.attr("data-action").unwrap_or_default().to_lowercase(),
            element.attr("data-testid").unwrap_or_default().to_lowercase(),
            slug_source(root, element).to_lowercase(),
        ]
        .join(" ");
        let words: Vec<&str> = haystack
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        SOCIAL_VERBS.iter().copied().find(|verb| words.contains(verb))
    }

    fn is_clickable(element: &Element) -> bool {
        element.is("button") || element.is("a") || element.attr("role") == Some("button")
    }
}

impl Classifier for SocialClassifier {
    fn category(&self) -> Category {
        Category::SocialAction
    }

    fn name(&self) -> &'static str {
        "social"
    }

    fn priority(&self) -> u8 {
        10
    }

    fn emission_cap(&self) -> usize {
        MAX_SOCIAL
    }

    fn scan(
        &self,
        root: DocumentRoot<'_>,
        arena: &ScanArena<'_>,
        claims: &mut ClaimTracker,
    ) -> DomainResult<Vec<Capability>> {
        let mut found = Vec::new();
        for element in root.elements() {
            if found.len() >= MAX_SOCIAL {
                break;
            }
            if !Self::is_clickable(element) || claims.is_claimed(element.id) {
                continue;
            }
            let Some(verb) = Self::verb(&root, element) else {
                continue;
            };
            if !claims.claim(element.id) {
                continue;
            }

            let name = format!("social.{}", slugify(&slug_source(&root, element)));
            let tool = candidate(&root, arena, element, Category::SocialAction, name)
                .with_description(format!("Social action: {verb}"))
                .with_annotations(ToolAnnotations {
                    read_only_hint: Some(false),
                    destructive_hint: Some(false),
                    idempotent_hint: Some(false),
                    open_world_hint: Some(true),
                });
            found.push(tool);
        }
        Ok(found)
    }
}
