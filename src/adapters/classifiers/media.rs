//! Audio and video players.

use serde_json::json;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Capability, Category, DocumentRoot, ScanArena, ToolAnnotations};
use crate::domain::ports::Classifier;
use crate::services::claim_tracker::ClaimTracker;
use crate::services::confidence::slugify;

use super::candidate;

const MAX_PLAYERS: usize = 5;

/// Emits one control capability per media element.
#[derive(Debug, Clone, Copy, Default)]
pub struct MediaClassifier;

impl Classifier for MediaClassifier {
    fn category(&self) -> Category {
        Category::Media
    }

    fn name(&self) -> &'static str {
        "media"
    }

    fn priority(&self) -> u8 {
        50
    }

    fn emission_cap(&self) -> usize {
        MAX_PLAYERS
    }

    fn scan(
        &self,
        root: DocumentRoot<'_>,
        arena: &ScanArena<'_>,
        claims: &mut ClaimTracker,
    ) -> DomainResult<Vec<Capability>> {
        let mut found = Vec::new();
        let players = root
            .elements()
            .into_iter()
            .filter(|el| el.is("video") || el.is("audio"));

        for (index, player) in players.enumerate() {
            if found.len() >= MAX_PLAYERS {
                break;
            }
            if !claims.claim(player.id) {
                continue;
            }
            claims.claim_all(root.descendants_of(player).iter().map(|el| el.id));

            let kind = player.tag.as_str();
            let slug = player
                .non_empty_attr("aria-label")
                .or_else(|| player.non_empty_attr("id"))
                .or_else(|| player.non_empty_attr("title"))
                .map_or_else(|| format!("{kind}-{}", index + 1), slugify);
            let tool = candidate(&root, arena, player, Category::Media, format!("media.{slug}"))
                .with_description(format!("Control the {kind} player"))
                .with_schema(json!({
                    "type": "object",
                    "properties": {
                        "action": { "type": "string", "enum": ["play", "pause", "seek", "mute", "unmute"] },
                        "time": { "type": "number", "description": "Seek position in seconds" }
                    },
                    "required": ["action"]
                }))
                .with_annotations(ToolAnnotations {
                    read_only_hint: Some(false),
                    destructive_hint: Some(false),
                    idempotent_hint: Some(true),
                    open_world_hint: Some(false),
                });
            found.push(tool);
        }
        Ok(found)
    }
}
