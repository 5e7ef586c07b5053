//! Capability domain models.
//!
//! A capability (also called a tool) is a named, schema-described action or
//! query that a page exposes: a search box, a login form, a play button.
//! Capabilities are discovered per scan by three tiers (native,
//! declarative, inferred) and merged into one list with unique names.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

use super::document::{ElementId, ScanId};

/// The closed set of capability categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Form,
    Navigation,
    Search,
    Media,
    Commerce,
    Auth,
    SocialAction,
    FileUpload,
    RichText,
    PageState,
    StructuredData,
    Interactive,
}

impl Category {
    /// Returns the string representation of this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Form => "form",
            Self::Navigation => "navigation",
            Self::Search => "search",
            Self::Media => "media",
            Self::Commerce => "commerce",
            Self::Auth => "auth",
            Self::SocialAction => "social-action",
            Self::FileUpload => "file-upload",
            Self::RichText => "rich-text",
            Self::PageState => "page-state",
            Self::StructuredData => "structured-data",
            Self::Interactive => "interactive",
        }
    }

    /// Parse a category from a string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "form" => Some(Self::Form),
            "navigation" | "nav" => Some(Self::Navigation),
            "search" => Some(Self::Search),
            "media" => Some(Self::Media),
            "commerce" => Some(Self::Commerce),
            "auth" => Some(Self::Auth),
            "social-action" | "social" => Some(Self::SocialAction),
            "file-upload" => Some(Self::FileUpload),
            "rich-text" => Some(Self::RichText),
            "page-state" => Some(Self::PageState),
            "structured-data" => Some(Self::StructuredData),
            "interactive" => Some(Self::Interactive),
            _ => None,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which discovery tier produced a capability.
///
/// Ordering follows merge priority: a lower rank wins a name collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolSource {
    /// Declared by the platform itself.
    Native,
    /// Annotated by the page author in the document.
    Declarative,
    /// Heuristically classified from document structure.
    Inferred,
    /// Served from a previously built manifest.
    Manifest,
}

impl ToolSource {
    /// Returns the string representation of this source.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::Declarative => "declarative",
            Self::Inferred => "inferred",
            Self::Manifest => "manifest",
        }
    }

    /// Merge rank; lower wins.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Native => 0,
            Self::Declarative => 1,
            Self::Inferred => 2,
            Self::Manifest => 3,
        }
    }
}

impl std::fmt::Display for ToolSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Behavioral hints attached to a capability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolAnnotations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only_hint: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destructive_hint: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotent_hint: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_world_hint: Option<bool>,
}

impl ToolAnnotations {
    /// Annotations for a side-effect-free query.
    pub fn read_only() -> Self {
        Self {
            read_only_hint: Some(true),
            destructive_hint: Some(false),
            idempotent_hint: Some(true),
            open_world_hint: None,
        }
    }

    /// Whether no hint is set.
    pub fn is_empty(&self) -> bool {
        self.read_only_hint.is_none()
            && self.destructive_hint.is_none()
            && self.idempotent_hint.is_none()
            && self.open_world_hint.is_none()
    }
}

/// Opaque reference to the control that produced a capability.
///
/// Only valid inside the scan that created it; resolve through
/// [`ScanArena::resolve`](super::document::ScanArena::resolve).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle {
    pub(crate) scan: ScanId,
    pub(crate) element: ElementId,
}

impl ElementHandle {
    /// The scan this handle belongs to.
    pub fn scan(&self) -> ScanId {
        self.scan
    }
}

/// Confidence bounded to `[0, 1]`; NaN counts as no confidence.
fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn deserialize_confidence<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    f64::deserialize(deserializer).map(clamp_confidence)
}

/// The schema used when a capability carries none or a malformed one.
pub fn empty_object_schema() -> Value {
    json!({ "type": "object", "properties": {} })
}

/// A discovered capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capability {
    /// Hierarchical `category.action-slug` name.
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: Category,
    #[serde(default = "empty_object_schema")]
    pub input_schema: Value,
    #[serde(default, skip_serializing_if = "ToolAnnotations::is_empty")]
    pub annotations: ToolAnnotations,
    #[serde(deserialize_with = "deserialize_confidence")]
    pub confidence: f64,
    pub source: ToolSource,
    /// Scan-scoped backing element; never serialized.
    #[serde(skip)]
    pub backing: Option<ElementHandle>,
}

impl Capability {
    /// Create a capability with an empty schema and no annotations.
    pub fn new(
        name: impl Into<String>,
        category: Category,
        source: ToolSource,
        confidence: f64,
    ) -> Self {
        let name = name.into();
        Self {
            title: name.clone(),
            name,
            description: String::new(),
            category,
            input_schema: empty_object_schema(),
            annotations: ToolAnnotations::default(),
            confidence: clamp_confidence(confidence),
            source,
            backing: None,
        }
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the input schema.
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }

    /// Set the annotations.
    pub fn with_annotations(mut self, annotations: ToolAnnotations) -> Self {
        self.annotations = annotations;
        self
    }

    /// Attach the scan-scoped backing element.
    pub fn with_backing(mut self, handle: ElementHandle) -> Self {
        self.backing = Some(handle);
        self
    }

    /// Drop every transient field so the value can cross a storage or
    /// transport boundary.
    pub fn stripped(mut self) -> Self {
        self.backing = None;
        self
    }

    /// Replace a missing or non-object schema with the empty-object schema.
    pub fn sanitize_schema(&mut self) {
        let valid = self
            .input_schema
            .as_object()
            .is_some_and(|obj| obj.get("type").map_or(true, |t| t == "object"));
        if !valid {
            self.input_schema = empty_object_schema();
        }
    }
}
