//! Generic forms. Forms with a password field are classified as auth.

use serde_json::{json, Map, Value};

use crate::domain::errors::DomainResult;
use crate::domain::models::{Capability, Category, DocumentRoot, Element, ScanArena, ToolAnnotations};
use crate::domain::ports::Classifier;
use crate::services::claim_tracker::ClaimTracker;
use crate::services::confidence::slugify;

use super::{candidate, slug_source};

const MAX_FORMS: usize = 15;
const SKIPPED_INPUT_TYPES: &[&str] = &["submit", "button", "reset", "image", "hidden"];

/// JSON type and optional format for an `<input type>`.
pub(crate) fn json_type_for_input(kind: &str) -> (&'static str, Option<&'static str>) {
    match kind {
        "number" | "range" => ("number", None),
        "checkbox" => ("boolean", None),
        "email" => ("string", Some("email")),
        "url" => ("string", Some("uri")),
        "date" => ("string", Some("date")),
        "datetime-local" => ("string", Some("date-time")),
        "file" => ("string", Some("binary")),
        _ => ("string", None),
    }
}

/// Detects forms and derives an input schema from their fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormClassifier;

impl FormClassifier {
    fn field_schema(root: &DocumentRoot<'_>, field: &Element) -> Value {
        let mut schema = Map::new();
        if field.is("select") {
            let options: Vec<Value> = root
                .descendants_of(field)
                .into_iter()
                .filter(|el| el.is("option"))
                .map(|opt| {
                    Value::String(
                        opt.attr("value")
                            .map_or_else(|| root.text_content(opt), str::to_string),
                    )
                })
                .collect();
            schema.insert("type".into(), json!("string"));
            if !options.is_empty() {
                schema.insert("enum".into(), Value::Array(options));
            }
        } else {
            let kind = field.input_type().unwrap_or_else(|| "text".to_string());
            let (ty, format) = json_type_for_input(&kind);
            schema.insert("type".into(), json!(ty));
            if let Some(format) = format {
                schema.insert("format".into(), json!(format));
            }
        }
        if let Some(label) = root.label_for(field).or_else(|| field.non_empty_attr("placeholder").map(str::to_string)) {
            schema.insert("description".into(), json!(label));
        }
        Value::Object(schema)
    }

    fn form_schema(root: &DocumentRoot<'_>, form: &Element) -> (Value, bool, bool) {
        let mut properties = Map::new();
        let mut required = Vec::new();
        let mut has_password = false;
        let mut has_file = false;

        for field in root.descendants_of(form) {
            let is_field = field.is("select") || field.is("textarea") || field.is("input");
            if !is_field {
                continue;
            }
            let kind = field.input_type();
            if kind.as_deref().is_some_and(|k| SKIPPED_INPUT_TYPES.contains(&k)) {
                continue;
            }
            has_password |= kind.as_deref() == Some("password");
            has_file |= kind.as_deref() == Some("file");

            let Some(key) = field.non_empty_attr("name").or_else(|| field.non_empty_attr("id")) else {
                continue;
            };
            properties.insert(key.to_string(), Self::field_schema(root, field));
            if field.has_attr("required") {
                required.push(json!(key));
            }
        }

        let mut schema = json!({ "type": "object", "properties": properties });
        if !required.is_empty() {
            schema["required"] = Value::Array(required);
        }
        (schema, has_password, has_file)
    }

    fn form_label(root: &DocumentRoot<'_>, form: &Element) -> String {
        for attr in ["aria-label", "name", "id"] {
            if let Some(value) = form.non_empty_attr(attr) {
                return value.to_string();
            }
        }
        root.descendants_of(form)
            .into_iter()
            .find(|el| el.is("button") || el.input_type().as_deref() == Some("submit"))
            .map(|submit| slug_source(root, submit))
            .filter(|label| !label.is_empty())
            .unwrap_or_else(|| "submit".to_string())
    }
}

impl Classifier for FormClassifier {
    fn category(&self) -> Category {
        Category::Form
    }

    fn name(&self) -> &'static str {
        "form"
    }

    fn priority(&self) -> u8 {
        40
    }

    fn emission_cap(&self) -> usize {
        MAX_FORMS
    }

    fn scan(
        &self,
        root: DocumentRoot<'_>,
        arena: &ScanArena<'_>,
        claims: &mut ClaimTracker,
    ) -> DomainResult<Vec<Capability>> {
        let mut found = Vec::new();
        for form in root.select("form") {
            if found.len() >= MAX_FORMS {
                break;
            }
            if !claims.claim(form.id) {
                continue;
            }
            claims.claim_all(root.descendants_of(form).iter().map(|el| el.id));

            let (schema, has_password, has_file) = Self::form_schema(&root, form);
            let (category, prefix) = if has_password {
                (Category::Auth, "auth")
            } else if has_file {
                (Category::FileUpload, "upload")
            } else {
                (Category::Form, "form")
            };
            let label = Self::form_label(&root, form);
            let name = format!("{prefix}.{}", slugify(&label));

            let tool = candidate(&root, arena, form, category, name)
                .with_title(label.clone())
                .with_description(format!("Fill and submit the '{label}' form"))
                .with_schema(schema)
                .with_annotations(ToolAnnotations {
                    read_only_hint: Some(false),
                    destructive_hint: None,
                    idempotent_hint: Some(false),
                    open_world_hint: Some(true),
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

    fn contact_form() -> Document {
        Document::from_tree(
            DocumentNode::new("body").child(
                DocumentNode::new("form")
                    .attr("id", "contact")
                    .child(DocumentNode::new("label").attr("for", "email").text("Your email"))
                    .child(
                        DocumentNode::new("input")
                            .attr("id", "email")
                            .attr("name", "email")
                            .attr("type", "email")
                            .attr("required", ""),
                    )
                    .child(
                        DocumentNode::new("select")
                            .attr("name", "topic")
                            .child(DocumentNode::new("option").attr("value", "sales"))
                            .child(DocumentNode::new("option").attr("value", "support")),
                    )
                    .child(DocumentNode::new("input").attr("type", "hidden").attr("name", "csrf"))
                    .child(DocumentNode::new("button").attr("type", "submit").text("Send")),
            ),
        )
    }

    #[test]
    fn test_schema_from_fields() {
        let tools = run(&FormClassifier, &contact_form());
        assert_eq!(tools.len(), 1);
        let tool = &tools[0];
        assert_eq!(tool.name, "form.contact");
        assert_eq!(tool.category, Category::Form);

        let props = &tool.input_schema["properties"];
        assert_eq!(props["email"]["format"], "email");
        assert_eq!(props["email"]["description"], "Your email");
        assert_eq!(props["topic"]["enum"][1], "support");
        assert!(props.get("csrf").is_none());
        assert_eq!(tool.input_schema["required"][0], "email");
    }

    #[test]
    fn test_password_form_is_auth() {
        let doc = Document::from_tree(
            DocumentNode::new("body").child(
                DocumentNode::new("form")
                    .child(DocumentNode::new("input").attr("name", "user"))
                    .child(DocumentNode::new("input").attr("name", "pass").attr("type", "password"))
                    .child(DocumentNode::new("button").text("Sign in")),
            ),
        );
        let tools = run(&FormClassifier, &doc);
        assert_eq!(tools[0].category, Category::Auth);
        assert_eq!(tools[0].name, "auth.sign-in");
    }

    #[test]
    fn test_claimed_form_skipped() {
        let doc = contact_form();
        let arena = ScanArena::new(&doc);
        let mut claims = ClaimTracker::new();
        claims.claim(doc.root().select("form")[0].id);
        let tools = FormClassifier.scan(doc.root(), &arena, &mut claims).unwrap();
        assert!(tools.is_empty());
    }
}
