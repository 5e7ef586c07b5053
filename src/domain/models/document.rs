//! Document model supplied by the page-context extractor.
//!
//! A [`Document`] is an arena of [`Element`]s. Embedded subtrees (shadow
//! roots, same-origin frames) are not children of their host; they hang
//! off [`Element::embedded_root`] so a walk over one root never crosses a
//! boundary by accident.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use super::capability::ElementHandle;
use crate::domain::errors::{DomainError, DomainResult};

/// Index of an element inside its document arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ElementId(pub usize);

/// Identity of a single scan pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScanId(Uuid);

impl ScanId {
    /// A fresh scan identity.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ScanId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ScanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One node of the rendered document.
#[derive(Debug, Clone)]
pub struct Element {
    pub id: ElementId,
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    /// Text directly owned by this element (not its descendants).
    pub text: String,
    pub visible: bool,
    pub parent: Option<ElementId>,
    pub children: Vec<ElementId>,
    pub embedded_root: Option<ElementId>,
}

impl Element {
    /// Attribute value, if present.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Attribute value, if present and not blank.
    pub fn non_empty_attr(&self, name: &str) -> Option<&str> {
        self.attr(name).map(str::trim).filter(|v| !v.is_empty())
    }

    /// Whether the attribute is present, even if empty.
    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Case-insensitive tag comparison.
    pub fn is(&self, tag: &str) -> bool {
        self.tag.eq_ignore_ascii_case(tag)
    }

    /// Lowercased `type` attribute, defaulting to `text` for inputs.
    pub fn input_type(&self) -> Option<String> {
        if !self.is("input") {
            return None;
        }
        Some(
            self.attr("type")
                .map_or_else(|| "text".to_string(), str::to_ascii_lowercase),
        )
    }

    /// Space-separated class list contains `class`.
    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }
}

/// Serializable nested form of a document, as produced by an extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentNode {
    pub tag: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub children: Vec<DocumentNode>,
    #[serde(default)]
    pub embedded: Option<Box<DocumentNode>>,
}

const fn default_visible() -> bool {
    true
}

impl DocumentNode {
    /// Element node with no attributes or children.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            text: String::new(),
            visible: true,
            children: Vec::new(),
            embedded: None,
        }
    }

    /// Set an attribute.
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set the directly owned text.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Mark the node hidden.
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Append a child node.
    pub fn child(mut self, child: DocumentNode) -> Self {
        self.children.push(child);
        self
    }

    /// Host an embedded subtree.
    pub fn embed(mut self, root: DocumentNode) -> Self {
        self.embedded = Some(Box::new(root));
        self
    }
}

/// Arena-backed document.
#[derive(Debug, Clone)]
pub struct Document {
    elements: Vec<Element>,
    root: ElementId,
    index: ElementIndex,
}

type KeyedElements = HashMap<(ElementId, String), Vec<ElementId>>;

/// Lookup tables built once per document. Keys pair the top-level root
/// (primary or embedded) owning an element with an attribute value.
#[derive(Debug, Clone, Default)]
struct ElementIndex {
    owner: Vec<ElementId>,
    /// `<label>` elements by their `for` attribute, in document order.
    labels: KeyedElements,
    /// Elements by their `id` attribute, in document order.
    dom_ids: KeyedElements,
}

impl ElementIndex {
    // Parents precede their children in the arena, so one forward pass
    // sees every parent's owner before the child needs it.
    fn build(elements: &[Element]) -> Self {
        let mut index = Self::default();
        for el in elements {
            let owner = el
                .parent
                .and_then(|p| index.owner.get(p.0).copied())
                .unwrap_or(el.id);
            index.owner.push(owner);

            if el.is("label") {
                if let Some(target) = el.attr("for") {
                    index.labels.entry((owner, target.to_string())).or_default().push(el.id);
                }
            }
            if let Some(dom_id) = el.attr("id") {
                index.dom_ids.entry((owner, dom_id.to_string())).or_default().push(el.id);
            }
        }
        index
    }
}

impl Document {
    /// Flatten a nested tree into an arena.
    pub fn from_tree(tree: DocumentNode) -> Self {
        let mut elements = Vec::new();
        let root = push_node(&mut elements, tree, None);
        let index = ElementIndex::build(&elements);
        Self { elements, root, index }
    }

    /// Parse a JSON-encoded [`DocumentNode`] tree.
    pub fn from_json(json: &str) -> DomainResult<Self> {
        let tree: DocumentNode = serde_json::from_str(json)?;
        Ok(Self::from_tree(tree))
    }

    /// The primary root.
    pub fn root(&self) -> DocumentRoot<'_> {
        DocumentRoot {
            doc: self,
            root: self.root,
        }
    }

    /// A view rooted at an arbitrary element (usually an embedded root).
    pub fn root_at(&self, id: ElementId) -> Option<DocumentRoot<'_>> {
        self.element(id).map(|_| DocumentRoot { doc: self, root: id })
    }

    /// Element by arena index.
    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id.0)
    }

    /// Number of elements, embedded subtrees included.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the arena holds no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Effective visibility: hidden if the element or any ancestor is hidden.
    pub fn is_visible(&self, id: ElementId) -> bool {
        let mut current = Some(id);
        while let Some(cur) = current {
            match self.element(cur) {
                Some(el) if !el.visible => return false,
                Some(el) => current = el.parent,
                None => return false,
            }
        }
        true
    }

    /// Concatenated, whitespace-normalized text of an element's subtree.
    pub fn text_content(&self, id: ElementId) -> String {
        let mut parts = Vec::new();
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            if let Some(el) = self.element(cur) {
                if !el.text.trim().is_empty() {
                    parts.push(el.text.trim().to_string());
                }
                stack.extend(el.children.iter().rev().copied());
            }
        }
        parts.join(" ")
    }
}

fn push_node(elements: &mut Vec<Element>, node: DocumentNode, parent: Option<ElementId>) -> ElementId {
    let id = ElementId(elements.len());
    elements.push(Element {
        id,
        tag: node.tag.to_ascii_lowercase(),
        attributes: node.attributes,
        text: node.text,
        visible: node.visible,
        parent,
        children: Vec::new(),
        embedded_root: None,
    });

    let children: Vec<ElementId> = node
        .children
        .into_iter()
        .map(|child| push_node(elements, child, Some(id)))
        .collect();
    let embedded = node.embedded.map(|root| push_node(elements, *root, None));

    let el = &mut elements[id.0];
    el.children = children;
    el.embedded_root = embedded;
    id
}

/// A document viewed from one root. Walks stop at embedded boundaries.
#[derive(Debug, Clone, Copy)]
pub struct DocumentRoot<'a> {
    doc: &'a Document,
    root: ElementId,
}

impl<'a> DocumentRoot<'a> {
    /// Element this view is rooted at.
    pub fn id(&self) -> ElementId {
        self.root
    }

    /// Backing document.
    pub fn document(&self) -> &'a Document {
        self.doc
    }

    /// Every element under this root in document order, root included.
    pub fn elements(&self) -> Vec<&'a Element> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(cur) = stack.pop() {
            if let Some(el) = self.doc.element(cur) {
                out.push(el);
                stack.extend(el.children.iter().rev().copied());
            }
        }
        out
    }

    /// Elements with the given tag.
    pub fn select(&self, tag: &str) -> Vec<&'a Element> {
        self.elements().into_iter().filter(|el| el.is(tag)).collect()
    }

    /// Roots of the embedded subtrees hosted directly under this root.
    pub fn embedded_roots(&self) -> Vec<ElementId> {
        self.elements()
            .into_iter()
            .filter_map(|el| el.embedded_root)
            .collect()
    }

    /// Whether `id` is this root or one of its descendants.
    fn contains(&self, id: ElementId) -> bool {
        let mut current = Some(id);
        while let Some(cur) = current {
            if cur == self.root {
                return true;
            }
            current = self.doc.element(cur).and_then(|el| el.parent);
        }
        false
    }

    /// First indexed element under this root for `key`.
    fn lookup(&self, table: &'a KeyedElements, key: &str) -> Option<&'a Element> {
        let owner = self.doc.index.owner.get(self.root.0).copied()?;
        table
            .get(&(owner, key.to_string()))?
            .iter()
            .copied()
            .filter(|id| self.contains(*id))
            .find_map(|id| self.doc.element(id))
    }

    /// Element carrying `id="..."` under this root.
    pub fn find_by_dom_id(&self, dom_id: &str) -> Option<&'a Element> {
        self.lookup(&self.doc.index.dom_ids, dom_id)
    }

    /// Text of a `<label>` bound to the element, by `for` or by nesting.
    pub fn label_for(&self, element: &Element) -> Option<String> {
        if let Some(dom_id) = element.non_empty_attr("id") {
            if let Some(label) = self.lookup(&self.doc.index.labels, dom_id) {
                let text = self.doc.text_content(label.id);
                if !text.is_empty() {
                    return Some(text);
                }
            }
        }

        let mut current = element.parent;
        while let Some(cur) = current {
            let el = self.doc.element(cur)?;
            if el.is("label") {
                let text = self.doc.text_content(el.id);
                return (!text.is_empty()).then_some(text);
            }
            current = el.parent;
        }
        None
    }

    /// Nearest ancestor with the given tag.
    pub fn closest(&self, element: &Element, tag: &str) -> Option<&'a Element> {
        let mut current = element.parent;
        while let Some(cur) = current {
            let el = self.doc.element(cur)?;
            if el.is(tag) {
                return Some(el);
            }
            current = el.parent;
        }
        None
    }

    /// Descendants of `element` (exclusive) in document order.
    pub fn descendants_of(&self, element: &Element) -> Vec<&'a Element> {
        let mut out = Vec::new();
        let mut stack: Vec<ElementId> = element.children.iter().rev().copied().collect();
        while let Some(cur) = stack.pop() {
            if let Some(el) = self.doc.element(cur) {
                out.push(el);
                stack.extend(el.children.iter().rev().copied());
            }
        }
        out
    }

    /// Whitespace-normalized text of `element`'s subtree.
    pub fn text_content(&self, element: &Element) -> String {
        self.doc.text_content(element.id)
    }

    /// Effective visibility of `element`.
    pub fn is_visible(&self, element: &Element) -> bool {
        self.doc.is_visible(element.id)
    }
}

/// Per-scan arena: mints and resolves [`ElementHandle`]s for one scan.
///
/// Handles minted by another scan fail to resolve.
#[derive(Debug)]
pub struct ScanArena<'a> {
    id: ScanId,
    doc: &'a Document,
}

impl<'a> ScanArena<'a> {
    /// Arena with a fresh scan identity.
    pub fn new(doc: &'a Document) -> Self {
        Self {
            id: ScanId::new(),
            doc,
        }
    }

    /// Identity of this scan.
    pub fn id(&self) -> ScanId {
        self.id
    }

    /// Document being scanned.
    pub fn document(&self) -> &'a Document {
        self.doc
    }

    /// Mint a handle to an element of this scan's document.
    pub fn handle(&self, element: ElementId) -> ElementHandle {
        ElementHandle {
            scan: self.id,
            element,
        }
    }

    /// Resolve a handle or fail if it belongs to another scan.
    pub fn resolve(&self, handle: ElementHandle) -> DomainResult<&'a Element> {
        if handle.scan != self.id {
            return Err(DomainError::StaleElementHandle);
        }
        self.doc
            .element(handle.element)
            .ok_or(DomainError::ElementNotFound(handle.element.0))
    }
}
