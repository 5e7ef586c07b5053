//! Common test utilities for integration tests
//!
//! Provides shared fixtures, helpers, and test utilities used across
//! multiple integration test files.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use pagecap::adapters::sqlite::{initialize_database, create_migrated_test_pool, database_url};
use pagecap::domain::models::{Capability, Category, Document, DocumentNode, ToolSource};
use pagecap::domain::ports::{PageContext, PageSnapshot};
use pagecap::{DomainResult, SqliteKeyValueStore};

/// Create a temporary test database
///
/// Returns the path to a SQLite database file in a temporary directory.
pub fn temp_db_path() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("pagecap.db");
    (dir, db_path)
}

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// In-memory SQLite store with migrations applied.
pub async fn memory_sqlite_store() -> Arc<SqliteKeyValueStore> {
    let pool = create_migrated_test_pool().await.expect("Failed to create test pool");
    Arc::new(SqliteKeyValueStore::new(pool))
}

/// File-backed SQLite store at `path`.
pub async fn file_sqlite_store(path: &std::path::Path) -> Arc<SqliteKeyValueStore> {
    let url = database_url(path.to_str().expect("utf-8 temp path"));
    let pool = initialize_database(&url, None)
        .await
        .expect("Failed to initialize database");
    Arc::new(SqliteKeyValueStore::new(pool))
}

pub fn tool(name: &str, confidence: f64) -> Capability {
    let category = match name.split('.').next() {
        Some("nav") => Category::Navigation,
        Some("search") => Category::Search,
        Some("media") => Category::Media,
        _ => Category::Form,
    };
    Capability::new(name, category, ToolSource::Inferred, confidence)
}

/// A small storefront page: navigation, a search box, and a newsletter form.
pub fn storefront() -> Document {
    Document::from_tree(
        DocumentNode::new("body")
            .child(
                DocumentNode::new("nav")
                    .child(DocumentNode::new("a").attr("href", "/").text("Home"))
                    .child(DocumentNode::new("a").attr("href", "/deals").text("Deals")),
            )
            .child(
                DocumentNode::new("form").attr("role", "search").child(
                    DocumentNode::new("input")
                        .attr("name", "q")
                        .attr("placeholder", "Search products"),
                ),
            )
            .child(
                DocumentNode::new("form")
                    .attr("id", "newsletter")
                    .attr("aria-label", "Newsletter signup")
                    .child(DocumentNode::new("label").attr("for", "email").text("Email"))
                    .child(
                        DocumentNode::new("input")
                            .attr("id", "email")
                            .attr("name", "email")
                            .attr("type", "email")
                            .attr("required", ""),
                    )
                    .child(DocumentNode::new("button").attr("type", "submit").text("Subscribe")),
            ),
    )
}

/// The storefront after the deals link was removed.
pub fn storefront_without_deals() -> Document {
    Document::from_tree(
        DocumentNode::new("body")
            .child(DocumentNode::new("nav").child(DocumentNode::new("a").attr("href", "/").text("Home")))
            .child(
                DocumentNode::new("form").attr("role", "search").child(
                    DocumentNode::new("input")
                        .attr("name", "q")
                        .attr("placeholder", "Search products"),
                ),
            ),
    )
}

pub fn names(tools: &[Capability]) -> Vec<String> {
    let mut names: Vec<String> = tools.iter().map(|t| t.name.clone()).collect();
    names.sort();
    names
}

/// A page context whose document can be swapped between snapshots.
pub struct SwappableContext {
    url: String,
    document: Mutex<Document>,
}

impl SwappableContext {
    pub fn new(url: &str, document: Document) -> Self {
        Self {
            url: url.to_string(),
            document: Mutex::new(document),
        }
    }

    pub fn replace(&self, document: Document) {
        *self.document.lock().unwrap() = document;
    }
}

impl PageContext for SwappableContext {
    fn snapshot(&self) -> DomainResult<PageSnapshot> {
        let document = self.document.lock().unwrap().clone();
        Ok(PageSnapshot::new(self.url.as_str(), document))
    }
}
