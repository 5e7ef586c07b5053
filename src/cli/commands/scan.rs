//! Page scan command.

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::cli::commands::open_store;
use crate::cli::output::{list_table, output, render_list, truncate, CommandOutput};
use crate::domain::models::{Capability, Config, Document};
use crate::domain::ports::{NativeToolSource, NoNativeTools, NullNotifier, PageSnapshot, StaticNativeTools};
use crate::services::discovery_service::DiscoveryService;
use crate::services::url_pattern::{site_for, to_pattern};

const RECONCILE_POLL: Duration = Duration::from_millis(20);

/// Arguments for `pagecap scan`.
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// URL the document was captured from
    #[arg(short, long)]
    pub url: String,

    /// Document tree as JSON
    #[arg(short, long)]
    pub document: PathBuf,

    /// Platform-declared tools as a JSON array of capabilities
    #[arg(long)]
    pub native: Option<PathBuf>,

    /// Ignore cached results and rescan
    #[arg(long)]
    pub fresh: bool,
}

/// One capability as a table row.
#[derive(Debug, serde::Serialize)]
pub struct ToolRow {
    pub name: String,
    pub category: String,
    pub source: String,
    pub confidence: f64,
    pub title: String,
}

impl From<&Capability> for ToolRow {
    fn from(tool: &Capability) -> Self {
        Self {
            name: tool.name.clone(),
            category: tool.category.as_str().to_string(),
            source: tool.source.as_str().to_string(),
            confidence: tool.confidence,
            title: tool.title.clone(),
        }
    }
}

/// Capabilities discovered for one page.
#[derive(Debug, serde::Serialize)]
pub struct ScanOutput {
    pub url: String,
    pub site: String,
    pub pattern: String,
    #[serde(skip)]
    pub rows: Vec<ToolRow>,
    pub tools: Vec<Capability>,
}

impl ScanOutput {
    /// Output for `tools` found at `url`.
    pub fn new(url: &str, tools: Vec<Capability>) -> Self {
        Self {
            url: url.to_string(),
            site: site_for(url),
            pattern: to_pattern(url),
            rows: tools.iter().map(ToolRow::from).collect(),
            tools,
        }
    }
}

impl CommandOutput for ScanOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["name", "category", "source", "confidence", "title"]);
        for row in &self.rows {
            table.add_row(vec![
                row.name.clone(),
                row.category.clone(),
                row.source.clone(),
                format!("{:.2}", row.confidence),
                truncate(&row.title, 40),
            ]);
        }
        format!(
            "{} ({})\n{}",
            self.site,
            self.pattern,
            render_list("tool", &table, self.rows.len())
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub(crate) fn read_document(path: &Path) -> Result<Document> {
    let json = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Document::from_json(&json).with_context(|| format!("Invalid document tree in {}", path.display()))
}

pub(crate) fn read_native_tools(path: Option<&Path>) -> Result<Arc<dyn NativeToolSource>> {
    let Some(path) = path else {
        return Ok(Arc::new(NoNativeTools));
    };
    let json = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let tools: Vec<Capability> =
        serde_json::from_str(&json).with_context(|| format!("Invalid native tool list in {}", path.display()))?;
    Ok(Arc::new(StaticNativeTools::new(tools)))
}

/// Discover and persist the capabilities of a page.
pub async fn execute(args: ScanArgs, config: &Config, json_mode: bool) -> Result<()> {
    let document = read_document(&args.document)?;
    let native = read_native_tools(args.native.as_deref())?;
    let store = open_store(config).await?;

    let service = DiscoveryService::from_config(config, store, Arc::new(NullNotifier), native);
    let snapshot = PageSnapshot::new(args.url.as_str(), document);

    let tools = if args.fresh {
        service.rescan(&snapshot).await
    } else {
        service.current_capabilities(&snapshot).await
    };

    // Let a background reconciliation finish before the process exits.
    while service.reconciler().is_in_flight() {
        tokio::time::sleep(RECONCILE_POLL).await;
    }

    output(&ScanOutput::new(&args.url, tools), json_mode);
    Ok(())
}
