//! Manifest inspection commands.

use anyhow::{anyhow, Context, Result};
use clap::{Args, Subcommand};

use crate::cli::commands::open_store;
use crate::cli::commands::scan::ToolRow;
use crate::cli::output::{list_table, output, render_list, truncate, CommandOutput};
use crate::domain::models::{Config, FlatExport};
use crate::services::capability_manifest::ManifestStore;
use crate::services::url_pattern::{site_for, to_pattern};

/// Arguments for `pagecap manifest`.
#[derive(Args, Debug)]
pub struct ManifestArgs {
    #[command(subcommand)]
    pub command: ManifestCommands,
}

/// Manifest subcommands.
#[derive(Subcommand, Debug)]
pub enum ManifestCommands {
    /// List origins with a manifest
    List,
    /// Print the flat export of an origin's manifest
    Export {
        /// Origin (site key) or any URL on it
        #[arg(short, long)]
        origin: String,
    },
    /// Show the tools recorded for one page
    Tools {
        /// Page URL
        #[arg(short, long)]
        url: String,
        /// Origin (defaults to the URL's site)
        #[arg(short, long)]
        origin: Option<String>,
    },
    /// Delete an origin's manifest
    Remove {
        /// Origin (site key) or any URL on it
        #[arg(short, long)]
        origin: String,
    },
}

/// Accept either a bare site key or a URL.
fn origin_key(origin: &str) -> String {
    if origin.contains("://") {
        site_for(origin)
    } else {
        origin.to_string()
    }
}

/// Origins with a manifest.
#[derive(Debug, serde::Serialize)]
pub struct OriginListOutput {
    pub origins: Vec<String>,
    pub total: usize,
}

impl CommandOutput for OriginListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["origin"]);
        for origin in &self.origins {
            table.add_row(vec![origin.clone()]);
        }
        render_list("origin", &table, self.total)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Flat export of one manifest.
#[derive(Debug, serde::Serialize)]
pub struct ExportOutput {
    #[serde(flatten)]
    pub export: FlatExport,
}

impl CommandOutput for ExportOutput {
    fn to_human(&self) -> String {
        let meta = &self.export.meta;
        let mut table = list_table(&["name", "description"]);
        for tool in &self.export.tools {
            table.add_row(vec![tool.name.clone(), truncate(&tool.description, 60)]);
        }
        format!(
            "Origin: {} (version {}, {} page(s))\n{}",
            meta.origin,
            meta.version,
            meta.page_count,
            render_list("tool", &table, meta.tool_count)
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.export).unwrap_or_default()
    }
}

/// Capabilities recorded for one page pattern.
#[derive(Debug, serde::Serialize)]
pub struct PageToolsOutput {
    pub origin: String,
    pub pattern: String,
    pub tools: Vec<ToolRow>,
}

impl CommandOutput for PageToolsOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["name", "category", "confidence"]);
        for row in &self.tools {
            table.add_row(vec![
                row.name.clone(),
                row.category.clone(),
                format!("{:.2}", row.confidence),
            ]);
        }
        format!(
            "{} ({})\n{}",
            self.origin,
            self.pattern,
            render_list("tool", &table, self.tools.len())
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Outcome of a manifest mutation.
#[derive(Debug, serde::Serialize)]
pub struct ManifestActionOutput {
    pub success: bool,
    pub message: String,
}

impl CommandOutput for ManifestActionOutput {
    fn to_human(&self) -> String {
        self.message.clone()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Run a manifest subcommand.
pub async fn execute(args: ManifestArgs, config: &Config, json_mode: bool) -> Result<()> {
    let manifests = ManifestStore::new(open_store(config).await?);

    match args.command {
        ManifestCommands::List => {
            let mut origins = manifests.origins().await.context("Failed to list manifests")?;
            origins.sort();
            let out = OriginListOutput {
                total: origins.len(),
                origins,
            };
            output(&out, json_mode);
        }

        ManifestCommands::Export { origin } => {
            let origin = origin_key(&origin);
            let export = manifests
                .to_flat_export(&origin)
                .await
                .context("Failed to read manifest")?
                .ok_or_else(|| anyhow!("No manifest for origin {origin}"))?;
            output(&ExportOutput { export }, json_mode);
        }

        ManifestCommands::Tools { url, origin } => {
            let origin = origin.map_or_else(|| site_for(&url), |o| origin_key(&o));
            let tools = manifests
                .get_tools_for_url(&origin, &url)
                .await
                .context("Failed to read manifest")?;
            let out = PageToolsOutput {
                origin,
                pattern: to_pattern(&url),
                tools: tools.iter().map(ToolRow::from).collect(),
            };
            output(&out, json_mode);
        }

        ManifestCommands::Remove { origin } => {
            let origin = origin_key(&origin);
            manifests.remove(&origin).await.context("Failed to remove manifest")?;
            let out = ManifestActionOutput {
                success: true,
                message: format!("Manifest removed: {origin}"),
            };
            output(&out, json_mode);
        }
    }

    Ok(())
}
