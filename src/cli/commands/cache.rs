//! Capability cache commands.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};

use crate::cli::commands::open_store;
use crate::cli::output::{list_table, output, render_list, truncate, CommandOutput};
use crate::domain::models::{Config, SiteManifestCacheEntry};
use crate::services::capability_cache::CapabilityCache;

/// Arguments for `pagecap cache`.
#[derive(Args, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommands,
}

/// Cache subcommands.
#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// List cached sites
    List,
    /// Show the cached pages of a site
    Show {
        /// Site key
        #[arg(short, long)]
        site: String,
    },
    /// Drop a cached page, or a whole site when no URL is given
    Invalidate {
        /// Site key
        #[arg(short, long)]
        site: String,
        /// Page URL
        #[arg(short, long)]
        url: Option<String>,
    },
    /// Drop every cached site
    Clear,
}

/// Cached sites.
#[derive(Debug, serde::Serialize)]
pub struct SiteListOutput {
    pub sites: Vec<String>,
    pub total: usize,
}

impl CommandOutput for SiteListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["site"]);
        for site in &self.sites {
            table.add_row(vec![site.clone()]);
        }
        render_list("site", &table, self.total)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// One cached page of a site.
#[derive(Debug, serde::Serialize)]
pub struct CachedPageRow {
    pub pattern: String,
    pub tools: usize,
    pub hash: String,
    pub scanned_at: DateTime<Utc>,
    pub fresh: bool,
}

/// Cached pages of one site.
#[derive(Debug, serde::Serialize)]
pub struct SiteCacheOutput {
    pub site: String,
    pub version: u64,
    pub pages: Vec<CachedPageRow>,
}

impl SiteCacheOutput {
    /// Rows for `entry`, marking pages younger than `ttl` as fresh.
    pub fn new(entry: &SiteManifestCacheEntry, ttl: chrono::Duration, now: DateTime<Utc>) -> Self {
        Self {
            site: entry.site.clone(),
            version: entry.version,
            pages: entry
                .pages
                .values()
                .map(|page| CachedPageRow {
                    pattern: page.pattern.clone(),
                    tools: page.tools.len(),
                    hash: page.hash.clone(),
                    scanned_at: page.scanned_at,
                    fresh: page.is_fresh(now, ttl),
                })
                .collect(),
        }
    }
}

impl CommandOutput for SiteCacheOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["pattern", "tools", "hash", "scanned", "fresh"]);
        for page in &self.pages {
            table.add_row(vec![
                truncate(&page.pattern, 50),
                page.tools.to_string(),
                page.hash.clone(),
                page.scanned_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
                if page.fresh { "yes" } else { "no" }.to_string(),
            ]);
        }
        format!(
            "Site: {} (version {})\n{}",
            self.site,
            self.version,
            render_list("page", &table, self.pages.len())
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Outcome of a cache mutation.
#[derive(Debug, serde::Serialize)]
pub struct CacheActionOutput {
    pub success: bool,
    pub message: String,
}

impl CommandOutput for CacheActionOutput {
    fn to_human(&self) -> String {
        self.message.clone()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Run a cache subcommand.
pub async fn execute(args: CacheArgs, config: &Config, json_mode: bool) -> Result<()> {
    let cache = CapabilityCache::with_ttl(
        open_store(config).await?,
        std::time::Duration::from_secs(config.cache.ttl_secs),
    );

    match args.command {
        CacheCommands::List => {
            let mut sites = cache.sites().await.context("Failed to list cached sites")?;
            sites.sort();
            let out = SiteListOutput {
                total: sites.len(),
                sites,
            };
            output(&out, json_mode);
        }

        CacheCommands::Show { site } => {
            let entry = cache
                .site_entry(&site)
                .await
                .context("Failed to read cache")?
                .unwrap_or_else(|| SiteManifestCacheEntry::new(site.as_str()));
            let ttl = chrono::Duration::from_std(cache.ttl()).unwrap_or_else(|_| chrono::Duration::days(36_500));
            output(&SiteCacheOutput::new(&entry, ttl, Utc::now()), json_mode);
        }

        CacheCommands::Invalidate { site, url } => {
            let message = match url {
                Some(url) => {
                    cache.invalidate(&site, &url).await.context("Failed to invalidate page")?;
                    format!("Invalidated {url} on {site}")
                }
                None => {
                    cache.invalidate_site(&site).await.context("Failed to invalidate site")?;
                    format!("Invalidated site {site}")
                }
            };
            output(&CacheActionOutput { success: true, message }, json_mode);
        }

        CacheCommands::Clear => {
            cache.clear().await.context("Failed to clear cache")?;
            let out = CacheActionOutput {
                success: true,
                message: "Capability cache cleared".to_string(),
            };
            output(&out, json_mode);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::CachedPage;

    #[test]
    fn test_site_cache_output_marks_stale_pages() {
        let now = Utc::now();
        let mut entry = SiteManifestCacheEntry::new("x.com");
        entry.version = 3;
        for (pattern, age_hours) in [("/", 1), ("/old", 48)] {
            entry.pages.insert(
                pattern.to_string(),
                CachedPage {
                    pattern: pattern.to_string(),
                    tools: Vec::new(),
                    hash: "00000000".into(),
                    scanned_at: now - chrono::Duration::hours(age_hours),
                },
            );
        }

        let out = SiteCacheOutput::new(&entry, chrono::Duration::hours(24), now);
        assert_eq!(out.pages.len(), 2);
        assert!(out.pages.iter().find(|p| p.pattern == "/").unwrap().fresh);
        assert!(!out.pages.iter().find(|p| p.pattern == "/old").unwrap().fresh);
        assert!(out.to_human().contains("version 3"));
    }
}
