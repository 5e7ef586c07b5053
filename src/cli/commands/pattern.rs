//! URL pattern inspection.

use anyhow::Result;
use clap::Args;

use crate::cli::output::{output, CommandOutput};
use crate::services::url_pattern::{site_for, to_pattern};

/// Arguments for `pagecap pattern`.
#[derive(Args, Debug)]
pub struct PatternArgs {
    /// URL to normalize
    pub url: String,
}

/// Normalized form of one URL.
#[derive(Debug, serde::Serialize)]
pub struct PatternOutput {
    pub url: String,
    pub site: String,
    pub pattern: String,
}

impl CommandOutput for PatternOutput {
    fn to_human(&self) -> String {
        format!("Site:    {}\nPattern: {}", self.site, self.pattern)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

impl PatternOutput {
    /// Normalize `url`.
    pub fn for_url(url: &str) -> Self {
        Self {
            url: url.to_string(),
            site: site_for(url),
            pattern: to_pattern(url),
        }
    }
}

/// Print the pattern and site of a URL.
pub fn execute(args: PatternArgs, json_mode: bool) -> Result<()> {
    output(&PatternOutput::for_url(&args.url), json_mode);
    Ok(())
}
