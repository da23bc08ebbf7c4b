//! Site configuration module.
//!
//! Handles loading, validating, and layering `config.toml`. Values are
//! resolved in this order, later layers winning:
//!
//! 1. stock defaults ([`SiteConfig::default`])
//! 2. `config.toml` in the source directory
//! 3. environment variables (`PRISMIC_API_ENDPOINT`, `PRISMIC_ACCESS_TOKEN`,
//!    `UTTERANCES_REPO`)
//! 4. command-line flags (`--preview`, `--ref`), applied by `main`
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! assets_dir = "assets"     # Copied verbatim into the output root
//!
//! [site]
//! title = "spacetraveling"
//! lang = "pt-BR"
//! logo = "/images/logo.svg"
//!
//! [cms]
//! endpoint = ""             # e.g. "https://my-repo.cdn.prismic.io/api/v2"
//! document_type = "post"
//! page_size = 3             # Posts per listing page (1-100)
//! timeout_secs = 30
//! max_pages = 1000          # Listing pages fetched at most per build
//! # access_token = "..."    # Prefer PRISMIC_ACCESS_TOKEN
//! # orderings = "[document.first_publication_date desc]"
//!
//! [preview]
//! enabled = false
//! exit_url = "/api/exit-preview"
//! # ref = "..."             # Content revision to fetch instead of master
//!
//! [comments]
//! # repo = "owner/name"     # utterances repository; no repo = no widget
//!
//! [theme]
//! background = "#1a1d23"
//! text = "#d7d7d7"
//! heading = "#f8f8f8"
//! muted = "#bbbbbb"
//! highlight = "#ff57b2"
//!
//! [processing]
//! max_processes = 4         # Parallel post fetches (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Directory (relative to the source dir) copied into the output root.
    #[serde(default = "default_assets_dir")]
    pub assets_dir: String,
    pub site: SiteMeta,
    pub cms: CmsConfig,
    pub preview: PreviewConfig,
    pub comments: CommentsConfig,
    pub theme: ThemeConfig,
    pub processing: ProcessingConfig,
}

fn default_assets_dir() -> String {
    "assets".to_string()
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            assets_dir: default_assets_dir(),
            site: SiteMeta::default(),
            cms: CmsConfig::default(),
            preview: PreviewConfig::default(),
            comments: CommentsConfig::default(),
            theme: ThemeConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let endpoint = self.cms.endpoint.trim();
        if !endpoint.is_empty()
            && !endpoint.starts_with("https://")
            && !endpoint.starts_with("http://")
        {
            return Err(ConfigError::Validation(
                "cms.endpoint must be an http(s) URL".into(),
            ));
        }
        if !(1..=100).contains(&self.cms.page_size) {
            return Err(ConfigError::Validation(
                "cms.page_size must be 1-100".into(),
            ));
        }
        if self.cms.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "cms.timeout_secs must be non-zero".into(),
            ));
        }
        if self.cms.max_pages == 0 {
            return Err(ConfigError::Validation(
                "cms.max_pages must be non-zero".into(),
            ));
        }
        if self.cms.document_type.trim().is_empty() {
            return Err(ConfigError::Validation(
                "cms.document_type must not be empty".into(),
            ));
        }
        if self.preview.exit_url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "preview.exit_url must not be empty".into(),
            ));
        }
        if let Some(repo) = &self.comments.repo {
            let mut parts = repo.split('/');
            let valid = matches!(
                (parts.next(), parts.next(), parts.next()),
                (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty()
            );
            if !valid {
                return Err(ConfigError::Validation(
                    "comments.repo must look like \"owner/name\"".into(),
                ));
            }
        }
        Ok(())
    }

    /// Overlay environment variables on top of file values.
    ///
    /// `lookup` is `std::env::var` in production; empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(endpoint) = get("PRISMIC_API_ENDPOINT") {
            self.cms.endpoint = endpoint;
        }
        if let Some(token) = get("PRISMIC_ACCESS_TOKEN") {
            self.cms.access_token = Some(token);
        }
        if let Some(repo) = get("UTTERANCES_REPO") {
            self.comments.repo = Some(repo);
        }
    }

    /// The CMS endpoint, or an error explaining how to set one.
    pub fn require_endpoint(&self) -> Result<&str, ConfigError> {
        let endpoint = self.cms.endpoint.trim();
        if endpoint.is_empty() {
            return Err(ConfigError::Validation(
                "cms.endpoint is not set (config.toml [cms] endpoint or PRISMIC_API_ENDPOINT)"
                    .into(),
            ));
        }
        Ok(endpoint)
    }
}

/// Metadata rendered into every page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteMeta {
    pub title: String,
    /// Value of the `<html lang>` attribute.
    pub lang: String,
    /// Logo shown in the page header, linking home.
    pub logo: String,
}

impl Default for SiteMeta {
    fn default() -> Self {
        Self {
            title: "spacetraveling".to_string(),
            lang: "pt-BR".to_string(),
            logo: "/images/logo.svg".to_string(),
        }
    }
}

/// Headless CMS connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CmsConfig {
    /// Repository API root, e.g. `https://my-repo.cdn.prismic.io/api/v2`.
    pub endpoint: String,
    /// Access token for private repositories. Never written to manifests.
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
    /// Custom type of the post documents.
    pub document_type: String,
    /// Posts per listing page.
    pub page_size: u32,
    /// Optional ordering predicate, e.g. `[document.first_publication_date desc]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orderings: Option<String>,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Upper bound on listing pages fetched in one build.
    pub max_pages: usize,
}

impl Default for CmsConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            access_token: None,
            document_type: "post".to_string(),
            page_size: 3,
            orderings: None,
            timeout_secs: 30,
            max_pages: 1000,
        }
    }
}

/// Preview mode settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreviewConfig {
    pub enabled: bool,
    /// Content revision to fetch instead of the master ref.
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    pub content_ref: Option<String>,
    /// Where the "exit preview" link points.
    pub exit_url: String,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            content_ref: None,
            exit_url: "/api/exit-preview".to_string(),
        }
    }
}

/// Comments widget settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CommentsConfig {
    /// GitHub repository (`owner/name`) backing the utterances threads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
}

/// Colors injected as CSS custom properties.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThemeConfig {
    pub background: String,
    /// Body text.
    pub text: String,
    /// Titles and headings.
    pub heading: String,
    /// Dates, authors, reading time.
    pub muted: String,
    /// Links and the load-more control.
    pub highlight: String,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            background: "#1a1d23".to_string(),
            text: "#d7d7d7".to_string(),
            heading: "#f8f8f8".to_string(),
            muted: "#bbbbbb".to_string(),
            highlight: "#ff57b2".to_string(),
        }
    }
}

/// Parallel fetch settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of post documents fetched in parallel.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)`, at least 1
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// Base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// Tables merge key-by-key; any other overlay value replaces the base value.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the directory has no `config.toml`.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = path.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value and deserialize.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    Ok(config)
}

/// Load config from the source directory and the process environment.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    load_config_with_env(root, |key| std::env::var(key).ok())
}

/// [`load_config`] with an explicit environment lookup.
pub fn load_config_with_env<F>(root: &Path, lookup: F) -> Result<SiteConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let overlay = load_raw_config(root)?;
    let mut config = resolve_config(stock_defaults_value(), overlay)?;
    config.apply_env(lookup);
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `config.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Simple Blog Configuration
# =========================
# All settings are optional. Values shown below are the defaults.
# Unknown keys will cause an error.

# Directory next to this file whose contents are copied into the output root
# (logo, favicon, fonts).
assets_dir = "assets"

# ---------------------------------------------------------------------------
# Site
# ---------------------------------------------------------------------------
[site]
title = "spacetraveling"
# <html lang> attribute.
lang = "pt-BR"
# Header logo, linking back to the listing.
logo = "/images/logo.svg"

# ---------------------------------------------------------------------------
# CMS
# ---------------------------------------------------------------------------
[cms]
# Repository API root. Can also be set with PRISMIC_API_ENDPOINT.
endpoint = ""

# Access token for private repositories. Prefer PRISMIC_ACCESS_TOKEN so the
# token stays out of version control.
# access_token = ""

# Custom type of the post documents.
document_type = "post"

# Posts per listing page (1-100). Further pages are loaded with
# "Carregar mais posts".
page_size = 3

# Optional ordering, in CMS predicate syntax.
# orderings = "[document.first_publication_date desc]"

# Timeout for every CMS request, in seconds.
timeout_secs = 30

# Stop the listing after this many pages.
max_pages = 1000

# ---------------------------------------------------------------------------
# Preview
# ---------------------------------------------------------------------------
[preview]
# Fetch a draft content revision and show the exit-preview link.
# Also available as --preview / --ref on the command line.
enabled = false
# ref = ""
exit_url = "/api/exit-preview"

# ---------------------------------------------------------------------------
# Comments (utterances)
# ---------------------------------------------------------------------------
[comments]
# GitHub repository backing the comment threads. Can also be set with
# UTTERANCES_REPO. Without a repo no widget is rendered.
# repo = "owner/name"

# ---------------------------------------------------------------------------
# Theme colors
# ---------------------------------------------------------------------------
[theme]
background = "#1a1d23"
text = "#d7d7d7"
heading = "#f8f8f8"
muted = "#bbbbbb"
highlight = "#ff57b2"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum post documents fetched in parallel.
# Omit to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}

/// Generate CSS custom properties from the theme.
pub fn generate_theme_css(theme: &ThemeConfig) -> String {
    format!(
        r#":root {{
    --color-bg: {background};
    --color-text: {text};
    --color-heading: {heading};
    --color-muted: {muted};
    --color-highlight: {highlight};
}}"#,
        background = theme.background,
        text = theme.text,
        heading = theme.heading,
        muted = theme.muted,
        highlight = theme.highlight,
    )
}
