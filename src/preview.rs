//! Preview mode.
//!
//! A single flag, resolved once at fetch time from config and CLI and
//! carried unchanged into every rendered page. While it is set, the CMS is
//! queried at the preview content ref and pages show a link that leaves
//! preview mode. It has no other effect.

use crate::config::PreviewConfig;
use maud::{Markup, html};
use serde::{Deserialize, Serialize};

/// Preview state recorded in the manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewState {
    pub enabled: bool,
    /// Content ref the posts were fetched at, when it was not the master ref.
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub content_ref: Option<String>,
    pub exit_url: String,
}

impl PreviewState {
    /// Resolve from config with optional CLI overrides.
    ///
    /// Passing a ref implies preview mode.
    pub fn resolve(config: &PreviewConfig, cli_enabled: bool, cli_ref: Option<&str>) -> Self {
        let content_ref = cli_ref
            .map(str::to_string)
            .or_else(|| config.content_ref.clone())
            .filter(|r| !r.trim().is_empty());
        let enabled = config.enabled || cli_enabled || cli_ref.is_some();
        Self {
            enabled,
            content_ref: if enabled { content_ref } else { None },
            exit_url: config.exit_url.clone(),
        }
    }

    /// The ref to query at, if it differs from master.
    pub fn query_ref(&self) -> Option<&str> {
        self.content_ref.as_deref()
    }
}

/// The "exit preview" link, or nothing when preview is off.
pub fn exit_affordance(state: &PreviewState) -> Markup {
    html! {
        @if state.enabled {
            aside.exit-preview {
                a href=(state.exit_url) { "Sair do modo Preview" }
            }
        }
    }
}
