//! Utterances comments widget.
//!
//! The widget is a third-party script that replaces itself with a GitHub
//! issue thread. Threads are keyed by page URL and shown in the dark theme.

use crate::config::CommentsConfig;
use maud::{Markup, html};

pub const SCRIPT_SRC: &str = "https://utteranc.es/client.js";
pub const ISSUE_TERM: &str = "url";
pub const THEME: &str = "github-dark";

/// Comments container with the widget script, or nothing without a repo.
pub fn render_comments(config: &CommentsConfig) -> Markup {
    html! {
        @if let Some(repo) = &config.repo {
            section.comments {
                script src=(SCRIPT_SRC)
                    crossorigin="anonymous"
                    async
                    repo=(repo)
                    issue-term=(ISSUE_TERM)
                    theme=(THEME) {}
            }
        }
    }
}
