//! CLI output formatting for all pipeline stages.
//!
//! # Information-First Display
//!
//! Output is **information-centric, not request-centric**. Every post is shown
//! by its positional index and title, with the uid and output path as indented
//! context lines. Cursors, refs and raw URLs only show up when something went
//! wrong.
//!
//! # Output Format
//!
//! ## Fetch
//!
//! ```text
//! Listing
//!     page 1: 3 posts
//!     page 2: +2 posts (5 total)
//! Posts
//!     001 Como utilizar Hooks (4 min)
//!         uid: como-utilizar-hooks
//!     002 (missing-post) skipped
//!         Reason: Document not found: missing-post
//!
//! Fetched 4 of 5 posts
//! ```
//!
//! ## Generate
//!
//! ```text
//! Home → index.html (3 posts)
//!     002 → posts/2.json
//!
//! Posts
//! 001 Como utilizar Hooks → post/como-utilizar-hooks/index.html
//!
//! Generated 1 listing, 1 page-list endpoint, 1 post
//! ```
//!
//! # Architecture
//!
//! Each stage has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure:
//! no I/O, no side effects.

use crate::fetch::{FetchEvent, Manifest};
use crate::generate::GenerateReport;
use crate::types::PostPagination;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// `1 post`, `3 posts`.
fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

/// Titles are the identity; posts without one fall back to their uid.
fn post_line(index: usize, title: &str, uid: &str) -> String {
    if title.trim().is_empty() {
        format!("{} ({})", format_index(index), uid)
    } else {
        format!("{} {}", format_index(index), truncate(title, 60))
    }
}

// ============================================================================
// Stage 1: Fetch output
// ============================================================================

/// Format a single fetch progress event as display lines.
///
/// Events arrive listing first, then posts; the section headers are emitted
/// with the first event of each kind.
pub fn format_fetch_event(event: &FetchEvent) -> Vec<String> {
    match event {
        FetchEvent::ListingPage { page: 1, added, .. } => {
            vec![
                "Listing".to_string(),
                format!("    page 1: {}", plural(*added, "post")),
            ]
        }
        FetchEvent::ListingPage { page, added, total } => {
            vec![format!("    page {}: +{} ({} total)", page, plural(*added, "post"), total)]
        }
        FetchEvent::ListingStopped { loaded, error } => vec![
            format!("    stopped after {}", plural(*loaded, "post")),
            format!("        Error: {}", error),
        ],
        FetchEvent::PostFetched {
            index,
            uid,
            title,
            minutes,
        } => {
            let mut lines = Vec::new();
            if *index == 1 {
                lines.push("Posts".to_string());
            }
            lines.push(format!("    {} ({} min)", post_line(*index, title, uid), minutes));
            lines.push(format!("        uid: {}", uid));
            lines
        }
        FetchEvent::PostSkipped { index, uid, reason } => {
            let mut lines = Vec::new();
            if *index == 1 {
                lines.push("Posts".to_string());
            }
            lines.push(format!("    {} ({}) skipped", format_index(*index), uid));
            lines.push(format!("        Reason: {}", reason));
            lines
        }
    }
}

/// Summary printed once the manifest is written.
pub fn format_fetch_summary(manifest: &Manifest) -> Vec<String> {
    let mut lines = vec![String::new()];
    if manifest.preview.enabled {
        match manifest.preview.query_ref() {
            Some(r) => lines.push(format!("Preview mode (ref {})", r)),
            None => lines.push("Preview mode".to_string()),
        }
    }
    let mut unique: Vec<&str> = manifest.listing.iter().map(|p| p.uid.as_str()).collect();
    unique.sort_unstable();
    unique.dedup();
    lines.push(format!(
        "Fetched {} of {}",
        manifest.posts.len(),
        plural(unique.len(), "post")
    ));
    lines
}

pub fn print_fetch_event(event: &FetchEvent) {
    for line in format_fetch_event(event) {
        println!("{}", line);
    }
}

pub fn print_fetch_summary(manifest: &Manifest) {
    for line in format_fetch_summary(manifest) {
        println!("{}", line);
    }
}

// ============================================================================
// Stage 2: Generate output
// ============================================================================

/// Format generate stage output showing generated files.
///
/// Information-first: each post leads with its positional index and title,
/// followed by `→` and the output path.
pub fn format_generate_output(report: &GenerateReport) -> Vec<String> {
    let mut lines = Vec::new();

    lines.push(format!(
        "Home \u{2192} index.html ({})",
        plural(report.index_posts, "post")
    ));
    for (i, page) in report.list_pages.iter().enumerate() {
        lines.push(format!("    {} \u{2192} {}", format_index(i + 2), page));
    }

    if !report.post_pages.is_empty() {
        lines.push(String::new());
        lines.push("Posts".to_string());
        for (i, post) in report.post_pages.iter().enumerate() {
            let path = format!("{}index.html", post.path.trim_start_matches('/'));
            lines.push(format!(
                "{} \u{2192} {}",
                post_line(i + 1, &post.title, &post.uid),
                path
            ));
        }
    }

    if report.assets_copied > 0 {
        lines.push(String::new());
        lines.push(format!("Assets: {} copied", plural(report.assets_copied, "file")));
    }

    lines.push(String::new());
    if report.preview {
        lines.push("Preview mode: exit link on every page".to_string());
    }
    lines.push(format!(
        "Generated 1 listing, {}, {}",
        plural(report.list_pages.len(), "page-list endpoint"),
        plural(report.post_pages.len(), "post")
    ));
    lines.push(format!("Site written to {}", report.output_dir.display()));

    lines
}

/// Print generate output to stdout.
pub fn print_generate_output(report: &GenerateReport) {
    for line in format_generate_output(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Check output
// ============================================================================

/// Format the result of `check`: where the CMS is and what its first page holds.
pub fn format_check_output(endpoint: &str, content_ref: &str, first: &PostPagination) -> Vec<String> {
    let mut lines = vec![
        "Config OK".to_string(),
        format!("    Endpoint: {}", endpoint),
        format!("    Ref: {}", content_ref),
        format!("First page: {}", plural(first.results.len(), "post")),
    ];
    for (i, post) in first.results.iter().enumerate() {
        lines.push(format!("    {}", post_line(i + 1, &post.data.title, &post.uid)));
    }
    if first.next_page.is_some() {
        lines.push("    (more pages available)".to_string());
    }
    lines
}

pub fn print_check_output(endpoint: &str, content_ref: &str, first: &PostPagination) {
    for line in format_check_output(endpoint, content_ref, first) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
