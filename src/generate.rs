//! HTML site generation.
//!
//! Stage 2 of the build pipeline. Takes the fetch manifest and generates the
//! final static site.
//!
//! ## Generated Pages
//!
//! - **Listing** (`/index.html`): the first page of posts and a
//!   "Carregar mais posts" button
//! - **Page-list endpoints** (`/posts/{n}.json`): every further listing page,
//!   as `PostPagination` JSON whose `next_page` points at the next endpoint
//! - **Post pages** (`/post/{uid}/index.html`): banner, title, date, author,
//!   reading time, content, previous/next links and comments
//!
//! ## Output Structure
//!
//! ```text
//! dist/
//! ├── index.html                 # Listing, first page
//! ├── posts/
//! │   ├── 2.json                 # { "next_page": "/posts/3.json", "results": [...] }
//! │   └── 3.json                 # { "next_page": null, "results": [...] }
//! ├── post/
//! │   └── como-utilizar-hooks/
//! │       └── index.html
//! └── images/logo.svg            # Copied from <source>/assets/
//! ```
//!
//! ## CSS and JavaScript
//!
//! Static assets are embedded at compile time:
//! - `static/style.css`: Base styles (theme colors injected from config)
//! - `static/load-more.js`: Browser-side "load more" over the page-list endpoints
//!
//! ## HTML Generation
//!
//! Uses [maud](https://maud.lambda.xyz/) for compile-time HTML templating.
//! Everything interpolated is escaped, except post content, which enters as
//! [`TrustedHtml`](crate::richtext::TrustedHtml).

use crate::comments::render_comments;
use crate::config::{self, SiteConfig, SiteMeta};
use crate::dates::{format_date, format_edited};
use crate::fetch::{self, Manifest};
use crate::navigation::{NeighborCache, PostNeighbors};
use crate::preview::{PreviewState, exit_affordance};
use crate::reading::reading_time;
use crate::richtext::render_rich_text;
use crate::store::PostListStore;
use crate::types::{Post, PostPagination};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Manifest error: {0}")]
    Manifest(#[from] fetch::FetchError),
}

const CSS_STATIC: &str = include_str!("../static/style.css");
const JS: &str = include_str!("../static/load-more.js");

/// What the generate stage wrote, for CLI output.
#[derive(Debug, Clone, Default)]
pub struct GenerateReport {
    pub output_dir: PathBuf,
    /// Posts on the listing page itself.
    pub index_posts: usize,
    /// Page-list endpoints written, in order (`posts/2.json`, ...).
    pub list_pages: Vec<String>,
    pub post_pages: Vec<GeneratedPost>,
    pub assets_copied: usize,
    pub preview: bool,
}

#[derive(Debug, Clone)]
pub struct GeneratedPost {
    pub uid: String,
    pub title: String,
    pub path: String,
    pub minutes: usize,
}

/// Shared by every page renderer.
struct PageContext<'a> {
    site: &'a SiteMeta,
    css: &'a str,
    preview: &'a PreviewState,
}

pub fn generate(
    manifest_path: &Path,
    source_dir: &Path,
    output_dir: &Path,
) -> Result<GenerateReport, GenerateError> {
    let manifest = fetch::read_manifest(manifest_path)?;
    generate_from_manifest(&manifest, source_dir, output_dir)
}

/// Render a manifest already in memory.
pub fn generate_from_manifest(
    manifest: &Manifest,
    source_dir: &Path,
    output_dir: &Path,
) -> Result<GenerateReport, GenerateError> {
    let config = &manifest.config;
    let css = format!(
        "{}\n\n{}",
        config::generate_theme_css(&config.theme),
        CSS_STATIC
    );
    let ctx = PageContext {
        site: &config.site,
        css: &css,
        preview: &manifest.preview,
    };

    fs::create_dir_all(output_dir)?;
    let mut report = GenerateReport {
        output_dir: output_dir.to_path_buf(),
        preview: manifest.preview.enabled,
        ..Default::default()
    };

    report.assets_copied = copy_assets(&source_dir.join(&config.assets_dir), output_dir)?;

    // Only posts that get a page are listed or linked
    let rendered: HashSet<&str> = manifest
        .posts
        .iter()
        .map(|p| p.uid.as_str())
        .filter(|uid| is_path_segment(uid))
        .collect();
    let listing: Vec<Post> = manifest
        .listing
        .iter()
        .filter(|p| {
            let keep = rendered.contains(p.uid.as_str());
            if !keep {
                log::warn!("leaving {:?} out of the listing: no post page", p.uid);
            }
            keep
        })
        .cloned()
        .collect();

    // Listing: first chunk inline, the rest as page-list endpoints
    let pages = listing_pages(&listing, config.cms.page_size as usize);
    let first = pages.first().cloned().unwrap_or_default();
    report.index_posts = first.results.len();
    let index_html = render_index(&first, &ctx);
    fs::write(output_dir.join("index.html"), index_html.into_string())?;

    if pages.len() > 1 {
        let posts_dir = output_dir.join("posts");
        fs::create_dir_all(&posts_dir)?;
        for (idx, page) in pages.iter().enumerate().skip(1) {
            let filename = format!("{}.json", idx + 1);
            fs::write(posts_dir.join(&filename), serde_json::to_string(page)?)?;
            report.list_pages.push(format!("posts/{filename}"));
        }
    }

    // Post pages, with neighbors taken from the listing
    let store = PostListStore::new();
    store.replace(listing);
    let mut neighbors = NeighborCache::new();

    for post in &manifest.posts {
        if !is_path_segment(&post.uid) {
            log::warn!("skipping post with unusable uid {:?}", post.uid);
            continue;
        }
        let post_dir = output_dir.join("post").join(&post.uid);
        fs::create_dir_all(&post_dir)?;
        let links = neighbors.resolve(&store, &post.uid);
        let post_html = render_post_page(post, links, config, &ctx);
        fs::write(post_dir.join("index.html"), post_html.into_string())?;
        log::debug!("wrote post/{}/index.html", post.uid);

        report.post_pages.push(GeneratedPost {
            uid: post.uid.clone(),
            title: post.data.title.clone(),
            path: post_path(&post.uid),
            minutes: reading_time(&post.data.content),
        });
    }

    Ok(report)
}

/// Split the listing into pages of `page_size`, chaining each page's
/// `next_page` to the endpoint of the one after it.
pub fn listing_pages(listing: &[Post], page_size: usize) -> Vec<PostPagination> {
    let chunks: Vec<&[Post]> = listing.chunks(page_size.max(1)).collect();
    let count = chunks.len();
    chunks
        .into_iter()
        .enumerate()
        .map(|(idx, chunk)| PostPagination {
            next_page: (idx + 1 < count).then(|| list_page_url(idx + 2)),
            results: chunk.to_vec(),
        })
        .collect()
}

/// URL of the `n`th listing page endpoint (1-based; page 1 is the index).
pub fn list_page_url(n: usize) -> String {
    format!("/posts/{n}.json")
}

pub fn post_path(uid: &str) -> String {
    format!("/post/{uid}/")
}

/// A uid becomes a directory name and goes into hrefs as is, so it must be
/// exactly one path segment with nothing a URL would reinterpret.
fn is_path_segment(uid: &str) -> bool {
    !uid.is_empty()
        && uid != "."
        && uid != ".."
        && !uid.contains(['/', '\\', '?', '#', '%'])
        && !uid.chars().any(|c| c.is_whitespace() || c.is_control())
}

fn copy_assets(src: &Path, dst: &Path) -> Result<usize, GenerateError> {
    if !src.is_dir() {
        return Ok(0);
    }
    let mut copied = 0;
    for entry in WalkDir::new(src).min_depth(1) {
        let entry = entry.map_err(std::io::Error::from)?;
        let Ok(relative) = entry.path().strip_prefix(src) else {
            continue;
        };
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}

// ============================================================================
// HTML Components
// ============================================================================

/// Renders the base HTML document structure
fn base_document(title: &str, ctx: &PageContext, script: Option<&str>, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang=(ctx.site.lang) {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                style { (PreEscaped(ctx.css)) }
            }
            body {
                (content)
                (exit_affordance(ctx.preview))
                @if let Some(js) = script {
                    script { (PreEscaped(js)) }
                }
            }
        }
    }
}

/// Renders the site header: the logo, linking to the listing
fn site_header(site: &SiteMeta) -> Markup {
    html! {
        header.site-header {
            a href="/" {
                img src=(site.logo) alt=(site.title);
            }
        }
    }
}

/// Date and author line shared by listing cards and post pages. Post pages
/// add the reading time.
fn post_info(post: &Post, minutes: Option<usize>) -> Markup {
    html! {
        div.post-info {
            @if let Some(date) = &post.first_publication_date {
                time.date datetime=(date.to_rfc3339()) { (format_date(date)) }
            }
            span.author { (post.data.author) }
            @if let Some(minutes) = minutes {
                span.reading-time { (minutes) " min" }
            }
        }
    }
}

fn post_card(post: &Post) -> Markup {
    html! {
        a.post-card href=(post_path(&post.uid)) {
            h2 { (post.data.title) }
            p.subtitle { (post.data.subtitle) }
            (post_info(post, None))
        }
    }
}

// ============================================================================
// Page Renderers
// ============================================================================

/// Renders the listing page with its first page of posts
fn render_index(first: &PostPagination, ctx: &PageContext) -> Markup {
    let content = html! {
        (site_header(ctx.site))
        main {
            div.post-list data-post-list {
                @for post in &first.results {
                    (post_card(post))
                }
            }
            @if let Some(next) = &first.next_page {
                button.load-more type="button" data-load-more data-next=(next) {
                    "Carregar mais posts"
                }
            }
        }
    };

    let script = first.next_page.is_some().then_some(JS);
    base_document(&ctx.site.title, ctx, script, content)
}

/// Renders a post page
fn render_post_page(
    post: &Post,
    neighbors: &PostNeighbors,
    config: &SiteConfig,
    ctx: &PageContext,
) -> Markup {
    let data = &post.data;
    let minutes = reading_time(&data.content);
    let edited = post
        .was_edited()
        .then_some(post.last_publication_date.as_ref())
        .flatten();

    let content = html! {
        (site_header(ctx.site))
        @if !data.banner.is_empty() {
            img.banner src=(data.banner.url) alt=(data.title);
        }
        main.post-page {
            header {
                h1 { (data.title) }
                (post_info(post, Some(minutes)))
                @if let Some(at) = edited {
                    p.edited { "* editado em " (format_edited(at)) }
                }
            }
            @for (idx, block) in data.content.iter().enumerate() {
                section.post-block id=(block.key(idx)) {
                    h2 { (block.heading) }
                    div.post-content { (render_rich_text(&block.body)) }
                }
            }
            (render_post_nav(neighbors))
            (render_comments(&config.comments))
        }
    };

    let title = format!("{} | {}", data.title, ctx.site.title);
    base_document(&title, ctx, None, content)
}

/// Previous/next links, omitted entirely when the post has no neighbors
fn render_post_nav(neighbors: &PostNeighbors) -> Markup {
    html! {
        @if !neighbors.is_empty() {
            nav.post-nav {
                @if let Some(prev) = &neighbors.previous {
                    a.previous href=(post_path(&prev.uid)) {
                        (prev.title)
                        span { "Post anterior" }
                    }
                }
                @if let Some(next) = &neighbors.next {
                    a.next href=(post_path(&next.uid)) {
                        (next.title)
                        span { "Próximo post" }
                    }
                }
            }
        }
    }
}
