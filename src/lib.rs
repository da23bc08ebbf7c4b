//! # Simple Blog
//!
//! A static blog generator for posts kept in a headless CMS. The CMS is the
//! data source: posts are fetched from Prismic's REST API at build time and
//! written out as plain HTML, plus a few JSON page-list endpoints that let the
//! listing grow in the browser with "Carregar mais posts".
//!
//! # Architecture: Two-Stage Pipeline
//!
//! Content goes through two independent stages joined by a JSON manifest:
//!
//! ```text
//! 1. Fetch     CMS       →  manifest.json   (listing pages + post documents)
//! 2. Generate  manifest  →  dist/           (final HTML site)
//! ```
//!
//! - **Debuggability**: the manifest is human-readable JSON you can inspect.
//! - **Offline rendering**: `generate` re-renders without touching the CMS.
//! - **Testability**: the fetch stage talks to the CMS through the
//!   [`cms::PostSource`] trait, so tests drive it with an in-memory source.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`fetch`] | Stage 1: loads every listing page and post document into the manifest |
//! | [`generate`] | Stage 2: renders the site from the manifest using Maud |
//! | [`cms`] | Prismic REST client and the `PageFetcher` / `PostSource` seams |
//! | [`feed`] | Paginated listing with "load more", loading flag and in-flight guard |
//! | [`store`] | The shared post list, replaced wholesale and versioned |
//! | [`navigation`] | Previous/next neighbors of a post, memoized per store version |
//! | [`reading`] | Estimated reading time |
//! | [`dates`] | pt-BR date and hour formatting |
//! | [`richtext`] | CMS rich text → [`richtext::TrustedHtml`] |
//! | [`preview`] | Preview mode flag and its exit link |
//! | [`comments`] | Utterances comments widget |
//! | [`config`] | `config.toml` loading, environment overrides, validation, theme CSS |
//! | [`types`] | Post types shared by the CMS client, the manifest and the page-list endpoints |
//! | [`output`] | CLI output formatting for each stage |
//!
//! # Design Decisions
//!
//! ## One Post List, Replaced Wholesale
//!
//! Loaded posts live in a single [`store::PostListStore`]. The feed replaces
//! it after every successful page with the full updated list, and readers
//! take snapshots. There is no partial mutation to reason about, and the
//! version counter lets [`navigation::NeighborCache`] skip recomputation.
//!
//! ## One Load at a Time
//!
//! [`feed::PostFeed`] refuses to start a load while another is in flight.
//! The browser script follows the same rule, so a double click never appends
//! a page twice.
//!
//! ## A Single Trust Boundary for Content
//!
//! Post bodies are the only markup pages embed unescaped, and they can only
//! get there as a [`richtext::TrustedHtml`], which only
//! [`richtext::render_rich_text`] produces. Every other value goes through
//! Maud's escaping.
//!
//! ## Maud Over Template Engines
//!
//! HTML is generated with [Maud](https://maud.lambda.xyz/), a compile-time HTML
//! macro system. Malformed templates are build errors, template variables are
//! Rust expressions, and there is no template directory to ship.

pub mod cms;
pub mod comments;
pub mod config;
pub mod dates;
pub mod feed;
pub mod fetch;
pub mod generate;
pub mod navigation;
pub mod output;
pub mod preview;
pub mod reading;
pub mod richtext;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
