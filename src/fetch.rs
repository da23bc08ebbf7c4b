//! CMS fetching and manifest generation.
//!
//! Stage 1 of the build pipeline. Performs every request the site needs,
//! once, before anything is rendered:
//!
//! 1. The first listing page (`cms.page_size` posts).
//! 2. "Load more" through a [`PostFeed`] until the cursor is exhausted. A
//!    failing page or a repeated cursor stops the listing there, as does
//!    reaching `cms.max_pages`; the posts loaded so far are kept.
//! 3. The full document of every listed post, in parallel with
//!    [rayon](https://docs.rs/rayon). Posts whose document cannot be fetched
//!    are skipped.
//!
//! The result is a [`Manifest`] written as JSON for the generate stage.
//!
//! ## Output Structure
//!
//! ```text
//! .simple-blog-temp/
//! └── manifest.json     # listing + full posts + preview state + config
//! ```

use crate::cms::{CmsError, PostSource, PrismicClient};
use crate::config::{ConfigError, SiteConfig};
use crate::feed::PostFeed;
use crate::preview::PreviewState;
use crate::reading::reading_time;
use crate::store::PostListStore;
use crate::types::Post;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("CMS error: {0}")]
    Cms(#[from] CmsError),
}

/// Manifest output from the fetch stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Listing entries in arrival order (summaries, no content).
    pub listing: Vec<Post>,
    /// Full documents, in listing order, one per uid.
    pub posts: Vec<Post>,
    pub preview: PreviewState,
    pub config: SiteConfig,
}

/// Progress reported while fetching.
#[derive(Debug, Clone)]
pub enum FetchEvent {
    ListingPage {
        page: usize,
        added: usize,
        total: usize,
    },
    ListingStopped {
        loaded: usize,
        error: String,
    },
    PostFetched {
        index: usize,
        uid: String,
        title: String,
        minutes: usize,
    },
    PostSkipped {
        index: usize,
        uid: String,
        reason: String,
    },
}

/// Connect to the configured CMS and fetch everything.
pub fn fetch(
    config: &SiteConfig,
    preview: &PreviewState,
    events: Option<Sender<FetchEvent>>,
) -> Result<Manifest, FetchError> {
    config.require_endpoint()?;
    let client = PrismicClient::connect(&config.cms, preview.query_ref())?;
    fetch_with_source(&client, config, preview, events)
}

/// Fetch everything from a specific source (allows testing without a CMS).
pub fn fetch_with_source<S>(
    source: &S,
    config: &SiteConfig,
    preview: &PreviewState,
    events: Option<Sender<FetchEvent>>,
) -> Result<Manifest, FetchError>
where
    S: PostSource + ?Sized,
{
    let emit = |event: FetchEvent| {
        if let Some(tx) = &events {
            tx.send(event).ok();
        }
    };

    let first = source.first_page(config.cms.page_size)?;
    emit(FetchEvent::ListingPage {
        page: 1,
        added: first.results.len(),
        total: first.results.len(),
    });

    let mut feed = PostFeed::new(first, PostListStore::new());
    let mut cursors = HashSet::new();
    while let Some(cursor) = feed.next_page() {
        let stop = if !cursors.insert(cursor.to_string()) {
            Some(format!("cursor {cursor} was already loaded"))
        } else if feed.pages_loaded() >= config.cms.max_pages {
            Some(format!("reached cms.max_pages ({})", config.cms.max_pages))
        } else {
            None
        };
        if let Some(error) = stop {
            log::warn!("listing stopped: {}", error);
            emit(FetchEvent::ListingStopped {
                loaded: feed.posts().len(),
                error,
            });
            break;
        }
        match feed.load_more(source) {
            Ok(added) => emit(FetchEvent::ListingPage {
                page: feed.pages_loaded(),
                added,
                total: feed.posts().len(),
            }),
            Err(e) => {
                emit(FetchEvent::ListingStopped {
                    loaded: feed.posts().len(),
                    error: e.to_string(),
                });
                break;
            }
        }
    }
    let listing: Vec<Post> = feed.into_posts().iter().map(Post::summary).collect();

    let mut seen = HashSet::new();
    let unique: Vec<&Post> = listing
        .iter()
        .filter(|p| seen.insert(p.uid.as_str()))
        .collect();

    let fetched: Vec<Result<Post, CmsError>> = unique
        .par_iter()
        .map(|summary| source.post_by_uid(&summary.uid))
        .collect();

    let mut posts = Vec::with_capacity(fetched.len());
    for (index, (summary, result)) in unique.iter().zip(fetched).enumerate() {
        match result {
            Ok(post) => {
                emit(FetchEvent::PostFetched {
                    index: index + 1,
                    uid: post.uid.clone(),
                    title: post.data.title.clone(),
                    minutes: reading_time(&post.data.content),
                });
                posts.push(post);
            }
            Err(e) => {
                log::warn!("skipping post {}: {}", summary.uid, e);
                emit(FetchEvent::PostSkipped {
                    index: index + 1,
                    uid: summary.uid.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(Manifest {
        listing,
        posts,
        preview: preview.clone(),
        config: config.clone(),
    })
}

pub fn write_manifest(manifest: &Manifest, path: &Path) -> Result<(), FetchError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(manifest)?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn read_manifest(path: &Path) -> Result<Manifest, FetchError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PreviewConfig;
    use crate::test_helpers::{FakeCms, page, post_with_body, uids};
    use std::sync::mpsc;
    use tempfile::TempDir;

    fn config(page_size: u32) -> SiteConfig {
        let mut config = SiteConfig::default();
        config.cms.page_size = page_size;
        config
    }

    fn preview() -> PreviewState {
        PreviewState::resolve(&PreviewConfig::default(), false, None)
    }

    fn full_cms() -> FakeCms {
        FakeCms::new()
            .with_first_page(page(&["a", "b", "c"], Some("url2")))
            .with_page("url2", page(&["d", "e"], None))
            .with_document(post_with_body("a", 10))
            .with_document(post_with_body("b", 250))
            .with_document(post_with_body("c", 10))
            .with_document(post_with_body("d", 10))
            .with_document(post_with_body("e", 10))
    }

    #[test]
    fn fetches_all_pages_and_documents() {
        let cms = full_cms();
        let manifest = fetch_with_source(&cms, &config(3), &preview(), None).unwrap();

        assert_eq!(uids(&manifest.listing), vec!["a", "b", "c", "d", "e"]);
        assert_eq!(uids(&manifest.posts), vec!["a", "b", "c", "d", "e"]);
        assert!(manifest.listing.iter().all(|p| p.data.content.is_empty()));
        assert!(manifest.posts.iter().all(|p| !p.data.content.is_empty()));
    }

    #[test]
    fn listing_failure_keeps_loaded_posts() {
        let cms = FakeCms::new()
            .with_first_page(page(&["a", "b"], Some("url2")))
            .with_failure("url2")
            .with_document(post_with_body("a", 10))
            .with_document(post_with_body("b", 10));
        let (tx, rx) = mpsc::channel();

        let manifest = fetch_with_source(&cms, &config(3), &preview(), Some(tx)).unwrap();

        assert_eq!(uids(&manifest.listing), vec!["a", "b"]);
        let events: Vec<FetchEvent> = rx.iter().collect();
        assert!(
            events
                .iter()
                .any(|e| matches!(e, FetchEvent::ListingStopped { loaded: 2, .. }))
        );
    }

    #[test]
    fn repeated_cursor_stops_the_listing() {
        let cms = FakeCms::new()
            .with_first_page(page(&["a"], Some("url2")))
            .with_page("url2", page(&["b"], Some("url2")))
            .with_document(post_with_body("a", 10))
            .with_document(post_with_body("b", 10));
        let (tx, rx) = mpsc::channel();

        let manifest = fetch_with_source(&cms, &config(1), &preview(), Some(tx)).unwrap();

        assert_eq!(uids(&manifest.listing), vec!["a", "b"]);
        let page_requests = cms.requested().iter().filter(|r| *r == "url2").count();
        assert_eq!(page_requests, 1);
        let events: Vec<FetchEvent> = rx.iter().collect();
        assert!(events.iter().any(|e| matches!(
            e,
            FetchEvent::ListingStopped { loaded: 2, error } if error.contains("url2")
        )));
    }

    #[test]
    fn listing_stops_at_max_pages() {
        let cms = FakeCms::new()
            .with_first_page(page(&["a"], Some("url2")))
            .with_page("url2", page(&["b"], Some("url3")))
            .with_page("url3", page(&["c"], None))
            .with_document(post_with_body("a", 10))
            .with_document(post_with_body("b", 10))
            .with_document(post_with_body("c", 10));
        let mut config = config(1);
        config.cms.max_pages = 2;
        let (tx, rx) = mpsc::channel();

        let manifest = fetch_with_source(&cms, &config, &preview(), Some(tx)).unwrap();

        assert_eq!(uids(&manifest.listing), vec!["a", "b"]);
        assert!(!cms.requested().iter().any(|r| r == "url3"));
        let events: Vec<FetchEvent> = rx.iter().collect();
        assert!(events.iter().any(|e| matches!(
            e,
            FetchEvent::ListingStopped { error, .. } if error.contains("max_pages")
        )));
    }

    #[test]
    fn missing_document_is_skipped() {
        let cms = FakeCms::new()
            .with_first_page(page(&["a", "gone"], None))
            .with_document(post_with_body("a", 10));
        let (tx, rx) = mpsc::channel();

        let manifest = fetch_with_source(&cms, &config(3), &preview(), Some(tx)).unwrap();

        assert_eq!(uids(&manifest.listing), vec!["a", "gone"]);
        assert_eq!(uids(&manifest.posts), vec!["a"]);
        let events: Vec<FetchEvent> = rx.iter().collect();
        assert!(events.iter().any(
            |e| matches!(e, FetchEvent::PostSkipped { uid, .. } if uid == "gone")
        ));
    }

    #[test]
    fn duplicate_listing_entries_fetch_once() {
        let cms = FakeCms::new()
            .with_first_page(page(&["a", "b"], Some("url2")))
            .with_page("url2", page(&["b"], None))
            .with_document(post_with_body("a", 10))
            .with_document(post_with_body("b", 10));

        let manifest = fetch_with_source(&cms, &config(2), &preview(), None).unwrap();

        assert_eq!(uids(&manifest.listing), vec!["a", "b", "b"]);
        assert_eq!(uids(&manifest.posts), vec!["a", "b"]);
        let b_requests = cms.requested().iter().filter(|r| *r == "b").count();
        assert_eq!(b_requests, 1);
    }

    #[test]
    fn reports_pages_and_reading_time() {
        let cms = full_cms();
        let (tx, rx) = mpsc::channel();
        fetch_with_source(&cms, &config(3), &preview(), Some(tx)).unwrap();
        let events: Vec<FetchEvent> = rx.iter().collect();

        assert!(events.iter().any(|e| matches!(
            e,
            FetchEvent::ListingPage {
                page: 2,
                added: 2,
                total: 5
            }
        )));
        assert!(events.iter().any(|e| matches!(
            e,
            FetchEvent::PostFetched { uid, minutes: 2, .. } if uid == "b"
        )));
    }

    #[test]
    fn manifest_records_preview_state() {
        let cms = full_cms();
        let state = PreviewState::resolve(&PreviewConfig::default(), false, Some("draft"));
        let manifest = fetch_with_source(&cms, &config(3), &state, None).unwrap();
        assert!(manifest.preview.enabled);
        assert_eq!(manifest.preview.query_ref(), Some("draft"));
    }

    #[test]
    fn manifest_round_trips_through_disk() {
        let cms = full_cms();
        let manifest = fetch_with_source(&cms, &config(3), &preview(), None).unwrap();
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested/manifest.json");

        write_manifest(&manifest, &path).unwrap();
        let back = read_manifest(&path).unwrap();

        assert_eq!(back.listing, manifest.listing);
        assert_eq!(back.posts, manifest.posts);
        assert_eq!(back.preview, manifest.preview);
    }

    #[test]
    fn fetch_requires_endpoint() {
        let result = fetch(&SiteConfig::default(), &preview(), None);
        assert!(matches!(result, Err(FetchError::Config(_))));
    }
}
