//! Paginated post listing with "load more".
//!
//! [`PostFeed`] holds the posts loaded so far and the cursor of the next
//! page. Loading is split into [`PostFeed::begin_load`] and
//! [`PostFeed::finish_load`] so the loading flag is observable while a
//! request is outstanding:
//!
//! ```text
//! idle ──begin_load──▶ loading ──finish_load(Ok)──▶ idle (posts + cursor replaced)
//!                              └─finish_load(Err)─▶ idle (nothing changed)
//! ```
//!
//! - A load can only begin while a cursor remains and no other load is in
//!   flight; otherwise `begin_load` refuses with [`FeedError::Exhausted`] or
//!   [`FeedError::InFlight`].
//! - `finish_load` always clears the loading flag.
//! - On success the new page is appended in arrival order (no de-duplication
//!   by uid) and the cursor is replaced, both at once; then the shared
//!   [`PostListStore`] is overwritten with the updated list.

use crate::cms::{CmsError, PageFetcher};
use crate::store::PostListStore;
use crate::types::{Post, PostPagination};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("No more pages to load")]
    Exhausted,
    #[error("A page is already loading")]
    InFlight,
    #[error("Loading the next page failed: {0}")]
    Fetch(#[from] CmsError),
}

/// Append `page` to `acc`: results concatenated, cursor taken from `page`.
pub fn accumulate(mut acc: PostPagination, page: PostPagination) -> PostPagination {
    acc.results.extend(page.results);
    acc.next_page = page.next_page;
    acc
}

/// Permission to complete one in-flight load. Returned by
/// [`PostFeed::begin_load`] and consumed by [`PostFeed::finish_load`].
#[derive(Debug)]
#[must_use = "an unfinished load keeps the feed in the loading state"]
pub struct PendingLoad {
    cursor: String,
}

impl PendingLoad {
    pub fn cursor(&self) -> &str {
        &self.cursor
    }
}

#[derive(Debug)]
pub struct PostFeed {
    page: PostPagination,
    loading: bool,
    pages_loaded: usize,
    store: PostListStore,
}

impl PostFeed {
    /// Start a feed from its first page and publish that page to `store`.
    pub fn new(first: PostPagination, store: PostListStore) -> Self {
        store.replace(first.results.clone());
        Self {
            page: first,
            loading: false,
            pages_loaded: 1,
            store,
        }
    }

    pub fn posts(&self) -> &[Post] {
        &self.page.results
    }

    pub fn next_page(&self) -> Option<&str> {
        self.page.next_page.as_deref()
    }

    pub fn has_more(&self) -> bool {
        self.page.next_page.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Pages successfully added, the first one included.
    pub fn pages_loaded(&self) -> usize {
        self.pages_loaded
    }

    pub fn into_posts(self) -> Vec<Post> {
        self.page.results
    }

    /// Mark a load as in flight and hand out the cursor to fetch.
    pub fn begin_load(&mut self) -> Result<PendingLoad, FeedError> {
        if self.loading {
            return Err(FeedError::InFlight);
        }
        let cursor = self.page.next_page.clone().ok_or(FeedError::Exhausted)?;
        self.loading = true;
        Ok(PendingLoad { cursor })
    }

    /// Apply the outcome of a load. Returns the number of posts added.
    pub fn finish_load(
        &mut self,
        pending: PendingLoad,
        result: Result<PostPagination, CmsError>,
    ) -> Result<usize, FeedError> {
        self.loading = false;
        let page = match result {
            Ok(page) => page,
            Err(e) => {
                log::warn!("loading {} failed: {}", pending.cursor, e);
                return Err(FeedError::Fetch(e));
            }
        };
        let added = page.results.len();
        let current = std::mem::take(&mut self.page);
        self.page = accumulate(current, page);
        self.pages_loaded += 1;
        self.store.replace(self.page.results.clone());
        Ok(added)
    }

    /// Fetch the next page through `fetcher` and append it.
    pub fn load_more<F>(&mut self, fetcher: &F) -> Result<usize, FeedError>
    where
        F: PageFetcher + ?Sized,
    {
        let pending = self.begin_load()?;
        let result = fetcher.fetch_page(pending.cursor());
        self.finish_load(pending, result)
    }
}
