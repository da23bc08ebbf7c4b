//! Shared test utilities for the simple-blog test suite.
//!
//! Post builders and an in-memory CMS ([`FakeCms`]) that implements the same
//! [`PostSource`] seam as the real client, so feed and fetch-stage logic can
//! be exercised without a network.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let cms = FakeCms::new()
//!     .with_first_page(page(&["a", "b"], Some("url2")))
//!     .with_page("url2", page(&["c"], None));
//!
//! let first = cms.first_page(2).unwrap();
//! assert_eq!(uids(&first.results), vec!["a", "b"]);
//! ```

use crate::cms::{CmsError, PageFetcher, PostSource};
use crate::types::{
    Banner, ContentBlock, Post, PostData, PostPagination, RichTextFragment, timestamp,
};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

// =========================================================================
// Builders
// =========================================================================

/// A listing-shaped post: title, subtitle, author and a fixed date.
pub fn post(uid: &str, title: &str) -> Post {
    Post {
        uid: uid.to_string(),
        first_publication_date: timestamp::parse("2021-03-15T19:25:28+0000"),
        last_publication_date: timestamp::parse("2021-03-15T19:25:28+0000"),
        data: PostData {
            title: title.to_string(),
            subtitle: format!("About {title}"),
            author: "Joseph Oliveira".to_string(),
            banner: Banner::default(),
            content: Vec::new(),
        },
    }
}

/// A full post whose single block body holds `words` words.
pub fn post_with_body(uid: &str, words: usize) -> Post {
    let mut p = post(uid, &uid.to_uppercase());
    p.data.banner.url = format!("https://images.prismic.io/{uid}.png");
    p.data.content = vec![ContentBlock {
        heading: "Introduction".to_string(),
        body: vec![RichTextFragment::paragraph(vec!["lorem"; words].join(" "))],
    }];
    p
}

/// A listing page of `post(uid, UID)` entries.
pub fn page(uids: &[&str], next: Option<&str>) -> PostPagination {
    PostPagination {
        next_page: next.map(str::to_string),
        results: uids.iter().map(|u| post(u, &u.to_uppercase())).collect(),
    }
}

pub fn uids(posts: &[Post]) -> Vec<&str> {
    posts.iter().map(|p| p.uid.as_str()).collect()
}

// =========================================================================
// In-memory CMS
// =========================================================================

#[derive(Default)]
pub struct FakeCms {
    first: PostPagination,
    pages: HashMap<String, PostPagination>,
    failing: HashSet<String>,
    documents: HashMap<String, Post>,
    requests: Mutex<Vec<String>>,
}

impl FakeCms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_first_page(mut self, first: PostPagination) -> Self {
        self.first = first;
        self
    }

    pub fn with_page(mut self, cursor: &str, page: PostPagination) -> Self {
        self.pages.insert(cursor.to_string(), page);
        self
    }

    pub fn with_failure(mut self, cursor: &str) -> Self {
        self.failing.insert(cursor.to_string());
        self
    }

    pub fn with_document(mut self, post: Post) -> Self {
        self.documents.insert(post.uid.clone(), post);
        self
    }

    /// Cursors and uids requested so far, in order.
    pub fn requested(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, key: &str) {
        self.requests.lock().unwrap().push(key.to_string());
    }
}

impl PageFetcher for FakeCms {
    fn fetch_page(&self, cursor: &str) -> Result<PostPagination, CmsError> {
        self.record(cursor);
        if self.failing.contains(cursor) {
            return Err(CmsError::Status {
                status: 500,
                url: cursor.to_string(),
            });
        }
        self.pages
            .get(cursor)
            .cloned()
            .ok_or_else(|| CmsError::Status {
                status: 404,
                url: cursor.to_string(),
            })
    }
}

impl PostSource for FakeCms {
    fn first_page(&self, page_size: u32) -> Result<PostPagination, CmsError> {
        let mut first = self.first.clone();
        first.results.truncate(page_size as usize);
        Ok(first)
    }

    fn post_by_uid(&self, uid: &str) -> Result<Post, CmsError> {
        self.record(uid);
        self.documents
            .get(uid)
            .cloned()
            .ok_or_else(|| CmsError::NotFound(uid.to_string()))
    }
}
