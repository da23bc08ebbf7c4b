//! The shared post list.
//!
//! Holds the most recently established listing so post pages can look up
//! their neighbors without another CMS round-trip. The store is an explicit
//! handle passed to whoever needs it; clones share the same list.
//!
//! The only mutation is [`PostListStore::replace`]: a new listing overwrites
//! the previous one wholesale and is never merged into it. Every replace
//! bumps a version number, which lets readers such as
//! [`NeighborCache`](crate::navigation::NeighborCache) notice changes without
//! comparing lists.

use crate::types::Post;
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug, Clone, Default)]
pub struct PostListStore {
    inner: Arc<RwLock<PostList>>,
}

/// An immutable view of the store at one version.
#[derive(Debug, Clone)]
pub struct PostList {
    pub version: u64,
    pub posts: Arc<[Post]>,
}

impl Default for PostList {
    fn default() -> Self {
        Self {
            version: 0,
            posts: Arc::from(Vec::new()),
        }
    }
}

impl PostListStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the list. Returns the new version.
    pub fn replace(&self, posts: Vec<Post>) -> u64 {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        guard.version += 1;
        guard.posts = Arc::from(posts);
        log::debug!(
            "post list replaced: {} posts (version {})",
            guard.posts.len(),
            guard.version
        );
        guard.version
    }

    pub fn snapshot(&self) -> PostList {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn version(&self) -> u64 {
        self.snapshot().version
    }
}
