//! Previous/next links between posts.
//!
//! Neighbors come from the shared post list, in listing order. A post that
//! is not in the list (e.g. reached by a direct link before any listing was
//! loaded) simply has no neighbors.

use crate::store::PostListStore;
use crate::types::Post;

/// Neighbors of a post within a list, borrowed from that list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbors<'a> {
    pub previous: Option<&'a Post>,
    pub next: Option<&'a Post>,
}

impl<'a> Neighbors<'a> {
    pub const NONE: Self = Neighbors {
        previous: None,
        next: None,
    };
}

/// Find the neighbors of the first post in `posts` whose uid is `uid`.
pub fn find_neighbors<'a>(posts: &'a [Post], uid: &str) -> Neighbors<'a> {
    let Some(index) = posts.iter().position(|p| p.uid == uid) else {
        return Neighbors::NONE;
    };
    Neighbors {
        previous: index.checked_sub(1).map(|i| &posts[i]),
        next: posts.get(index + 1),
    }
}

/// What a post page needs to link to a neighbor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborLink {
    pub uid: String,
    pub title: String,
}

impl From<&Post> for NeighborLink {
    fn from(post: &Post) -> Self {
        Self {
            uid: post.uid.clone(),
            title: post.data.title.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostNeighbors {
    pub previous: Option<NeighborLink>,
    pub next: Option<NeighborLink>,
}

impl PostNeighbors {
    pub fn is_empty(&self) -> bool {
        self.previous.is_none() && self.next.is_none()
    }
}

impl From<Neighbors<'_>> for PostNeighbors {
    fn from(n: Neighbors<'_>) -> Self {
        Self {
            previous: n.previous.map(NeighborLink::from),
            next: n.next.map(NeighborLink::from),
        }
    }
}

/// Memoized neighbor lookup.
///
/// Recomputes only when the store version or the requested uid differs from
/// the previous call.
#[derive(Debug, Default)]
pub struct NeighborCache {
    key: Option<(u64, String)>,
    value: PostNeighbors,
    computations: usize,
}

impl NeighborCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&mut self, store: &PostListStore, uid: &str) -> &PostNeighbors {
        let list = store.snapshot();
        let fresh = matches!(&self.key, Some((version, cached)) if *version == list.version && cached == uid);
        if !fresh {
            self.value = find_neighbors(&list.posts, uid).into();
            self.key = Some((list.version, uid.to_string()));
            self.computations += 1;
        }
        &self.value
    }

    /// Number of lookups that actually scanned the list.
    pub fn computations(&self) -> usize {
        self.computations
    }
}
