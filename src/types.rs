//! Shared types used across both pipeline stages.
//!
//! These types are serialized into the fetch manifest and read back by the
//! generate stage, and they are also the wire shape of the `posts/<n>.json`
//! page-list endpoints, so field names follow the CMS document layout
//! (`first_publication_date`, `next_page`, ...).

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A blog post as fetched from the CMS.
///
/// Listing queries only request title, subtitle and author, so `banner` and
/// `content` are empty for posts that came from a listing page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub uid: String,
    #[serde(default, with = "timestamp")]
    pub first_publication_date: Option<DateTime<FixedOffset>>,
    #[serde(default, with = "timestamp")]
    pub last_publication_date: Option<DateTime<FixedOffset>>,
    pub data: PostData,
}

impl Post {
    /// Copy of this post without banner or content, as served by listing pages.
    pub fn summary(&self) -> Post {
        Post {
            uid: self.uid.clone(),
            first_publication_date: self.first_publication_date,
            last_publication_date: self.last_publication_date,
            data: PostData {
                title: self.data.title.clone(),
                subtitle: self.data.subtitle.clone(),
                author: self.data.author.clone(),
                banner: Banner::default(),
                content: Vec::new(),
            },
        }
    }

    /// True when the post was republished after its first publication.
    pub fn was_edited(&self) -> bool {
        match (self.first_publication_date, self.last_publication_date) {
            (Some(first), Some(last)) => last > first,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostData {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub author: String,
    #[serde(default, skip_serializing_if = "Banner::is_empty")]
    pub banner: Banner,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Banner {
    #[serde(default)]
    pub url: String,
}

impl Banner {
    pub fn is_empty(&self) -> bool {
        self.url.is_empty()
    }
}

/// One titled section of a post body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(default)]
    pub heading: String,
    #[serde(default)]
    pub body: Vec<RichTextFragment>,
}

impl ContentBlock {
    /// Render key for the block at `index`.
    ///
    /// Headings are not unique within a post, so the key combines the
    /// position with a short SHA-256 of the block's heading and text.
    pub fn key(&self, index: usize) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.heading.as_bytes());
        for fragment in &self.body {
            hasher.update([0u8]);
            hasher.update(fragment.text.as_bytes());
        }
        let digest = format!("{:x}", hasher.finalize());
        format!("block-{}-{}", index, &digest[..8])
    }
}

/// A rich-text element as delivered by the CMS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichTextFragment {
    #[serde(rename = "type", default)]
    pub kind: FragmentKind,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spans: Vec<Span>,
}

impl RichTextFragment {
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self {
            kind: FragmentKind::Paragraph,
            text: text.into(),
            spans: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FragmentKind {
    #[default]
    Paragraph,
    Heading1,
    Heading2,
    Heading3,
    Heading4,
    Heading5,
    Heading6,
    ListItem,
    OListItem,
    Preformatted,
    /// Anything the renderer does not know (images, embeds, ...).
    #[serde(other)]
    Other,
}

/// Inline formatting over a character range of a fragment's text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "type")]
    pub kind: SpanKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<SpanData>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanKind {
    Strong,
    Em,
    Hyperlink,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpanData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// One page of a post listing.
///
/// `next_page` is the cursor for the following page; `None` means the
/// listing is exhausted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostPagination {
    #[serde(default)]
    pub next_page: Option<String>,
    #[serde(default)]
    pub results: Vec<Post>,
}

/// Serde adapter for optional CMS timestamps.
///
/// Accepts RFC 3339 as well as the `+0000` offset form the CMS emits, and
/// writes RFC 3339 with the original offset preserved.
pub mod timestamp {
    use chrono::{DateTime, FixedOffset};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(raw: &str) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(raw)
            .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z"))
            .ok()
    }

    pub fn serialize<S>(value: &Option<DateTime<FixedOffset>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => serializer.serialize_some(&ts.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<FixedOffset>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(s) => parse(&s)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {s}"))),
        }
    }
}
