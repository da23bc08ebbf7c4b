//! Prismic CMS client.
//!
//! Talks to the repository's REST API with a blocking `reqwest` client:
//!
//! - `GET {endpoint}` lists the repository refs; the master ref is the
//!   published content, other refs are preview revisions.
//! - `GET {endpoint}/documents/search?ref=..&q=..` runs predicate queries.
//!   Listings use `[[at(document.type,"post")]]`, single posts use
//!   `[[at(my.post.uid,"<uid>")]]`.
//!
//! Responses are mapped from the CMS document layout onto [`Post`] and
//! [`PostPagination`]. A listing response's `next_page` is an absolute
//! search URL; the client fetches it verbatim (adding the access token when
//! the repository needs one), which is what [`PageFetcher`] abstracts.
//!
//! The [`PageFetcher`] and [`PostSource`] traits are the seams the rest of
//! the crate depends on, so the fetch stage can run against an in-memory
//! source in tests.

use crate::config::CmsConfig;
use crate::types::{Banner, ContentBlock, Post, PostData, PostPagination, RichTextFragment, timestamp};
use chrono::{DateTime, FixedOffset};
use reqwest::Url;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CmsError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("CMS returned {status} for {url}")]
    Status { status: u16, url: String },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("Repository has no master ref")]
    NoMasterRef,
    #[error("Document not found: {0}")]
    NotFound(String),
}

/// Fetches one listing page from a cursor.
pub trait PageFetcher {
    fn fetch_page(&self, cursor: &str) -> Result<PostPagination, CmsError>;
}

/// Everything the fetch stage needs from the CMS.
pub trait PostSource: PageFetcher + Sync {
    /// First listing page, `page_size` posts long.
    fn first_page(&self, page_size: u32) -> Result<PostPagination, CmsError>;
    /// Full document for one post.
    fn post_by_uid(&self, uid: &str) -> Result<Post, CmsError>;
}

// ============================================================================
// CMS response shapes
// ============================================================================

#[derive(Debug, Deserialize)]
struct ApiInfo {
    #[serde(default)]
    refs: Vec<ApiRef>,
}

#[derive(Debug, Deserialize)]
struct ApiRef {
    #[serde(rename = "ref")]
    content_ref: String,
    #[serde(rename = "isMasterRef", default)]
    is_master: bool,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    next_page: Option<String>,
    #[serde(default)]
    results: Vec<Document>,
}

#[derive(Debug, Deserialize)]
struct Document {
    #[serde(default)]
    uid: Option<String>,
    #[serde(default, with = "timestamp")]
    first_publication_date: Option<DateTime<FixedOffset>>,
    #[serde(default, with = "timestamp")]
    last_publication_date: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    data: DocumentData,
}

/// Post fields as stored in the CMS. Empty fields arrive as `null`.
#[derive(Debug, Default, Deserialize)]
struct DocumentData {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    subtitle: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    banner: Option<DocumentBanner>,
    #[serde(default)]
    content: Option<Vec<DocumentBlock>>,
}

#[derive(Debug, Default, Deserialize)]
struct DocumentBanner {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DocumentBlock {
    #[serde(default)]
    heading: Option<String>,
    #[serde(default)]
    body: Option<Vec<RichTextFragment>>,
}

impl Document {
    /// Map onto a [`Post`]. Documents without a uid cannot be linked to
    /// and are dropped.
    fn into_post(self) -> Option<Post> {
        let uid = self.uid.filter(|u| !u.is_empty())?;
        let data = self.data;
        Some(Post {
            uid,
            first_publication_date: self.first_publication_date,
            last_publication_date: self.last_publication_date,
            data: PostData {
                title: data.title.unwrap_or_default(),
                subtitle: data.subtitle.unwrap_or_default(),
                author: data.author.unwrap_or_default(),
                banner: Banner {
                    url: data.banner.and_then(|b| b.url).unwrap_or_default(),
                },
                content: data
                    .content
                    .unwrap_or_default()
                    .into_iter()
                    .map(|block| ContentBlock {
                        heading: block.heading.unwrap_or_default(),
                        body: block.body.unwrap_or_default(),
                    })
                    .collect(),
            },
        })
    }
}

impl SearchResponse {
    fn into_pagination(self) -> PostPagination {
        let total = self.results.len();
        let results: Vec<Post> = self
            .results
            .into_iter()
            .filter_map(Document::into_post)
            .collect();
        if results.len() < total {
            log::warn!(
                "dropped {} document(s) without a uid from listing page",
                total - results.len()
            );
        }
        PostPagination {
            next_page: self.next_page.filter(|n| !n.is_empty()),
            results,
        }
    }
}

fn master_ref_of(info: ApiInfo) -> Result<String, CmsError> {
    info.refs
        .into_iter()
        .find(|r| r.is_master)
        .map(|r| r.content_ref)
        .ok_or(CmsError::NoMasterRef)
}

/// Quote a value for use inside a predicate string.
fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// `[[at(document.type,"post")]]`
pub fn type_predicate(document_type: &str) -> String {
    format!("[[at(document.type,{})]]", quote(document_type))
}

/// `[[at(my.post.uid,"slug")]]`
pub fn uid_predicate(document_type: &str, uid: &str) -> String {
    format!("[[at(my.{}.uid,{})]]", document_type, quote(uid))
}

/// URL without query string, safe to show in errors and logs.
fn display_url(url: &Url) -> String {
    format!("{}{}", url.origin().ascii_serialization(), url.path())
}

fn parse_url(raw: &str) -> Result<Url, CmsError> {
    Url::parse(raw).map_err(|e| CmsError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })
}

// ============================================================================
// Client
// ============================================================================

pub struct PrismicClient {
    http: reqwest::blocking::Client,
    endpoint: Url,
    access_token: Option<String>,
    document_type: String,
    orderings: Option<String>,
    content_ref: String,
}

impl PrismicClient {
    /// Build a client and resolve the content ref.
    ///
    /// With `preview_ref` set the client queries that revision; otherwise it
    /// asks the repository for its master ref.
    pub fn connect(config: &CmsConfig, preview_ref: Option<&str>) -> Result<Self, CmsError> {
        let mut client = Self::with_ref(config, "")?;
        client.content_ref = match preview_ref {
            Some(r) => r.to_string(),
            None => client.master_ref()?,
        };
        log::info!(
            "querying {} at ref {}",
            display_url(&client.endpoint),
            client.content_ref
        );
        Ok(client)
    }

    /// Build a client for a known ref without contacting the repository.
    pub fn with_ref(config: &CmsConfig, content_ref: &str) -> Result<Self, CmsError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("simple-blog/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let endpoint = parse_url(config.endpoint.trim().trim_end_matches('/'))?;
        Ok(Self {
            http,
            endpoint,
            access_token: config.access_token.clone().filter(|t| !t.is_empty()),
            document_type: config.document_type.clone(),
            orderings: config.orderings.clone(),
            content_ref: content_ref.to_string(),
        })
    }

    pub fn content_ref(&self) -> &str {
        &self.content_ref
    }

    /// The endpoint without query string.
    pub fn endpoint(&self) -> String {
        display_url(&self.endpoint)
    }

    fn master_ref(&self) -> Result<String, CmsError> {
        let info: ApiInfo = self.get_json(self.with_token(self.endpoint.clone()))?;
        master_ref_of(info)
    }

    /// Append the access token unless the URL already carries one.
    fn with_token(&self, mut url: Url) -> Url {
        if let Some(token) = &self.access_token {
            let present = url.query_pairs().any(|(k, _)| k == "access_token");
            if !present {
                url.query_pairs_mut().append_pair("access_token", token);
            }
        }
        url
    }

    /// Build a documents/search URL for `predicate`.
    pub fn search_url(&self, predicate: &str, page_size: u32, fetch: Option<&str>) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("documents").push("search");
        }
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("ref", &self.content_ref);
            query.append_pair("q", predicate);
            query.append_pair("pageSize", &page_size.to_string());
            if let Some(fields) = fetch {
                query.append_pair("fetch", fields);
            }
            if let Some(orderings) = &self.orderings {
                query.append_pair("orderings", orderings);
            }
        }
        self.with_token(url)
    }

    /// Resolve a cursor against the endpoint and add the token.
    pub fn cursor_url(&self, cursor: &str) -> Result<Url, CmsError> {
        let url = match Url::parse(cursor) {
            Ok(url) => url,
            Err(_) => {
                let mut base = self.endpoint.clone();
                if !base.path().ends_with('/') {
                    let path = format!("{}/", base.path());
                    base.set_path(&path);
                }
                base.join(cursor).map_err(|e| CmsError::InvalidUrl {
                    url: cursor.to_string(),
                    reason: e.to_string(),
                })?
            }
        };
        Ok(self.with_token(url))
    }

    fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, CmsError> {
        log::debug!("GET {}", display_url(&url));
        let response = self.http.get(url.clone()).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(CmsError::Status {
                status: status.as_u16(),
                url: display_url(&url),
            });
        }
        let body = response.text()?;
        Ok(serde_json::from_str(&body)?)
    }

    fn listing_fields(&self) -> String {
        ["title", "subtitle", "author"]
            .iter()
            .map(|field| format!("{}.{}", self.document_type, field))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl PageFetcher for PrismicClient {
    fn fetch_page(&self, cursor: &str) -> Result<PostPagination, CmsError> {
        let url = self.cursor_url(cursor)?;
        let response: SearchResponse = self.get_json(url)?;
        Ok(response.into_pagination())
    }
}

impl PostSource for PrismicClient {
    fn first_page(&self, page_size: u32) -> Result<PostPagination, CmsError> {
        let fields = self.listing_fields();
        let url = self.search_url(
            &type_predicate(&self.document_type),
            page_size,
            Some(&fields),
        );
        let response: SearchResponse = self.get_json(url)?;
        Ok(response.into_pagination())
    }

    fn post_by_uid(&self, uid: &str) -> Result<Post, CmsError> {
        let url = self.search_url(&uid_predicate(&self.document_type, uid), 1, None);
        let response: SearchResponse = self.get_json(url)?;
        response
            .into_pagination()
            .results
            .into_iter()
            .next()
            .ok_or_else(|| CmsError::NotFound(uid.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FragmentKind;

    fn config() -> CmsConfig {
        CmsConfig {
            endpoint: "https://blog.cdn.prismic.io/api/v2/".to_string(),
            ..CmsConfig::default()
        }
    }

    fn client(config: &CmsConfig) -> PrismicClient {
        PrismicClient::with_ref(config, "master-ref").unwrap()
    }

    const SEARCH_BODY: &str = r#"{
        "page": 1,
        "results_per_page": 2,
        "next_page": "https://blog.cdn.prismic.io/api/v2/documents/search?ref=master-ref&page=2&pageSize=2",
        "results": [
            {
                "id": "YFu4tBIAACMAk4E1",
                "uid": "como-utilizar-hooks",
                "type": "post",
                "first_publication_date": "2021-03-15T19:25:28+0000",
                "last_publication_date": "2021-03-19T15:49:00+0000",
                "data": {
                    "title": "Como utilizar Hooks",
                    "subtitle": "Pensando em sincronização",
                    "author": "Joseph Oliveira",
                    "banner": { "url": "https://images.prismic.io/b.png", "alt": null },
                    "content": [
                        {
                            "heading": "Proin et varius",
                            "body": [
                                { "type": "paragraph", "text": "Lorem ipsum dolor", "spans": [
                                    { "start": 0, "end": 5, "type": "strong" },
                                    { "start": 6, "end": 11, "type": "hyperlink",
                                      "data": { "link_type": "Web", "url": "https://example.com" } }
                                ] },
                                { "type": "image", "url": "https://images.prismic.io/i.png", "alt": null }
                            ]
                        }
                    ]
                }
            },
            {
                "id": "no-uid",
                "uid": null,
                "type": "post",
                "first_publication_date": null,
                "last_publication_date": null,
                "data": { "title": null, "subtitle": null, "author": null, "banner": {}, "content": null }
            }
        ]
    }"#;

    #[test]
    fn maps_search_response() {
        let response: SearchResponse = serde_json::from_str(SEARCH_BODY).unwrap();
        let page = response.into_pagination();

        assert!(page.next_page.as_deref().unwrap().contains("page=2"));
        assert_eq!(page.results.len(), 1);
        let post = &page.results[0];
        assert_eq!(post.uid, "como-utilizar-hooks");
        assert_eq!(post.data.author, "Joseph Oliveira");
        assert_eq!(post.data.banner.url, "https://images.prismic.io/b.png");
        assert!(post.was_edited());

        let body = &post.data.content[0].body;
        assert_eq!(body.len(), 2);
        assert_eq!(body[0].spans.len(), 2);
        assert_eq!(body[1].kind, FragmentKind::Other);
    }

    #[test]
    fn null_fields_become_empty() {
        let doc: Document = serde_json::from_str(
            r#"{"uid": "x", "data": {"title": null, "banner": {}, "content": null}}"#,
        )
        .unwrap();
        let post = doc.into_post().unwrap();
        assert_eq!(post.data.title, "");
        assert!(post.data.banner.is_empty());
        assert!(post.data.content.is_empty());
        assert!(post.first_publication_date.is_none());
    }

    #[test]
    fn empty_next_page_means_exhausted() {
        let response: SearchResponse =
            serde_json::from_str(r#"{"next_page": null, "results": []}"#).unwrap();
        assert!(response.into_pagination().next_page.is_none());
    }

    #[test]
    fn picks_master_ref() {
        let info: ApiInfo = serde_json::from_str(
            r#"{"refs": [
                {"id": "preview", "ref": "draft-ref", "label": "Draft", "isMasterRef": false},
                {"id": "master", "ref": "master-ref", "label": "Master", "isMasterRef": true}
            ]}"#,
        )
        .unwrap();
        assert_eq!(master_ref_of(info).unwrap(), "master-ref");
    }

    #[test]
    fn missing_master_ref_is_error() {
        let info: ApiInfo = serde_json::from_str(r#"{"refs": []}"#).unwrap();
        assert!(matches!(master_ref_of(info), Err(CmsError::NoMasterRef)));
    }

    #[test]
    fn predicates_are_quoted() {
        assert_eq!(type_predicate("post"), r#"[[at(document.type,"post")]]"#);
        assert_eq!(
            uid_predicate("post", r#"a"b"#),
            r#"[[at(my.post.uid,"a\"b")]]"#
        );
    }

    #[test]
    fn search_url_carries_ref_query_and_page_size() {
        let client = client(&config());
        let url = client.search_url(&type_predicate("post"), 3, Some("post.title"));
        assert_eq!(url.path(), "/api/v2/documents/search");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("ref".to_string(), "master-ref".to_string())));
        assert!(pairs.contains(&("pageSize".to_string(), "3".to_string())));
        assert!(pairs.contains(&("fetch".to_string(), "post.title".to_string())));
        assert!(pairs.contains(&("q".to_string(), type_predicate("post"))));
        assert!(!pairs.iter().any(|(k, _)| k == "access_token"));
    }

    #[test]
    fn search_url_on_bare_host_has_single_slash() {
        let cfg = CmsConfig {
            endpoint: "https://blog.cdn.prismic.io".to_string(),
            ..CmsConfig::default()
        };
        let url = client(&cfg).search_url("q", 1, None);
        assert_eq!(url.path(), "/documents/search");
    }

    #[test]
    fn search_url_includes_orderings() {
        let mut cfg = config();
        cfg.orderings = Some("[document.first_publication_date desc]".to_string());
        let url = client(&cfg).search_url("q", 1, None);
        assert!(url.query_pairs().any(|(k, _)| k == "orderings"));
    }

    #[test]
    fn token_appended_once() {
        let mut cfg = config();
        cfg.access_token = Some("secret".to_string());
        let client = client(&cfg);

        let url = client
            .cursor_url("https://blog.cdn.prismic.io/api/v2/documents/search?page=2")
            .unwrap();
        assert_eq!(
            url.query_pairs().filter(|(k, _)| k == "access_token").count(),
            1
        );

        let again = client.cursor_url(url.as_str()).unwrap();
        assert_eq!(
            again.query_pairs().filter(|(k, _)| k == "access_token").count(),
            1
        );
    }

    #[test]
    fn relative_cursor_resolves_against_endpoint() {
        let client = client(&config());
        let url = client.cursor_url("documents/search?page=2").unwrap();
        assert_eq!(url.path(), "/api/v2/documents/search");
    }

    #[test]
    fn display_url_hides_query() {
        let url = Url::parse("https://blog.cdn.prismic.io/api/v2?access_token=secret").unwrap();
        assert_eq!(display_url(&url), "https://blog.cdn.prismic.io/api/v2");
    }

    #[test]
    fn invalid_endpoint_is_error() {
        let cfg = CmsConfig {
            endpoint: "not a url".to_string(),
            ..CmsConfig::default()
        };
        assert!(matches!(
            PrismicClient::with_ref(&cfg, "r"),
            Err(CmsError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn listing_fields_use_document_type() {
        let mut cfg = config();
        cfg.document_type = "article".to_string();
        assert_eq!(
            client(&cfg).listing_fields(),
            "article.title,article.subtitle,article.author"
        );
    }
}
