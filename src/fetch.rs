// site-listings/src/fetch.rs

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL, PRAGMA};
use std::{io, path::{Component, Path, PathBuf}, time::Duration};
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Raw response of a single GET.
#[derive(Clone, Debug)]
pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Response {
    pub fn ok(&self) -> bool { (200..300).contains(&self.status) }

    pub fn json(&self) -> Result<serde_json::Value, FetchError> {
        serde_json::from_slice(&self.body).map_err(FetchError::Json)
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid request url {url}: {reason}")]
    BadUrl { url: String, reason: String },
    #[error("network error while fetching {url}: {source}")]
    Network { url: String, #[source] source: reqwest::Error },
    #[error("failed to read {}: {source}", path.display())]
    Io { path: PathBuf, #[source] source: io::Error },
    #[error("invalid JSON: {0}")]
    Json(#[source] serde_json::Error),
}

/// One GET per call, never cached, never retried.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn get(&self, path: &str) -> Result<Response, FetchError>;
}

#[derive(Clone, Debug)]
enum Origin {
    Http { page: Url, client: reqwest::Client },
    Local { root: PathBuf, page: String },
}

/// Resolves dataset paths the way a browser on the host page would: relative
/// paths against the page, absolute paths against the site origin/root.
#[derive(Clone, Debug)]
pub struct SiteFetcher {
    origin: Origin,
}

impl SiteFetcher {
    /// HTTP origin. `page` is the page hosting the widgets, relative to `base_url`.
    pub fn http(base_url: &str, page: Option<&str>, timeout: Option<Duration>) -> Result<Self, FetchError> {
        let bad = |reason: String| FetchError::BadUrl { url: base_url.to_string(), reason };
        let base = Url::parse(base_url).map_err(|e| bad(e.to_string()))?;
        let page = match page {
            Some(p) => base.join(p).map_err(|e| bad(e.to_string()))?,
            None => base,
        };
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(t) = timeout { builder = builder.timeout(t); }
        let client = builder.build()
            .map_err(|e| FetchError::Network { url: page.to_string(), source: e })?;
        Ok(Self { origin: Origin::Http { page, client } })
    }

    /// Local static-site directory; a missing file answers 404 like a static server would.
    pub fn local(root: impl Into<PathBuf>, page: Option<&str>) -> Self {
        Self { origin: Origin::Local { root: root.into(), page: page.unwrap_or("index.html").to_string() } }
    }

    /// The URL (or site-relative path) a dataset path resolves to.
    pub fn resolve(&self, path: &str) -> Result<String, FetchError> {
        match &self.origin {
            Origin::Http { page, .. } => page.join(path).map(|u| u.to_string())
                .map_err(|e| FetchError::BadUrl { url: path.to_string(), reason: e.to_string() }),
            Origin::Local { page, .. } => Ok(resolve_site_path(page, path)),
        }
    }
}

/// Browser-style resolution of `path` against `page` inside a site, returning
/// a root-relative path without leading slash. `..` never escapes the root.
pub fn resolve_site_path(page: &str, path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let joined = if path.starts_with('/') {
        PathBuf::from(path.trim_start_matches('/'))
    } else {
        let page_dir = Path::new(page.trim_start_matches('/')).parent().unwrap_or(Path::new(""));
        page_dir.join(path)
    };
    let mut parts: Vec<String> = vec![];
    for c in joined.components() {
        match c {
            Component::Normal(s) => parts.push(s.to_string_lossy().into_owned()),
            Component::ParentDir => { parts.pop(); }
            _ => {}
        }
    }
    parts.join("/")
}

#[async_trait]
impl Fetcher for SiteFetcher {
    async fn get(&self, path: &str) -> Result<Response, FetchError> {
        match &self.origin {
            Origin::Http { client, .. } => {
                let url = self.resolve(path)?;
                debug!(%url, "GET");
                let resp = client.get(&url).send().await
                    .map_err(|e| FetchError::Network { url: url.clone(), source: e })?;
                let status = resp.status().as_u16();
                let body = resp.bytes().await
                    .map_err(|e| FetchError::Network { url: url.clone(), source: e })?;
                Ok(Response { status, body: body.to_vec() })
            }
            Origin::Local { root, .. } => {
                let file = root.join(self.resolve(path)?);
                debug!(file = %file.display(), "read");
                match tokio::fs::read(&file).await {
                    Ok(body) => Ok(Response { status: 200, body }),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Response { status: 404, body: vec![] }),
                    Err(e) if file.is_dir() => {
                        debug!(error = %e, "directory requested");
                        Ok(Response { status: 403, body: vec![] })
                    }
                    Err(e) => Err(FetchError::Io { path: file, source: e }),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_resolve_against_page_directory() {
        assert_eq!(resolve_site_path("lectures/index.html", "lectures.json"), "lectures/lectures.json");
        assert_eq!(resolve_site_path("index.html", "lectures.json"), "lectures.json");
        assert_eq!(resolve_site_path("a/b/page.html", "../data/x.json?v=2"), "a/data/x.json");
    }

    #[test]
    fn absolute_paths_resolve_against_root() {
        assert_eq!(resolve_site_path("about/team.html", "/officers/officers.json"), "officers/officers.json");
        assert_eq!(resolve_site_path("index.html", "/../../etc/passwd"), "etc/passwd");
    }

    #[test]
    fn http_resolution_follows_url_join() {
        let f = SiteFetcher::http("https://club.example.org/", Some("lectures/"), None).unwrap();
        assert_eq!(f.resolve("lectures.json").unwrap(), "https://club.example.org/lectures/lectures.json");
        assert_eq!(f.resolve("/officers/officers.json").unwrap(), "https://club.example.org/officers/officers.json");
        assert!(SiteFetcher::http("not a url", None, None).is_err());
    }

    #[tokio::test]
    async fn local_missing_file_is_404() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("lectures.json"), b"[]").unwrap();
        let f = SiteFetcher::local(tmp.path(), None);
        let hit = f.get("lectures.json").await.unwrap();
        assert!(hit.ok());
        assert_eq!(hit.json().unwrap(), serde_json::json!([]));
        let miss = f.get("/officers/officers.json").await.unwrap();
        assert_eq!(miss.status, 404);
        assert!(!miss.ok());
    }
}
