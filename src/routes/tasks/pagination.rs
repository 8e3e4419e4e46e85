use axum::http::{header, HeaderMap, Uri};
use serde::Serialize;
use url::Url;

use crate::error::AppError;

/// Page-number envelope returned by list endpoints.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// An empty result set still has one (empty) page.
pub fn num_pages(count: i64, page_size: u32) -> u32 {
    let size = i64::from(page_size.max(1));
    let pages = (count.max(0) + size - 1) / size;
    u32::try_from(pages.max(1)).unwrap_or(u32::MAX)
}

/// Absolute URL of the current request, used as the template for page links.
pub fn request_url(base: Option<&Url>, headers: &HeaderMap, uri: &Uri) -> Result<Url, AppError> {
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");

    let parsed = match base {
        Some(base) => Ok(under_base(base, uri)),
        None => {
            let host = headers
                .get(header::HOST)
                .and_then(|v| v.to_str().ok())
                .or_else(|| uri.authority().map(|a| a.as_str()))
                .unwrap_or("localhost");
            Url::parse(&format!("http://{}{}", host, path_and_query))
        }
    };

    parsed.map_err(|e| AppError::BadRequest(format!("Cannot build request URL: {}", e)))
}

/// The request path appended to the base path, so a mount prefix such as
/// `https://host/api/` is kept.
fn under_base(base: &Url, uri: &Uri) -> Url {
    let prefix = base.path().trim_end_matches('/');
    let mut url = base.clone();
    url.set_path(&format!("{}{}", prefix, uri.path()));
    url.set_query(uri.query());
    url.set_fragment(None);
    url
}

/// `(next, previous)` links for `page` out of `num_pages`.
pub fn page_links(url: &Url, page: u32, num_pages: u32) -> (Option<String>, Option<String>) {
    let next = (page < num_pages).then(|| with_page(url, Some(page + 1)));
    let previous = match page {
        0 | 1 => None,
        2 => Some(with_page(url, None)),
        _ => Some(with_page(url, Some(page - 1))),
    };

    (next, previous)
}

/// Rewrites the query with `page` replaced, or removed for `None`.
/// Parameters come out sorted by key.
fn with_page(url: &Url, page: Option<u32>) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "page")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if let Some(page) = page {
        pairs.push(("page".to_string(), page.to_string()));
    }
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    let mut out = url.clone();
    if pairs.is_empty() {
        out.set_query(None);
    } else {
        out.query_pairs_mut().clear().extend_pairs(pairs);
    }

    out.to_string()
}
