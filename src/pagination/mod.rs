//! Link-header pagination.

use crate::errors::{GitHubError, GitHubResult};
use reqwest::header::HeaderMap;
use serde_json::Value;
use url::Url;

/// Relations parsed from a `Link` header (RFC 8288).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationLinks {
    /// Next page.
    pub next: Option<String>,
    /// Previous page.
    pub prev: Option<String>,
    /// First page.
    pub first: Option<String>,
    /// Last page.
    pub last: Option<String>,
}

impl PaginationLinks {
    /// Parses a `Link` header value. Unknown relations are ignored.
    pub fn parse(header_value: &str) -> Self {
        let mut links = Self::default();

        for part in header_value.split(',') {
            let mut segments = part.split(';').map(str::trim);
            let Some(target) = segments
                .next()
                .and_then(|s| s.strip_prefix('<'))
                .and_then(|s| s.strip_suffix('>'))
            else {
                continue;
            };

            for segment in segments {
                let Some(rels) = segment.strip_prefix("rel=") else {
                    continue;
                };
                // A single link may carry several space-separated relations.
                for rel in rels.trim_matches('"').split_whitespace() {
                    let slot = match rel {
                        "next" => &mut links.next,
                        "prev" => &mut links.prev,
                        "first" => &mut links.first,
                        "last" => &mut links.last,
                        _ => continue,
                    };
                    *slot = Some(target.to_string());
                }
            }
        }

        links
    }

    /// Parses the `Link` header of a response.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get("link")
            .and_then(|v| v.to_str().ok())
            .map(Self::parse)
            .unwrap_or_default()
    }

    /// Returns true if there is a next page.
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    /// Page number of the `last` link.
    pub fn total_pages(&self) -> Option<u32> {
        let last = Url::parse(self.last.as_deref()?).ok()?;
        last.query_pairs()
            .find(|(k, _)| k == "page")
            .and_then(|(_, v)| v.parse().ok())
    }
}

/// Sets `per_page` on a URL, replacing any existing value.
pub fn with_per_page(url: &str, per_page: u32) -> GitHubResult<String> {
    let mut parsed = Url::parse(url).map_err(|e| {
        GitHubError::configuration(format!("Invalid request URL: {}", e)).with_cause(e)
    })?;
    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| k != "per_page")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    parsed
        .query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair("per_page", &per_page.to_string());
    Ok(parsed.to_string())
}

/// Items on one page: the array itself, or the `items` array of a search
/// result. Anything else counts as a single item.
pub fn page_items(page: Value) -> Vec<Value> {
    match page {
        Value::Array(items) => items,
        Value::Object(mut object) => match object.remove("items") {
            Some(Value::Array(items)) => items,
            Some(other) => {
                object.insert("items".to_string(), other);
                vec![Value::Object(object)]
            }
            None => vec![Value::Object(object)],
        },
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_link_header() {
        let header = r#"<https://api.github.com/repos?page=2>; rel="next", <https://api.github.com/repos?page=5>; rel="last""#;
        let links = PaginationLinks::parse(header);

        assert_eq!(links.next.as_deref(), Some("https://api.github.com/repos?page=2"));
        assert_eq!(links.last.as_deref(), Some("https://api.github.com/repos?page=5"));
        assert!(links.prev.is_none());
        assert_eq!(links.total_pages(), Some(5));
    }

    #[test]
    fn test_multiple_relations_on_one_link() {
        let links = PaginationLinks::parse(r#"<https://x/?page=1>; rel="first prev""#);
        assert_eq!(links.first, links.prev);
        assert!(links.first.is_some());
    }

    #[test]
    fn test_malformed_parts_are_skipped() {
        let links = PaginationLinks::parse(r#"garbage, <https://x/?page=3>; rel="next""#);
        assert_eq!(links.next.as_deref(), Some("https://x/?page=3"));
    }

    #[test]
    fn test_with_per_page_replaces_existing() {
        let url = with_per_page("https://api.github.com/user/repos?per_page=10&type=owner", 50).unwrap();
        assert_eq!(url, "https://api.github.com/user/repos?type=owner&per_page=50");
    }

    #[test]
    fn test_page_items() {
        assert_eq!(page_items(json!([1, 2])).len(), 2);
        assert_eq!(
            page_items(json!({"total_count": 2, "items": [{"id": 1}, {"id": 2}]})),
            vec![json!({"id": 1}), json!({"id": 2})]
        );
        assert_eq!(page_items(json!({"id": 1})), vec![json!({"id": 1})]);
        assert!(page_items(Value::Null).is_empty());
    }
}
