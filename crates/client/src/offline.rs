//! Offline fallback page for navigations that cannot reach the network.

use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::{self, HeaderMap, HeaderValue};
use url::Url;
use waystation_core::ResponseType;

use crate::response::Response;

/// Visible notice rendered on the offline page.
pub const OFFLINE_NOTICE: &str = "You're currently offline. Please check your internet connection and try again.";

/// Self-contained offline document: inline styles, no external assets.
#[derive(Debug, Clone)]
pub struct OfflinePage {
    html: String,
}

impl OfflinePage {
    /// Render the page for an application name.
    pub fn new(app_name: &str) -> Self {
        let name = escape_html(app_name);
        let html = format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>{name} - Offline</title>
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <style>
    body {{
      font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
      display: flex;
      justify-content: center;
      align-items: center;
      height: 100vh;
      margin: 0;
      background: #f8fafc;
      color: #1e293b;
    }}
    .offline-message {{ text-align: center; padding: 2rem; max-width: 400px; }}
    h1 {{ color: #4361ee; margin-bottom: 1rem; }}
    p {{ margin-bottom: 1.5rem; }}
    button {{
      background: #4361ee;
      color: white;
      border: none;
      padding: 0.75rem 1.5rem;
      border-radius: 0.5rem;
      cursor: pointer;
      font-size: 1rem;
    }}
    button:hover {{ background: #3f37c9; }}
  </style>
</head>
<body>
  <div class="offline-message">
    <h1>{name}</h1>
    <p>{OFFLINE_NOTICE}</p>
    <button onclick="window.location.reload()">Try Again</button>
  </div>
</body>
</html>
"#
        );
        Self { html }
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    /// Build the 200 `text/html` response served in place of `url`.
    pub fn response(&self, url: &Url) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
        Response {
            url: url.clone(),
            status: StatusCode::OK,
            headers,
            body: Bytes::from(self.html.clone()),
            response_type: ResponseType::Basic,
        }
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offline_response_shape() {
        let page = OfflinePage::new("Doc-Rocker");
        let url = Url::parse("http://localhost:4000/docs/intro").unwrap();
        let response = page.response(&url);

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.content_type(), Some("text/html; charset=utf-8"));
        assert_eq!(response.url, url);
        let body = response.text();
        assert!(body.contains(OFFLINE_NOTICE));
        assert!(body.contains("<title>Doc-Rocker - Offline</title>"));
        assert!(body.contains("window.location.reload()"));
    }

    #[test]
    fn test_offline_page_is_self_contained() {
        let page = OfflinePage::new("Doc-Rocker");
        assert!(page.html().contains("<style>"));
        assert!(!page.html().contains("<link"));
        assert!(!page.html().contains("<script src"));
    }

    #[test]
    fn test_app_name_is_escaped() {
        let page = OfflinePage::new("<Docs & Co>");
        assert!(page.html().contains("&lt;Docs &amp; Co&gt;"));
        assert!(!page.html().contains("<Docs"));
    }
}
