use crate::utils::error::{BookingMapError, Result, TransportError, SNIPPET_LEN};
use reqwest::cookie::Jar;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Credentialed JSON-over-HTTP requests against one booking server.
///
/// All requests share the cookie jar, so a session cookie set once is sent on
/// every call. Relative URLs are resolved against the base URL.
#[derive(Debug, Clone)]
pub struct JsonTransport {
    client: Client,
    base_url: Url,
    jar: Arc<Jar>,
}

impl JsonTransport {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        Self::with_jar(base_url, timeout_secs, Arc::new(Jar::default()))
    }

    pub fn with_jar(base_url: &str, timeout_secs: u64, jar: Arc<Jar>) -> Result<Self> {
        let base_url =
            Url::parse(base_url).map_err(|e| BookingMapError::InvalidConfigValueError {
                field: "server.base_url".to_string(),
                value: base_url.to_string(),
                reason: e.to_string(),
            })?;

        let client = Client::builder()
            .cookie_provider(jar.clone())
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url,
            jar,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn cookie_jar(&self) -> Arc<Jar> {
        self.jar.clone()
    }

    /// Stores each `name=value` pair of a `Cookie` header for the server's origin,
    /// so root-relative endpoints get them even when the base URL has a path.
    pub fn seed_cookies(&self, cookie_header: &str) {
        let origin = self
            .base_url
            .join("/")
            .unwrap_or_else(|_| self.base_url.clone());
        for pair in cookie_header.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            self.jar.add_cookie_str(pair, &origin);
        }
    }

    pub fn resolve(&self, url: &str) -> std::result::Result<Url, TransportError> {
        self.base_url
            .join(url)
            .map_err(|source| TransportError::InvalidUrl {
                url: url.to_string(),
                source,
            })
    }

    pub fn resolve_with_query(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> std::result::Result<Url, TransportError> {
        let mut resolved = self.resolve(url)?;
        {
            let mut query = resolved.query_pairs_mut();
            for (key, value) in params {
                query.append_pair(key, value);
            }
        }
        Ok(resolved)
    }

    /// GET a JSON document.
    ///
    /// A non-2xx status is reported without looking at the body, so an HTML
    /// error page is never fed to the JSON parser.
    pub async fn get_json(&self, url: Url) -> std::result::Result<serde_json::Value, TransportError> {
        tracing::debug!("GET {}", url);
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        let content_type = content_type(&response);
        let text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                "API error: {} {} {}",
                status.as_u16(),
                url,
                snippet(&text)
            );
            return Err(TransportError::ServerError {
                status: status.as_u16(),
            });
        }

        parse_json_body(&url, &content_type, &text)
    }

    pub async fn get_as<T: DeserializeOwned>(&self, url: Url) -> std::result::Result<T, TransportError> {
        let value = self.get_json(url).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// POST a JSON body and return the status with the parsed answer.
    ///
    /// JSON answers are parsed whatever the status: the server reports
    /// rejected submissions as 4xx/5xx with `{ok: false, error}`.
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        url: Url,
        body: &B,
        headers: &[(&'static str, String)],
    ) -> std::result::Result<(u16, serde_json::Value), TransportError> {
        tracing::debug!("POST {}", url);
        let mut request = self.client.post(url.clone()).json(body);
        for (name, value) in headers {
            request = request.header(*name, value.as_str());
        }

        let response = request.send().await?;
        let status = response.status();
        let content_type = content_type(&response);
        let text = response.text().await?;

        if !status.is_success() && !is_json(&content_type) {
            tracing::error!(
                "API error: {} {} {}",
                status.as_u16(),
                url,
                snippet(&text)
            );
            return Err(TransportError::ServerError {
                status: status.as_u16(),
            });
        }

        let value = parse_json_body(&url, &content_type, &text)?;
        Ok((status.as_u16(), value))
    }
}

fn content_type(response: &Response) -> String {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase()
}

fn is_json(content_type: &str) -> bool {
    content_type.contains("application/json") || content_type.contains("+json")
}

fn snippet(text: &str) -> String {
    text.chars().take(SNIPPET_LEN).collect()
}

fn parse_json_body(
    url: &Url,
    content_type: &str,
    text: &str,
) -> std::result::Result<serde_json::Value, TransportError> {
    if !is_json(content_type) {
        let snippet = snippet(text);
        tracing::error!("Non-JSON response from {}: {}", url, snippet);
        return Err(TransportError::InvalidContentType {
            content_type: content_type.to_string(),
            snippet,
        });
    }

    Ok(serde_json::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[test]
    fn test_resolve_relative_and_absolute() {
        let transport = JsonTransport::new("http://bookings.test/app/", 5).unwrap();

        assert_eq!(
            transport.resolve("/physio/api/book/").unwrap().as_str(),
            "http://bookings.test/physio/api/book/"
        );
        assert_eq!(
            transport.resolve("https://other.test/x").unwrap().as_str(),
            "https://other.test/x"
        );
    }

    #[test]
    fn test_query_params_are_encoded() {
        let transport = JsonTransport::new("http://bookings.test", 5).unwrap();
        let url = transport
            .resolve_with_query("/api/timeslots/", &[("location_id", "42"), ("time", "09:00")])
            .unwrap();

        assert_eq!(url.query(), Some("location_id=42&time=09%3A00"));
    }

    #[test]
    fn test_snippet_is_truncated() {
        let long = "x".repeat(1000);
        assert_eq!(snippet(&long).len(), SNIPPET_LEN);
        assert_eq!(snippet("short"), "short");
    }

    #[tokio::test]
    async fn test_get_json_parses_json() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET).path("/data");
            then.status(200)
                .header("Content-Type", "application/json")
                .body(r#"{"ok": true}"#);
        });

        let transport = JsonTransport::new(&server.base_url(), 5).unwrap();
        let value = transport
            .get_json(transport.resolve("/data").unwrap())
            .await
            .unwrap();

        api_mock.assert();
        assert_eq!(value, serde_json::json!({"ok": true}));
    }

    #[tokio::test]
    async fn test_get_json_server_error_skips_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/data");
            then.status(500)
                .header("Content-Type", "text/html")
                .body("<html><body>Traceback</body></html>");
        });

        let transport = JsonTransport::new(&server.base_url(), 5).unwrap();
        let err = transport
            .get_json(transport.resolve("/data").unwrap())
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::ServerError { status: 500 }));
    }

    #[tokio::test]
    async fn test_get_json_rejects_html_with_snippet() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/data");
            then.status(200)
                .header("Content-Type", "text/html; charset=utf-8")
                .body("<html>login page</html>");
        });

        let transport = JsonTransport::new(&server.base_url(), 5).unwrap();
        let err = transport
            .get_json(transport.resolve("/data").unwrap())
            .await
            .unwrap_err();

        match err {
            TransportError::InvalidContentType {
                content_type,
                snippet,
            } => {
                assert!(content_type.starts_with("text/html"));
                assert_eq!(snippet, "<html>login page</html>");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_get_json_malformed_body_is_decode_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/data");
            then.status(200)
                .header("Content-Type", "application/json")
                .body("{not json");
        });

        let transport = JsonTransport::new(&server.base_url(), 5).unwrap();
        let err = transport
            .get_json(transport.resolve("/data").unwrap())
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::Decode(_)));
        assert!(!err.is_expected());
    }

    #[tokio::test]
    async fn test_seeded_cookies_are_sent() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/data")
                .cookie("sessionid", "xyz");
            then.status(200)
                .header("Content-Type", "application/json")
                .body("{}");
        });

        let transport = JsonTransport::new(&server.base_url(), 5).unwrap();
        transport.seed_cookies("csrftoken=abc; sessionid=xyz");
        transport
            .get_json(transport.resolve("/data").unwrap())
            .await
            .unwrap();

        api_mock.assert();
    }

    #[tokio::test]
    async fn test_post_json_parses_error_status_with_json_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/book");
            then.status(400)
                .header("Content-Type", "application/json")
                .body(r#"{"ok": false, "error": "Slot full"}"#);
        });

        let transport = JsonTransport::new(&server.base_url(), 5).unwrap();
        let (status, value) = transport
            .post_json(transport.resolve("/book").unwrap(), &serde_json::json!({}), &[])
            .await
            .unwrap();

        assert_eq!(status, 400);
        assert_eq!(value["error"], "Slot full");
    }

    #[tokio::test]
    async fn test_seeded_cookies_reach_root_paths_below_base_path() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/physio/map-data/")
                .cookie("sessionid", "xyz");
            then.status(200)
                .header("Content-Type", "application/json")
                .body("{}");
        });

        let transport = JsonTransport::new(&server.url("/app/"), 5).unwrap();
        transport.seed_cookies("sessionid=xyz");
        transport
            .get_json(transport.resolve("/physio/map-data/").unwrap())
            .await
            .unwrap();

        api_mock.assert();
    }

    #[tokio::test]
    async fn test_post_json_error_status_with_html_is_server_error() {
        let server = MockServer::start();
        let book_mock = server.mock(|when, then| {
            when.method(POST).path("/book");
            then.status(403)
                .header("Content-Type", "text/html")
                .body("<h1>Forbidden (403)</h1><p>CSRF verification failed.</p>");
        });

        let transport = JsonTransport::new(&server.base_url(), 5).unwrap();
        let err = transport
            .post_json(transport.resolve("/book").unwrap(), &serde_json::json!({}), &[])
            .await
            .unwrap_err();

        book_mock.assert_hits(1);
        assert!(matches!(err, TransportError::ServerError { status: 403 }));
        assert!(err.is_expected());
    }

    #[tokio::test]
    async fn test_post_json_success_with_html_is_invalid_content_type() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/book");
            then.status(200)
                .header("Content-Type", "text/html")
                .body("<html>login page</html>");
        });

        let transport = JsonTransport::new(&server.base_url(), 5).unwrap();
        let err = transport
            .post_json(transport.resolve("/book").unwrap(), &serde_json::json!({}), &[])
            .await
            .unwrap_err();

        match err {
            TransportError::InvalidContentType {
                content_type,
                snippet,
            } => {
                assert_eq!(content_type, "text/html");
                assert_eq!(snippet, "<html>login page</html>");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
