use crate::domain::ports::CredentialProvider;
use reqwest::cookie::{CookieStore, Jar};
use std::sync::Arc;
use url::Url;

/// Reads the anti-forgery token out of the shared cookie jar on every call.
pub struct CookieCsrfToken {
    jar: Arc<Jar>,
    url: Url,
    cookie_name: String,
}

impl CookieCsrfToken {
    pub fn new(jar: Arc<Jar>, url: Url, cookie_name: impl Into<String>) -> Self {
        Self {
            jar,
            url,
            cookie_name: cookie_name.into(),
        }
    }
}

impl CredentialProvider for CookieCsrfToken {
    fn anti_forgery_token(&self) -> Option<String> {
        let header = self.jar.cookies(&self.url)?;
        let header = header.to_str().ok()?;
        find_cookie(header, &self.cookie_name)
    }
}

/// A fixed token handed over by the host, or none at all.
#[derive(Debug, Clone, Default)]
pub struct StaticToken(pub Option<String>);

impl CredentialProvider for StaticToken {
    fn anti_forgery_token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Looks up `name` in a `Cookie` header value and percent-decodes it.
pub fn find_cookie(header: &str, name: &str) -> Option<String> {
    header
        .split(';')
        .map(str::trim)
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| {
            url::form_urlencoded::parse(value.as_bytes())
                .next()
                .map(|(decoded, _)| decoded.into_owned())
                .unwrap_or_default()
        })
}
