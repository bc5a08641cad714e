use std::convert::Infallible;

use axum::extract::{FromRequestParts, Request};
use axum::middleware::Next;
use axum::response::Response;
use http::HeaderMap;
use http::header::COOKIE;
use http::request::Parts;
use indexmap::IndexMap;

/// Cookies sent with the request, in header order
///
/// When a name repeats, the first occurrence wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cookies(IndexMap<String, String>);

impl Cookies {
    /// Parse every `Cookie` header on the request
    pub fn parse(headers: &HeaderMap) -> Self {
        let mut cookies = IndexMap::new();

        for pair in headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
        {
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };

            let name = name.trim();
            if name.is_empty() || cookies.contains_key(name) {
                continue;
            }

            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|inner| inner.strip_suffix('"'))
                .unwrap_or(value);

            cookies.insert(name.to_owned(), decode(value));
        }

        Self(cookies)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

impl<S> FromRequestParts<S> for Cookies
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<Self>()
            .cloned()
            .unwrap_or_else(|| Self::parse(&parts.headers)))
    }
}

/// Parse cookies once and attach them to the request
pub async fn cookie_middleware(mut request: Request, next: Next) -> Response {
    let cookies = Cookies::parse(request.headers());
    request.extensions_mut().insert(cookies);
    next.run(request).await
}

/// Percent-decode a cookie value; `+` is literal
fn decode(value: &str) -> String {
    let escaped = value.replace('+', "%2B").replace('&', "%26");
    url::form_urlencoded::parse(format!("v={escaped}").as_bytes())
        .next()
        .map_or_else(|| value.to_owned(), |(_, decoded)| decoded.into_owned())
}
