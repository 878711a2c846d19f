//! Inbound request headers consumed by the proxy.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{
        HeaderMap,
        header::{AUTHORIZATION, COOKIE},
        request::Parts,
    },
};

use crate::backend::WORKSPACE_HEADER;

/// The inbound headers the proxy reads, and nothing else.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundHeaders {
    pub authorization: Option<String>,
    pub cookie: Option<String>,
    pub workspace_id: Option<String>,
}

impl InboundHeaders {
    /// Pick the proxy's headers out of a request header map.
    ///
    /// Values that are empty or not visible ASCII are treated as absent.
    /// Multiple `Cookie` headers (as sent over HTTP/2) are joined with `"; "`.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let text = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let cookies: Vec<&str> = headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .collect();

        Self {
            authorization: text(AUTHORIZATION.as_str()),
            cookie: (!cookies.is_empty()).then(|| cookies.join("; ")),
            workspace_id: text(WORKSPACE_HEADER),
        }
    }
}

impl<S> FromRequestParts<S> for InboundHeaders
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_reads_known_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.insert(COOKIE, HeaderValue::from_static("session=1"));
        headers.insert(WORKSPACE_HEADER, HeaderValue::from_static("ws-1"));
        headers.insert("x-unrelated", HeaderValue::from_static("ignored"));

        let inbound = InboundHeaders::from_headers(&headers);
        assert_eq!(inbound.authorization.as_deref(), Some("Bearer abc"));
        assert_eq!(inbound.cookie.as_deref(), Some("session=1"));
        assert_eq!(inbound.workspace_id.as_deref(), Some("ws-1"));
    }

    #[test]
    fn test_missing_and_blank_headers_are_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(WORKSPACE_HEADER, HeaderValue::from_static("  "));

        assert_eq!(InboundHeaders::from_headers(&headers), InboundHeaders::default());
    }

    #[test]
    fn test_joins_split_cookie_headers() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("a=1"));
        headers.append(COOKIE, HeaderValue::from_static("b=2"));

        let inbound = InboundHeaders::from_headers(&headers);
        assert_eq!(inbound.cookie.as_deref(), Some("a=1; b=2"));
    }
}
