//! Typed MCP headers
//!
//! `Mcp-Session-Id` identifies the session on every request after `initialize`
//! and is echoed back when a session is created. `Mcp-Protocol-Version` is advisory.

use axum::http::{HeaderName, HeaderValue};
use axum_extra::headers::{self, Header};

use crate::session::SessionId;

pub static SESSION_ID_HEADER: HeaderName = HeaderName::from_static("mcp-session-id");
pub static PROTOCOL_VERSION_HEADER: HeaderName = HeaderName::from_static("mcp-protocol-version");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McpSessionId(pub SessionId);

impl Header for McpSessionId {
    fn name() -> &'static HeaderName {
        &SESSION_ID_HEADER
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
    where
        I: Iterator<Item = &'i HeaderValue>,
    {
        non_empty_text(values).map(|text| Self(SessionId::from(text)))
    }

    fn encode<E: Extend<HeaderValue>>(&self, values: &mut E) {
        if let Ok(value) = HeaderValue::from_str(self.0.as_str()) {
            values.extend(std::iter::once(value));
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McpProtocolVersion(pub String);

impl Header for McpProtocolVersion {
    fn name() -> &'static HeaderName {
        &PROTOCOL_VERSION_HEADER
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
    where
        I: Iterator<Item = &'i HeaderValue>,
    {
        non_empty_text(values).map(|text| Self(text.to_string()))
    }

    fn encode<E: Extend<HeaderValue>>(&self, values: &mut E) {
        if let Ok(value) = HeaderValue::from_str(&self.0) {
            values.extend(std::iter::once(value));
        }
    }
}

fn non_empty_text<'i, I>(values: &mut I) -> Result<&'i str, headers::Error>
where
    I: Iterator<Item = &'i HeaderValue>,
{
    values
        .next()
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .ok_or_else(headers::Error::invalid)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderMap;
    use axum_extra::headers::HeaderMapExt;

    use super::*;

    #[test]
    fn session_header_round_trips_through_header_map() {
        let mut map = HeaderMap::new();
        map.typed_insert(McpSessionId(SessionId::from("abc-123")));

        assert_eq!(map.get(&SESSION_ID_HEADER).expect("header set"), "abc-123");
        assert_eq!(
            map.typed_get::<McpSessionId>(),
            Some(McpSessionId(SessionId::from("abc-123")))
        );
    }

    #[test]
    fn blank_session_header_is_rejected() {
        let mut map = HeaderMap::new();
        map.insert(SESSION_ID_HEADER.clone(), HeaderValue::from_static("  "));

        assert_eq!(map.typed_get::<McpSessionId>(), None);
    }
}
